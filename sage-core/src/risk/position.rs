//! Per-symbol position store
//!
//! A fixed array of cache-aligned position records, one per symbol slot,
//! pre-allocated at startup. Only the risk worker mutates records; the two
//! aggregates other workers observe (total exposure, daily PnL) are atomics
//! published with release stores and read with acquire loads.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;

use crate::config::MAX_SYMBOLS;

/// One symbol's position. Exactly one cache line.
#[derive(Debug, Clone, Copy)]
#[repr(C, align(64))]
pub struct Position {
    /// Signed quantity: positive long, negative short.
    pub quantity: i64,
    /// Average entry price (fixed point raw).
    pub avg_entry_price: i64,
    /// Unrealized PnL (fixed point raw).
    pub unrealized_pnl: i64,
    /// Realized PnL for the day (fixed point raw).
    pub realized_pnl: i64,
    /// Last update timestamp, nanoseconds.
    pub last_update_ns: u64,
    /// Trades today.
    pub trade_count: u32,
}

impl Position {
    pub const fn empty() -> Self {
        Self {
            quantity: 0,
            avg_entry_price: 0,
            unrealized_pnl: 0,
            realized_pnl: 0,
            last_update_ns: 0,
            trade_count: 0,
        }
    }
}

const _: () = {
    assert!(std::mem::size_of::<Position>() == 64);
    assert!(std::mem::align_of::<Position>() == 64);
};

/// The two aggregates peer workers may observe: release-stored by the
/// risk worker, acquire-loaded everywhere else.
pub struct BookAggregates {
    total_exposure: CachePadded<AtomicI64>,
    daily_pnl: CachePadded<AtomicI64>,
}

impl BookAggregates {
    fn new() -> Self {
        Self {
            total_exposure: CachePadded::new(AtomicI64::new(0)),
            daily_pnl: CachePadded::new(AtomicI64::new(0)),
        }
    }

    #[inline(always)]
    pub fn total_exposure(&self) -> i64 {
        self.total_exposure.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub fn daily_pnl(&self) -> i64 {
        self.daily_pnl.load(Ordering::Acquire)
    }
}

/// Pre-allocated position store for all symbol slots.
///
/// Single-writer by contract (the risk worker); the [`BookAggregates`]
/// handle is the cross-worker observable surface.
pub struct PositionBook {
    positions: Box<[Position]>,
    aggregates: Arc<BookAggregates>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self {
            positions: vec![Position::empty(); MAX_SYMBOLS].into_boxed_slice(),
            aggregates: Arc::new(BookAggregates::new()),
        }
    }

    /// Shared observer handle for peer workers.
    pub fn aggregates(&self) -> Arc<BookAggregates> {
        Arc::clone(&self.aggregates)
    }

    #[inline(always)]
    fn index(symbol_id: u64) -> usize {
        (symbol_id as usize) & (MAX_SYMBOLS - 1)
    }

    /// Apply a signed delta to a symbol's position.
    ///
    /// Exposure changes by `|new| - |old|` and is published with release
    /// ordering for cross-worker observers.
    #[inline]
    pub fn update_position(&mut self, symbol_id: u64, delta: i64, now_ns: u64) {
        let pos = &mut self.positions[Self::index(symbol_id)];

        let old_qty = pos.quantity;
        let new_qty = old_qty.saturating_add(delta);
        pos.quantity = new_qty;
        pos.trade_count += 1;
        pos.last_update_ns = now_ns;

        let exposure_change = new_qty.abs() - old_qty.abs();
        self.aggregates
            .total_exposure
            .fetch_add(exposure_change, Ordering::Release);
    }

    /// Record a fill against a symbol, maintaining the average entry price
    /// and realizing PnL on position reduction.
    pub fn apply_fill(&mut self, symbol_id: u64, price: i64, qty: i64, now_ns: u64) {
        let pos = &mut self.positions[Self::index(symbol_id)];

        let old_qty = pos.quantity;
        let new_qty = old_qty.saturating_add(qty);

        if old_qty == 0 || old_qty.signum() == qty.signum() {
            // Opening or adding: blend the entry price by size.
            let old_abs = old_qty.abs() as i128;
            let add_abs = qty.abs() as i128;
            let total = old_abs + add_abs;
            if total > 0 {
                pos.avg_entry_price = ((pos.avg_entry_price as i128 * old_abs
                    + price as i128 * add_abs)
                    / total) as i64;
            }
        } else {
            // Reducing or flipping: realize PnL on the closed portion.
            let closed = qty.abs().min(old_qty.abs());
            let pnl_per_unit = if old_qty > 0 {
                price - pos.avg_entry_price
            } else {
                pos.avg_entry_price - price
            };
            let realized = (pnl_per_unit as i128 * closed as i128
                / crate::core::fixed::SCALE as i128) as i64;
            pos.realized_pnl += realized;
            self.aggregates.daily_pnl.fetch_add(realized, Ordering::Release);
            if new_qty != 0 && new_qty.signum() != old_qty.signum() {
                // Flipped through zero: remainder opens at the fill price.
                pos.avg_entry_price = price;
            } else if new_qty == 0 {
                pos.avg_entry_price = 0;
            }
        }

        pos.quantity = new_qty;
        pos.trade_count += 1;
        pos.last_update_ns = now_ns;

        let exposure_change = new_qty.abs() - old_qty.abs();
        self.aggregates
            .total_exposure
            .fetch_add(exposure_change, Ordering::Release);
    }

    #[inline(always)]
    pub fn position(&self, symbol_id: u64) -> i64 {
        self.positions[Self::index(symbol_id)].quantity
    }

    #[inline(always)]
    pub fn position_info(&self, symbol_id: u64) -> &Position {
        &self.positions[Self::index(symbol_id)]
    }

    /// Cross-worker observable, acquire load.
    #[inline(always)]
    pub fn total_exposure(&self) -> i64 {
        self.aggregates.total_exposure()
    }

    /// Cross-worker observable, acquire load.
    #[inline(always)]
    pub fn daily_pnl(&self) -> i64 {
        self.aggregates.daily_pnl()
    }

    /// Fold realized PnL into the daily aggregate (release store).
    #[inline(always)]
    pub fn record_pnl(&self, pnl: i64) {
        self.aggregates.daily_pnl.fetch_add(pnl, Ordering::Release);
    }

    /// Start-of-day reset.
    pub fn reset(&mut self) {
        for pos in self.positions.iter_mut() {
            *pos = Position::empty();
        }
        self.aggregates.total_exposure.store(0, Ordering::Release);
        self.aggregates.daily_pnl.store(0, Ordering::Release);
    }
}

impl Default for PositionBook {
    fn default() -> Self {
        Self::new()
    }
}
