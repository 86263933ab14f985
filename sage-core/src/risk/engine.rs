//! Risk engine: per-signal admission and position accounting
//!
//! Per signal: a relaxed-load breaker check first (cheapest rejection),
//! then the four-limit branchless check against the projected position,
//! order size, total exposure and daily PnL. Approval emits a market-order
//! request downstream and applies the position delta before the order
//! leaves this stage, so the book never lags the wire. Every decision is
//! TSC-timed.
//!
//! The order value is the signal's confidence times its direction -- a
//! signed notional in fixed-point units (the same unit every limit is
//! configured in).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::breaker::{BreakerReason, CircuitBreaker};
use super::limits::{self, RiskLimits};
use super::position::PositionBook;
use crate::core::fixed::FixedPoint;
use crate::core::message::{
    AlertLevel, Envelope, OrderRequest, OrderType, Payload, RiskAlert,
};
use crate::perf::clock::{self, TscCalibrator};

/// Time-in-force stamped on emitted orders: immediate-or-cancel.
const TIF_IOC: u8 = 1;

/// Cache-padded risk counters, readable from any thread.
#[repr(C, align(64))]
pub struct RmeMetrics {
    pub signals_received: AtomicU64,
    _pad1: [u8; 56],
    pub orders_approved: AtomicU64,
    _pad2: [u8; 56],
    pub orders_rejected: AtomicU64,
    _pad3: [u8; 56],
    /// Approved orders lost to a full downstream ring.
    pub orders_dropped: AtomicU64,
    _pad4: [u8; 56],
    /// Cumulative decision time in nanoseconds.
    pub decision_latency_ns: AtomicU64,
    _pad5: [u8; 56],
}

impl RmeMetrics {
    pub const fn new() -> Self {
        Self {
            signals_received: AtomicU64::new(0),
            _pad1: [0; 56],
            orders_approved: AtomicU64::new(0),
            _pad2: [0; 56],
            orders_rejected: AtomicU64::new(0),
            _pad3: [0; 56],
            orders_dropped: AtomicU64::new(0),
            _pad4: [0; 56],
            decision_latency_ns: AtomicU64::new(0),
            _pad5: [0; 56],
        }
    }

    pub fn snapshot(&self) -> RmeMetricsSnapshot {
        RmeMetricsSnapshot {
            signals_received: self.signals_received.load(Ordering::Relaxed),
            orders_approved: self.orders_approved.load(Ordering::Relaxed),
            orders_rejected: self.orders_rejected.load(Ordering::Relaxed),
            orders_dropped: self.orders_dropped.load(Ordering::Relaxed),
            decision_latency_ns: self.decision_latency_ns.load(Ordering::Relaxed),
        }
    }
}

impl Default for RmeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`RmeMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RmeMetricsSnapshot {
    pub signals_received: u64,
    pub orders_approved: u64,
    pub orders_rejected: u64,
    pub orders_dropped: u64,
    pub decision_latency_ns: u64,
}

impl RmeMetricsSnapshot {
    pub fn avg_decision_ns(&self) -> f64 {
        if self.signals_received > 0 {
            self.decision_latency_ns as f64 / self.signals_received as f64
        } else {
            0.0
        }
    }
}

/// The risk worker core.
pub struct RiskEngine {
    limits: RiskLimits,
    book: PositionBook,
    breaker: Arc<CircuitBreaker>,
    metrics: Arc<RmeMetrics>,
    calibrator: TscCalibrator,
    sequence: u64,
}

impl RiskEngine {
    /// Build with a freshly calibrated TSC converter (sleeps ~50 ms).
    pub fn new(limits: RiskLimits) -> Self {
        Self::with_calibrator(limits, TscCalibrator::new())
    }

    pub fn with_calibrator(limits: RiskLimits, calibrator: TscCalibrator) -> Self {
        Self {
            limits,
            book: PositionBook::new(),
            breaker: Arc::new(CircuitBreaker::new()),
            metrics: Arc::new(RmeMetrics::new()),
            calibrator,
            sequence: 0,
        }
    }

    /// Dispatch one incoming envelope.
    ///
    /// Signals run the risk check and may produce an order request;
    /// heartbeats are forwarded unchanged.
    #[inline]
    pub fn on_message(&mut self, msg: &Envelope) -> Option<Envelope> {
        match &msg.payload {
            Payload::Signal(_) => self.process_signal(msg),
            Payload::Heartbeat(_) => Some(*msg),
            _ => None,
        }
    }

    fn process_signal(&mut self, msg: &Envelope) -> Option<Envelope> {
        let start_tsc = clock::rdtsc();

        let signal = match msg.as_signal() {
            Some(s) => *s,
            None => return None,
        };

        self.metrics.signals_received.fetch_add(1, Ordering::Relaxed);

        let order_value = signal.confidence.raw() * signal.direction as i64;

        if !self.check_order(signal.symbol_id, order_value) {
            self.metrics.orders_rejected.fetch_add(1, Ordering::Relaxed);
            self.finish_timing(start_tsc);
            return None;
        }

        self.sequence += 1;
        let order = OrderRequest::new(
            self.sequence,
            signal.symbol_id,
            FixedPoint::zero(), // market order: no limit price
            signal.confidence,
            signal.direction,
            OrderType::Market,
            TIF_IOC,
        );

        // Book first, wire second: the store never lags the order flow.
        self.book
            .update_position(signal.symbol_id, order_value, clock::monotonic_ns());
        self.metrics.orders_approved.fetch_add(1, Ordering::Relaxed);

        let out = Envelope::order(clock::monotonic_ns(), self.sequence, order);
        self.finish_timing(start_tsc);
        Some(out)
    }

    /// The four-limit check, breaker first.
    #[inline(always)]
    fn check_order(&self, symbol_id: u64, order_value: i64) -> bool {
        if self.breaker.is_tripped() {
            return false;
        }

        let current = self.book.position(symbol_id);
        let new_position = current.saturating_add(order_value);

        limits::all_checks_pass(
            new_position,
            self.limits.max_position_per_symbol,
            order_value,
            self.limits.max_order_size,
            self.book.total_exposure().saturating_add(order_value.abs()),
            self.limits.max_total_exposure,
            self.book.daily_pnl(),
            self.limits.max_daily_loss,
        )
    }

    #[inline(always)]
    fn finish_timing(&self, start_tsc: u64) {
        let ns = self
            .calibrator
            .tsc_to_ns(clock::rdtsc().wrapping_sub(start_tsc));
        self.metrics
            .decision_latency_ns
            .fetch_add(ns, Ordering::Relaxed);
    }

    /// Background-loop condition check; trips on daily loss breach.
    pub fn check_breaker_conditions(&self) {
        if self.book.daily_pnl() < -self.limits.max_daily_loss {
            self.breaker.trip(BreakerReason::DailyLossBreach);
        }
    }

    /// Build a risk alert reflecting the current aggregates.
    pub fn make_alert(&mut self, level: AlertLevel) -> Envelope {
        self.sequence += 1;
        let alert = RiskAlert::new(
            clock::realtime_ns(),
            self.book.total_exposure(),
            self.book.daily_pnl(),
            level,
        );
        Envelope::risk_alert(clock::monotonic_ns(), self.sequence, alert)
    }

    pub fn book(&self) -> &PositionBook {
        &self.book
    }

    pub fn book_mut(&mut self) -> &mut PositionBook {
        &mut self.book
    }

    pub fn breaker(&self) -> Arc<CircuitBreaker> {
        Arc::clone(&self.breaker)
    }

    /// Shared observer handle to the book aggregates, for peer workers.
    pub fn aggregates(&self) -> Arc<crate::risk::position::BookAggregates> {
        self.book.aggregates()
    }

    pub fn metrics(&self) -> Arc<RmeMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }
}
