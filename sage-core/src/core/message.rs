//! 64-byte cache-line message envelope for inter-worker transport
//!
//! Every message that crosses an SPSC ring is exactly one cache line:
//!
//! ```text
//! [0-7]   timestamp_ns   local receipt time (monotonic)
//! [8-15]  sequence_id    monotonic per producer
//! [16]    tag            payload discriminant
//! [17-23] (padding)
//! [24-63] payload        one of the variants below (40 bytes max)
//! ```
//!
//! The payload is a `#[repr(u8)]` enum, so the discriminant occupies the tag
//! byte and variant data sits in the 40-byte payload area; dispatch is a
//! single tag test and the whole envelope is `Copy` (bitwise move-safe).
//! Size and alignment are compile-time asserted.

use super::fixed::FixedPoint;

/// Market-data flag: quote on the bid side.
pub const FLAG_BID: u32 = 0x01;
/// Market-data flag: quote on the ask side.
pub const FLAG_ASK: u32 = 0x02;
/// Market-data flag: trade print.
pub const FLAG_TRADE: u32 = 0x04;

/// One market tick (trade or quote). 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct MarketTick {
    pub price: FixedPoint,
    pub quantity: FixedPoint,
    pub symbol_id: u64,
    pub flags: u32,
    pub exchange_id: u8,
    _reserved: [u8; 3],
}

impl MarketTick {
    #[inline]
    pub const fn new(
        price: FixedPoint,
        quantity: FixedPoint,
        symbol_id: u64,
        flags: u32,
        exchange_id: u8,
    ) -> Self {
        Self {
            price,
            quantity,
            symbol_id,
            flags,
            exchange_id,
            _reserved: [0; 3],
        }
    }
}

/// Trading signal produced by the analytics stage. 24 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct SignalData {
    pub symbol_id: u64,
    /// Signal confidence (capped z-score magnitude, fixed point).
    pub confidence: FixedPoint,
    /// +1 buy, -1 sell, 0 neutral.
    pub direction: i8,
    pub strategy_id: u8,
    _reserved: [u8; 6],
}

impl SignalData {
    #[inline]
    pub const fn new(
        symbol_id: u64,
        confidence: FixedPoint,
        direction: i8,
        strategy_id: u8,
    ) -> Self {
        Self {
            symbol_id,
            confidence,
            direction,
            strategy_id,
            _reserved: [0; 6],
        }
    }
}

/// Order type carried in an [`OrderRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OrderType {
    Market = 1,
    Limit = 2,
    Ioc = 3,
}

/// Order request from risk to execution. 40 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct OrderRequest {
    pub order_id: u64,
    pub symbol_id: u64,
    pub price: FixedPoint,
    pub quantity: FixedPoint,
    /// +1 buy, -1 sell.
    pub side: i8,
    pub order_type: OrderType,
    pub time_in_force: u8,
    _reserved: [u8; 5],
}

impl OrderRequest {
    #[inline]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        order_id: u64,
        symbol_id: u64,
        price: FixedPoint,
        quantity: FixedPoint,
        side: i8,
        order_type: OrderType,
        time_in_force: u8,
    ) -> Self {
        Self {
            order_id,
            symbol_id,
            price,
            quantity,
            side,
            order_type,
            time_in_force,
            _reserved: [0; 5],
        }
    }
}

/// Severity of a [`RiskAlert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum AlertLevel {
    Info = 0,
    Warn = 1,
    Critical = 2,
}

/// Risk alert broadcast from the risk stage. 40 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct RiskAlert {
    /// Wall-clock timestamp (ns since epoch).
    pub timestamp_ns: u64,
    pub exposure: i64,
    pub daily_pnl: i64,
    pub level: AlertLevel,
    _reserved: [u8; 15],
}

impl RiskAlert {
    #[inline]
    pub const fn new(timestamp_ns: u64, exposure: i64, daily_pnl: i64, level: AlertLevel) -> Self {
        Self {
            timestamp_ns,
            exposure,
            daily_pnl,
            level,
            _reserved: [0; 15],
        }
    }
}

/// Liveness status carried in a [`Heartbeat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ComponentStatus {
    Ok = 0,
    Degraded = 1,
    Failing = 2,
}

/// Heartbeat for liveness detection. 16 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Heartbeat {
    pub sequence: u64,
    pub component_id: u32,
    pub status: ComponentStatus,
    _reserved: [u8; 3],
}

impl Heartbeat {
    #[inline]
    pub const fn new(sequence: u64, component_id: u32, status: ComponentStatus) -> Self {
        Self {
            sequence,
            component_id,
            status,
            _reserved: [0; 3],
        }
    }
}

/// Tagged payload area of an [`Envelope`].
///
/// The `repr(u8)` discriminant is the envelope's tag byte; variant data
/// occupies the 40-byte payload area.
#[derive(Debug, Clone, Copy)]
#[repr(u8)]
pub enum Payload {
    Invalid = 0,
    MarketTick(MarketTick) = 1,
    Signal(SignalData) = 2,
    Order(OrderRequest) = 3,
    RiskAlert(RiskAlert) = 7,
    Heartbeat(Heartbeat) = 8,
}

/// One cache line of inter-worker message.
#[derive(Debug, Clone, Copy)]
#[repr(C, align(64))]
pub struct Envelope {
    /// Local receipt timestamp, nanoseconds (monotonic clock).
    pub timestamp_ns: u64,
    /// Monotonic sequence id assigned by the producer.
    pub sequence_id: u64,
    pub payload: Payload,
}

impl Envelope {
    /// An invalid (empty) envelope; `is_valid()` is false.
    #[inline]
    pub const fn invalid() -> Self {
        Self {
            timestamp_ns: 0,
            sequence_id: 0,
            payload: Payload::Invalid,
        }
    }

    #[inline]
    pub const fn market_tick(timestamp_ns: u64, sequence_id: u64, tick: MarketTick) -> Self {
        Self {
            timestamp_ns,
            sequence_id,
            payload: Payload::MarketTick(tick),
        }
    }

    #[inline]
    pub const fn signal(timestamp_ns: u64, sequence_id: u64, signal: SignalData) -> Self {
        Self {
            timestamp_ns,
            sequence_id,
            payload: Payload::Signal(signal),
        }
    }

    #[inline]
    pub const fn order(timestamp_ns: u64, sequence_id: u64, order: OrderRequest) -> Self {
        Self {
            timestamp_ns,
            sequence_id,
            payload: Payload::Order(order),
        }
    }

    #[inline]
    pub const fn risk_alert(timestamp_ns: u64, sequence_id: u64, alert: RiskAlert) -> Self {
        Self {
            timestamp_ns,
            sequence_id,
            payload: Payload::RiskAlert(alert),
        }
    }

    #[inline]
    pub const fn heartbeat(timestamp_ns: u64, sequence_id: u64, component_id: u32) -> Self {
        Self {
            timestamp_ns,
            sequence_id,
            payload: Payload::Heartbeat(Heartbeat::new(
                sequence_id,
                component_id,
                ComponentStatus::Ok,
            )),
        }
    }

    /// Tag is anything but `Invalid`.
    #[inline(always)]
    pub const fn is_valid(&self) -> bool {
        !matches!(self.payload, Payload::Invalid)
    }

    #[inline(always)]
    pub fn as_market_tick(&self) -> Option<&MarketTick> {
        match &self.payload {
            Payload::MarketTick(t) => Some(t),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_signal(&self) -> Option<&SignalData> {
        match &self.payload {
            Payload::Signal(s) => Some(s),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_order(&self) -> Option<&OrderRequest> {
        match &self.payload {
            Payload::Order(o) => Some(o),
            _ => None,
        }
    }
}

// The envelope contract: exactly one cache line, cache-line aligned, and
// every payload variant within the 40-byte payload area.
const _: () = {
    assert!(std::mem::size_of::<Envelope>() == 64);
    assert!(std::mem::align_of::<Envelope>() == 64);
    assert!(std::mem::size_of::<MarketTick>() == 32);
    assert!(std::mem::size_of::<SignalData>() == 24);
    assert!(std::mem::size_of::<OrderRequest>() == 40);
    assert!(std::mem::size_of::<RiskAlert>() == 40);
    assert!(std::mem::size_of::<Heartbeat>() == 16);
};
