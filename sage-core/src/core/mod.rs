//! Core zero-overhead types shared by every pipeline stage
//!
//! - [`fixed`]: deterministic 8-decimal fixed-point arithmetic
//! - [`message`]: the 64-byte cache-line message envelope
//! - [`errors`]: conversion error types for the ingress boundary
//!
//! Everything here is `Copy`, allocation-free, and safe to move bitwise
//! across the SPSC rings.

pub mod errors;
pub mod fixed;
mod fixed_proptest;
pub mod message;

pub use errors::ConversionError;
pub use fixed::{FixedPoint, SCALE};
pub use message::{
    AlertLevel, ComponentStatus, Envelope, Heartbeat, MarketTick, OrderRequest, OrderType,
    Payload, RiskAlert, SignalData, FLAG_ASK, FLAG_BID, FLAG_TRADE,
};
