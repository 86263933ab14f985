//! Wire-input handling for market data

pub mod ingress;

pub use ingress::{parse_tick, validate_symbol_id, validate_tick, IngressCounters, IngressError, RawTick};
