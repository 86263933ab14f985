//! Market-tick ingress: JSON parsing and validation
//!
//! The process boundary where untrusted numbers become fixed-point
//! scalars. Validation lives HERE, not inside the per-symbol lookup:
//! downstream indexes by `symbol_id & (MAX_SYMBOLS - 1)`, so an unchecked
//! id would silently alias two real symbols into one state slot -- a
//! data-integrity defect, not a performance one. Rejects are counted and
//! dropped; the feed never stalls on bad input.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;

use crate::config::MAX_SYMBOLS;
use crate::core::errors::ConversionError;
use crate::core::fixed::FixedPoint;
use crate::core::message::MarketTick;

/// Raw tick as it arrives on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTick {
    pub price: f64,
    pub quantity: f64,
    pub symbol_id: u64,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub exchange_id: u8,
}

/// Why a tick was rejected at ingress.
#[derive(Debug)]
pub enum IngressError {
    /// Malformed JSON.
    Parse(serde_json::Error),
    /// Price not finite or not positive.
    BadPrice { price: f64 },
    /// Quantity not finite or not positive.
    BadQuantity { quantity: f64 },
    /// Symbol id would alias into another symbol's state slot.
    SymbolOutOfRange { symbol_id: u64 },
    /// Numeric field failed fixed-point conversion.
    Conversion(ConversionError),
}

impl fmt::Display for IngressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngressError::Parse(e) => write!(f, "malformed tick JSON: {}", e),
            IngressError::BadPrice { price } => {
                write!(f, "price {} not positive finite", price)
            }
            IngressError::BadQuantity { quantity } => {
                write!(f, "quantity {} not positive finite", quantity)
            }
            IngressError::SymbolOutOfRange { symbol_id } => {
                write!(
                    f,
                    "symbol id {} >= {} would alias downstream state",
                    symbol_id, MAX_SYMBOLS
                )
            }
            IngressError::Conversion(e) => write!(f, "fixed-point conversion: {}", e),
        }
    }
}

impl std::error::Error for IngressError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngressError::Parse(e) => Some(e),
            IngressError::Conversion(e) => Some(e),
            _ => None,
        }
    }
}

/// Symbol ids must be strictly below the state-array size.
#[inline(always)]
pub fn validate_symbol_id(symbol_id: u64) -> bool {
    symbol_id < MAX_SYMBOLS as u64
}

/// Validate a decoded tick and convert it to the internal representation.
pub fn validate_tick(raw: &RawTick) -> Result<MarketTick, IngressError> {
    if !(raw.price.is_finite() && raw.price > 0.0) {
        return Err(IngressError::BadPrice { price: raw.price });
    }
    if !(raw.quantity.is_finite() && raw.quantity > 0.0) {
        return Err(IngressError::BadQuantity {
            quantity: raw.quantity,
        });
    }
    if !validate_symbol_id(raw.symbol_id) {
        return Err(IngressError::SymbolOutOfRange {
            symbol_id: raw.symbol_id,
        });
    }

    let price = FixedPoint::from_f64_checked(raw.price).map_err(IngressError::Conversion)?;
    let quantity =
        FixedPoint::from_f64_checked(raw.quantity).map_err(IngressError::Conversion)?;

    Ok(MarketTick::new(
        price,
        quantity,
        raw.symbol_id,
        raw.flags,
        raw.exchange_id,
    ))
}

/// Parse one JSON tick message and validate it.
pub fn parse_tick(json: &str) -> Result<MarketTick, IngressError> {
    let raw: RawTick = serde_json::from_str(json).map_err(IngressError::Parse)?;
    validate_tick(&raw)
}

/// Cache-padded ingress counters.
#[repr(C, align(64))]
pub struct IngressCounters {
    pub accepted: AtomicU64,
    _pad1: [u8; 56],
    pub rejected: AtomicU64,
    _pad2: [u8; 56],
}

impl IngressCounters {
    pub const fn new() -> Self {
        Self {
            accepted: AtomicU64::new(0),
            _pad1: [0; 56],
            rejected: AtomicU64::new(0),
            _pad2: [0; 56],
        }
    }

    #[inline(always)]
    pub fn accept(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn reject(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for IngressCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_tick_parses() {
        let tick =
            parse_tick(r#"{"price": 50000.25, "quantity": 0.5, "symbol_id": 3}"#).unwrap();
        assert_eq!(tick.symbol_id, 3);
        assert_eq!(tick.price, FixedPoint::from_f64(50000.25));
        assert_eq!(tick.quantity, FixedPoint::from_f64(0.5));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            parse_tick("{not json"),
            Err(IngressError::Parse(_))
        ));
    }

    #[test]
    fn test_non_positive_price_rejected() {
        for json in [
            r#"{"price": 0.0, "quantity": 1.0, "symbol_id": 1}"#,
            r#"{"price": -5.0, "quantity": 1.0, "symbol_id": 1}"#,
        ] {
            assert!(matches!(
                parse_tick(json),
                Err(IngressError::BadPrice { .. })
            ));
        }
    }

    #[test]
    fn test_non_finite_price_rejected() {
        // JSON has no NaN/inf literals; they arrive via the struct path.
        let raw = RawTick {
            price: f64::NAN,
            quantity: 1.0,
            symbol_id: 1,
            flags: 0,
            exchange_id: 0,
        };
        assert!(matches!(
            validate_tick(&raw),
            Err(IngressError::BadPrice { .. })
        ));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        assert!(matches!(
            parse_tick(r#"{"price": 1.0, "quantity": 0.0, "symbol_id": 1}"#),
            Err(IngressError::BadQuantity { .. })
        ));
    }

    #[test]
    fn test_symbol_at_limit_rejected_never_aliased() {
        // Exactly MAX_SYMBOLS must be rejected: masking it would alias
        // symbol 0.
        let json = format!(
            r#"{{"price": 1.0, "quantity": 1.0, "symbol_id": {}}}"#,
            MAX_SYMBOLS
        );
        assert!(matches!(
            parse_tick(&json),
            Err(IngressError::SymbolOutOfRange { .. })
        ));

        let json = format!(
            r#"{{"price": 1.0, "quantity": 1.0, "symbol_id": {}}}"#,
            MAX_SYMBOLS - 1
        );
        assert!(parse_tick(&json).is_ok());
    }

    #[test]
    fn test_oversized_price_rejected_by_conversion() {
        assert!(matches!(
            parse_tick(r#"{"price": 1e14, "quantity": 1.0, "symbol_id": 1}"#),
            Err(IngressError::Conversion(_))
        ));
    }

    #[test]
    fn test_counters() {
        let counters = IngressCounters::new();
        counters.accept();
        counters.accept();
        counters.reject();
        assert_eq!(counters.accepted.load(Ordering::Relaxed), 2);
        assert_eq!(counters.rejected.load(Ordering::Relaxed), 1);
    }
}
