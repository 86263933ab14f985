//! Domain error types for the numeric substrate and ingress boundary
//!
//! Hot paths do not unwind; these types surface on the init and validation
//! paths where an error is a decision, not an exception.

use std::fmt;

/// Errors from checked f64 -> fixed-point conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// Value is too large to represent in fixed point.
    OutOfRange {
        /// The value that could not be converted
        value: f64,
    },

    /// Value is NaN (not a valid price or quantity).
    NotANumber,

    /// Value is infinite.
    Infinite {
        /// Whether it was positive or negative infinity
        positive: bool,
    },
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::OutOfRange { value } => {
                write!(f, "value {} outside fixed-point range", value)
            }
            ConversionError::NotANumber => write!(f, "value is NaN"),
            ConversionError::Infinite { positive } => {
                write!(
                    f,
                    "value is {}infinite",
                    if *positive { "+" } else { "-" }
                )
            }
        }
    }
}

impl std::error::Error for ConversionError {}
