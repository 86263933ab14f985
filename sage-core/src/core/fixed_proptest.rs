//! Property-based tests for the fixed-point scalar
//!
//! Randomized inputs catch the conversion and arithmetic edge cases that
//! hand-picked unit tests miss.

#[cfg(test)]
mod tests {
    use super::super::errors::ConversionError;
    use super::super::fixed::{self, FixedPoint};
    use proptest::prelude::*;

    // ===== CONVERSION PROPERTIES =====

    /// Round-trip through fixed point stays within one sub-scale unit.
    #[test]
    fn prop_roundtrip_within_precision() {
        proptest!(|(value in -1_000_000.0..1_000_000.0_f64)| {
            match FixedPoint::from_f64_checked(value) {
                Ok(fp) => {
                    let back = fp.to_f64();
                    let error = (value - back).abs();
                    prop_assert!(error < 1e-7,
                        "round-trip error too large: {} -> {} -> {} (error {})",
                        value, fp.raw(), back, error);
                }
                Err(_) => {
                    prop_assert!(value > fixed::MAX_SAFE_F64 || value < fixed::MIN_SAFE_F64,
                        "conversion failed for in-range value {}", value);
                }
            }
        });
    }

    /// NaN and infinities never convert.
    #[test]
    fn prop_non_finite_always_fails() {
        assert!(matches!(
            FixedPoint::from_f64_checked(f64::NAN),
            Err(ConversionError::NotANumber)
        ));
        assert!(matches!(
            FixedPoint::from_f64_checked(f64::INFINITY),
            Err(ConversionError::Infinite { positive: true })
        ));
        assert!(matches!(
            FixedPoint::from_f64_checked(f64::NEG_INFINITY),
            Err(ConversionError::Infinite { positive: false })
        ));
    }

    /// Conversion preserves sign.
    #[test]
    fn prop_conversion_preserves_sign() {
        proptest!(|(value in -1_000_000.0..1_000_000.0_f64)| {
            if let Ok(fp) = FixedPoint::from_f64_checked(value) {
                // Stay clear of the sub-scale quantization boundary.
                if value >= 1e-7 {
                    prop_assert!(fp.is_positive());
                } else if value <= -1e-7 {
                    prop_assert!(fp.is_negative());
                }
            }
        });
    }

    /// Conversion preserves ordering (up to quantization).
    #[test]
    fn prop_conversion_preserves_ordering() {
        proptest!(|(a in -1_000_000.0..1_000_000.0_f64,
                    b in -1_000_000.0..1_000_000.0_f64)| {
            if let (Ok(fa), Ok(fb)) =
                (FixedPoint::from_f64_checked(a), FixedPoint::from_f64_checked(b))
            {
                if a - b > 1e-7 {
                    prop_assert!(fa >= fb, "{} > {} but {} < {}", a, b, fa.raw(), fb.raw());
                } else if b - a > 1e-7 {
                    prop_assert!(fb >= fa, "{} > {} but {} < {}", b, a, fb.raw(), fa.raw());
                }
            }
        });
    }

    // ===== ARITHMETIC PROPERTIES =====

    /// Addition is exact and invertible.
    #[test]
    fn prop_add_sub_inverse() {
        proptest!(|(a in -1_000_000_000_000_i64..1_000_000_000_000,
                    b in -1_000_000_000_000_i64..1_000_000_000_000)| {
            let fa = FixedPoint::from_raw(a);
            let fb = FixedPoint::from_raw(b);
            prop_assert_eq!(fa + fb - fb, fa);
        });
    }

    /// Multiplying by one and dividing by one are identities.
    #[test]
    fn prop_one_identity() {
        proptest!(|(a in -1_000_000_000_000_i64..1_000_000_000_000)| {
            let fa = FixedPoint::from_raw(a);
            prop_assert_eq!((fa * FixedPoint::one()) / FixedPoint::one(), fa);
        });
    }

    /// abs is non-negative and idempotent.
    #[test]
    fn prop_abs_non_negative() {
        proptest!(|(a in i64::MIN + 1..i64::MAX)| {
            let fa = FixedPoint::from_raw(a);
            prop_assert!(fa.abs().raw() >= 0);
            prop_assert_eq!(fa.abs().abs(), fa.abs());
        });
    }

    /// min and max partition the pair: min + max == a + b.
    #[test]
    fn prop_min_max_partition() {
        proptest!(|(a in -1_000_000_000_000_i64..1_000_000_000_000,
                    b in -1_000_000_000_000_i64..1_000_000_000_000)| {
            let fa = FixedPoint::from_raw(a);
            let fb = FixedPoint::from_raw(b);
            let lo = fixed::min(fa, fb);
            let hi = fixed::max(fa, fb);
            prop_assert!(lo <= hi);
            prop_assert_eq!(lo + hi, fa + fb);
        });
    }
}
