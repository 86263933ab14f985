//! Deterministic fixed-point arithmetic for prices and quantities
//!
//! All prices, quantities and derived statistics in the pipeline are carried
//! as a single signed 64-bit integer with an implied scale of 10^8 (8 decimal
//! places). Floating point exists only at the edges: JSON ingress (checked
//! conversion) and operator-facing display.
//!
//! Design constraints:
//! - Multiplication and division go through an i128 intermediate and
//!   saturate at the representable bounds rather than wrapping.
//! - `abs`, `min` and `max` are branchless (sign-fill mask), so the hot path
//!   executes the same instruction sequence for any input.
//! - Division by zero is not a defined operation; callers guard.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use super::errors::ConversionError;

/// Scale factor: 10^8 for 8 decimal places.
pub const SCALE: i64 = 100_000_000;

/// Largest f64 magnitude accepted by the checked conversion.
///
/// Chosen so that `value * SCALE` stays comfortably inside i64.
pub const MAX_SAFE_F64: f64 = 9.0e10;

/// Smallest f64 magnitude accepted by the checked conversion.
pub const MIN_SAFE_F64: f64 = -9.0e10;

/// Signed fixed-point scalar, 8 decimal places.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct FixedPoint(i64);

impl FixedPoint {
    /// Wrap a raw scaled value.
    #[inline(always)]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw scaled value.
    #[inline(always)]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Create from an integer number of whole units.
    #[inline(always)]
    pub const fn from_int(i: i64) -> Self {
        Self(i * SCALE)
    }

    /// Create from integer and sub-scale parts.
    ///
    /// `from_parts(100, 50_000_000)` is 100.50.
    #[inline(always)]
    pub const fn from_parts(integer: i64, decimal: i64) -> Self {
        Self(integer * SCALE + decimal)
    }

    /// Lossy conversion from f64, truncating toward zero.
    ///
    /// Initialization path only. Hot paths never touch floating point; the
    /// ingress boundary uses [`FixedPoint::from_f64_checked`] instead.
    #[inline]
    pub fn from_f64(d: f64) -> Self {
        Self((d * SCALE as f64) as i64)
    }

    /// Checked conversion from f64.
    ///
    /// Rejects NaN, infinities and values outside the safe range before any
    /// arithmetic happens, so ingress never manufactures a corrupt scalar.
    pub fn from_f64_checked(d: f64) -> Result<Self, ConversionError> {
        if d.is_nan() {
            return Err(ConversionError::NotANumber);
        }
        if d.is_infinite() {
            return Err(ConversionError::Infinite { positive: d > 0.0 });
        }
        if !(MIN_SAFE_F64..=MAX_SAFE_F64).contains(&d) {
            return Err(ConversionError::OutOfRange { value: d });
        }
        Ok(Self::from_f64(d))
    }

    /// Lossy conversion to f64. Display/diagnostics only.
    #[inline(always)]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Whole-unit part, truncating toward zero.
    #[inline(always)]
    pub const fn to_int(self) -> i64 {
        self.0 / SCALE
    }

    /// Branchless absolute value via sign-fill mask.
    #[inline(always)]
    pub const fn abs(self) -> Self {
        let mask = self.0 >> 63;
        Self((self.0 + mask) ^ mask)
    }

    #[inline(always)]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline(always)]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Zero constant.
    #[inline(always)]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// One whole unit.
    #[inline(always)]
    pub const fn one() -> Self {
        Self(SCALE)
    }

    /// Largest representable value.
    #[inline(always)]
    pub const fn max_value() -> Self {
        Self(i64::MAX)
    }

    /// Smallest representable value.
    #[inline(always)]
    pub const fn min_value() -> Self {
        Self(i64::MIN)
    }

    #[inline(always)]
    const fn saturate(wide: i128) -> i64 {
        if wide > i64::MAX as i128 {
            i64::MAX
        } else if wide < i64::MIN as i128 {
            i64::MIN
        } else {
            wide as i64
        }
    }
}

impl Add for FixedPoint {
    type Output = Self;

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for FixedPoint {
    type Output = Self;

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for FixedPoint {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for FixedPoint {
    #[inline(always)]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for FixedPoint {
    type Output = Self;

    #[inline(always)]
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Mul for FixedPoint {
    type Output = Self;

    /// `(a * b) / SCALE` with an i128 intermediate.
    ///
    /// Saturates at the representable bounds when the true product does not
    /// fit; callers on hot paths bound operand magnitudes so that
    /// `|a * b| / SCALE` fits in 63 bits.
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        let wide = (self.0 as i128 * rhs.0 as i128) / SCALE as i128;
        Self(Self::saturate(wide))
    }
}

impl Div for FixedPoint {
    type Output = Self;

    /// `(a * SCALE) / b` with an i128 intermediate.
    ///
    /// Division by zero is not a defined operation; callers guard (the
    /// analytics and risk paths return a neutral value when a denominator
    /// could be zero).
    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        let wide = (self.0 as i128 * SCALE as i128) / rhs.0 as i128;
        Self(Self::saturate(wide))
    }
}

/// Branchless minimum.
#[inline(always)]
pub const fn min(a: FixedPoint, b: FixedPoint) -> FixedPoint {
    let diff = a.raw() - b.raw();
    let mask = diff >> 63;
    FixedPoint::from_raw(b.raw() + (diff & mask))
}

/// Branchless maximum.
#[inline(always)]
pub const fn max(a: FixedPoint, b: FixedPoint) -> FixedPoint {
    let diff = a.raw() - b.raw();
    let mask = diff >> 63;
    FixedPoint::from_raw(a.raw() - (diff & mask))
}

impl fmt::Display for FixedPoint {
    /// Canonical 8-decimal rendering, e.g. `50000.12345678`.
    ///
    /// This exact form is what the audit log and FIX encoder emit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let mag = self.0.unsigned_abs();
        let whole = mag / SCALE as u64;
        let frac = mag % SCALE as u64;
        write!(f, "{}{}.{:08}", sign, whole, frac)
    }
}

// 8-byte raw value, same as the wire layout expects.
const _: () = assert!(std::mem::size_of::<FixedPoint>() == 8);
