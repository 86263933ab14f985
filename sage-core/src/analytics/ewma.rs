//! Exponentially weighted statistics and volatility-regime detection
//!
//! EWMA responds faster than a fixed rolling window:
//! `mean_t = alpha * x_t + (1 - alpha) * mean_{t-1}`, with alpha derived
//! from a half-life (`alpha = 1 - exp(-ln 2 / H)`) and stored as an integer
//! scaled by 10^4. The variance recursion rescales the squared deviation by
//! the price scale to contain magnitude.
//!
//! The regime detector runs an EWMA of volatility (half-life H) next to an
//! EWMA of one-tick volatility changes (half-life 2H) and flags a regime
//! change when either the instantaneous change or the sustained vol-of-vol
//! exceeds a configurable multiple of the prevailing volatility. Gated
//! while warming up.

use super::isqrt;
use crate::core::fixed::SCALE;

/// Fixed-point scale for alpha.
pub const ALPHA_SCALE: i64 = 10_000;

/// EWMA mean and variance with integer alpha.
#[derive(Debug, Clone)]
pub struct EwmaStats {
    alpha: i64,
    one_minus_alpha: i64,
    /// EWMA of values, scaled by `ALPHA_SCALE`.
    mean_scaled: i64,
    /// EWMA variance accumulator (deviation^2 rescaled by `SCALE`).
    var_scaled: i64,
    count: u64,
    initialized: bool,
}

impl EwmaStats {
    /// `half_life` is the number of ticks for a sample's weight to halve.
    pub fn new(half_life: u32) -> Self {
        let alpha = Self::compute_alpha(half_life);
        Self {
            alpha,
            one_minus_alpha: ALPHA_SCALE - alpha,
            mean_scaled: 0,
            var_scaled: 0,
            count: 0,
            initialized: false,
        }
    }

    /// `alpha = 1 - exp(-ln 2 / half_life)`, scaled by `ALPHA_SCALE`.
    ///
    /// Floating point is acceptable here: alpha is computed once at
    /// construction, never on the tick path.
    pub fn compute_alpha(half_life: u32) -> i64 {
        if half_life == 0 {
            return ALPHA_SCALE / 10;
        }
        let alpha = 1.0 - (-std::f64::consts::LN_2 / half_life as f64).exp();
        (alpha * ALPHA_SCALE as f64) as i64
    }

    /// O(1) update of mean and variance.
    ///
    /// The first sample seeds the mean directly (no smoothing) with zero
    /// variance.
    #[inline]
    pub fn update(&mut self, value: i64) {
        if !self.initialized {
            self.mean_scaled = value * ALPHA_SCALE;
            self.var_scaled = 0;
            self.initialized = true;
            self.count = 1;
            return;
        }

        let old_mean = self.mean_scaled / ALPHA_SCALE;
        self.mean_scaled = self.alpha * value + self.one_minus_alpha * old_mean;

        // var_t = (1 - a) * (var_{t-1} + a * dev^2), dev^2 rescaled by SCALE.
        let deviation = value - old_mean;
        let dev_sq = deviation as i128 * deviation as i128;
        let scaled_dev_sq = dev_sq / SCALE as i128;

        let num = self.one_minus_alpha as i128 * self.var_scaled as i128
            + self.alpha as i128 * self.one_minus_alpha as i128 * scaled_dev_sq;
        self.var_scaled = (num / ALPHA_SCALE as i128).clamp(0, i64::MAX as i128) as i64;

        self.count += 1;
    }

    #[inline(always)]
    pub fn mean(&self) -> i64 {
        if self.initialized {
            self.mean_scaled / ALPHA_SCALE
        } else {
            0
        }
    }

    /// Variance in raw fixed-point units (the `SCALE` rescaling undone).
    #[inline(always)]
    pub fn variance(&self) -> i64 {
        (self.var_scaled as i128 * SCALE as i128 / ALPHA_SCALE as i128)
            .clamp(0, i64::MAX as i128) as i64
    }

    /// Integer Newton-Raphson standard deviation.
    #[inline(always)]
    pub fn stddev_approx(&self) -> i64 {
        isqrt(self.variance())
    }

    #[inline(always)]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Enough samples for the estimate to mean anything.
    #[inline(always)]
    pub fn is_ready(&self) -> bool {
        self.count >= 10
    }

    pub fn alpha_scaled(&self) -> i64 {
        self.alpha
    }

    pub fn reset(&mut self) {
        self.mean_scaled = 0;
        self.var_scaled = 0;
        self.count = 0;
        self.initialized = false;
    }
}

/// Volatility-regime detector.
///
/// Consumes a variance estimate per tick, tracks volatility (its integer
/// square root) in one EWMA and one-tick volatility changes in a slower
/// EWMA (vol-of-vol). A regime change fires when the current tick's change
/// -- or the sustained vol-of-vol -- exceeds
/// `threshold * normal_vol / SCALE`, with `normal_vol` taken *before* this
/// tick's update so a jump is measured against the regime it broke.
#[derive(Debug, Clone)]
pub struct VolRegimeDetector {
    vol_ewma: EwmaStats,
    vol_of_vol_ewma: EwmaStats,
    /// Regime threshold as a multiple of normal vol, scaled by `SCALE`.
    threshold: i64,
    last_vol: i64,
    last_fired: bool,
}

impl VolRegimeDetector {
    /// `half_life` drives the volatility EWMA; vol-of-vol uses double.
    pub fn new(half_life: u32) -> Self {
        Self {
            vol_ewma: EwmaStats::new(half_life),
            vol_of_vol_ewma: EwmaStats::new(half_life * 2),
            threshold: 2 * SCALE,
            last_vol: 0,
            last_fired: false,
        }
    }

    /// Feed one variance observation; returns true on regime change.
    #[inline]
    pub fn update(&mut self, variance: i64) -> bool {
        let vol = isqrt(variance);

        let normal_vol_prev = self.vol_ewma.mean();
        self.vol_ewma.update(vol);

        let mut fired = false;
        if self.last_vol > 0 {
            let change = (vol - self.last_vol).abs();
            self.vol_of_vol_ewma.update(change);

            if self.vol_of_vol_ewma.is_ready() && normal_vol_prev > 0 {
                let bound = (self.threshold as i128 * normal_vol_prev as i128
                    / SCALE as i128) as i64;
                fired = change > bound || self.vol_of_vol_ewma.mean() > bound;
            }
        }
        self.last_vol = vol;
        self.last_fired = fired;
        fired
    }

    /// Did the most recent update fire?
    #[inline(always)]
    pub fn is_regime_change(&self) -> bool {
        self.last_fired
    }

    /// Current volatility estimate (EWMA of sqrt variance).
    #[inline(always)]
    pub fn current_vol(&self) -> i64 {
        self.vol_ewma.mean()
    }

    /// Sustained volatility-of-volatility estimate.
    #[inline(always)]
    pub fn vol_of_vol(&self) -> i64 {
        self.vol_of_vol_ewma.mean()
    }

    /// Threshold as a multiple of normal vol, scaled by `SCALE`.
    pub fn set_threshold(&mut self, multiplier: i64) {
        self.threshold = multiplier;
    }
}
