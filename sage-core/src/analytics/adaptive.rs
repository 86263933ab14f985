//! Variance-scaled adaptive lookback window
//!
//! Produces an *effective* window length from a base window, a minimum, and
//! the ratio of current variance to a slow-EWMA baseline. Calm markets get
//! the full base window (smooth estimates); volatile markets get a shorter
//! one (fast adaptation). Used where adaptive smoothing is wanted instead
//! of a fixed lookback.

use crate::core::fixed::SCALE;

/// Rolling window whose effective length shrinks with volatility.
#[derive(Debug, Clone)]
pub struct AdaptiveWindow<const MAX: usize> {
    base_window: usize,
    min_window: usize,
    vol_scale: i64,

    buffer: [i64; MAX],
    head: usize,
    count: usize,
    sum: i64,
    sum_sq: i128,

    /// Long-term variance level (slow EWMA).
    baseline_var: i64,
    /// Variance over the full buffer.
    current_var: i64,
}

impl<const MAX: usize> AdaptiveWindow<MAX> {
    /// `base_window`: lookback in calm conditions; `min_window`: floor under
    /// stress; `vol_scale` (scaled by `SCALE`): how aggressively volatility
    /// shortens the window.
    pub fn new(base_window: usize, min_window: usize, vol_scale: i64) -> Self {
        const {
            assert!(MAX > 0 && MAX.is_power_of_two(), "window must be a power of two");
        }
        Self {
            base_window: base_window.min(MAX),
            min_window,
            vol_scale,
            buffer: [0; MAX],
            head: 0,
            count: 0,
            sum: 0,
            sum_sq: 0,
            baseline_var: 0,
            current_var: 0,
        }
    }

    pub fn update(&mut self, value: i64) {
        let idx = self.head & (MAX - 1);

        if self.count >= MAX {
            let old = self.buffer[idx];
            self.sum -= old;
            self.sum_sq -= old as i128 * old as i128;
        }

        self.buffer[idx] = value;
        self.sum += value;
        self.sum_sq += value as i128 * value as i128;

        self.head = self.head.wrapping_add(1);
        if self.count < MAX {
            self.count += 1;
        }

        self.update_variance();
    }

    /// Mean over the *effective* window (most recent samples only).
    pub fn mean(&self) -> i64 {
        let eff = self.effective_window();
        if eff == 0 {
            return 0;
        }
        let take = eff.min(self.count);
        let mut sum = 0i64;
        for i in 0..take {
            let idx = self.head.wrapping_sub(take).wrapping_add(i) & (MAX - 1);
            sum += self.buffer[idx];
        }
        sum / take as i64
    }

    /// Variance over the full buffer.
    pub fn variance(&self) -> i64 {
        self.current_var
    }

    /// Effective lookback given current volatility:
    /// `clamp(base * SCALE / (SCALE + ratio * vol_scale / SCALE), min, base)`.
    pub fn effective_window(&self) -> usize {
        if self.count < self.min_window {
            return self.count;
        }
        if self.baseline_var <= 0 {
            return self.base_window;
        }

        let ratio = self.volatility_ratio() as i128;
        let denominator =
            (SCALE as i128 + ratio * self.vol_scale as i128 / SCALE as i128).max(1);
        let eff = (self.base_window as i128 * SCALE as i128 / denominator) as usize;
        eff.clamp(self.min_window, self.base_window)
    }

    /// `current_var * SCALE / baseline_var`; the identity ratio when the
    /// baseline has not formed yet.
    pub fn volatility_ratio(&self) -> i64 {
        if self.baseline_var <= 0 {
            return SCALE;
        }
        ((self.current_var as i128 * SCALE as i128) / self.baseline_var as i128)
            .clamp(0, i64::MAX as i128) as i64
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_ready(&self) -> bool {
        self.count >= self.min_window
    }

    pub fn reset(&mut self) {
        self.buffer = [0; MAX];
        self.head = 0;
        self.count = 0;
        self.sum = 0;
        self.sum_sq = 0;
        self.baseline_var = 0;
        self.current_var = 0;
    }

    fn update_variance(&mut self) {
        if self.count < 2 {
            return;
        }
        let n = self.count as i128;
        let mean = (self.sum / self.count as i64) as i128;
        self.current_var =
            (self.sum_sq / n - mean * mean).clamp(0, i64::MAX as i128) as i64;

        // Slow EWMA baseline: b <- (99*b + current) / 100.
        if self.baseline_var == 0 {
            self.baseline_var = self.current_var;
        } else {
            self.baseline_var = ((self.baseline_var as i128 * 99
                + self.current_var as i128)
                / 100) as i64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calm_window() -> AdaptiveWindow<128> {
        let mut w = AdaptiveWindow::<128>::new(64, 16, SCALE);
        for i in 0..128 {
            // Mild alternation around 1000.
            w.update(1000 + (i % 2));
        }
        w
    }

    #[test]
    fn test_warmup_reports_count() {
        let mut w = AdaptiveWindow::<128>::new(64, 16, SCALE);
        for i in 0..10 {
            assert_eq!(w.effective_window(), i);
            w.update(100);
        }
    }

    #[test]
    fn test_effective_window_bounded() {
        let mut w = calm_window();
        for v in [1000, 5000, 100, 9000, 42, 7777] {
            w.update(v);
            let eff = w.effective_window();
            assert!((16..=64).contains(&eff), "effective window {} out of bounds", eff);
        }
    }

    #[test]
    fn test_zero_variance_gets_base_window() {
        let mut w = AdaptiveWindow::<128>::new(64, 16, SCALE);
        for _ in 0..128 {
            w.update(1000);
        }
        // No dispersion, no baseline: full base window.
        assert_eq!(w.effective_window(), 64);
    }

    #[test]
    fn test_identity_ratio_halves_base_window() {
        let w = calm_window();
        // Steady variance pins the ratio at the identity, and with
        // vol_scale = SCALE the denominator is exactly 2*SCALE.
        assert_eq!(w.volatility_ratio(), SCALE);
        assert_eq!(w.effective_window(), 32);
    }

    #[test]
    fn test_volatility_shrinks_window() {
        let mut w = calm_window();
        let calm_eff = w.effective_window();
        // Burst of dispersion an order of magnitude beyond baseline.
        for i in 0..32 {
            w.update(if i % 2 == 0 { 5000 } else { -3000 });
        }
        assert!(
            w.effective_window() < calm_eff,
            "window failed to shrink: {} -> {}",
            calm_eff,
            w.effective_window()
        );
    }

    #[test]
    fn test_volatility_ratio_finite_non_negative() {
        let mut w = AdaptiveWindow::<64>::new(32, 8, SCALE);
        // Before any baseline: identity ratio.
        assert_eq!(w.volatility_ratio(), SCALE);
        for v in [3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5, 8, 9, 7, 9, 3] {
            w.update(v);
            assert!(w.volatility_ratio() >= 0);
        }
    }

    #[test]
    fn test_mean_over_effective_window() {
        let mut w = AdaptiveWindow::<64>::new(32, 8, SCALE);
        for _ in 0..64 {
            w.update(500);
        }
        assert_eq!(w.mean(), 500);
    }

    #[test]
    fn test_reset() {
        let mut w = calm_window();
        w.reset();
        assert_eq!(w.count(), 0);
        assert_eq!(w.mean(), 0);
        assert!(!w.is_ready());
    }
}
