//! High-resolution time sources
//!
//! Two tiers: the TSC for cheap intra-thread deltas on the hot path, and
//! the OS monotonic/realtime clocks for timestamps that cross threads or
//! land in logs. The [`TscCalibrator`] converts TSC ticks to nanoseconds
//! with 16.16 fixed-point arithmetic so the hot path never divides by a
//! float.

use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub const NANOS_PER_SEC: u64 = 1_000_000_000;
pub const NANOS_PER_MS: u64 = 1_000_000;

/// Read the cycle counter without serialization.
///
/// Relative timing within one thread only. On non-x86-64 targets this
/// falls back to the monotonic clock, which keeps the calibrator honest
/// (ticks-per-ns converges to 1).
#[inline(always)]
pub fn rdtsc() -> u64 {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        std::arch::x86_64::_rdtsc()
    }
    #[cfg(not(target_arch = "x86_64"))]
    monotonic_ns()
}

/// Monotonic nanoseconds since process start.
#[inline]
pub fn monotonic_ns() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Wall-clock nanoseconds since the Unix epoch. Logs and audit stamps only.
#[inline]
pub fn realtime_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos() as u64
}

/// TSC-to-nanoseconds converter.
///
/// Calibrates once at construction by timing a short sleep against the
/// monotonic clock and stores ticks-per-ns as a 16.16 fixed-point ratio.
/// Construction sleeps for the calibration period; build calibrators at
/// startup, not on hot paths.
#[derive(Debug, Clone, Copy)]
pub struct TscCalibrator {
    /// Ticks per nanosecond, 16.16 fixed point.
    ticks_per_ns_fp16: u64,
}

impl TscCalibrator {
    const DEFAULT_PERIOD: Duration = Duration::from_millis(50);

    pub fn new() -> Self {
        Self::with_period(Self::DEFAULT_PERIOD)
    }

    /// Calibrate over a caller-chosen period (tests use a short one).
    pub fn with_period(period: Duration) -> Self {
        let start_tsc = rdtsc();
        let start = Instant::now();
        std::thread::sleep(period);
        let elapsed_tsc = rdtsc().wrapping_sub(start_tsc);
        let elapsed_ns = start.elapsed().as_nanos() as u64;

        let ticks_per_ns_fp16 = if elapsed_ns == 0 {
            1 << 16
        } else {
            ((elapsed_tsc as u128) << 16).checked_div(elapsed_ns as u128).unwrap_or(1 << 16) as u64
        };
        Self {
            ticks_per_ns_fp16: ticks_per_ns_fp16.max(1),
        }
    }

    /// Convert a tick delta to nanoseconds.
    #[inline(always)]
    pub fn tsc_to_ns(&self, ticks: u64) -> u64 {
        (((ticks as u128) << 16) / self.ticks_per_ns_fp16 as u128) as u64
    }

    /// Convert nanoseconds to an equivalent tick delta.
    #[inline(always)]
    pub fn ns_to_tsc(&self, ns: u64) -> u64 {
        ((ns as u128 * self.ticks_per_ns_fp16 as u128) >> 16) as u64
    }

    pub fn ticks_per_ns(&self) -> f64 {
        self.ticks_per_ns_fp16 as f64 / (1u64 << 16) as f64
    }
}

impl Default for TscCalibrator {
    fn default() -> Self {
        Self::new()
    }
}
