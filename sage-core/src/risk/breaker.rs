//! Global circuit breaker
//!
//! One atomic flag plus a reason code. Once tripped, every subsequent risk
//! decision short-circuits to reject until an operator resets it. The
//! `is_tripped` fast path is a relaxed load; trip is idempotent -- only the
//! first caller records its reason.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Why the breaker tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BreakerReason {
    None = 0,
    HighErrorRate = 1,
    LatencySpike = 2,
    DailyLossBreach = 3,
    ManualHalt = 4,
}

impl BreakerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerReason::None => "none",
            BreakerReason::HighErrorRate => "high error rate",
            BreakerReason::LatencySpike => "latency spike",
            BreakerReason::DailyLossBreach => "daily loss breach",
            BreakerReason::ManualHalt => "manual halt",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => BreakerReason::HighErrorRate,
            2 => BreakerReason::LatencySpike,
            3 => BreakerReason::DailyLossBreach,
            4 => BreakerReason::ManualHalt,
            _ => BreakerReason::None,
        }
    }
}

/// Process-wide kill switch, settable from any worker.
pub struct CircuitBreaker {
    tripped: AtomicBool,
    reason: AtomicU8,
}

impl CircuitBreaker {
    pub const fn new() -> Self {
        Self {
            tripped: AtomicBool::new(false),
            reason: AtomicU8::new(BreakerReason::None as u8),
        }
    }

    /// Trip the breaker. Idempotent: only the first trip records a reason.
    pub fn trip(&self, reason: BreakerReason) {
        if !self.tripped.swap(true, Ordering::AcqRel) {
            self.reason.store(reason as u8, Ordering::Release);
            tracing::error!(reason = reason.as_str(), "circuit breaker tripped");
        }
    }

    /// Hot-path check: relaxed load.
    #[inline(always)]
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Relaxed)
    }

    pub fn reason(&self) -> BreakerReason {
        BreakerReason::from_u8(self.reason.load(Ordering::Acquire))
    }

    /// Operator reset.
    pub fn reset(&self) {
        self.reason
            .store(BreakerReason::None as u8, Ordering::Release);
        self.tripped.store(false, Ordering::Release);
        tracing::warn!("circuit breaker reset");
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}
