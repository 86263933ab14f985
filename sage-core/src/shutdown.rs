//! Cooperative shutdown flag
//!
//! One atomic boolean shared by every worker. Hot loops test it between
//! poll iterations; background threads test it on their sleep boundary.
//! Signal installation belongs to the hosting binary -- the flag itself is
//! transport-agnostic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle to the process-wide shutdown state.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    flag: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent.
    pub fn request(&self) {
        if !self.flag.swap(true, Ordering::AcqRel) {
            tracing::info!("shutdown requested");
        }
    }

    /// Poll-loop check.
    #[inline(always)]
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
