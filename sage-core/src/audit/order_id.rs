//! Exchange order-id generation
//!
//! Time-sortable 64-bit ids: startup time in seconds in the upper 32 bits,
//! an atomic counter in the lower 32. Unique across restarts as long as
//! two processes do not start within the same second, and unique within a
//! process for 4 billion orders.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct OrderIdGenerator {
    startup_secs: u64,
    counter: AtomicU32,
}

impl OrderIdGenerator {
    pub fn new() -> Self {
        let startup_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            startup_secs,
            counter: AtomicU32::new(0),
        }
    }

    /// Next globally unique, time-sortable id.
    #[inline]
    pub fn generate(&self) -> u64 {
        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        (self.startup_secs << 32) | count as u64
    }
}

impl Default for OrderIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_unique_and_increasing() {
        let gen = OrderIdGenerator::new();
        let a = gen.generate();
        let b = gen.generate();
        let c = gen.generate();
        assert!(a < b && b < c);
        assert_eq!(b - a, 1);
    }

    #[test]
    fn test_id_embeds_startup_time() {
        let gen = OrderIdGenerator::new();
        let id = gen.generate();
        // Upper 32 bits: seconds since epoch, comfortably after 2020.
        assert!((id >> 32) > 1_577_836_800);
        assert_eq!(id & 0xFFFF_FFFF, 0);
    }
}
