//! CPU affinity and scheduling for pinned pipeline workers
//!
//! Each pipeline stage runs on a dedicated core with real-time priority
//! where the OS permits. Pinning prevents migrations that evict the
//! per-symbol state arrays from cache; SCHED_FIFO keeps the busy-poll loops
//! from being preempted by background load.

use anyhow::Result;
use core_affinity::CoreId;

/// Pin the current thread to a specific CPU core.
pub fn pin_to_core(core: usize) -> Result<()> {
    let core_id = CoreId { id: core };

    if core_affinity::set_for_current(core_id) {
        tracing::info!(core, "pinned worker thread");
        Ok(())
    } else {
        anyhow::bail!("failed to pin thread to core {}", core)
    }
}

/// Set SCHED_FIFO real-time priority (Linux only).
///
/// Requires CAP_SYS_NICE or root; callers treat failure as a degraded but
/// runnable configuration.
#[cfg(target_os = "linux")]
pub fn set_realtime_priority(priority: i32) -> Result<()> {
    use libc::{sched_param, sched_setscheduler, SCHED_FIFO};

    unsafe {
        let param = sched_param {
            sched_priority: priority,
        };
        if sched_setscheduler(0, SCHED_FIFO, &param) == 0 {
            tracing::info!(priority, "SCHED_FIFO priority set");
            Ok(())
        } else {
            anyhow::bail!("failed to set SCHED_FIFO priority (need CAP_SYS_NICE or root)")
        }
    }
}

/// Real-time priority is a no-op off Linux.
#[cfg(not(target_os = "linux"))]
pub fn set_realtime_priority(_priority: i32) -> Result<()> {
    tracing::warn!("real-time priority not supported on this platform");
    Ok(())
}

/// Number of available CPU cores.
pub fn num_cores() -> usize {
    core_affinity::get_core_ids()
        .map(|ids| ids.len())
        .unwrap_or(1)
}

/// Pin and elevate one pipeline worker. Best-effort: failures are logged
/// and the worker runs unpinned rather than not at all.
pub fn optimize_worker(core: usize, priority: i32) {
    if let Err(e) = pin_to_core(core) {
        tracing::warn!(core, error = %e, "running unpinned");
    }
    if let Err(e) = set_realtime_priority(priority) {
        tracing::warn!(priority, error = %e, "running at default priority");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_cores_positive() {
        assert!(num_cores() > 0);
    }

    #[test]
    fn test_optimize_worker_never_panics() {
        // Pinning and RT priority may both fail in CI; the worker setup
        // must degrade, not abort.
        optimize_worker(0, 1);
    }
}
