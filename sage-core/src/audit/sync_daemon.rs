//! Background audit-durability daemon
//!
//! A dedicated thread fsyncs the audit log at a fixed interval so the
//! execution hot path never blocks on disk. The trade: entries written
//! since the last sync live in kernel buffers and are lost on power
//! failure. Shortening the interval tightens the window at the cost of
//! disk traffic.
//!
//! The sleep is a `recv_timeout` on a stop channel, so shutdown interrupts
//! the wait immediately; a final sync runs before the thread exits.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, RecvTimeoutError, Sender};

use super::log::AuditLog;

pub struct AuditSyncDaemon {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl AuditSyncDaemon {
    /// Start syncing `log` every `interval`.
    pub fn spawn(log: Arc<AuditLog>, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("audit-sync".into())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => log.sync(),
                        // Stop requested or daemon handle dropped.
                        _ => break,
                    }
                }
                // Final durability checkpoint on the way out.
                log.sync();
                tracing::info!("audit sync daemon stopped");
            })
            .expect("spawning audit-sync thread");

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Stop the daemon, running one final sync before returning.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AuditSyncDaemon {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_daemon_syncs_periodically() {
        let dir = tempdir().unwrap();
        let log = Arc::new(AuditLog::open(dir.path().join("audit.log")).unwrap());

        let daemon = AuditSyncDaemon::spawn(Arc::clone(&log), Duration::from_millis(10));
        log.log_sent(1);
        thread::sleep(Duration::from_millis(80));
        assert!(log.sync_count() >= 2, "syncs: {}", log.sync_count());
        daemon.stop();
    }

    #[test]
    fn test_stop_issues_final_sync() {
        let dir = tempdir().unwrap();
        let log = Arc::new(AuditLog::open(dir.path().join("audit.log")).unwrap());

        // Long interval: the only syncs are the final one on stop.
        let daemon = AuditSyncDaemon::spawn(Arc::clone(&log), Duration::from_secs(3600));
        log.log_sent(7);
        daemon.stop();
        assert!(log.sync_count() >= 1);

        let content = std::fs::read_to_string(dir.path().join("audit.log")).unwrap();
        assert!(content.contains("SENT|7"));
    }

    #[test]
    fn test_drop_stops_daemon() {
        let dir = tempdir().unwrap();
        let log = Arc::new(AuditLog::open(dir.path().join("audit.log")).unwrap());
        {
            let _daemon = AuditSyncDaemon::spawn(Arc::clone(&log), Duration::from_secs(3600));
        }
        // Drop joined the thread and synced.
        assert!(log.sync_count() >= 1);
    }
}
