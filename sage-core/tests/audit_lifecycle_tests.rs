//! Audit-trail lifecycle and durability behavior

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use sage_core::audit::{AuditLog, AuditSyncDaemon, CountingSender, ExecutionEngine};
use sage_core::core::message::{Envelope, OrderRequest, OrderType};
use sage_core::core::FixedPoint;
use sage_core::perf::clock::{self, TscCalibrator};
use tempfile::tempdir;

fn order_request(order_id: u64, symbol: u64, side: i8) -> OrderRequest {
    OrderRequest::new(
        order_id,
        symbol,
        FixedPoint::from_f64(101.5),
        FixedPoint::from_f64(3.0),
        side,
        OrderType::Market,
        1,
    )
}

/// ORDER 12345 -> SENT -> ACK "EX123", then sync: three lines in that
/// order, all UTC Z-stamped, containing the literal lifecycle tokens.
#[test]
fn lifecycle_lines_in_order_with_utc_stamps() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let log = AuditLog::open(&path).unwrap();

    log.log_order(12345, &order_request(12345, 9, 1));
    log.log_sent(12345);
    log.log_ack(12345, "EX123");
    log.sync();

    let content = fs::read_to_string(&path).unwrap();
    let events: Vec<&str> = content.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(events.len(), 3);

    assert!(events[0].contains("ORDER|12345"));
    assert!(events[1].contains("SENT|12345"));
    assert!(events[2].contains("ACK|12345"));
    assert!(events[2].contains("EX123"));

    for line in &events {
        let ts = line.split('|').next().unwrap();
        assert!(ts.ends_with('Z'), "timestamp {} must be UTC Z-suffixed", ts);
        assert_eq!(ts.len(), 20);
    }
}

/// A 200-character reject reason yields a REJECT line that carries the
/// order id and stays under the per-line cap.
#[test]
fn long_reject_reason_capped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let log = AuditLog::open(&path).unwrap();

    let reason: String = std::iter::repeat('R').take(200).collect();
    log.log_reject(12345, &reason);

    let content = fs::read_to_string(&path).unwrap();
    let line = content
        .lines()
        .find(|l| l.contains("REJECT|12345"))
        .expect("reject line");
    assert!(line.len() <= 256, "line length {} exceeds cap", line.len());
}

/// Everything written before a sync is readable after it.
#[test]
fn sync_durability_readback() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let log = AuditLog::open(&path).unwrap();

    for i in 0..250u64 {
        log.log_order(i, &order_request(i, 1, if i % 2 == 0 { 1 } else { -1 }));
    }
    log.sync();

    let content = fs::read_to_string(&path).unwrap();
    for i in 0..250u64 {
        assert!(
            content.contains(&format!("ORDER|{}|", i)),
            "entry {} missing after sync",
            i
        );
    }
    assert_eq!(log.entries_logged(), 250);
}

/// The full execution engine path: ORDER precedes SENT for every order
/// that reached the wire, and absence of SENT marks the unsent one.
#[test]
fn execution_engine_audit_ordering() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let audit = Arc::new(AuditLog::open(&path).unwrap());
    let mut eng = ExecutionEngine::with_calibrator(
        Arc::clone(&audit),
        CountingSender::new(),
        TscCalibrator::with_period(Duration::from_millis(5)),
    );

    let mut ids = Vec::new();
    for i in 0..20u64 {
        let msg = Envelope::order(clock::monotonic_ns(), i, order_request(i, 2, 1));
        ids.push(eng.process_order(&msg));
    }
    audit.sync();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    for id in &ids {
        let order_pos = lines
            .iter()
            .position(|l| l.contains(&format!("ORDER|{}|", id)))
            .unwrap_or_else(|| panic!("ORDER line for {}", id));
        let sent_pos = lines
            .iter()
            .position(|l| l.contains(&format!("SENT|{}", id)))
            .unwrap_or_else(|| panic!("SENT line for {}", id));
        assert!(order_pos < sent_pos, "ORDER precedes SENT for {}", id);
    }
}

/// The background daemon provides durability without any explicit sync
/// from the writer.
#[test]
fn sync_daemon_covers_writer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let log = Arc::new(AuditLog::open(&path).unwrap());
    let daemon = AuditSyncDaemon::spawn(Arc::clone(&log), Duration::from_millis(10));

    for i in 0..5u64 {
        log.log_sent(i);
        std::thread::sleep(Duration::from_millis(5));
    }
    std::thread::sleep(Duration::from_millis(30));

    let content = fs::read_to_string(&path).unwrap();
    for i in 0..5u64 {
        assert!(content.contains(&format!("SENT|{}", i)));
    }
    assert!(log.sync_count() >= 1);
    daemon.stop();
}

/// Concurrent writer and sync daemon: the mutex keeps every line whole
/// (no interleaved fragments).
#[test]
fn writer_and_daemon_do_not_tear_lines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let log = Arc::new(AuditLog::open(&path).unwrap());
    let daemon = AuditSyncDaemon::spawn(Arc::clone(&log), Duration::from_millis(1));

    for i in 0..2_000u64 {
        log.log_sent(i);
    }
    daemon.stop();

    let content = fs::read_to_string(&path).unwrap();
    let mut seen = 0u64;
    for line in content.lines().filter(|l| !l.starts_with('#')) {
        let mut parts = line.split('|');
        let ts = parts.next().unwrap();
        assert!(ts.ends_with('Z'));
        assert_eq!(parts.next(), Some("SENT"));
        let id: u64 = parts.next().unwrap().parse().expect("intact id field");
        assert_eq!(id, seen);
        seen += 1;
    }
    assert_eq!(seen, 2_000);
}
