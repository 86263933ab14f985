//! Append-only order audit trail
//!
//! COMPLIANCE INVARIANT: orders are logged BEFORE network transmission. If
//! the worker dies after `log_order`, the intent is on record; a missing
//! SENT line means the order never reached the wire.
//!
//! Durability model:
//! - `flush()` moves user-space buffers to the kernel. NOT durable.
//! - `sync()` is fsync: the only durability contract. A background daemon
//!   calls it periodically; between syncs, recent entries can be lost on
//!   power failure. That window is the price of a non-blocking hot path.
//!
//! Every entry formats into a 256-byte stack buffer; a line that would
//! overflow is truncated with a `[TRUNC]` marker and counted. One mutex
//! serializes the single writer against the sync daemon; it is held for
//! microseconds and is a correctness lock, not a hot-path primitive.
//! Timestamps are ISO 8601 UTC with a `Z` suffix -- no local-time
//! dependence, no DST discontinuity across rotation.

use std::fmt::{self, Write as _};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write as _};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;

use crate::core::fixed::FixedPoint;
use crate::core::message::OrderRequest;

/// Stack formatting buffer per entry; longer lines are truncated.
const ENTRY_SIZE: usize = 256;
/// Buffered entries between automatic flushes.
const FLUSH_INTERVAL: usize = 100;
/// Free-text cap for reject reasons and error messages.
const REASON_CAP: usize = 64;

const TRUNC_MARKER: &[u8] = b"[TRUNC]\n";

/// Bounded formatter: fills a fixed buffer, flags overflow, never fails.
struct EntryBuf {
    buf: [u8; ENTRY_SIZE],
    len: usize,
    overflow: bool,
}

impl EntryBuf {
    fn new() -> Self {
        Self {
            buf: [0; ENTRY_SIZE],
            len: 0,
            overflow: false,
        }
    }

    fn finish(&mut self) -> &[u8] {
        if self.overflow {
            let start = ENTRY_SIZE - 1 - TRUNC_MARKER.len();
            self.buf[start..ENTRY_SIZE - 1].copy_from_slice(TRUNC_MARKER);
            self.len = ENTRY_SIZE - 1;
        }
        &self.buf[..self.len]
    }
}

impl fmt::Write for EntryBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let space = ENTRY_SIZE - self.len;
        if bytes.len() > space {
            self.buf[self.len..].copy_from_slice(&bytes[..space]);
            self.len = ENTRY_SIZE;
            self.overflow = true;
        } else {
            self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
            self.len += bytes.len();
        }
        Ok(())
    }
}

/// Write the UTC timestamp prefix: `YYYY-MM-DDTHH:MM:SSZ`.
fn write_timestamp(w: &mut EntryBuf) {
    let _ = write!(w, "{}", Utc::now().format("%Y-%m-%dT%H:%M:%SZ"));
}

/// Truncate free text to the cap at a char boundary.
fn cap_reason(reason: &str) -> &str {
    if reason.len() <= REASON_CAP {
        return reason;
    }
    let mut end = REASON_CAP;
    while end > 0 && !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}

struct Inner {
    writer: BufWriter<File>,
    pending: usize,
}

/// Append-only audit log with buffered writes and explicit sync.
pub struct AuditLog {
    inner: Mutex<Inner>,
    entries_logged: AtomicU64,
    truncations: AtomicU64,
    syncs: AtomicU64,
}

impl AuditLog {
    /// Open (or append to) the audit file. A fresh file gets the header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening audit log {}", path.display()))?;
        let fresh = file.metadata().map(|m| m.len() == 0).unwrap_or(false);

        let mut writer = BufWriter::new(file);
        if fresh {
            writer.write_all(
                b"# SAGE Audit Log\n\
                  # Format: TIMESTAMP|EVENT|ORDER_ID|SYMBOL|SIDE|PRICE|QTY\n\
                  # Events: ORDER (intent), SENT (transmitted), ACK, REJECT, FILL, ERROR\n",
            )?;
            writer.flush()?;
        }

        Ok(Self {
            inner: Mutex::new(Inner { writer, pending: 0 }),
            entries_logged: AtomicU64::new(0),
            truncations: AtomicU64::new(0),
            syncs: AtomicU64::new(0),
        })
    }

    /// Log order intent. MUST be called before transmission.
    pub fn log_order(&self, order_id: u64, order: &OrderRequest) {
        self.write_entry(false, |w| {
            write_timestamp(w);
            let side = if order.side > 0 { "BUY" } else { "SELL" };
            let _ = write!(
                w,
                "|ORDER|{}|{}|{}|{}|{}\n",
                order_id, order.symbol_id, side, order.price, order.quantity
            );
        });
    }

    /// Log transmission, immediately after a successful send.
    pub fn log_sent(&self, order_id: u64) {
        self.write_entry(false, |w| {
            write_timestamp(w);
            let _ = write!(w, "|SENT|{}\n", order_id);
        });
    }

    /// Log exchange acknowledgment.
    pub fn log_ack(&self, order_id: u64, exchange_ack_id: &str) {
        self.write_entry(false, |w| {
            write_timestamp(w);
            let _ = write!(w, "|ACK|{}|{}\n", order_id, exchange_ack_id);
        });
    }

    /// Log execution confirmation.
    pub fn log_fill(&self, order_id: u64, symbol_id: u64, price: FixedPoint, qty: FixedPoint) {
        self.write_entry(false, |w| {
            write_timestamp(w);
            let _ = write!(w, "|FILL|{}|{}|{}|{}\n", order_id, symbol_id, price, qty);
        });
    }

    /// Log rejection. Always flushed immediately.
    pub fn log_reject(&self, order_id: u64, reason: &str) {
        self.write_entry(true, |w| {
            write_timestamp(w);
            let _ = write!(w, "|REJECT|{}|{}\n", order_id, cap_reason(reason));
        });
    }

    /// Log an error condition (terminal for the order).
    pub fn log_error(&self, order_id: u64, message: &str) {
        self.write_entry(false, |w| {
            write_timestamp(w);
            let _ = write!(w, "|ERROR|{}|{}\n", order_id, cap_reason(message));
        });
    }

    /// Push user-space buffers to the kernel. Does NOT imply durability.
    pub fn flush(&self) {
        let mut inner = self.inner.lock();
        if let Err(e) = inner.writer.flush() {
            tracing::error!(error = %e, "audit flush failed");
            return;
        }
        inner.pending = 0;
    }

    /// Force a kernel-to-disk sync (fsync). The durability checkpoint.
    pub fn sync(&self) {
        let mut inner = self.inner.lock();
        if let Err(e) = inner.writer.flush() {
            tracing::error!(error = %e, "audit flush-before-sync failed");
            return;
        }
        if let Err(e) = inner.writer.get_ref().sync_all() {
            tracing::error!(error = %e, "audit fsync failed");
            return;
        }
        inner.pending = 0;
        self.syncs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn entries_logged(&self) -> u64 {
        self.entries_logged.load(Ordering::Relaxed)
    }

    pub fn truncation_count(&self) -> u64 {
        self.truncations.load(Ordering::Relaxed)
    }

    pub fn sync_count(&self) -> u64 {
        self.syncs.load(Ordering::Relaxed)
    }

    fn write_entry(&self, force_flush: bool, build: impl FnOnce(&mut EntryBuf)) {
        let mut entry = EntryBuf::new();
        build(&mut entry);
        if entry.overflow {
            self.truncations.fetch_add(1, Ordering::Relaxed);
        }
        let bytes = entry.finish();

        let mut inner = self.inner.lock();
        if let Err(e) = inner.writer.write_all(bytes) {
            tracing::error!(error = %e, "audit write failed, entry dropped");
            return;
        }
        self.entries_logged.fetch_add(1, Ordering::Relaxed);
        inner.pending += 1;

        if force_flush || inner.pending >= FLUSH_INTERVAL {
            if let Err(e) = inner.writer.flush() {
                tracing::error!(error = %e, "audit flush failed");
            } else {
                inner.pending = 0;
            }
        }
    }
}

impl Drop for AuditLog {
    fn drop(&mut self) {
        // Final durability checkpoint before close.
        self.sync();
    }
}
