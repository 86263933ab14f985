//! Execution engine: order submission with a provable audit trail
//!
//! Lifecycle per order: ORDER (intent, logged BEFORE the send) -> SENT
//! (logged after a successful send) -> ACK / REJECT / FILL / ERROR on the
//! exchange response. A crash between ORDER and SENT leaves a record that
//! distinguishes "intended" from "transmitted".
//!
//! The exchange link itself is a collaborator behind [`ExchangeSender`];
//! the simulated sender here counts bytes and succeeds, which is all the
//! pipeline needs outside production.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::fix;
use super::log::AuditLog;
use super::order_id::OrderIdGenerator;
use crate::core::fixed::FixedPoint;
use crate::core::message::{Envelope, Payload};
use crate::perf::clock::{self, TscCalibrator};

/// FIX frame scratch buffer size.
const FIX_BUFFER_SIZE: usize = 512;

/// The wire to the exchange. Production implementations own a socket;
/// `send` returns whether the frame left the process.
pub trait ExchangeSender {
    fn send(&mut self, frame: &[u8]) -> bool;
}

/// Simulated exchange link: counts bytes, always succeeds.
#[derive(Debug, Default)]
pub struct CountingSender {
    bytes_sent: u64,
    frames_sent: u64,
}

impl CountingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}

impl ExchangeSender for CountingSender {
    fn send(&mut self, frame: &[u8]) -> bool {
        self.bytes_sent += frame.len() as u64;
        self.frames_sent += 1;
        true
    }
}

/// Cache-padded execution counters, readable from any thread.
#[repr(C, align(64))]
pub struct PoeMetrics {
    pub orders_sent: AtomicU64,
    _pad1: [u8; 56],
    pub orders_failed: AtomicU64,
    _pad2: [u8; 56],
    pub bytes_sent: AtomicU64,
    _pad3: [u8; 56],
    /// Cumulative submit-path time in nanoseconds.
    pub submit_latency_ns: AtomicU64,
    _pad4: [u8; 56],
}

impl PoeMetrics {
    pub const fn new() -> Self {
        Self {
            orders_sent: AtomicU64::new(0),
            _pad1: [0; 56],
            orders_failed: AtomicU64::new(0),
            _pad2: [0; 56],
            bytes_sent: AtomicU64::new(0),
            _pad3: [0; 56],
            submit_latency_ns: AtomicU64::new(0),
            _pad4: [0; 56],
        }
    }

    pub fn snapshot(&self) -> PoeMetricsSnapshot {
        PoeMetricsSnapshot {
            orders_sent: self.orders_sent.load(Ordering::Relaxed),
            orders_failed: self.orders_failed.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            submit_latency_ns: self.submit_latency_ns.load(Ordering::Relaxed),
        }
    }
}

impl Default for PoeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`PoeMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoeMetricsSnapshot {
    pub orders_sent: u64,
    pub orders_failed: u64,
    pub bytes_sent: u64,
    pub submit_latency_ns: u64,
}

/// The execution worker core.
pub struct ExecutionEngine<S: ExchangeSender> {
    audit: Arc<AuditLog>,
    ids: OrderIdGenerator,
    sender: S,
    metrics: Arc<PoeMetrics>,
    calibrator: TscCalibrator,
    fix_buf: [u8; FIX_BUFFER_SIZE],
}

impl<S: ExchangeSender> ExecutionEngine<S> {
    /// Build with a freshly calibrated TSC converter (sleeps ~50 ms).
    pub fn new(audit: Arc<AuditLog>, sender: S) -> Self {
        Self::with_calibrator(audit, sender, TscCalibrator::new())
    }

    pub fn with_calibrator(audit: Arc<AuditLog>, sender: S, calibrator: TscCalibrator) -> Self {
        Self {
            audit,
            ids: OrderIdGenerator::new(),
            sender,
            metrics: Arc::new(PoeMetrics::new()),
            calibrator,
            fix_buf: [0; FIX_BUFFER_SIZE],
        }
    }

    /// Dispatch one incoming envelope; order requests run the submit path.
    #[inline]
    pub fn on_message(&mut self, msg: &Envelope) {
        if let Payload::Order(_) = &msg.payload {
            self.process_order(msg);
        }
    }

    /// Submit one order: audit intent, encode, send, audit outcome.
    ///
    /// Returns the exchange order id assigned to the submission.
    pub fn process_order(&mut self, msg: &Envelope) -> u64 {
        let start_tsc = clock::rdtsc();

        let order = match msg.as_order() {
            Some(o) => *o,
            None => return 0,
        };

        let exchange_order_id = self.ids.generate();

        // The compliance checkpoint: intent hits the log before any bytes
        // hit the wire.
        self.audit.log_order(exchange_order_id, &order);

        let len = fix::encode_new_order(
            &mut self.fix_buf,
            exchange_order_id,
            order.symbol_id,
            order.side,
            order.price,
            order.quantity,
        );

        let sent = len > 0 && self.sender.send(&self.fix_buf[..len]);

        if sent {
            self.audit.log_sent(exchange_order_id);
            self.metrics.orders_sent.fetch_add(1, Ordering::Relaxed);
            self.metrics
                .bytes_sent
                .fetch_add(len as u64, Ordering::Relaxed);
        } else {
            self.audit.log_error(exchange_order_id, "SEND_FAILED");
            self.metrics.orders_failed.fetch_add(1, Ordering::Relaxed);
        }

        let ns = self
            .calibrator
            .tsc_to_ns(clock::rdtsc().wrapping_sub(start_tsc));
        self.metrics
            .submit_latency_ns
            .fetch_add(ns, Ordering::Relaxed);

        exchange_order_id
    }

    /// Exchange acknowledged the order.
    pub fn on_ack(&self, order_id: u64, exchange_ack_id: &str) {
        self.audit.log_ack(order_id, exchange_ack_id);
    }

    /// Exchange rejected the order (terminal).
    pub fn on_reject(&self, order_id: u64, reason: &str) {
        self.audit.log_reject(order_id, reason);
    }

    /// Execution confirmed (terminal).
    pub fn on_fill(&self, order_id: u64, symbol_id: u64, price: FixedPoint, qty: FixedPoint) {
        self.audit.log_fill(order_id, symbol_id, price, qty);
    }

    /// Link-level error (terminal).
    pub fn on_error(&self, order_id: u64, message: &str) {
        self.audit.log_error(order_id, message);
    }

    pub fn metrics(&self) -> Arc<PoeMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }
}
