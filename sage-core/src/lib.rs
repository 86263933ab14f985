//! SAGE Core - Low-Latency Multi-Stage Trading Pipeline
//!
//! A shared-nothing trading pipeline in which CPU-pinned workers exchange
//! fixed-size 64-byte messages across lock-free single-producer
//! single-consumer rings:
//!
//! ```text
//! market data     +-------+        +-------+        +-------+
//! (JSON ingress)->| ring  |->ADE ->| ring  |->RME ->| ring  |->POE -> exchange
//!                 +-------+  |     +-------+  |     +-------+  |      (FIX 4.2)
//!                            |                |                |
//!                       per-symbol       position book    audit trail
//!                       stats/regime     + limit check    + fsync daemon
//! ```
//!
//! - **ADE** (analytics): rolling + EWMA statistics per symbol, volatility
//!   regime detection, winsorized z-scores, mean-reversion signals, latency
//!   histograms.
//! - **RME** (risk): branchless four-limit check over a cache-aligned
//!   position store, circuit breaker short-circuit.
//! - **POE** (execution): audit-before-send order logging, FIX encoding,
//!   periodic fsync durability.
//!
//! ## Design principles
//!
//! - **Zero allocation on hot paths.** All per-symbol state, ring storage
//!   and formatting buffers are pre-allocated at startup.
//! - **Cache-line discipline.** Envelopes are exactly 64 bytes; per-symbol
//!   records and metric counters are padded to their own lines.
//! - **Deterministic arithmetic.** One fixed-point scalar (i64, scale 10^8)
//!   carries every price, quantity and statistic; no NaN/infinity failure
//!   modes downstream of ingress.
//! - **Count, drop, continue.** Validation failures, full rings and
//!   numerical guards increment counters and move on; nothing on a hot
//!   path blocks or unwinds.
//! - **Explicit durability.** The audit log separates `flush` (user-space
//!   to kernel) from `sync` (fsync); only the latter is a durability
//!   contract, and a background daemon pays that cost off the hot path.
//!
//! ## Module map
//!
//! - [`core`]: fixed-point scalar, message envelope
//! - [`ring`]: the SPSC transport
//! - [`analytics`]: ADE statistics and signal engine
//! - [`risk`]: RME position store, limits, circuit breaker
//! - [`audit`]: POE audit log, FIX encoder, sync daemon
//! - [`data`]: ingress validation
//! - [`perf`]: clocks, TSC calibration, CPU pinning
//! - [`config`], [`shutdown`]: wiring

pub mod analytics;
pub mod audit;
pub mod config;
pub mod core;
pub mod data;
pub mod perf;
pub mod ring;
pub mod risk;
pub mod shutdown;

pub use crate::core::{Envelope, FixedPoint, MarketTick, OrderRequest, SignalData, SCALE};
pub use anyhow::{Error, Result};

/// Prelude for the worker binaries.
pub mod prelude {
    pub use crate::analytics::{AdeConfig, AnalyticsEngine};
    pub use crate::audit::{AuditLog, AuditSyncDaemon, CountingSender, ExecutionEngine};
    pub use crate::config::{PipelineConfig, ADE_BATCH_SIZE, MAX_SYMBOLS, PIPELINE_RING_CAPACITY};
    pub use crate::core::{Envelope, FixedPoint, MarketTick, Payload, SignalData};
    pub use crate::data::ingress;
    pub use crate::perf::{clock, cpu};
    pub use crate::ring::spsc;
    pub use crate::risk::{RiskEngine, RiskLimits};
    pub use crate::shutdown::ShutdownFlag;
    pub use crate::{Error, Result};
}
