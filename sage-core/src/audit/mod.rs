//! Execution and audit: the compliance end of the pipeline

pub mod engine;
pub mod fix;
pub mod log;
pub mod order_id;
pub mod sync_daemon;

pub use engine::{CountingSender, ExchangeSender, ExecutionEngine, PoeMetrics, PoeMetricsSnapshot};
pub use log::AuditLog;
pub use order_id::OrderIdGenerator;
pub use sync_daemon::AuditSyncDaemon;
