//! Common utilities for all binaries
//!
//! CLI parsing, logging setup, and worker-thread performance setup shared
//! by the pipeline and inspection binaries.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Common CLI arguments. No flag is required; defaults plus `SAGE_*`
/// environment variables configure everything.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// Number of synthetic ticks to feed
    #[arg(short, long, default_value = "100000")]
    pub ticks: u64,

    /// Symbols to spread the feed across
    #[arg(short, long, default_value = "4")]
    pub symbols: u64,

    /// First CPU core for worker pinning (workers take consecutive cores)
    #[arg(short = 'c', long)]
    pub cpu_core_base: Option<usize>,

    /// Enable real-time scheduling (requires privileges)
    #[arg(long)]
    pub realtime: bool,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

/// Initialize tracing output.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    Ok(())
}

/// Pin the current worker thread and optionally elevate it.
///
/// Best-effort: a pipeline that cannot pin still runs, degraded.
pub fn setup_worker(name: &str, core: Option<usize>, realtime: bool) {
    if let Some(core) = core {
        if let Err(e) = sage_core::perf::cpu::pin_to_core(core) {
            tracing::warn!(worker = name, core, error = %e, "pinning failed");
        } else {
            tracing::info!(worker = name, core, "pinned");
        }
    }
    if realtime {
        if let Err(e) = sage_core::perf::cpu::set_realtime_priority(50) {
            tracing::warn!(worker = name, error = %e, "real-time priority unavailable");
        }
    }
}
