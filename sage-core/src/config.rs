//! Pipeline constants and runtime configuration
//!
//! Runtime parameters come from embedded defaults with environment
//! overrides (`SAGE_*` variables); workers take no required flags. Sizes
//! that shape memory layout (symbol slots, ring capacities) are
//! compile-time constants.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::analytics::AdeConfig;
use crate::risk::RiskLimits;

/// Symbol state slots; power of two so lookup is a mask.
pub const MAX_SYMBOLS: usize = 256;

/// Capacity of the rings between pipeline stages.
pub const PIPELINE_RING_CAPACITY: usize = 65_536;

/// Batch size for the analytics worker's ring dequeue.
pub const ADE_BATCH_SIZE: usize = 16;

const _: () = assert!(MAX_SYMBOLS.is_power_of_two());

/// Audit-log configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Audit file path.
    pub path: PathBuf,
    /// Background fsync interval in milliseconds.
    pub sync_interval_ms: u64,
}

impl AuditConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("sage_audit.log"),
            sync_interval_ms: 50,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    pub ade: AdeConfig,
    pub limits: RiskLimits,
    pub audit: AuditConfig,
}

impl PipelineConfig {
    /// Defaults with `SAGE_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(path) = env_var("SAGE_AUDIT_PATH") {
            cfg.audit.path = PathBuf::from(path);
        }
        if let Some(v) = env_parse("SAGE_SYNC_INTERVAL_MS") {
            cfg.audit.sync_interval_ms = v;
        }
        if let Some(v) = env_parse("SAGE_MAX_POSITION") {
            cfg.limits.max_position_per_symbol = v;
        }
        if let Some(v) = env_parse("SAGE_MAX_EXPOSURE") {
            cfg.limits.max_total_exposure = v;
        }
        if let Some(v) = env_parse("SAGE_MAX_DAILY_LOSS") {
            cfg.limits.max_daily_loss = v;
        }
        if let Some(v) = env_parse("SAGE_MAX_ORDER_SIZE") {
            cfg.limits.max_order_size = v;
        }
        if let Some(v) = env_parse("SAGE_EWMA_HALF_LIFE") {
            cfg.ade.ewma_half_life = v;
        }
        if let Some(v) = env_parse("SAGE_REGIME_HALF_LIFE") {
            cfg.ade.regime_half_life = v;
        }

        cfg
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    match env_var(name) {
        Some(raw) => match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(var = name, value = %raw, "unparseable override ignored");
                None
            }
        },
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.audit.sync_interval_ms, 50);
        assert_eq!(cfg.audit.sync_interval(), Duration::from_millis(50));
        assert_eq!(cfg.ade.ewma_half_life, 50);
        assert!(cfg.limits.max_daily_loss > 0);
    }

    #[test]
    fn test_env_override() {
        // Serialized by the env-var name: no other test touches it.
        std::env::set_var("SAGE_MAX_DAILY_LOSS", "42");
        let cfg = PipelineConfig::from_env();
        assert_eq!(cfg.limits.max_daily_loss, 42);
        std::env::remove_var("SAGE_MAX_DAILY_LOSS");
    }

    #[test]
    fn test_bad_env_value_ignored() {
        std::env::set_var("SAGE_MAX_ORDER_SIZE", "not-a-number");
        let cfg = PipelineConfig::from_env();
        assert_eq!(
            cfg.limits.max_order_size,
            RiskLimits::default().max_order_size
        );
        std::env::remove_var("SAGE_MAX_ORDER_SIZE");
    }
}
