//! TOML-based configuration with environment variable override support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mediator: MediatorConfig,
    pub batcher: BatcherConfig,
    pub inbox: InboxConfig,
    pub outbox: OutboxConfig,
    pub recovery: RecoveryConfig,
    pub lifecycle: LifecycleConfig,
    pub idgen: IdGenConfig,

    /// Enable development mode (verbose logging, in-memory stores)
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mediator: MediatorConfig::default(),
            batcher: BatcherConfig::default(),
            inbox: InboxConfig::default(),
            outbox: OutboxConfig::default(),
            recovery: RecoveryConfig::default(),
            lifecycle: LifecycleConfig::default(),
            idgen: IdGenConfig::default(),
            dev_mode: false,
        }
    }
}

/// Mediator dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediatorConfig {
    pub default_timeout_ms: u64,
    pub enable_auto_batching: bool,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self { default_timeout_ms: 30_000, enable_auto_batching: true }
    }
}

/// Auto-batcher shard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    pub max_batch_size: usize,
    pub batch_timeout_ms: u64,
    pub max_queue_length: usize,
    pub shard_idle_ttl_secs: u64,
    pub max_shards: usize,
    pub flush_degree: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            batch_timeout_ms: 100,
            max_queue_length: 1_000,
            shard_idle_ttl_secs: 60,
            max_shards: 10_000,
            flush_degree: 0,
        }
    }
}

/// Inbox (idempotent receive) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxConfig {
    pub retention_secs: u64,
    pub shard_count: usize,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self { retention_secs: 86_400, shard_count: 16 }
    }
}

/// Outbox processor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    pub scan_interval_ms: u64,
    pub batch_size: usize,
    pub error_delay_ms: u64,
    pub complete_current_batch_on_shutdown: bool,
    /// Attempts a row may fail before it transitions from `Pending` to
    /// terminal `Failed` instead of being retried on the next scan.
    pub max_attempts: u32,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 1_000,
            batch_size: 50,
            error_delay_ms: 5_000,
            complete_current_batch_on_shutdown: true,
            max_attempts: 5,
        }
    }
}

/// Recovery supervisor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub check_interval_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub use_exponential_backoff: bool,
    pub enable_auto_recovery: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 30_000,
            max_retries: 5,
            retry_delay_ms: 1_000,
            use_exponential_backoff: true,
            enable_auto_recovery: true,
        }
    }
}

/// Transport lifecycle host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub shutdown_timeout_secs: u64,
    pub enable_transport_hosting: bool,
    pub enable_outbox_processor: bool,
    pub enable_auto_recovery: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: 30,
            enable_transport_hosting: true,
            enable_outbox_processor: true,
            enable_auto_recovery: true,
        }
    }
}

/// Snowflake-style id generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdGenConfig {
    pub worker_id: u64,
    pub auto_detect_worker_id: bool,
    /// Custom epoch as milliseconds since Unix epoch
    pub custom_epoch_millis: i64,
    pub layout: IdLayoutConfig,
}

impl Default for IdGenConfig {
    fn default() -> Self {
        Self {
            worker_id: 0,
            auto_detect_worker_id: true,
            custom_epoch_millis: 1_577_836_800_000, // 2020-01-01T00:00:00Z
            layout: IdLayoutConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdLayoutConfig {
    pub timestamp_bits: u8,
    pub worker_id_bits: u8,
    pub sequence_bits: u8,
}

impl Default for IdLayoutConfig {
    fn default() -> Self {
        Self { timestamp_bits: 41, worker_id_bits: 10, sequence_bits: 12 }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with file-search and environment variable overrides
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# fc-dev configuration
# FC_* environment variables override these settings

[mediator]
default_timeout_ms = 30000
enable_auto_batching = true

[batcher]
max_batch_size = 100
batch_timeout_ms = 100
max_queue_length = 1000
shard_idle_ttl_secs = 60
max_shards = 10000
flush_degree = 0

[inbox]
retention_secs = 86400
shard_count = 16

[outbox]
scan_interval_ms = 1000
batch_size = 50
error_delay_ms = 5000
complete_current_batch_on_shutdown = true
max_attempts = 5

[recovery]
check_interval_ms = 30000
max_retries = 5
retry_delay_ms = 1000
use_exponential_backoff = true
enable_auto_recovery = true

[lifecycle]
shutdown_timeout_secs = 30
enable_transport_hosting = true
enable_outbox_processor = true
enable_auto_recovery = true

[idgen]
worker_id = 0
auto_detect_worker_id = true
custom_epoch_millis = 1577836800000

[idgen.layout]
timestamp_bits = 41
worker_id_bits = 10
sequence_bits = 12

dev_mode = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = AppConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.batcher.max_batch_size, config.batcher.max_batch_size);
        assert_eq!(parsed.idgen.layout.sequence_bits, config.idgen.layout.sequence_bits);
    }

    #[test]
    fn example_toml_parses_into_defaults() {
        let parsed: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        assert_eq!(parsed.recovery.max_retries, 5);
        assert!(parsed.lifecycle.enable_transport_hosting);
    }
}
