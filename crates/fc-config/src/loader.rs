//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &["config.toml", "./config/config.toml", "/etc/fc/config.toml"];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self { config_path: Some(path.into()) }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        self.apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Find the configuration file to use: explicit path → `FC_CONFIG` env
    /// var → standard search paths.
    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("FC_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        for path in CONFIG_PATHS {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Apply `FC_*` environment variable overrides, one subsystem at a time.
    fn apply_env_overrides(&self, config: &mut AppConfig) {
        if let Ok(val) = env::var("FC_MEDIATOR_DEFAULT_TIMEOUT_MS") {
            if let Ok(v) = val.parse() {
                config.mediator.default_timeout_ms = v;
            }
        }
        if let Ok(val) = env::var("FC_MEDIATOR_ENABLE_AUTO_BATCHING") {
            config.mediator.enable_auto_batching = val.parse().unwrap_or(true);
        }

        if let Ok(val) = env::var("FC_BATCHER_MAX_BATCH_SIZE") {
            if let Ok(v) = val.parse() {
                config.batcher.max_batch_size = v;
            }
        }
        if let Ok(val) = env::var("FC_BATCHER_BATCH_TIMEOUT_MS") {
            if let Ok(v) = val.parse() {
                config.batcher.batch_timeout_ms = v;
            }
        }
        if let Ok(val) = env::var("FC_BATCHER_MAX_QUEUE_LENGTH") {
            if let Ok(v) = val.parse() {
                config.batcher.max_queue_length = v;
            }
        }
        if let Ok(val) = env::var("FC_BATCHER_SHARD_IDLE_TTL_SECS") {
            if let Ok(v) = val.parse() {
                config.batcher.shard_idle_ttl_secs = v;
            }
        }
        if let Ok(val) = env::var("FC_BATCHER_MAX_SHARDS") {
            if let Ok(v) = val.parse() {
                config.batcher.max_shards = v;
            }
        }
        if let Ok(val) = env::var("FC_BATCHER_FLUSH_DEGREE") {
            if let Ok(v) = val.parse() {
                config.batcher.flush_degree = v;
            }
        }

        if let Ok(val) = env::var("FC_INBOX_RETENTION_SECS") {
            if let Ok(v) = val.parse() {
                config.inbox.retention_secs = v;
            }
        }
        if let Ok(val) = env::var("FC_INBOX_SHARD_COUNT") {
            if let Ok(v) = val.parse() {
                config.inbox.shard_count = v;
            }
        }

        if let Ok(val) = env::var("FC_OUTBOX_SCAN_INTERVAL_MS") {
            if let Ok(v) = val.parse() {
                config.outbox.scan_interval_ms = v;
            }
        }
        if let Ok(val) = env::var("FC_OUTBOX_BATCH_SIZE") {
            if let Ok(v) = val.parse() {
                config.outbox.batch_size = v;
            }
        }
        if let Ok(val) = env::var("FC_OUTBOX_ERROR_DELAY_MS") {
            if let Ok(v) = val.parse() {
                config.outbox.error_delay_ms = v;
            }
        }
        if let Ok(val) = env::var("FC_OUTBOX_COMPLETE_CURRENT_BATCH_ON_SHUTDOWN") {
            config.outbox.complete_current_batch_on_shutdown = val.parse().unwrap_or(true);
        }
        if let Ok(val) = env::var("FC_OUTBOX_MAX_ATTEMPTS") {
            if let Ok(v) = val.parse() {
                config.outbox.max_attempts = v;
            }
        }

        if let Ok(val) = env::var("FC_RECOVERY_CHECK_INTERVAL_MS") {
            if let Ok(v) = val.parse() {
                config.recovery.check_interval_ms = v;
            }
        }
        if let Ok(val) = env::var("FC_RECOVERY_MAX_RETRIES") {
            if let Ok(v) = val.parse() {
                config.recovery.max_retries = v;
            }
        }
        if let Ok(val) = env::var("FC_RECOVERY_RETRY_DELAY_MS") {
            if let Ok(v) = val.parse() {
                config.recovery.retry_delay_ms = v;
            }
        }
        if let Ok(val) = env::var("FC_RECOVERY_USE_EXPONENTIAL_BACKOFF") {
            config.recovery.use_exponential_backoff = val.parse().unwrap_or(true);
        }
        if let Ok(val) = env::var("FC_RECOVERY_ENABLE_AUTO_RECOVERY") {
            config.recovery.enable_auto_recovery = val.parse().unwrap_or(true);
        }

        if let Ok(val) = env::var("FC_LIFECYCLE_SHUTDOWN_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.lifecycle.shutdown_timeout_secs = v;
            }
        }
        if let Ok(val) = env::var("FC_LIFECYCLE_ENABLE_TRANSPORT_HOSTING") {
            config.lifecycle.enable_transport_hosting = val.parse().unwrap_or(true);
        }
        if let Ok(val) = env::var("FC_LIFECYCLE_ENABLE_OUTBOX_PROCESSOR") {
            config.lifecycle.enable_outbox_processor = val.parse().unwrap_or(true);
        }
        if let Ok(val) = env::var("FC_LIFECYCLE_ENABLE_AUTO_RECOVERY") {
            config.lifecycle.enable_auto_recovery = val.parse().unwrap_or(true);
        }

        if let Ok(val) = env::var("FC_IDGEN_WORKER_ID") {
            if let Ok(v) = val.parse() {
                config.idgen.worker_id = v;
            }
        }
        if let Ok(val) = env::var("FC_IDGEN_AUTO_DETECT_WORKER_ID") {
            config.idgen.auto_detect_worker_id = val.parse().unwrap_or(true);
        }
        if let Ok(val) = env::var("FC_IDGEN_CUSTOM_EPOCH_MILLIS") {
            if let Ok(v) = val.parse() {
                config.idgen.custom_epoch_millis = v;
            }
        }

        if let Ok(val) = env::var("FC_DEV_MODE") {
            config.dev_mode = val.parse().unwrap_or(false);
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_config_file_falls_back_to_none_when_nothing_exists() {
        let loader = ConfigLoader::with_path("/nonexistent/path/config.toml");
        assert!(loader.find_config_file().is_none());
    }

    #[test]
    fn load_without_any_file_returns_defaults() {
        let loader = ConfigLoader::with_path("/nonexistent/path/config.toml");
        let config = loader.load().unwrap();
        assert_eq!(config.batcher.max_batch_size, 100);
    }
}
