//! TOML configuration file loader with environment variable overrides.
//!
//! Mirrors `fc-config`'s `ConfigLoader`: search a short list of
//! conventional paths (or an explicit override), parse TOML into the
//! unvalidated [`RawBatchingConfig`], apply scalar environment overrides,
//! then run the result through [`BatchingConfig::new`] so a bad file or
//! env var is reported as one [`EngineError::ConfigInvalid`] instead of
//! silently producing a half-broken engine.

use std::env;
use std::path::PathBuf;

use crate::config::{BackpressureStrategy, BatchingConfig, RawBatchingConfig};
use crate::error::EngineError;

const CONFIG_PATHS: &[&str] = &["batch.toml", "fc-batch.toml", "./config/batch.toml"];

const ENV_CONFIG_PATH: &str = "FC_BATCH_CONFIG";

/// Loads a [`BatchingConfig`] from a TOML file, if present, layered with
/// environment variable overrides.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    pub fn load(&self) -> Result<BatchingConfig, EngineError> {
        let mut raw = RawBatchingConfig::default();

        if let Some(path) = self.find_config_file() {
            tracing::info!(?path, "loading batching configuration from file");
            let contents = std::fs::read_to_string(&path)
                .map_err(|err| EngineError::ConfigInvalid(format!("failed to read {}: {err}", path.display())))?;
            raw = toml::from_str(&contents)
                .map_err(|err| EngineError::ConfigInvalid(format!("failed to parse {}: {err}", path.display())))?;
        }

        self.apply_env_overrides(&mut raw)?;
        BatchingConfig::new(raw)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var(ENV_CONFIG_PATH) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    fn apply_env_overrides(&self, raw: &mut RawBatchingConfig) -> Result<(), EngineError> {
        if let Ok(val) = env::var("FC_BATCH_ADAPTIVE_TIMEOUT_MS") {
            raw.adaptive_timeout = parse_millis("FC_BATCH_ADAPTIVE_TIMEOUT_MS", &val)?;
        }
        if let Ok(val) = env::var("FC_BATCH_SILENCE_THRESHOLD_MS") {
            raw.silence_threshold = parse_millis("FC_BATCH_SILENCE_THRESHOLD_MS", &val)?;
        }
        if let Ok(val) = env::var("FC_BATCH_MAX_BUFFER_SIZE") {
            raw.max_buffer_size = val
                .parse()
                .map_err(|_| EngineError::ConfigInvalid("FC_BATCH_MAX_BUFFER_SIZE must be a non-negative integer".into()))?;
        }
        if let Ok(val) = env::var("FC_BATCH_BACKPRESSURE_STRATEGY") {
            raw.backpressure_strategy = parse_strategy(&val)?;
        }
        if let Ok(val) = env::var("FC_BATCH_RATE_LIMIT_TOKENS_PER_MINUTE") {
            raw.rate_limit.tokens_per_minute = val
                .parse()
                .map_err(|_| EngineError::ConfigInvalid("FC_BATCH_RATE_LIMIT_TOKENS_PER_MINUTE must be an integer".into()))?;
        }
        if let Ok(val) = env::var("FC_BATCH_RATE_LIMIT_BUCKET_CAPACITY") {
            raw.rate_limit.bucket_capacity = val
                .parse()
                .map_err(|_| EngineError::ConfigInvalid("FC_BATCH_RATE_LIMIT_BUCKET_CAPACITY must be an integer".into()))?;
        }
        if let Ok(val) = env::var("FC_BATCH_MAX_RETRIES") {
            raw.error_handling.max_retries = val
                .parse()
                .map_err(|_| EngineError::ConfigInvalid("FC_BATCH_MAX_RETRIES must be an integer".into()))?;
        }
        if let Ok(val) = env::var("FC_BATCH_RETRY_DELAY_MS") {
            raw.error_handling.retry_delay = parse_millis("FC_BATCH_RETRY_DELAY_MS", &val)?;
        }
        if let Ok(val) = env::var("FC_BATCH_BLOCK_TIMEOUT_MS") {
            raw.block_timeout = parse_millis("FC_BATCH_BLOCK_TIMEOUT_MS", &val)?;
        }
        if let Ok(val) = env::var("FC_BATCH_SHUTDOWN_GRACE_MS") {
            raw.shutdown_grace = parse_millis("FC_BATCH_SHUTDOWN_GRACE_MS", &val)?;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_millis(var: &str, val: &str) -> Result<std::time::Duration, EngineError> {
    val.parse::<u64>()
        .map(std::time::Duration::from_millis)
        .map_err(|_| EngineError::ConfigInvalid(format!("{var} must be a non-negative integer number of milliseconds")))
}

fn parse_strategy(val: &str) -> Result<BackpressureStrategy, EngineError> {
    match val.to_uppercase().as_str() {
        "DROP_NEW" => Ok(BackpressureStrategy::DropNew),
        "DROP_OLDEST" => Ok(BackpressureStrategy::DropOldest),
        "REJECT_WITH_NOTIFICATION" => Ok(BackpressureStrategy::RejectWithNotification),
        "BLOCK_UNTIL_SPACE" => Ok(BackpressureStrategy::BlockUntilSpace),
        "FLUSH_AND_ACCEPT" => Ok(BackpressureStrategy::FlushAndAccept),
        other => Err(EngineError::ConfigInvalid(format!(
            "FC_BATCH_BACKPRESSURE_STRATEGY has unrecognized value {other:?}"
        ))),
    }
}
