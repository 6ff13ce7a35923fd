//! Validated engine configuration.
//!
//! There is no fluent builder here: every field is a plain struct member,
//! and the only way to obtain a [`BatchingConfig`] is [`BatchingConfig::new`],
//! which checks every field against its documented range in one place and
//! fails with [`EngineError::ConfigInvalid`] naming the first offending
//! field. This mirrors this codebase's `AppConfig`/`RouterConfig` pattern of
//! plain `serde`-derived value structs with a single validating
//! constructor instead of a fluent builder.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Policy applied when a user's buffer is at `max_buffer_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackpressureStrategy {
    /// Reject the newly arrived message; the buffer is unchanged.
    DropNew,
    /// Evict the oldest buffered message, then append the new one.
    DropOldest,
    /// Reject the new message and emit a notification callback.
    RejectWithNotification,
    /// Wait (bounded by `block_timeout`) until a dispatch frees space.
    BlockUntilSpace,
    /// Dispatch the current batch immediately, then accept into the fresh buffer.
    FlushAndAccept,
}

/// Token-bucket rate limiting parameters, applied per user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Tokens refilled per minute, 1..=10_000.
    pub tokens_per_minute: u32,
    /// Bucket capacity (burst size), >= 1.
    pub bucket_capacity: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            tokens_per_minute: 60,
            bucket_capacity: 20,
        }
    }
}

/// Retry budget and backoff base for failed dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    /// Additional attempts after the first, 0..=10.
    pub max_retries: u32,
    /// Base delay before the first retry; doubles each subsequent attempt
    /// (multiplier fixed at 2.0) with +/-20% jitter.
    #[serde(with = "duration_millis")]
    pub retry_delay: Duration,
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Validated, immutable engine configuration.
///
/// Construct only via [`BatchingConfig::new`]; there is no public way to
/// obtain one that skips validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBatchingConfig", into = "RawBatchingConfig")]
pub struct BatchingConfig {
    adaptive_timeout: Duration,
    silence_threshold: Duration,
    max_buffer_size: usize,
    backpressure_strategy: BackpressureStrategy,
    rate_limit: RateLimitConfig,
    error_handling: ErrorHandlingConfig,
    block_timeout: Duration,
    shutdown_grace: Duration,
}

impl BatchingConfig {
    /// Validate and construct a configuration.
    ///
    /// Every field is checked; the first violation found is returned,
    /// naming the offending field so the caller can fix it without
    /// guessing.
    pub fn new(raw: RawBatchingConfig) -> Result<Self, EngineError> {
        if raw.silence_threshold > raw.adaptive_timeout {
            return Err(EngineError::ConfigInvalid(
                "silence_threshold must be <= adaptive_timeout".into(),
            ));
        }
        if raw.max_buffer_size < 1 || raw.max_buffer_size > 10_000 {
            return Err(EngineError::ConfigInvalid(
                "max_buffer_size must be in 1..=10_000".into(),
            ));
        }
        if raw.rate_limit.tokens_per_minute < 1 || raw.rate_limit.tokens_per_minute > 10_000 {
            return Err(EngineError::ConfigInvalid(
                "rate_limit.tokens_per_minute must be in 1..=10_000".into(),
            ));
        }
        if raw.rate_limit.bucket_capacity < 1 {
            return Err(EngineError::ConfigInvalid(
                "rate_limit.bucket_capacity must be >= 1".into(),
            ));
        }
        if raw.error_handling.max_retries > 10 {
            return Err(EngineError::ConfigInvalid(
                "error_handling.max_retries must be in 0..=10".into(),
            ));
        }
        if raw.backpressure_strategy == BackpressureStrategy::BlockUntilSpace
            && raw.block_timeout.is_zero()
        {
            return Err(EngineError::ConfigInvalid(
                "block_timeout must be > 0 when backpressure_strategy is BLOCK_UNTIL_SPACE".into(),
            ));
        }
        if raw.shutdown_grace.is_zero() {
            return Err(EngineError::ConfigInvalid("shutdown_grace must be > 0".into()));
        }

        Ok(Self {
            adaptive_timeout: raw.adaptive_timeout,
            silence_threshold: raw.silence_threshold,
            max_buffer_size: raw.max_buffer_size,
            backpressure_strategy: raw.backpressure_strategy,
            rate_limit: raw.rate_limit,
            error_handling: raw.error_handling,
            block_timeout: raw.block_timeout,
            shutdown_grace: raw.shutdown_grace,
        })
    }

    pub fn adaptive_timeout(&self) -> Duration {
        self.adaptive_timeout
    }
    pub fn silence_threshold(&self) -> Duration {
        self.silence_threshold
    }
    pub fn max_buffer_size(&self) -> usize {
        self.max_buffer_size
    }
    pub fn backpressure_strategy(&self) -> BackpressureStrategy {
        self.backpressure_strategy
    }
    pub fn rate_limit(&self) -> RateLimitConfig {
        self.rate_limit
    }
    pub fn error_handling(&self) -> ErrorHandlingConfig {
        self.error_handling
    }
    pub fn block_timeout(&self) -> Duration {
        self.block_timeout
    }
    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }
}

/// Plain, unvalidated mirror of [`BatchingConfig`] used as the `serde`
/// wire/file representation and the constructor argument. Keeping this
/// separate from `BatchingConfig` means the validated type can never be
/// deserialized without going through [`BatchingConfig::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBatchingConfig {
    #[serde(with = "duration_millis")]
    pub adaptive_timeout: Duration,
    #[serde(with = "duration_millis")]
    pub silence_threshold: Duration,
    pub max_buffer_size: usize,
    pub backpressure_strategy: BackpressureStrategy,
    pub rate_limit: RateLimitConfig,
    pub error_handling: ErrorHandlingConfig,
    #[serde(with = "duration_millis")]
    pub block_timeout: Duration,
    #[serde(with = "duration_millis")]
    pub shutdown_grace: Duration,
}

impl Default for RawBatchingConfig {
    fn default() -> Self {
        Self {
            adaptive_timeout: Duration::from_secs(5),
            silence_threshold: Duration::from_secs(1),
            max_buffer_size: 50,
            backpressure_strategy: BackpressureStrategy::DropOldest,
            rate_limit: RateLimitConfig::default(),
            error_handling: ErrorHandlingConfig::default(),
            block_timeout: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

impl TryFrom<RawBatchingConfig> for BatchingConfig {
    type Error = EngineError;

    fn try_from(raw: RawBatchingConfig) -> Result<Self, Self::Error> {
        BatchingConfig::new(raw)
    }
}

impl From<BatchingConfig> for RawBatchingConfig {
    fn from(cfg: BatchingConfig) -> Self {
        Self {
            adaptive_timeout: cfg.adaptive_timeout,
            silence_threshold: cfg.silence_threshold,
            max_buffer_size: cfg.max_buffer_size,
            backpressure_strategy: cfg.backpressure_strategy,
            rate_limit: cfg.rate_limit,
            error_handling: cfg.error_handling,
            block_timeout: cfg.block_timeout,
            shutdown_grace: cfg.shutdown_grace,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(BatchingConfig::new(RawBatchingConfig::default()).is_ok());
    }

    #[test]
    fn rejects_silence_threshold_above_adaptive_timeout() {
        let raw = RawBatchingConfig {
            adaptive_timeout: Duration::from_millis(100),
            silence_threshold: Duration::from_millis(200),
            ..Default::default()
        };
        let err = BatchingConfig::new(raw).unwrap_err();
        assert!(matches!(err, EngineError::ConfigInvalid(_)));
    }

    #[test]
    fn rejects_buffer_size_out_of_range() {
        let raw = RawBatchingConfig {
            max_buffer_size: 0,
            ..Default::default()
        };
        assert!(BatchingConfig::new(raw).is_err());

        let raw = RawBatchingConfig {
            max_buffer_size: 10_001,
            ..Default::default()
        };
        assert!(BatchingConfig::new(raw).is_err());
    }

    #[test]
    fn rejects_zero_block_timeout_when_blocking_strategy_selected() {
        let raw = RawBatchingConfig {
            backpressure_strategy: BackpressureStrategy::BlockUntilSpace,
            block_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(BatchingConfig::new(raw).is_err());
    }

    #[test]
    fn rejects_retry_budget_above_ten() {
        let raw = RawBatchingConfig {
            error_handling: ErrorHandlingConfig {
                max_retries: 11,
                retry_delay: Duration::from_millis(10),
            },
            ..Default::default()
        };
        assert!(BatchingConfig::new(raw).is_err());
    }

    #[test]
    fn round_trips_through_serde() {
        let cfg = BatchingConfig::new(RawBatchingConfig::default()).unwrap();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: BatchingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
