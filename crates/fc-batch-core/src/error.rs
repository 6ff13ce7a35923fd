//! Engine error taxonomy.
//!
//! Every fallible entry point on [`crate::service::BatchingService`] returns
//! [`EngineError`]. Failures inside the engine's own bookkeeping (dedup
//! lookups, hook accidents, DLQ sink failures) are logged and absorbed —
//! they never reach this enum. Only caller-contract violations and
//! terminal, policy-governed outcomes do.

use thiserror::Error;

/// Errors the engine can report to a caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EngineError {
    /// A [`crate::config::BatchingConfig`] field failed validation.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// `receiveMessage` was called with a null/empty `userId` or message id.
    #[error("invalid input: {0}")]
    InputInvalid(String),

    /// `BLOCK_UNTIL_SPACE` waited past the configured timeout without the
    /// buffer draining.
    #[error("timed out waiting for buffer space for user {user_id}")]
    BlockTimeout { user_id: String },

    /// `receiveMessage` was called after `shutdown()` began.
    #[error("service is shutting down, message rejected")]
    ShutdownInProgress,
}

/// Result alias used throughout the engine's public API.
pub type Result<T> = std::result::Result<T, EngineError>;
