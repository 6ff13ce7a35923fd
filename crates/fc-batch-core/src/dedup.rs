//! Message-level deduplication.
//!
//! `MessageStore` is the user-supplied collaborator (a database, a Redis
//! set, whatever durably remembers which `(userId, messageId)` pairs have
//! already been dispatched). `DedupGate` wraps it with the same
//! fail-open posture the rest of the engine uses for its own bookkeeping: a
//! lookup or commit failure is logged and treated as "not seen" / "best
//! effort", the same way a failing `fc-router` duplicate check falls back
//! to "not a duplicate" rather than stalling the pipeline.

use async_trait::async_trait;

/// Durable record of which messages have already been dispatched.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn has_processed(&self, user_id: &str, message_id: &str) -> anyhow::Result<bool>;
    async fn mark_processed(&self, user_id: &str, message_id: &str) -> anyhow::Result<()>;
}

/// Ingress-time duplicate filter backed by a [`MessageStore`].
pub struct DedupGate {
    store: std::sync::Arc<dyn MessageStore>,
}

impl DedupGate {
    pub fn new(store: std::sync::Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Returns `true` if this message has already been dispatched and
    /// should be silently dropped. A lookup failure is logged and treated
    /// as "not seen" — an engine that blocked ingestion on a flaky
    /// dedup store would be worse than one that occasionally double-sends.
    pub async fn seen(&self, user_id: &str, message_id: &str) -> bool {
        match self.store.has_processed(user_id, message_id).await {
            Ok(seen) => seen,
            Err(err) => {
                tracing::warn!(user_id, message_id, error = %err, "dedup lookup failed, treating as unseen");
                false
            }
        }
    }

    /// Record a message as dispatched. Failures are logged, not surfaced:
    /// the batch has already been handed to the processor successfully by
    /// the time this is called, so there is nothing left to roll back.
    pub async fn commit(&self, user_id: &str, message_id: &str) {
        if let Err(err) = self.store.mark_processed(user_id, message_id).await {
            tracing::warn!(user_id, message_id, error = %err, "failed to record message as processed");
        }
    }
}
