//! Reference collaborators for running the engine without a real backend.
//!
//! Everything here is an in-memory, single-process stand-in for the
//! collaborators an application is expected to supply: a durable dedup
//! store, a real message processor (an HTTP call, a queue publish, ...), a
//! moderation hook, a dead letter sink. Used by [`crate::service`]'s own
//! tests and by the demo binary; not meant for production use.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use fc_batch_common::InboundMessage;

use crate::dedup::MessageStore;
use crate::hooks::{HookContext, HookOutcome, ProcessingHook};
use crate::retry::{DeadLetterHandler, DispatchResult, MessageProcessor};

/// `MessageStore` backed by an in-memory set of `(userId, messageId)`
/// pairs. Never errors; exists purely so the demo binary and tests have a
/// dedup gate to wire up without standing up a database.
#[derive(Default)]
pub struct InMemoryMessageStore {
    seen: DashSet<(String, String)>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn has_processed(&self, user_id: &str, message_id: &str) -> anyhow::Result<bool> {
        Ok(self.seen.contains(&(user_id.to_string(), message_id.to_string())))
    }

    async fn mark_processed(&self, user_id: &str, message_id: &str) -> anyhow::Result<()> {
        self.seen.insert((user_id.to_string(), message_id.to_string()));
        Ok(())
    }
}

/// A `MessageProcessor` that logs each batch and always succeeds. Counts
/// the batches it has seen so callers (tests, the demo binary) can assert
/// on dispatch activity without a real downstream.
#[derive(Default)]
pub struct EchoProcessor {
    batches_handled: AtomicUsize,
}

impl EchoProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches_handled(&self) -> usize {
        self.batches_handled.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MessageProcessor for EchoProcessor {
    async fn process(&self, user_id: &str, messages: &[Arc<dyn InboundMessage>], attempt: u32) -> DispatchResult {
        self.batches_handled.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            user_id,
            attempt,
            batch_size = messages.len(),
            message_ids = ?messages.iter().map(|m| m.message_id()).collect::<Vec<_>>(),
            "echoing batch"
        );
        DispatchResult::Success
    }
}

/// A pre-dispatch hook that interrupts a batch if any message's id
/// contains one of a configured set of keywords. Stand-in for content
/// moderation / policy hooks a real deployment would register.
pub struct KeywordInterruptHook {
    keywords: Vec<String>,
}

impl KeywordInterruptHook {
    pub fn new(keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl ProcessingHook for KeywordInterruptHook {
    fn name(&self) -> &str {
        "keyword-interrupt"
    }

    async fn inspect(&self, ctx: &HookContext<'_>) -> anyhow::Result<HookOutcome> {
        for message in ctx.messages {
            for keyword in &self.keywords {
                if message.message_id().contains(keyword.as_str()) {
                    return Ok(HookOutcome::Interrupted {
                        reason: format!("message id matched moderation keyword {keyword:?}"),
                    });
                }
            }
        }
        Ok(HookOutcome::Continue)
    }
}

/// A `DeadLetterHandler` that just logs. Stand-in for a real DLQ (a topic,
/// a table) a deployment would point at instead.
pub struct LoggingDeadLetterHandler;

#[async_trait]
impl DeadLetterHandler for LoggingDeadLetterHandler {
    async fn handle(&self, user_id: &str, messages: &[Arc<dyn InboundMessage>], reason: &str) {
        tracing::error!(
            user_id,
            reason,
            batch_size = messages.len(),
            message_ids = ?messages.iter().map(|m| m.message_id()).collect::<Vec<_>>(),
            "batch sent to dead letter handler"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Msg(&'static str);
    impl InboundMessage for Msg {
        fn message_id(&self) -> &str {
            self.0
        }
        fn user_id(&self) -> &str {
            "u1"
        }
    }

    #[tokio::test]
    async fn echo_processor_always_succeeds_and_counts_batches() {
        let processor = EchoProcessor::new();
        let messages: Vec<Arc<dyn InboundMessage>> = vec![Arc::new(Msg("a"))];
        let result = processor.process("u1", &messages, 0).await;
        assert!(matches!(result, DispatchResult::Success));
        assert_eq!(processor.batches_handled(), 1);
    }

    #[tokio::test]
    async fn keyword_hook_interrupts_on_match() {
        let hook = KeywordInterruptHook::new(["spam"]);
        let messages: Vec<Arc<dyn InboundMessage>> = vec![Arc::new(Msg("spam-123"))];
        let ctx = HookContext {
            user_id: "u1",
            messages: &messages,
            batch_size: messages.len(),
            attempt: 0,
            is_retry: false,
            started_at: std::time::Instant::now(),
            outcome: None,
        };
        let outcome = hook.inspect(&ctx).await.unwrap();
        assert!(matches!(outcome, HookOutcome::Interrupted { .. }));
    }

    #[tokio::test]
    async fn keyword_hook_continues_without_match() {
        let hook = KeywordInterruptHook::new(["spam"]);
        let messages: Vec<Arc<dyn InboundMessage>> = vec![Arc::new(Msg("hello"))];
        let ctx = HookContext {
            user_id: "u1",
            messages: &messages,
            batch_size: messages.len(),
            attempt: 0,
            is_retry: false,
            started_at: std::time::Instant::now(),
            outcome: None,
        };
        let outcome = hook.inspect(&ctx).await.unwrap();
        assert_eq!(outcome, HookOutcome::Continue);
    }

    #[tokio::test]
    async fn in_memory_store_remembers_marked_messages() {
        let store = InMemoryMessageStore::new();
        assert!(!store.has_processed("u1", "m1").await.unwrap());
        store.mark_processed("u1", "m1").await.unwrap();
        assert!(store.has_processed("u1", "m1").await.unwrap());
    }
}
