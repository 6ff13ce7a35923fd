//! Dispatch, retry and dead-letter collaborators.
//!
//! `DispatchResult` and the retry/backoff shape follow this codebase's
//! `BatchMessageDispatcher`/`DispatchResult` pair in the outbox crate;
//! the difference is the unit of work here is a whole per-user batch, and
//! a batch that exhausts its retry budget is handed to a
//! [`DeadLetterHandler`] instead of being requeued indefinitely.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fc_batch_common::InboundMessage;
use rand::Rng;

use crate::config::ErrorHandlingConfig;
use crate::hooks::{HookChain, HookOutcome};

/// The outcome of handing one batch to a [`MessageProcessor`].
#[derive(Debug)]
pub enum DispatchResult {
    Success,
    Failure { error: String, retryable: bool },
}

/// User code that actually does something with a batch of messages.
///
/// `attempt` is 0-indexed (0 is the first attempt, not a retry) and mirrors
/// the attempt number a hook sees for the same call. This is the only
/// required collaborator: everything else (hooks, dedup, a dead letter
/// sink) has a no-op default available via the reference harness in
/// [`crate::harness`].
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn process(&self, user_id: &str, messages: &[Arc<dyn InboundMessage>], attempt: u32) -> DispatchResult;
}

/// Sink for batches that exhausted their retry budget, or that remained
/// buffered when [`crate::service::BatchingService::shutdown`] was called.
#[async_trait]
pub trait DeadLetterHandler: Send + Sync {
    async fn handle(&self, user_id: &str, messages: &[Arc<dyn InboundMessage>], reason: &str);
}

/// Computes the exponential backoff delay for a given retry attempt.
///
/// `attempt` is 1-based (the delay before the *first* retry, i.e. after
/// the first failed attempt, is `attempt = 1`). The base delay doubles
/// each attempt (fixed multiplier of 2.0) and is jittered by +/-20% to
/// avoid synchronized retry storms across users.
pub fn backoff_delay(config: &ErrorHandlingConfig, attempt: u32) -> Duration {
    let multiplier = 2f64.powi(attempt.saturating_sub(1) as i32);
    let base_ms = config.retry_delay.as_millis() as f64 * multiplier;

    let jitter_fraction = rand::rng().random_range(-0.2..=0.2);
    let jittered_ms = (base_ms * (1.0 + jitter_fraction)).max(0.0);

    Duration::from_millis(jittered_ms as u64)
}

/// What became of a batch after it was run through the retry budget.
#[derive(Debug)]
pub enum RetryOutcome {
    Success,
    /// A pre-hook interrupted dispatch before any attempt that would have
    /// counted against the retry budget.
    Interrupted { reason: String },
    /// The retry budget was exhausted, or the processor reported a
    /// non-retryable failure.
    Exhausted { error: String },
}

/// Runs a batch through the configured retry budget against a
/// [`MessageProcessor`], re-running `pre_hooks` before every attempt
/// (including retries) and sleeping between attempts with [`backoff_delay`].
pub async fn dispatch_with_retries(
    processor: &dyn MessageProcessor,
    config: &ErrorHandlingConfig,
    pre_hooks: &HookChain,
    user_id: &str,
    messages: &[Arc<dyn InboundMessage>],
) -> RetryOutcome {
    let started_at = Instant::now();
    let mut attempt = 0u32;
    loop {
        if let HookOutcome::Interrupted { reason } = pre_hooks.run_pre(user_id, messages, attempt, started_at).await {
            return RetryOutcome::Interrupted { reason };
        }

        match processor.process(user_id, messages, attempt).await {
            DispatchResult::Success => return RetryOutcome::Success,
            DispatchResult::Failure { error, retryable } => {
                if !retryable || attempt >= config.max_retries {
                    return RetryOutcome::Exhausted { error };
                }
                attempt += 1;
                let delay = backoff_delay(config, attempt);
                tracing::warn!(
                    user_id,
                    attempt,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "dispatch failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Msg;
    impl InboundMessage for Msg {
        fn message_id(&self) -> &str {
            "m1"
        }
        fn user_id(&self) -> &str {
            "u1"
        }
    }

    struct FlakyProcessor {
        fail_times: AtomicU32,
    }

    #[async_trait]
    impl MessageProcessor for FlakyProcessor {
        async fn process(&self, _user_id: &str, _messages: &[Arc<dyn InboundMessage>], _attempt: u32) -> DispatchResult {
            let remaining = self.fail_times.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                DispatchResult::Failure {
                    error: "transient".into(),
                    retryable: true,
                }
            } else {
                DispatchResult::Success
            }
        }
    }

    struct AlwaysFails;
    #[async_trait]
    impl MessageProcessor for AlwaysFails {
        async fn process(&self, _user_id: &str, _messages: &[Arc<dyn InboundMessage>], _attempt: u32) -> DispatchResult {
            DispatchResult::Failure {
                error: "permanent".into(),
                retryable: true,
            }
        }
    }

    struct NonRetryable;
    #[async_trait]
    impl MessageProcessor for NonRetryable {
        async fn process(&self, _user_id: &str, _messages: &[Arc<dyn InboundMessage>], _attempt: u32) -> DispatchResult {
            DispatchResult::Failure {
                error: "fatal".into(),
                retryable: false,
            }
        }
    }

    fn config(max_retries: u32) -> ErrorHandlingConfig {
        ErrorHandlingConfig {
            max_retries,
            retry_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures_within_budget() {
        let processor = FlakyProcessor {
            fail_times: AtomicU32::new(2),
        };
        let messages: Vec<Arc<dyn InboundMessage>> = vec![Arc::new(Msg)];
        let result = dispatch_with_retries(&processor, &config(3), &HookChain::empty(), "u1", &messages).await;
        assert!(matches!(result, RetryOutcome::Success));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_budget_and_returns_error() {
        let processor = AlwaysFails;
        let messages: Vec<Arc<dyn InboundMessage>> = vec![Arc::new(Msg)];
        let result = dispatch_with_retries(&processor, &config(2), &HookChain::empty(), "u1", &messages).await;
        assert!(matches!(result, RetryOutcome::Exhausted { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_failure_skips_remaining_budget() {
        let processor = NonRetryable;
        let messages: Vec<Arc<dyn InboundMessage>> = vec![Arc::new(Msg)];
        let result = dispatch_with_retries(&processor, &config(5), &HookChain::empty(), "u1", &messages).await;
        assert!(matches!(result, RetryOutcome::Exhausted { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn interrupting_hook_stops_before_first_attempt() {
        use crate::hooks::{HookContext, ProcessingHook};

        struct Interrupter;
        #[async_trait]
        impl ProcessingHook for Interrupter {
            fn name(&self) -> &str {
                "interrupter"
            }
            async fn inspect(&self, _ctx: &HookContext<'_>) -> anyhow::Result<HookOutcome> {
                Ok(HookOutcome::Interrupted {
                    reason: "moderation".into(),
                })
            }
        }

        let processor = AlwaysFails;
        let messages: Vec<Arc<dyn InboundMessage>> = vec![Arc::new(Msg)];
        let hooks = HookChain::new(vec![Arc::new(Interrupter)]);
        let result = dispatch_with_retries(&processor, &config(5), &hooks, "u1", &messages).await;
        assert!(matches!(result, RetryOutcome::Interrupted { .. }));
    }

    #[test]
    fn backoff_delay_doubles_each_attempt_within_jitter_bounds() {
        let cfg = config(5);
        for attempt in 1..=4 {
            let delay = backoff_delay(&cfg, attempt).as_millis() as f64;
            let expected = cfg.retry_delay.as_millis() as f64 * 2f64.powi(attempt as i32 - 1);
            assert!(delay >= expected * 0.8 - 1.0);
            assert!(delay <= expected * 1.2 + 1.0);
        }
    }
}
