//! Pre- and post-dispatch hook chains.
//!
//! Pre-hooks run in registration order against a batch immediately before
//! every dispatch attempt, including retries. A hook can inspect the batch
//! and cooperatively interrupt dispatch (say, a keyword trigger that should
//! stop an automated flow before it fires). Post-hooks run once after a
//! dispatch attempt completes, regardless of outcome, and cannot interrupt
//! anything — they exist for side effects (metrics, audit logging), not
//! control flow. A hook that panics or returns an error is logged and
//! treated as if it had returned [`HookOutcome::Continue`] (pre) or simply
//! completed (post) — a misbehaving hook must never take down a user's
//! batch.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use fc_batch_common::InboundMessage;

/// What a hook decided after inspecting a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// Proceed to the next hook, or to dispatch if this was the last one.
    Continue,
    /// Stop the chain; the batch is not dispatched. `reason` is recorded in
    /// the emitted log and handed to the caller via [`crate::stats::ServiceStats`].
    Interrupted { reason: String },
}

/// Everything a hook needs to make its decision.
///
/// `outcome` is `None` for pre-hooks (the attempt hasn't happened yet) and
/// `Some(succeeded)` for post-hooks, reporting whether the attempt that just
/// ran succeeded.
pub struct HookContext<'a> {
    pub user_id: &'a str,
    pub messages: &'a [Arc<dyn InboundMessage>],
    pub batch_size: usize,
    /// 0-indexed; 0 is the first attempt, not a retry.
    pub attempt: u32,
    pub is_retry: bool,
    pub started_at: Instant,
    pub outcome: Option<bool>,
}

impl<'a> HookContext<'a> {
    fn new_pre(user_id: &'a str, messages: &'a [Arc<dyn InboundMessage>], attempt: u32, started_at: Instant) -> Self {
        Self {
            user_id,
            messages,
            batch_size: messages.len(),
            attempt,
            is_retry: attempt > 0,
            started_at,
            outcome: None,
        }
    }

    fn new_post(
        user_id: &'a str,
        messages: &'a [Arc<dyn InboundMessage>],
        attempt: u32,
        started_at: Instant,
        succeeded: bool,
    ) -> Self {
        Self {
            user_id,
            messages,
            batch_size: messages.len(),
            attempt,
            is_retry: attempt > 0,
            started_at,
            outcome: Some(succeeded),
        }
    }
}

/// A single pre-dispatch inspection step.
#[async_trait]
pub trait ProcessingHook: Send + Sync {
    /// Short, stable name used in logs when this hook interrupts or errors.
    fn name(&self) -> &str;

    async fn inspect(&self, ctx: &HookContext<'_>) -> anyhow::Result<HookOutcome>;
}

/// A hook that runs once a dispatch attempt has finished. Cannot interrupt.
#[async_trait]
pub trait PostHook: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &HookContext<'_>) -> anyhow::Result<()>;
}

/// An ordered sequence of pre-dispatch hooks, run before every attempt.
pub struct HookChain {
    hooks: Vec<Arc<dyn ProcessingHook>>,
}

impl HookChain {
    pub fn new(hooks: Vec<Arc<dyn ProcessingHook>>) -> Self {
        Self { hooks }
    }

    pub fn empty() -> Self {
        Self { hooks: Vec::new() }
    }

    pub(crate) async fn run_pre(
        &self,
        user_id: &str,
        messages: &[Arc<dyn InboundMessage>],
        attempt: u32,
        started_at: Instant,
    ) -> HookOutcome {
        let ctx = HookContext::new_pre(user_id, messages, attempt, started_at);
        self.run(&ctx).await
    }

    /// Run the chain directly against a caller-built context. Used by tests
    /// and by [`HookChain::run_pre`].
    pub async fn run(&self, ctx: &HookContext<'_>) -> HookOutcome {
        for hook in &self.hooks {
            match hook.inspect(ctx).await {
                Ok(HookOutcome::Continue) => continue,
                Ok(interrupted @ HookOutcome::Interrupted { .. }) => {
                    tracing::info!(
                        user_id = ctx.user_id,
                        hook = hook.name(),
                        "dispatch interrupted by hook"
                    );
                    return interrupted;
                }
                Err(err) => {
                    tracing::warn!(
                        user_id = ctx.user_id,
                        hook = hook.name(),
                        error = %err,
                        "hook errored, treating as continue"
                    );
                }
            }
        }
        HookOutcome::Continue
    }
}

/// An ordered sequence of post-dispatch hooks. Errors are logged and
/// swallowed; there is nothing to interrupt since dispatch already happened.
pub struct PostHookChain {
    hooks: Vec<Arc<dyn PostHook>>,
}

impl PostHookChain {
    pub fn new(hooks: Vec<Arc<dyn PostHook>>) -> Self {
        Self { hooks }
    }

    pub fn empty() -> Self {
        Self { hooks: Vec::new() }
    }

    pub(crate) async fn run_post(
        &self,
        user_id: &str,
        messages: &[Arc<dyn InboundMessage>],
        attempt: u32,
        started_at: Instant,
        succeeded: bool,
    ) {
        let ctx = HookContext::new_post(user_id, messages, attempt, started_at, succeeded);
        for hook in &self.hooks {
            if let Err(err) = hook.run(&ctx).await {
                tracing::warn!(user_id, hook = hook.name(), error = %err, "post-hook errored");
            }
        }
    }
}
