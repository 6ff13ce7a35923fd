//! The batching engine facade.
//!
//! `BatchingService` is the one type applications construct and hold on to.
//! It owns one [`UserEntry`] per user behind a `DashMap` — the same
//! sharded-concurrent-map idiom this codebase's `QueueManager` uses for its
//! per-destination pools — and spawns one long-lived scheduler task per
//! user that owns that user's adaptive/silence timer, the same "one task
//! per key, woken by a notify, re-checks state under the lock before
//! acting" shape as `MessageGroupProcessor::run`. Admission
//! (`receive_message`) and timer firing (the scheduler task) are the only
//! two places that ever touch a user's buffer, and both go through the
//! same per-user `parking_lot::Mutex` — never held across an `.await`.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use fc_batch_common::InboundMessage;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::buffer::UserBuffer;
use crate::config::{BackpressureStrategy, BatchingConfig};
use crate::dedup::{DedupGate, MessageStore};
use crate::error::{EngineError, Result};
use crate::hooks::{HookChain, HookOutcome, PostHookChain};
use crate::retry::{dispatch_with_retries, DeadLetterHandler, MessageProcessor, RetryOutcome};
use crate::stats::ServiceStats;
use crate::token_bucket::TokenBucket;

struct UserState {
    buffer: UserBuffer,
    bucket: TokenBucket,
    first_arrival: Option<tokio::time::Instant>,
    last_arrival: Option<tokio::time::Instant>,
    in_flight: bool,
}

struct UserEntry {
    state: Mutex<UserState>,
    /// Woken whenever something the scheduler loop cares about changes:
    /// a message was admitted, a flush happened, or shutdown began.
    scheduler_wake: Notify,
}

impl UserEntry {
    fn new(config: &BatchingConfig) -> Self {
        Self {
            state: Mutex::new(UserState {
                buffer: UserBuffer::new(config.max_buffer_size()),
                bucket: TokenBucket::new(config.rate_limit()),
                first_arrival: None,
                last_arrival: None,
                in_flight: false,
            }),
            scheduler_wake: Notify::new(),
        }
    }
}

fn push_and_arm(state: &mut UserState, message: Arc<dyn InboundMessage>, now: tokio::time::Instant) {
    if state.buffer.is_empty() {
        state.first_arrival = Some(now);
    }
    state.last_arrival = Some(now);
    state.buffer.push(message);
}

enum AdmitDecision {
    Accepted,
    AcceptedDroppedOldest,
    Rejected,
    RejectedWithNotification,
    /// Buffer is over capacity under a strategy that needs the caller to
    /// wait and retry admission; bounded by `block_timeout`.
    NeedsWait,
    /// Buffer was flushed synchronously; caller owns `Vec` and must spawn
    /// the dispatch itself, then treat the new message as accepted.
    FlushThenAccept(Vec<Arc<dyn InboundMessage>>),
}

/// The per-user message batching/dispatch engine.
///
/// Construct with [`BatchingService::new`], call [`BatchingService::receive_message`]
/// for every inbound message, and [`BatchingService::shutdown`] once, before
/// dropping the service.
pub struct BatchingService {
    config: BatchingConfig,
    users: Arc<DashMap<String, Arc<UserEntry>>>,
    scheduler_tasks: Arc<DashMap<String, JoinHandle<()>>>,
    processor: Arc<dyn MessageProcessor>,
    dedup: DedupGate,
    pre_hooks: Arc<HookChain>,
    post_hooks: Arc<PostHookChain>,
    dlq: Arc<dyn DeadLetterHandler>,
    dropped_messages: AtomicU64,
    dlq_invocations: AtomicU64,
    dispatches_in_flight: AtomicUsize,
    shutting_down: AtomicBool,
}

impl BatchingService {
    pub fn new(
        config: BatchingConfig,
        processor: Arc<dyn MessageProcessor>,
        dedup_store: Arc<dyn MessageStore>,
        pre_hooks: HookChain,
        post_hooks: PostHookChain,
        dlq: Arc<dyn DeadLetterHandler>,
    ) -> Self {
        Self {
            config,
            users: Arc::new(DashMap::new()),
            scheduler_tasks: Arc::new(DashMap::new()),
            processor,
            dedup: DedupGate::new(dedup_store),
            pre_hooks: Arc::new(pre_hooks),
            post_hooks: Arc::new(post_hooks),
            dlq,
            dropped_messages: AtomicU64::new(0),
            dlq_invocations: AtomicU64::new(0),
            dispatches_in_flight: AtomicUsize::new(0),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Hand one message to the engine for `user_id`. Resolves dedup, rate
    /// limiting and backpressure before returning; the actual dispatch
    /// happens later, on this user's scheduler task.
    pub async fn receive_message(self: &Arc<Self>, user_id: &str, message: Arc<dyn InboundMessage>) -> Result<()> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(EngineError::ShutdownInProgress);
        }
        if user_id.is_empty() {
            return Err(EngineError::InputInvalid("user_id must not be empty".into()));
        }
        if message.message_id().is_empty() {
            return Err(EngineError::InputInvalid("message_id must not be empty".into()));
        }

        if self.dedup.seen(user_id, message.message_id()).await {
            tracing::debug!(user_id, message_id = message.message_id(), "duplicate message dropped at ingress");
            return Ok(());
        }

        let entry = self.get_or_create_user(user_id);
        let wait_start = tokio::time::Instant::now();

        loop {
            let now = tokio::time::Instant::now();
            let decision = self.try_admit(&entry, message.clone(), now);

            match decision {
                AdmitDecision::Accepted => {
                    entry.scheduler_wake.notify_waiters();
                    return Ok(());
                }
                AdmitDecision::AcceptedDroppedOldest => {
                    self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                    entry.scheduler_wake.notify_waiters();
                    return Ok(());
                }
                AdmitDecision::Rejected => {
                    self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                AdmitDecision::RejectedWithNotification => {
                    self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(user_id, message_id = message.message_id(), "buffer full, rejecting with notification");
                    return Ok(());
                }
                AdmitDecision::FlushThenAccept(batch) => {
                    entry.scheduler_wake.notify_waiters();
                    self.spawn_dispatch(user_id, &entry, batch);
                    return Ok(());
                }
                AdmitDecision::NeedsWait => {
                    if wait_start.elapsed() >= self.config.block_timeout() {
                        return Err(EngineError::BlockTimeout {
                            user_id: user_id.to_string(),
                        });
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
        }
    }

    /// Point-in-time snapshot of engine-wide counters. O(users) — takes
    /// each user's lock briefly, never holds more than one at a time.
    pub fn stats(&self) -> ServiceStats {
        let mut active_users = 0usize;
        let mut pending_messages = 0usize;
        for entry in self.users.iter() {
            let state = entry.value().state.lock();
            if !state.buffer.is_empty() || state.in_flight {
                active_users += 1;
            }
            pending_messages += state.buffer.len();
        }
        ServiceStats {
            active_users,
            pending_messages,
            dispatches_in_flight: self.dispatches_in_flight.load(Ordering::Relaxed),
            dropped_messages: self.dropped_messages.load(Ordering::Relaxed),
            dlq_invocations: self.dlq_invocations.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting new messages, let any in-flight dispatch finish
    /// (bounded by `shutdown_grace`), then hand whatever is still buffered
    /// to the dead letter handler with reason `"shutdown"`.
    pub async fn shutdown(self: &Arc<Self>) -> Result<()> {
        self.shutting_down.store(true, Ordering::Release);
        for entry in self.users.iter() {
            entry.value().scheduler_wake.notify_waiters();
        }

        let deadline = tokio::time::Instant::now() + self.config.shutdown_grace();
        while self.dispatches_in_flight.load(Ordering::Acquire) > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        for task in self.scheduler_tasks.iter() {
            task.value().abort();
        }
        self.scheduler_tasks.clear();

        for entry in self.users.iter() {
            let remaining: Vec<_> = {
                let mut state = entry.value().state.lock();
                state.buffer.drain_all()
            };
            if !remaining.is_empty() {
                self.dlq_invocations.fetch_add(1, Ordering::Relaxed);
                self.dlq.handle(entry.key(), &remaining, "shutdown").await;
            }
        }

        Ok(())
    }

    fn get_or_create_user(self: &Arc<Self>, user_id: &str) -> Arc<UserEntry> {
        let entry = Arc::clone(
            self.users
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(UserEntry::new(&self.config)))
                .value(),
        );

        self.scheduler_tasks.entry(user_id.to_string()).or_insert_with(|| {
            let service = Arc::clone(self);
            let uid = user_id.to_string();
            let entry_for_task = Arc::clone(&entry);
            tokio::spawn(async move { service.scheduler_loop(uid, entry_for_task).await })
        });

        entry
    }

    /// Resolve admission for `message` against the current buffer state.
    /// The rate limiter is only ever consulted on the path that would
    /// otherwise accept the message outright — a message that has nowhere
    /// to go regardless of rate limit (buffer full under
    /// `BLOCK_UNTIL_SPACE`, a flush already in flight under
    /// `FLUSH_AND_ACCEPT`) never burns a token it can't use.
    fn try_admit(&self, entry: &UserEntry, message: Arc<dyn InboundMessage>, now: tokio::time::Instant) -> AdmitDecision {
        let mut state = entry.state.lock();
        if state.buffer.len() < self.config.max_buffer_size() {
            if !state.bucket.try_acquire() {
                return self.resolve_over_capacity(&mut state, message, now);
            }
            push_and_arm(&mut state, message, now);
            return AdmitDecision::Accepted;
        }

        self.resolve_over_capacity(&mut state, message, now)
    }

    /// Apply the configured backpressure strategy once a message cannot be
    /// admitted outright — either the buffer is full or the rate limiter
    /// denied it. Never touches the token bucket: a message handled here
    /// was never going to consume a token either way.
    fn resolve_over_capacity(&self, state: &mut UserState, message: Arc<dyn InboundMessage>, now: tokio::time::Instant) -> AdmitDecision {
        match self.config.backpressure_strategy() {
            BackpressureStrategy::DropNew => AdmitDecision::Rejected,
            BackpressureStrategy::DropOldest => {
                state.buffer.pop_oldest();
                push_and_arm(state, message, now);
                AdmitDecision::AcceptedDroppedOldest
            }
            BackpressureStrategy::RejectWithNotification => AdmitDecision::RejectedWithNotification,
            BackpressureStrategy::BlockUntilSpace => AdmitDecision::NeedsWait,
            BackpressureStrategy::FlushAndAccept => {
                if state.in_flight {
                    // A dispatch is already draining this user; there is
                    // nothing further to flush until it completes.
                    AdmitDecision::NeedsWait
                } else {
                    let batch: Vec<_> = state.buffer.drain_all();
                    state.in_flight = true;
                    state.first_arrival = None;
                    push_and_arm(state, message, now);
                    AdmitDecision::FlushThenAccept(batch)
                }
            }
        }
    }

    fn effective_deadline(&self, state: &UserState) -> tokio::time::Instant {
        let silence = state.last_arrival.expect("deadline computed only on a non-empty buffer") + self.config.silence_threshold();
        match state.first_arrival {
            Some(first) => silence.min(first + self.config.adaptive_timeout()),
            None => silence,
        }
    }

    async fn scheduler_loop(self: Arc<Self>, user_id: String, entry: Arc<UserEntry>) {
        loop {
            if self.shutting_down.load(Ordering::Acquire) {
                return;
            }

            let wait_until = {
                let state = entry.state.lock();
                if state.in_flight || state.buffer.is_empty() {
                    None
                } else {
                    Some(self.effective_deadline(&state))
                }
            };

            match wait_until {
                Some(deadline) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(deadline) => {
                            self.try_dispatch(&user_id, &entry).await;
                        }
                        _ = entry.scheduler_wake.notified() => {}
                    }
                }
                None => entry.scheduler_wake.notified().await,
            }
        }
    }

    /// Called when a user's timer fires. Re-checks the buffer under the
    /// lock before committing to a dispatch: the deadline may have moved,
    /// or another path (`FLUSH_AND_ACCEPT`) may already have drained it.
    async fn try_dispatch(self: &Arc<Self>, user_id: &str, entry: &Arc<UserEntry>) {
        let batch = {
            let mut state = entry.state.lock();
            if state.in_flight || state.buffer.is_empty() {
                return;
            }
            if self.effective_deadline(&state) > tokio::time::Instant::now() {
                return;
            }
            state.in_flight = true;
            state.first_arrival = None;
            state.buffer.drain_all()
        };
        self.spawn_dispatch(user_id, entry, batch);
    }

    /// Run a dispatch on its own task, isolated from the caller. The
    /// per-user scheduler loop never awaits dispatch work directly: a
    /// panic inside a user-supplied processor, hook or DLQ handler is
    /// caught by the task boundary instead of unwinding through the one
    /// long-lived task that owns this user's timers.
    fn spawn_dispatch(self: &Arc<Self>, user_id: &str, entry: &Arc<UserEntry>, batch: Vec<Arc<dyn InboundMessage>>) {
        let service = Arc::clone(self);
        let uid = user_id.to_string();
        let entry = Arc::clone(entry);
        tokio::spawn(async move {
            service.run_dispatch(&uid, &entry, batch).await;
        });
    }

    async fn run_dispatch(self: &Arc<Self>, user_id: &str, entry: &Arc<UserEntry>, batch: Vec<Arc<dyn InboundMessage>>) {
        self.dispatches_in_flight.fetch_add(1, Ordering::Relaxed);
        // Held for the rest of this function; its `Drop` clears `in_flight`,
        // wakes the scheduler and decrements the in-flight counter exactly
        // once, whether this function returns normally or a collaborator
        // below panics and unwinds through it.
        let _guard = DispatchGuard {
            service: self.as_ref(),
            entry: entry.as_ref(),
            user_id,
        };

        let outcome = dispatch_with_retries(
            self.processor.as_ref(),
            &self.config.error_handling(),
            &self.pre_hooks,
            user_id,
            &batch,
        )
        .await;

        let started_at = std::time::Instant::now();
        match outcome {
            RetryOutcome::Interrupted { reason } => {
                tracing::info!(user_id, reason = %reason, batch_size = batch.len(), "batch discarded by hook interruption");
            }
            RetryOutcome::Success => {
                for message in &batch {
                    self.dedup.commit(user_id, message.message_id()).await;
                }
                self.post_hooks.run_post(user_id, &batch, 0, started_at, true).await;
            }
            RetryOutcome::Exhausted { error } => {
                self.dlq_invocations.fetch_add(1, Ordering::Relaxed);
                self.dlq.handle(user_id, &batch, &error).await;
                self.post_hooks.run_post(user_id, &batch, 0, started_at, false).await;
            }
        }
    }
}

/// Restores a user's dispatch-related state when a [`BatchingService::run_dispatch`]
/// call ends, successfully or otherwise. `std::thread::panicking` lets the
/// same cleanup path log the abnormal case without needing a second,
/// duplicate recovery branch at the `tokio::spawn` boundary.
struct DispatchGuard<'a> {
    service: &'a BatchingService,
    entry: &'a UserEntry,
    user_id: &'a str,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!(user_id = self.user_id, "dispatch task panicked; user state recovered, scheduler will retry");
        }
        {
            let mut state = self.entry.state.lock();
            state.in_flight = false;
        }
        self.entry.scheduler_wake.notify_waiters();
        self.service.dispatches_in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BatchingConfig, RawBatchingConfig};
    use crate::dedup::MessageStore;
    use crate::retry::DispatchResult;
    use async_trait::async_trait;
    use dashmap::DashSet;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    #[derive(Debug)]
    struct Msg(&'static str, &'static str);
    impl InboundMessage for Msg {
        fn message_id(&self) -> &str {
            self.0
        }
        fn user_id(&self) -> &str {
            self.1
        }
    }

    struct NoopStore;
    #[async_trait]
    impl MessageStore for NoopStore {
        async fn has_processed(&self, _user_id: &str, _message_id: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
        async fn mark_processed(&self, _user_id: &str, _message_id: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct NoopDlq;
    #[async_trait]
    impl DeadLetterHandler for NoopDlq {
        async fn handle(&self, _user_id: &str, _messages: &[Arc<dyn InboundMessage>], _reason: &str) {}
    }

    struct RecordingProcessor {
        batches: Arc<DashSet<usize>>,
        call_count: Arc<StdAtomicUsize>,
    }
    #[async_trait]
    impl MessageProcessor for RecordingProcessor {
        async fn process(&self, _user_id: &str, messages: &[Arc<dyn InboundMessage>], _attempt: u32) -> DispatchResult {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.batches.insert(messages.len());
            DispatchResult::Success
        }
    }

    fn config_with(overrides: impl FnOnce(RawBatchingConfig) -> RawBatchingConfig) -> BatchingConfig {
        BatchingConfig::new(overrides(RawBatchingConfig::default())).unwrap()
    }

    fn service_with(
        config: BatchingConfig,
        processor: Arc<dyn MessageProcessor>,
    ) -> Arc<BatchingService> {
        Arc::new(BatchingService::new(
            config,
            processor,
            Arc::new(NoopStore),
            HookChain::empty(),
            PostHookChain::empty(),
            Arc::new(NoopDlq),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn silence_timer_fires_dispatch_after_idle_period() {
        let calls = Arc::new(StdAtomicUsize::new(0));
        let batches = Arc::new(DashSet::new());
        let processor = Arc::new(RecordingProcessor {
            batches: batches.clone(),
            call_count: calls.clone(),
        });
        let config = config_with(|mut raw| {
            raw.silence_threshold = Duration::from_millis(100);
            raw.adaptive_timeout = Duration::from_secs(10);
            raw
        });
        let service = service_with(config, processor);

        service
            .receive_message("u1", Arc::new(Msg("m1", "u1")))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(150)).await;
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(batches.contains(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn adaptive_timeout_caps_wait_despite_continuous_activity() {
        let calls = Arc::new(StdAtomicUsize::new(0));
        let processor = Arc::new(RecordingProcessor {
            batches: Arc::new(DashSet::new()),
            call_count: calls.clone(),
        });
        let config = config_with(|mut raw| {
            raw.silence_threshold = Duration::from_millis(100);
            raw.adaptive_timeout = Duration::from_millis(250);
            raw.rate_limit.bucket_capacity = 1000;
            raw.rate_limit.tokens_per_minute = 10_000;
            raw
        });
        let service = service_with(config, processor);

        service.receive_message("u1", Arc::new(Msg("m0", "u1"))).await.unwrap();
        for i in 0..10 {
            tokio::time::advance(Duration::from_millis(50)).await;
            tokio::task::yield_now().await;
            service
                .receive_message("u1", Arc::new(Msg(Box::leak(i.to_string().into_boxed_str()), "u1")))
                .await
                .unwrap();
        }

        tokio::time::advance(Duration::from_millis(300)).await;
        tokio::task::yield_now().await;

        assert!(calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_oldest_evicts_when_buffer_is_full() {
        let calls = Arc::new(StdAtomicUsize::new(0));
        let processor = Arc::new(RecordingProcessor {
            batches: Arc::new(DashSet::new()),
            call_count: calls.clone(),
        });
        let config = config_with(|mut raw| {
            raw.max_buffer_size = 2;
            raw.backpressure_strategy = BackpressureStrategy::DropOldest;
            raw.silence_threshold = Duration::from_secs(60);
            raw.adaptive_timeout = Duration::from_secs(60);
            raw
        });
        let service = service_with(config, processor);

        service.receive_message("u1", Arc::new(Msg("a", "u1"))).await.unwrap();
        service.receive_message("u1", Arc::new(Msg("b", "u1"))).await.unwrap();
        service.receive_message("u1", Arc::new(Msg("c", "u1"))).await.unwrap();

        let stats = service.stats();
        assert_eq!(stats.pending_messages, 2);
        assert_eq!(stats.dropped_messages, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_message_is_dropped_before_buffering() {
        struct AlreadySeenStore;
        #[async_trait]
        impl MessageStore for AlreadySeenStore {
            async fn has_processed(&self, _user_id: &str, _message_id: &str) -> anyhow::Result<bool> {
                Ok(true)
            }
            async fn mark_processed(&self, _user_id: &str, _message_id: &str) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let calls = Arc::new(StdAtomicUsize::new(0));
        let processor = Arc::new(RecordingProcessor {
            batches: Arc::new(DashSet::new()),
            call_count: calls.clone(),
        });
        let service = Arc::new(BatchingService::new(
            config_with(|raw| raw),
            processor,
            Arc::new(AlreadySeenStore),
            HookChain::empty(),
            PostHookChain::empty(),
            Arc::new(NoopDlq),
        ));

        service.receive_message("u1", Arc::new(Msg("dup", "u1"))).await.unwrap();
        assert_eq!(service.stats().pending_messages, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_rejects_new_messages_and_dlqs_remaining_buffer() {
        let calls = Arc::new(StdAtomicUsize::new(0));
        let processor = Arc::new(RecordingProcessor {
            batches: Arc::new(DashSet::new()),
            call_count: calls.clone(),
        });
        let config = config_with(|mut raw| {
            raw.silence_threshold = Duration::from_secs(60);
            raw.adaptive_timeout = Duration::from_secs(60);
            raw
        });
        let service = service_with(config, processor);

        service.receive_message("u1", Arc::new(Msg("a", "u1"))).await.unwrap();
        service.shutdown().await.unwrap();

        let err = service
            .receive_message("u1", Arc::new(Msg("b", "u1")))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::ShutdownInProgress);
    }

    #[tokio::test(start_paused = true)]
    async fn block_until_space_times_out_when_buffer_never_drains() {
        let calls = Arc::new(StdAtomicUsize::new(0));
        let processor = Arc::new(RecordingProcessor {
            batches: Arc::new(DashSet::new()),
            call_count: calls.clone(),
        });
        let config = config_with(|mut raw| {
            raw.max_buffer_size = 1;
            raw.backpressure_strategy = BackpressureStrategy::BlockUntilSpace;
            raw.block_timeout = Duration::from_millis(50);
            raw.silence_threshold = Duration::from_secs(60);
            raw.adaptive_timeout = Duration::from_secs(60);
            raw
        });
        let service = service_with(config, processor);

        service.receive_message("u1", Arc::new(Msg("a", "u1"))).await.unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            service.receive_message("u1", Arc::new(Msg("b", "u1"))),
        )
        .await
        .expect("receive_message should return within the outer test timeout");

        assert!(matches!(result, Err(EngineError::BlockTimeout { .. })));
    }
}
