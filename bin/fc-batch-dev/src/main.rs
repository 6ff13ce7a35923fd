//! FlowCatalyst Batch Engine Dev Harness
//!
//! Stands up a [`fc_batch_core::BatchingService`] wired entirely to the
//! in-memory reference collaborators in `fc_batch_core::harness` and drives
//! it with synthetic per-user traffic, the same shape as `fc-dev`'s
//! all-in-one monolith but scoped to the one component this repository
//! actually owns: transports, real processors and real dedup stores are out
//! of scope here (see the crate's spec) and are left to the embedding
//! application.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rand::Rng;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;

use fc_batch_core::harness::{EchoProcessor, InMemoryMessageStore, KeywordInterruptHook, LoggingDeadLetterHandler};
use fc_batch_core::{BackpressureStrategy, BatchingConfig, BatchingService, HookChain, PostHookChain, RawBatchingConfig};
use fc_batch_common::InboundMessage;

/// FlowCatalyst Batching Engine Dev Harness
#[derive(Parser, Debug)]
#[command(name = "fc-batch-dev")]
#[command(about = "Drives the per-user batching engine with synthetic traffic for local exploration")]
struct Args {
    /// Number of simulated concurrent users.
    #[arg(long, env = "FC_BATCH_DEV_USERS", default_value = "5")]
    users: u32,

    /// Mean delay between two messages from the same simulated user, in milliseconds.
    #[arg(long, env = "FC_BATCH_DEV_MESSAGE_INTERVAL_MS", default_value = "150")]
    message_interval_ms: u64,

    /// How often to print a stats snapshot, in milliseconds.
    #[arg(long, env = "FC_BATCH_DEV_STATS_INTERVAL_MS", default_value = "2000")]
    stats_interval_ms: u64,

    /// Silence threshold for the batching config, in milliseconds.
    #[arg(long, env = "FC_BATCH_DEV_SILENCE_MS", default_value = "500")]
    silence_ms: u64,

    /// Adaptive timeout for the batching config, in milliseconds.
    #[arg(long, env = "FC_BATCH_DEV_ADAPTIVE_MS", default_value = "3000")]
    adaptive_ms: u64,

    /// Max buffered messages per user before the backpressure strategy kicks in.
    #[arg(long, env = "FC_BATCH_DEV_MAX_BUFFER", default_value = "20")]
    max_buffer: usize,

    /// One of DROP_NEW, DROP_OLDEST, REJECT_WITH_NOTIFICATION, BLOCK_UNTIL_SPACE, FLUSH_AND_ACCEPT.
    #[arg(long, env = "FC_BATCH_DEV_BACKPRESSURE", default_value = "DROP_OLDEST")]
    backpressure: String,

    /// Fraction (0.0..=1.0) of synthetic messages whose id contains "spam",
    /// triggering the demo moderation hook's interruption.
    #[arg(long, env = "FC_BATCH_DEV_SPAM_RATE", default_value = "0.05")]
    spam_rate: f64,
}

#[derive(Debug)]
struct DevMessage {
    message_id: String,
    user_id: String,
}

impl InboundMessage for DevMessage {
    fn message_id(&self) -> &str {
        &self.message_id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }
}

fn parse_backpressure(value: &str) -> Result<BackpressureStrategy> {
    match value.to_uppercase().as_str() {
        "DROP_NEW" => Ok(BackpressureStrategy::DropNew),
        "DROP_OLDEST" => Ok(BackpressureStrategy::DropOldest),
        "REJECT_WITH_NOTIFICATION" => Ok(BackpressureStrategy::RejectWithNotification),
        "BLOCK_UNTIL_SPACE" => Ok(BackpressureStrategy::BlockUntilSpace),
        "FLUSH_AND_ACCEPT" => Ok(BackpressureStrategy::FlushAndAccept),
        other => anyhow::bail!("unrecognized backpressure strategy {other:?}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fc_batch_common::logging::init_logging("fc-batch-dev");

    let args = Args::parse();
    info!(
        users = args.users,
        backpressure = %args.backpressure,
        "Starting FlowCatalyst batching engine dev harness"
    );

    let backpressure_strategy = parse_backpressure(&args.backpressure)?;
    let config = BatchingConfig::new(RawBatchingConfig {
        adaptive_timeout: Duration::from_millis(args.adaptive_ms),
        silence_threshold: Duration::from_millis(args.silence_ms),
        max_buffer_size: args.max_buffer,
        backpressure_strategy,
        block_timeout: Duration::from_secs(5),
        ..Default::default()
    })?;

    let processor = Arc::new(EchoProcessor::new());
    let dedup_store = Arc::new(InMemoryMessageStore::new());
    let pre_hooks = HookChain::new(vec![Arc::new(KeywordInterruptHook::new(["spam"]))]);
    let post_hooks = PostHookChain::empty();
    let dlq = Arc::new(LoggingDeadLetterHandler);

    let service = Arc::new(BatchingService::new(config, processor.clone(), dedup_store, pre_hooks, post_hooks, dlq));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let message_counter = Arc::new(AtomicU64::new(0));

    let mut generator_handles = Vec::with_capacity(args.users as usize);
    for user_index in 0..args.users {
        let service = Arc::clone(&service);
        let counter = Arc::clone(&message_counter);
        let mut shutdown_rx = shutdown_tx.subscribe();
        let interval = args.message_interval_ms;
        let spam_rate = args.spam_rate;

        generator_handles.push(tokio::spawn(async move {
            let user_id = format!("dev-user-{user_index}");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => return,
                    _ = tokio::time::sleep(jittered_interval(interval)) => {}
                }

                let sequence = counter.fetch_add(1, Ordering::Relaxed);
                let is_spam = rand::rng().random_bool(spam_rate.clamp(0.0, 1.0));
                let message_id = if is_spam {
                    format!("spam-{sequence}")
                } else {
                    format!("msg-{sequence}")
                };

                let message = Arc::new(DevMessage {
                    message_id,
                    user_id: user_id.clone(),
                });

                if let Err(err) = service.receive_message(&user_id, message).await {
                    tracing::warn!(user_id = %user_id, error = %err, "receive_message failed");
                }
            }
        }));
    }

    let stats_handle = {
        let service = Arc::clone(&service);
        let mut shutdown_rx = shutdown_tx.subscribe();
        let interval = args.stats_interval_ms;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => return,
                    _ = tokio::time::sleep(Duration::from_millis(interval)) => {}
                }
                let stats = service.stats();
                info!(
                    active_users = stats.active_users,
                    pending_messages = stats.pending_messages,
                    dispatches_in_flight = stats.dispatches_in_flight,
                    dropped_messages = stats.dropped_messages,
                    dlq_invocations = stats.dlq_invocations,
                    batches_echoed = processor.batches_handled(),
                    "stats snapshot"
                );
            }
        })
    };

    info!("Dev harness running. Press Ctrl+C to shut down.");
    shutdown_signal().await;
    info!("Shutdown signal received, draining in-flight dispatches...");

    let _ = shutdown_tx.send(());
    for handle in generator_handles {
        let _ = handle.await;
    }
    let _ = stats_handle.await;

    service.shutdown().await?;
    info!("FlowCatalyst batching engine dev harness shut down cleanly");
    Ok(())
}

fn jittered_interval(base_ms: u64) -> Duration {
    let jitter = rand::rng().random_range(0.5..1.5);
    Duration::from_millis(((base_ms as f64) * jitter) as u64)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
