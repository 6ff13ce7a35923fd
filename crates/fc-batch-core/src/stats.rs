//! Point-in-time service statistics.
//!
//! Mirrors the shape of this codebase's `DistributorStats`: a small,
//! `Default`-derived, `Clone`-able snapshot struct produced on demand by
//! [`crate::service::BatchingService::stats`] rather than pushed anywhere.

use serde::Serialize;

/// A snapshot of engine-wide counters at the moment it was requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    /// Users with at least one buffered message or an in-flight dispatch.
    pub active_users: usize,
    /// Total messages currently buffered across all users.
    pub pending_messages: usize,
    /// Users with a dispatch attempt currently in progress.
    pub dispatches_in_flight: usize,
    /// Messages dropped by the backpressure policy since startup.
    pub dropped_messages: u64,
    /// Batches handed to the dead letter handler since startup.
    pub dlq_invocations: u64,
}
