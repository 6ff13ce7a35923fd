//! Per-user message buffer.
//!
//! Each user owns exactly one [`UserBuffer`]. Admission policy
//! (what happens when the buffer is full) lives in [`crate::service`]; this
//! type only knows how to hold messages and hand back the whole batch when
//! asked, the same shape as this codebase's `GlobalBuffer`, narrowed to a
//! single owner instead of a globally shared queue.

use std::collections::VecDeque;
use std::sync::Arc;

use fc_batch_common::InboundMessage;

/// A FIFO queue of buffered messages for one user.
///
/// Holds messages only; which [`crate::config::BackpressureStrategy`] applies
/// when the buffer is full is decided by [`crate::service::BatchingService`],
/// which is the only caller that needs to weigh policy against the rest of a
/// user's state (rate limiter, in-flight flag) under the same lock.
pub struct UserBuffer {
    messages: VecDeque<Arc<dyn InboundMessage>>,
    max_size: usize,
}

impl UserBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(max_size.min(64)),
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append unconditionally. Callers are expected to have already
    /// resolved any backpressure decision (eviction, rejection) before
    /// calling this.
    pub fn push(&mut self, message: Arc<dyn InboundMessage>) {
        self.messages.push_back(message);
    }

    /// Evict and return the oldest buffered message, if any.
    pub fn pop_oldest(&mut self) -> Option<Arc<dyn InboundMessage>> {
        self.messages.pop_front()
    }

    /// Drain the entire buffer, in FIFO order, leaving it empty. Anything
    /// admitted after this call accumulates into what is effectively the
    /// next batch generation, with no extra bookkeeping required.
    pub fn drain_all(&mut self) -> Vec<Arc<dyn InboundMessage>> {
        self.messages.drain(..).collect()
    }
}
