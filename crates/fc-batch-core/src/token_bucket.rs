//! Per-user token bucket rate limiting.
//!
//! Backed by `governor`, the same crate this codebase's `ProcessPool` uses
//! for its own throughput cap (`Quota::per_minute` over a direct
//! `RateLimiter`). That pool shares one limiter across the whole pool; this
//! engine hands every user their own, consistent with the rest of its
//! per-user sharding (each `UserState` owns its bucket the same way it owns
//! its buffer).

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::config::RateLimitConfig;

/// A single user's rate limit state: starts full, refills continuously at
/// `tokens_per_minute`, capped at `bucket_capacity`.
pub struct TokenBucket {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl TokenBucket {
    pub fn new(config: RateLimitConfig) -> Self {
        let per_minute = NonZeroU32::new(config.tokens_per_minute)
            .expect("tokens_per_minute validated to be >= 1 by BatchingConfig::new");
        let burst = NonZeroU32::new(config.bucket_capacity)
            .expect("bucket_capacity validated to be >= 1 by BatchingConfig::new");
        let quota = Quota::per_minute(per_minute).allow_burst(burst);
        Self {
            limiter: RateLimiter::direct(quota),
        }
    }

    /// Attempt to take one token. Returns `true` if a token was available
    /// and has been consumed.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}
