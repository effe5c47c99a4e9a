//! Per-chain rate limiting for the search API
//!
//! Limiting is reactive: a chain's limiter only starts throttling after
//! that deployment has answered with a 429. Each chain is a separate
//! upstream deployment with its own quota.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;

use crate::models::ChainId;

/// Rate limiter state for a single chain.
pub struct ChainRateLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    active: AtomicBool,
    chain: ChainId,
}

impl ChainRateLimiter {
    /// Create a limiter allowing `per_second` requests once active.
    pub fn new(chain: ChainId, per_second: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));

        Self {
            limiter: RateLimiter::direct(quota),
            active: AtomicBool::new(false),
            chain,
        }
    }

    /// Activate rate limiting for this chain.
    pub fn activate(&self) {
        let was_active = self.active.swap(true, Ordering::SeqCst);
        if !was_active {
            debug!("Rate limiting activated for {}", self.chain);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait for permission if rate limiting is active.
    pub async fn wait_if_active(&self) {
        if self.is_active() {
            debug!("Waiting for rate limiter on {}", self.chain);
            self.limiter.until_ready().await;
        }
    }
}

/// Rate limiters for every configured chain.
pub struct RateLimiterSet {
    limiters: HashMap<ChainId, ChainRateLimiter>,
}

impl RateLimiterSet {
    pub fn new<'a>(chains: impl IntoIterator<Item = &'a ChainId>, per_second: u32) -> Self {
        let limiters = chains
            .into_iter()
            .map(|chain| (chain.clone(), ChainRateLimiter::new(chain.clone(), per_second)))
            .collect();

        Self { limiters }
    }

    /// Wait for rate limit permission on a chain (if active).
    pub async fn wait_for(&self, chain: &ChainId) {
        if let Some(limiter) = self.limiters.get(chain) {
            limiter.wait_if_active().await;
        }
    }

    /// Activate rate limiting for a chain (called on 429).
    pub fn activate(&self, chain: &ChainId) {
        if let Some(limiter) = self.limiters.get(chain) {
            limiter.activate();
        }
    }

    pub fn is_active(&self, chain: &ChainId) -> bool {
        self.limiters.get(chain).is_some_and(ChainRateLimiter::is_active)
    }
}
