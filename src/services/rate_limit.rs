// src/services/rate_limit.rs
//! In-memory fixed-window request limiter.
//!
//! Best-effort and single-process: counters live in a HashMap keyed by
//! `identifier:window_bucket`, reset on restart, and are not shared across
//! instances. Eviction of stale windows is probabilistic, so memory use is
//! only approximately bounded.

use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A named request quota: `max_requests` per fixed window.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitQuota {
    pub name: &'static str,
    pub window: Duration,
    pub max_requests: u32,
}

/// Per-endpoint-class quotas. Configuration only; the checking logic is
/// identical for all of them.
pub mod quotas {
    use super::RateLimitQuota;
    use std::time::Duration;

    pub const AI_GENERATION: RateLimitQuota = RateLimitQuota {
        name: "ai_generation",
        window: Duration::from_secs(60),
        max_requests: 5,
    };

    pub const PAYMENT: RateLimitQuota = RateLimitQuota {
        name: "payment",
        window: Duration::from_secs(60),
        max_requests: 10,
    };

    pub const GENERAL: RateLimitQuota = RateLimitQuota {
        name: "general",
        window: Duration::from_secs(60),
        max_requests: 30,
    };

    pub const WEBHOOK: RateLimitQuota = RateLimitQuota {
        name: "webhook",
        window: Duration::from_secs(60),
        max_requests: 100,
    };
}

/// Outcome of a limiter check.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Unix-epoch milliseconds at which the current window ends.
    pub reset_at_ms: u64,
    pub retry_after_secs: u32,
}

#[derive(Debug)]
struct WindowEntry {
    count: u32,
    reset_at_ms: u64,
    window_ms: u64,
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    entries: Arc<RwLock<HashMap<String, WindowEntry>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check and count a request against the quota.
    pub async fn check(&self, identifier: &str, quota: RateLimitQuota) -> RateLimitDecision {
        self.check_at(now_unix_ms(), identifier, quota).await
    }

    /// Clock-injected form of `check`, used directly by tests.
    pub async fn check_at(
        &self,
        now_ms: u64,
        identifier: &str,
        quota: RateLimitQuota,
    ) -> RateLimitDecision {
        let window_ms = quota.window.as_millis() as u64;
        let bucket = now_ms / window_ms;
        let key = format!("{}:{}", identifier, bucket);
        let reset_at_ms = (bucket + 1) * window_ms;

        let decision = {
            let mut entries = self.entries.write().await;
            let entry = entries.entry(key).or_insert(WindowEntry {
                count: 0,
                reset_at_ms,
                window_ms,
            });
            entry.count += 1;

            let allowed = entry.count <= quota.max_requests;
            let remaining = quota.max_requests.saturating_sub(entry.count);
            let retry_after_secs = (reset_at_ms.saturating_sub(now_ms)).div_ceil(1000) as u32;

            RateLimitDecision {
                allowed,
                remaining,
                reset_at_ms,
                retry_after_secs,
            }
        };

        if !decision.allowed {
            warn!(
                identifier = %identifier,
                quota = quota.name,
                "Rate limit exceeded"
            );
        }

        // Opportunistic cleanup: roughly one call in a hundred pays the
        // sweep cost. Stale entries can therefore linger, and adversarial
        // identifier cardinality has no hard memory cap.
        if rand::thread_rng().gen_ratio(1, 100) {
            self.sweep_expired(now_ms).await;
        }

        decision
    }

    /// Drop entries whose window ended more than one extra window ago.
    pub async fn sweep_expired(&self, now_ms: u64) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| now_ms <= e.reset_at_ms + e.window_ms);
        let swept = before - entries.len();
        if swept > 0 {
            debug!(swept = swept, "Swept expired rate limit windows");
        }
    }

    #[cfg(test)]
    async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000_000;

    #[tokio::test]
    async fn allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new();
        let quota = quotas::AI_GENERATION;

        for i in 0..quota.max_requests {
            let decision = limiter.check_at(T0 + i as u64, "user-1", quota).await;
            assert!(decision.allowed, "request {} should be allowed", i + 1);
        }

        let decision = limiter.check_at(T0 + 10, "user-1", quota).await;
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test]
    async fn window_rollover_resets_the_count() {
        let limiter = RateLimiter::new();
        let quota = quotas::AI_GENERATION;

        for _ in 0..=quota.max_requests {
            limiter.check_at(T0, "user-1", quota).await;
        }
        assert!(!limiter.check_at(T0, "user-1", quota).await.allowed);

        // First request of the next window is allowed again.
        let next_window = T0 + quota.window.as_millis() as u64;
        let decision = limiter.check_at(next_window, "user-1", quota).await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, quota.max_requests - 1);
    }

    #[tokio::test]
    async fn identifiers_are_independent() {
        let limiter = RateLimiter::new();
        let quota = quotas::AI_GENERATION;

        for _ in 0..quota.max_requests {
            limiter.check_at(T0, "user-1", quota).await;
        }
        assert!(!limiter.check_at(T0, "user-1", quota).await.allowed);
        assert!(limiter.check_at(T0, "user-2", quota).await.allowed);
    }

    #[tokio::test]
    async fn remaining_counts_down() {
        let limiter = RateLimiter::new();
        let quota = quotas::PAYMENT;

        let first = limiter.check_at(T0, "u", quota).await;
        assert_eq!(first.remaining, quota.max_requests - 1);
        let second = limiter.check_at(T0, "u", quota).await;
        assert_eq!(second.remaining, quota.max_requests - 2);
    }

    #[tokio::test]
    async fn reset_time_is_window_aligned() {
        let limiter = RateLimiter::new();
        let quota = quotas::GENERAL;
        let window_ms = quota.window.as_millis() as u64;

        let decision = limiter.check_at(T0, "u", quota).await;
        assert_eq!(decision.reset_at_ms % window_ms, 0);
        assert!(decision.reset_at_ms > T0);
        assert!(decision.reset_at_ms <= T0 + window_ms);
    }

    #[tokio::test]
    async fn sweep_drops_windows_older_than_one_extra_window() {
        let limiter = RateLimiter::new();
        let quota = quotas::AI_GENERATION;
        let window_ms = quota.window.as_millis() as u64;

        limiter.check_at(T0, "stale", quota).await;
        assert_eq!(limiter.entry_count().await, 1);

        // One extra window after reset: still kept.
        let reset = (T0 / window_ms + 1) * window_ms;
        limiter.sweep_expired(reset + window_ms).await;
        assert_eq!(limiter.entry_count().await, 1);

        // Past the grace window: gone.
        limiter.sweep_expired(reset + window_ms + 1).await;
        assert_eq!(limiter.entry_count().await, 0);
    }
}
