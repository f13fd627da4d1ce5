//! Per-team order-rate counters.
//!
//! Unlike the teacher's sliding-window, `Instant`-based limiter, the
//! `order_rate` constraint needs a wall-clock-aligned fixed window: the
//! window boundary is `floor(now, 1s)`, not "one second since the first
//! request in the bucket". A background cleanup task still prunes stale
//! buckets the same way the teacher's limiter does.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

struct Bucket {
    window_start_secs: i64,
    count: u32,
}

pub struct RateLimiter {
    buckets: DashMap<Uuid, Bucket>,
}

impl RateLimiter {
    pub fn new() -> Arc<Self> {
        let limiter = Arc::new(Self {
            buckets: DashMap::new(),
        });
        let background = limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(10));
            loop {
                interval.tick().await;
                let now_secs = Utc::now().timestamp();
                background
                    .buckets
                    .retain(|_, bucket| now_secs - bucket.window_start_secs < 2);
            }
        });
        limiter
    }

    /// Count one order attempt for `team_id` at `now` and report whether
    /// that attempt falls within `max_per_second`. The count is mutated
    /// regardless of the outcome — a rejected attempt still occupies a
    /// slot in its window, matching the teacher's "count, then compare"
    /// idiom.
    pub fn check(&self, team_id: Uuid, max_per_second: u32, now: DateTime<Utc>) -> bool {
        let window_start_secs = now.timestamp();
        let mut entry = self.buckets.entry(team_id).or_insert_with(|| Bucket {
            window_start_secs,
            count: 0,
        });
        if entry.window_start_secs != window_start_secs {
            entry.window_start_secs = window_start_secs;
            entry.count = 0;
        }
        entry.count += 1;
        entry.count <= max_per_second
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        // Only used in tests that don't need the background task; real
        // callers go through `RateLimiter::new` to get the `Arc` and the
        // cleanup loop.
        Self {
            buckets: DashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourth_order_in_one_second_is_rejected() {
        let limiter = RateLimiter::default();
        let team = Uuid::new_v4();
        let now = Utc::now();
        assert!(limiter.check(team, 3, now));
        assert!(limiter.check(team, 3, now));
        assert!(limiter.check(team, 3, now));
        assert!(!limiter.check(team, 3, now));
    }

    #[test]
    fn next_second_resets_the_window() {
        let limiter = RateLimiter::default();
        let team = Uuid::new_v4();
        let now = Utc::now();
        assert!(limiter.check(team, 1, now));
        assert!(!limiter.check(team, 1, now));
        let next_second = now + chrono::Duration::seconds(1);
        assert!(limiter.check(team, 1, next_second));
    }
}
