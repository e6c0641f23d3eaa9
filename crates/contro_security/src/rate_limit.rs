//! Sliding-window attempt counting keyed by actor.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Checks between automatic sweeps of idle actors.
const PRUNE_INTERVAL: u32 = 256;

/// Attempt limit for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Attempts allowed inside the window
    pub max_attempts: usize,
    /// Window length in seconds
    pub window_secs: u64,
}

impl RateLimit {
    /// Create a new rate limit.
    pub fn new(max_attempts: usize, window_secs: u64) -> Self {
        Self {
            max_attempts,
            window_secs,
        }
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Sliding-window rate limiter.
///
/// Each actor has an unordered list of attempt times. Lists are pruned to the
/// trailing window only when checked, and actors whose lists empty out are
/// swept periodically so the map does not grow with every actor ever seen.
///
/// ```
/// use contro_security::{RateLimit, RateLimiter};
///
/// let mut limiter = RateLimiter::new(RateLimit::new(2, 60));
/// limiter.add_attempt(7u64);
/// assert!(!limiter.is_rate_limited(&7));
/// limiter.add_attempt(7);
/// assert!(limiter.is_rate_limited(&7));
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiter<K = u64> {
    limit: RateLimit,
    attempts: HashMap<K, Vec<Instant>>,
    checks_since_prune: u32,
}

impl<K: Eq + Hash + Clone> RateLimiter<K> {
    /// Create a limiter.
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            attempts: HashMap::new(),
            checks_since_prune: 0,
        }
    }

    /// Configured limit.
    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Whether the actor has used up the window.
    pub fn is_rate_limited(&mut self, actor: &K) -> bool {
        self.checks_since_prune += 1;
        if self.checks_since_prune >= PRUNE_INTERVAL {
            self.prune_idle();
        }

        let window = self.limit.window();
        let now = Instant::now();
        let Some(attempts) = self.attempts.get_mut(actor) else {
            return false;
        };
        attempts.retain(|at| now.duration_since(*at) < window);

        let limited = attempts.len() >= self.limit.max_attempts;
        trace!(attempts = attempts.len(), limited, "Rate limit check");
        limited
    }

    /// Record an attempt. Pruning waits for the next check.
    pub fn add_attempt(&mut self, actor: K) {
        self.attempts.entry(actor).or_default().push(Instant::now());
    }

    /// Time until the oldest recorded attempt leaves the window.
    pub fn remaining_time(&self, actor: &K) -> Duration {
        let window = self.limit.window();
        let now = Instant::now();
        self.attempts
            .get(actor)
            .and_then(|attempts| attempts.iter().min())
            .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
            .unwrap_or(Duration::ZERO)
    }

    /// Attempts recorded for the actor inside the current window.
    pub fn attempt_count(&self, actor: &K) -> usize {
        let window = self.limit.window();
        let now = Instant::now();
        self.attempts
            .get(actor)
            .map(|attempts| {
                attempts
                    .iter()
                    .filter(|at| now.duration_since(**at) < window)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Forget an actor.
    pub fn reset(&mut self, actor: &K) {
        self.attempts.remove(actor);
    }

    /// Drop actors with no attempts inside the window. Returns how many were
    /// removed.
    pub fn prune_idle(&mut self) -> usize {
        self.checks_since_prune = 0;
        let window = self.limit.window();
        let now = Instant::now();
        let before = self.attempts.len();
        self.attempts.retain(|_, attempts| {
            attempts.retain(|at| now.duration_since(*at) < window);
            !attempts.is_empty()
        });
        let removed = before - self.attempts.len();
        if removed > 0 {
            debug!(removed, remaining = self.attempts.len(), "Pruned idle actors");
        }
        removed
    }

    /// Number of actors currently tracked.
    pub fn tracked_actors(&self) -> usize {
        self.attempts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_limited_after_max_attempts() {
        let mut limiter = RateLimiter::new(RateLimit::new(3, 60));

        for _ in 0..2 {
            limiter.add_attempt(42u64);
        }
        assert!(!limiter.is_rate_limited(&42));

        limiter.add_attempt(42);
        assert!(limiter.is_rate_limited(&42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let mut limiter = RateLimiter::new(RateLimit::new(3, 60));
        for _ in 0..3 {
            limiter.add_attempt(42u64);
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        assert!(limiter.is_rate_limited(&42));
        assert_eq!(limiter.remaining_time(&42), Duration::from_secs(57));

        tokio::time::advance(Duration::from_secs(57)).await;
        assert!(!limiter.is_rate_limited(&42));
        assert_eq!(limiter.attempt_count(&42), 2);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(!limiter.is_rate_limited(&42));
        assert_eq!(limiter.remaining_time(&42), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_actor() {
        let mut limiter: RateLimiter = RateLimiter::new(RateLimit::new(1, 10));
        assert!(!limiter.is_rate_limited(&1));
        assert_eq!(limiter.remaining_time(&1), Duration::ZERO);
        assert_eq!(limiter.tracked_actors(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_actors_are_independent() {
        let mut limiter = RateLimiter::new(RateLimit::new(1, 10));
        limiter.add_attempt(1u64);
        assert!(limiter.is_rate_limited(&1));
        assert!(!limiter.is_rate_limited(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_idle_removes_stale_actors() {
        let mut limiter = RateLimiter::new(RateLimit::new(5, 10));
        limiter.add_attempt(1u64);
        limiter.add_attempt(2);
        tokio::time::advance(Duration::from_secs(11)).await;
        limiter.add_attempt(3);

        assert_eq!(limiter.prune_idle(), 2);
        assert_eq!(limiter.tracked_actors(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_prune_during_checks() {
        let mut limiter = RateLimiter::new(RateLimit::new(5, 1));
        for actor in 0..100u64 {
            limiter.add_attempt(actor);
        }
        tokio::time::advance(Duration::from_secs(2)).await;

        for _ in 0..PRUNE_INTERVAL {
            limiter.is_rate_limited(&1000);
        }
        assert_eq!(limiter.tracked_actors(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_forgets_actor() {
        let mut limiter = RateLimiter::new(RateLimit::new(1, 60));
        limiter.add_attempt(9u64);
        limiter.reset(&9);
        assert!(!limiter.is_rate_limited(&9));
    }
}
