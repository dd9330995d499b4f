//! Minimum-spacing rate limiting for outbound requests.
//!
//! A [`RateLimiter`] guarantees at least `min_interval` between the moments
//! successive [`RateLimiter::acquire`] calls return. The limiter is an
//! ordinary value: the pipeline builds one for the aggregator host and hands
//! the same `Arc` to the feed searcher and the decoder, while
//! [`HostRateLimiters`] keeps one per publisher host.
//!
//! The internal lock is held across the wait, so concurrent callers queue
//! behind each other instead of computing overlapping waits and firing
//! together.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{Instant, sleep_until};
use tracing::trace;
use url::Url;

#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request_at: AsyncMutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request_at: AsyncMutex::new(None),
        }
    }

    /// A limiter that never waits.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a request slot is open, then claim it.
    ///
    /// Never fails; it only delays.
    pub async fn acquire(&self) {
        let mut last = self.last_request_at.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            if ready_at > Instant::now() {
                trace!(wait = ?(ready_at - Instant::now()), "rate limit wait");
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Lazily created limiters keyed by URL host.
///
/// Entries are never evicted: the map holds one limiter for every distinct
/// host seen during the value's lifetime. That is a few dozen entries for one
/// query run; a long-running process should build a fresh instance per batch
/// rather than keep one forever.
#[derive(Debug)]
pub struct HostRateLimiters {
    min_interval: Duration,
    limiters: Mutex<HashMap<String, Arc<RateLimiter>>>,
}

impl HostRateLimiters {
    /// # Arguments
    /// * `min_interval` - Spacing applied independently on each host.
    ///
    /// # Returns
    /// An empty set; limiters are created on first use of a host.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            limiters: Mutex::new(HashMap::new()),
        }
    }

    /// The limiter shared by every URL on the same host.
    ///
    /// # Arguments
    /// * `url` - Any absolute URL; the host is compared case-insensitively.
    ///
    /// # Returns
    /// The host's limiter, created on first call. URLs without a parseable
    /// host share one anonymous limiter.
    pub fn for_url(&self, url: &str) -> Arc<RateLimiter> {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .unwrap_or_default();
        let mut limiters = match self.limiters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        limiters
            .entry(host)
            .or_insert_with(|| Arc::new(RateLimiter::new(self.min_interval)))
            .clone()
    }

    /// Number of hosts that currently hold a limiter.
    pub fn len(&self) -> usize {
        match self.limiters.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(2));
        let t0 = Instant::now();
        limiter.acquire().await;
        assert_eq!(t0.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_n_acquires_take_n_minus_one_intervals() {
        let limiter = RateLimiter::new(Duration::from_secs(2));
        let t0 = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert!(t0.elapsed() >= Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_serialized() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(3)));
        let t0 = Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut stamps = Vec::new();
        for h in handles {
            stamps.push(h.await.unwrap());
        }
        stamps.sort();
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(3));
        }
        assert!(t0.elapsed() >= Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_interval_has_passed() {
        let limiter = RateLimiter::new(Duration::from_secs(2));
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(5)).await;
        let t0 = Instant::now();
        limiter.acquire().await;
        assert_eq!(t0.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_host_limiters_share_per_host() {
        let limiters = HostRateLimiters::new(Duration::from_secs(1));
        let a = limiters.for_url("https://www.example.com/a");
        let b = limiters.for_url("https://WWW.EXAMPLE.COM/b?x=1");
        let c = limiters.for_url("https://other.org/");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_one_entry_per_host_is_kept() {
        let limiters = HostRateLimiters::new(Duration::from_secs(1));
        assert!(limiters.is_empty());
        for path in ["a", "b", "c"] {
            limiters.for_url(&format!("https://www.example.com/{path}"));
        }
        limiters.for_url("https://other.org/");
        limiters.for_url("not a url");
        limiters.for_url("also not a url");
        // example.com, other.org and the shared hostless entry
        assert_eq!(limiters.len(), 3);
    }
}
