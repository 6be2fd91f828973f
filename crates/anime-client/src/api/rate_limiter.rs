//! Rate limiter implementation using the token bucket algorithm.
//!
//! One limiter is shared by every request a client sends to its upstream, so
//! concurrent callers are spaced in aggregate. A per-second bucket is always
//! present; a per-minute bucket can be layered on top.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// A single token bucket
///
/// The balance may go negative: each caller reserves its token up front and
/// then sleeps for the deficit, so waiters are served in arrival order.
#[derive(Debug)]
struct TokenBucket {
    /// Tokens added per second
    rate: f64,
    /// Maximum stored tokens
    capacity: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(rate: f64, capacity: f64, now: Instant) -> Self {
        Self {
            rate,
            capacity,
            tokens: capacity,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Take one token and return how long the caller must wait for it
    fn reserve(&mut self, now: Instant) -> Duration {
        self.refill(now);
        self.tokens -= 1.0;
        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(-self.tokens / self.rate).unwrap_or(Duration::MAX)
        }
    }
}

#[derive(Debug)]
struct Buckets {
    per_second: TokenBucket,
    per_minute: Option<TokenBucket>,
}

/// Rate limiter with an optional per-minute constraint
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<Buckets>,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_second` on average with
    /// bursts of up to `burst` requests
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        let now = Instant::now();
        Self {
            buckets: Mutex::new(Buckets {
                per_second: TokenBucket::new(requests_per_second, f64::from(burst.max(1)), now),
                per_minute: None,
            }),
        }
    }

    /// Additionally cap the number of requests in any minute
    pub fn with_per_minute(self, requests_per_minute: u32) -> Self {
        let mut buckets = self.buckets.into_inner();
        let capacity = f64::from(requests_per_minute.max(1));
        buckets.per_minute = Some(TokenBucket::new(capacity / 60.0, capacity, Instant::now()));
        Self {
            buckets: Mutex::new(buckets),
        }
    }

    /// Wait until a request can be made
    pub async fn acquire(&self) {
        let wait = {
            let mut buckets = self.buckets.lock().await;
            let now = Instant::now();
            let per_second = buckets.per_second.reserve(now);
            let per_minute = buckets
                .per_minute
                .as_mut()
                .map_or(Duration::ZERO, |bucket| bucket.reserve(now));
            per_second.max(per_minute)
        };

        if !wait.is_zero() {
            tracing::debug!(wait_ms = wait.as_millis(), "Rate limit: waiting for token");
            sleep(wait).await;
        }
    }

    /// Whole tokens currently available without waiting
    pub async fn available(&self) -> u32 {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        buckets.per_second.refill(now);
        let mut available = buckets.per_second.tokens;
        if let Some(bucket) = buckets.per_minute.as_mut() {
            bucket.refill(now);
            available = available.min(bucket.tokens);
        }
        available.max(0.0).floor() as u32
    }
}
