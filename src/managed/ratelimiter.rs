//! # Global Rate Limiter
//!
//! Token bucket shared by every managed-resource controller in the process.
//! A pass that cannot take a token is requeued after the returned delay
//! instead of blocking a worker.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Process-wide token bucket
#[derive(Debug)]
pub struct GlobalRateLimiter {
    rate: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl GlobalRateLimiter {
    /// Allow `rate` passes per second with bursts of up to `burst`
    #[must_use]
    pub fn new(rate: u32, burst: u32) -> Self {
        let rate = f64::from(rate.max(1));
        let burst = f64::from(burst.max(1));
        Self {
            rate,
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take a token if one is available
    ///
    /// Returns `Duration::ZERO` when the pass may proceed, otherwise how long
    /// until a token will be available. No token is reserved in that case.
    pub fn when(&self) -> Duration {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate)
        }
    }
}
