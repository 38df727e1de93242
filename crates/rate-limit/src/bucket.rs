//! Per-client token bucket.

use std::time::Duration;

use tokio::time::Instant;

/// Admission state of a single client.
///
/// Tokens are refilled lazily on every check, so a bucket needs no timer of its own.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

impl TokenBucket {
    /// Creates a full bucket holding `capacity` tokens, refilled at `refill_rate` tokens per second.
    pub fn new(capacity: u32, refill_rate: f64, now: Instant) -> Self {
        let capacity = f64::from(capacity);

        Self {
            capacity,
            refill_rate,
            tokens: capacity,
            last_refill: now,
            last_seen: now,
        }
    }

    /// Refills the bucket up to `now` and spends one token if available.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);
        self.last_seen = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// How long the bucket has gone without an admission check.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }

    /// Tokens currently held, as of the last check.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }
}
