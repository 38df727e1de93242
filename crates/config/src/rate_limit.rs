//! Rate limiting configuration structures.

use duration_str::deserialize_duration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-client rate limiting configuration for the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled.
    pub enabled: bool,
    /// Tokens added to each client's bucket per second.
    pub requests_per_second: f64,
    /// Maximum number of tokens a bucket holds, i.e. the largest allowed burst.
    pub burst: u32,
    /// How often the idle bucket sweep runs.
    #[serde(deserialize_with = "deserialize_duration")]
    pub eviction_interval: Duration,
    /// How long a client may stay silent before its bucket is dropped.
    #[serde(deserialize_with = "deserialize_duration")]
    pub idle_threshold: Duration,
    /// Use `X-Forwarded-For` / `X-Real-IP` to identify clients. Only enable behind a trusted proxy.
    pub trust_forwarded_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 2.0,
            burst: 4,
            eviction_interval: Duration::from_secs(60),
            idle_threshold: Duration::from_secs(180),
            trust_forwarded_headers: false,
        }
    }
}

impl RateLimitConfig {
    /// Checks that the limiter parameters describe a usable bucket.
    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            anyhow::bail!(
                "server.rate_limits.requests_per_second must be a positive number, got {}",
                self.requests_per_second
            );
        }

        if self.burst == 0 {
            anyhow::bail!("server.rate_limits.burst must be at least 1");
        }

        if self.eviction_interval.is_zero() {
            anyhow::bail!("server.rate_limits.eviction_interval must be greater than zero");
        }

        if self.idle_threshold < self.eviction_interval {
            log::warn!(
                "server.rate_limits.idle_threshold ({:?}) is shorter than eviction_interval ({:?}); \
                idle clients will linger up to one interval longer than the threshold",
                self.idle_threshold,
                self.eviction_interval
            );
        }

        Ok(())
    }
}
