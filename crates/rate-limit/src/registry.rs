//! Client key to token bucket mapping.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use config::RateLimitConfig;
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::TokenBucket;

/// Owns one [`TokenBucket`] per client key.
///
/// Every lookup, creation, update and eviction goes through the same mutex, so two
/// concurrent checks for one key are always linearized and never create two buckets.
pub struct RateLimiterRegistry {
    enabled: bool,
    capacity: u32,
    refill_rate: f64,
    idle_threshold: Duration,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiterRegistry {
    /// Creates an empty registry from the server rate limit settings.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            capacity: config.burst,
            refill_rate: config.requests_per_second,
            idle_threshold: config.idle_threshold,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Whether requests are checked at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Decides whether the client identified by `key` may make a request now.
    ///
    /// A previously unseen key starts with a full bucket. When the registry is disabled
    /// this always returns `true` and no state is created.
    pub fn allow(&self, key: &str) -> bool {
        if !self.enabled {
            return true;
        }

        let now = Instant::now();
        let mut buckets = self.lock();

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.capacity, self.refill_rate, now));

        let allowed = bucket.try_acquire(now);

        if !allowed {
            log::debug!("Client '{key}' has no tokens left");
        }

        allowed
    }

    /// Removes every bucket that has not been checked for longer than the idle threshold.
    ///
    /// Returns the number of evicted buckets.
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut buckets = self.lock();
        let before = buckets.len();

        buckets.retain(|_, bucket| bucket.idle_for(now) <= self.idle_threshold);

        before - buckets.len()
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no client is currently tracked.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Starts the periodic eviction sweep.
    ///
    /// The sweep runs every `interval` until `shutdown` is cancelled. Nothing is spawned
    /// for a disabled registry, since it never holds buckets.
    pub fn spawn_eviction(self: &Arc<Self>, interval: Duration, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        if !self.enabled {
            return None;
        }

        let registry = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(registry) = registry.upgrade() else {
                            break;
                        };

                        let evicted = registry.evict_idle();

                        if evicted > 0 {
                            log::debug!("Evicted {evicted} idle rate limit buckets, {} remaining", registry.len());
                        }
                    }
                }
            }

            log::debug!("Rate limit eviction sweep stopped");
        });

        Some(handle)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TokenBucket>> {
        // Buckets stay consistent even if a holder panicked; every update is a single assignment.
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn config(burst: u32, requests_per_second: f64) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            requests_per_second,
            burst,
            eviction_interval: Duration::from_secs(60),
            idle_threshold: Duration::from_secs(180),
            trust_forwarded_headers: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_capacity_then_deny() {
        let registry = RateLimiterRegistry::new(&config(4, 2.0));

        for _ in 0..4 {
            assert!(registry.allow("10.0.0.1"));
        }

        assert!(!registry.allow("10.0.0.1"));
    }

    #[tokio::test(start_paused = true)]
    async fn one_token_returns_after_refill_period() {
        let registry = RateLimiterRegistry::new(&config(2, 4.0));

        assert!(registry.allow("client"));
        assert!(registry.allow("client"));
        assert!(!registry.allow("client"));

        tokio::time::advance(Duration::from_millis(250)).await;

        assert!(registry.allow("client"));
        assert!(!registry.allow("client"));
    }

    #[tokio::test(start_paused = true)]
    async fn allow_allow_deny_allow() {
        let registry = RateLimiterRegistry::new(&config(2, 1.0));
        let mut results = Vec::new();

        results.push(registry.allow("client"));
        results.push(registry.allow("client"));
        results.push(registry.allow("client"));

        tokio::time::advance(Duration::from_secs(1)).await;

        results.push(registry.allow("client"));

        assert_eq!(results, [true, true, false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_do_not_interfere() {
        let registry = RateLimiterRegistry::new(&config(1, 1.0));

        assert!(registry.allow("a"));
        assert!(!registry.allow("a"));

        assert!(registry.allow("b"));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_registry_admits_everything() {
        let mut config = config(1, 1.0);
        config.enabled = false;

        let registry = RateLimiterRegistry::new(&config);

        for _ in 0..100 {
            assert!(registry.allow("client"));
        }

        assert!(registry.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_checks_never_over_admit() {
        let registry = Arc::new(RateLimiterRegistry::new(&config(1, 0.0001)));
        let admitted = Arc::new(AtomicUsize::new(0));

        let tasks = (0..64).map(|_| {
            let registry = registry.clone();
            let admitted = admitted.clone();

            tokio::spawn(async move {
                if registry.allow("shared") {
                    admitted.fetch_add(1, Ordering::SeqCst);
                }
            })
        });

        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_bucket_is_evicted_and_restarts_full() {
        let registry = RateLimiterRegistry::new(&config(2, 0.001));

        assert!(registry.allow("client"));
        assert!(registry.allow("client"));
        assert!(!registry.allow("client"));

        tokio::time::advance(Duration::from_secs(180)).await;
        assert_eq!(registry.evict_idle(), 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(registry.evict_idle(), 1);
        assert!(registry.is_empty());

        assert!(registry.allow("client"));
        assert!(registry.allow("client"));
        assert!(!registry.allow("client"));
    }

    #[tokio::test(start_paused = true)]
    async fn active_bucket_survives_eviction() {
        let registry = RateLimiterRegistry::new(&config(2, 1.0));

        registry.allow("idle");

        tokio::time::advance(Duration::from_secs(120)).await;
        registry.allow("active");

        tokio::time::advance(Duration::from_secs(90)).await;

        assert_eq!(registry.evict_idle(), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.allow("active"));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_runs_until_cancelled() {
        let registry = Arc::new(RateLimiterRegistry::new(&config(1, 1.0)));
        let shutdown = CancellationToken::new();

        let handle = registry
            .spawn_eviction(Duration::from_secs(60), shutdown.clone())
            .unwrap();

        registry.allow("client");
        assert_eq!(registry.len(), 1);

        tokio::time::sleep(Duration::from_secs(241)).await;
        assert!(registry.is_empty());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_registry_spawns_no_sweep() {
        let mut config = config(1, 1.0);
        config.enabled = false;

        let registry = Arc::new(RateLimiterRegistry::new(&config));

        assert!(registry.spawn_eviction(Duration::from_secs(60), CancellationToken::new()).is_none());
    }
}
