//! Data services sitting between the HTTP surface and the providers.
//!
//! A service answers from its cache first, throttles repeated lookups of the same
//! key, calls the provider, and falls back to stale cache entries or synthetic data
//! when the provider fails. Provider errors never escape a service; the only errors
//! returned are invalid input and poisoned locks.

use crate::model::failure_tracker::{DEFAULT_MAX_FAILURES, FailureTracker};
use crate::model::ttl_cache::TtlCache;
use log::{debug, warn};
use market_common::Result;
use market_common::status::{CacheStats, ServiceMetrics, SourceStatus};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub mod crypto;
pub mod dashboard;
pub mod stock;

/// Size of a cache or of the throttle map above which old entries are dropped on insert.
const PURGE_THRESHOLD: usize = 1024;

/// Tuning knobs of one service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceConfig {
    /// How long a fetched value is served without asking the provider again.
    pub cache_ttl: Duration,
    /// Consecutive failures after which the source is reported unavailable.
    pub max_failures: u32,
    /// Minimum gap between two provider calls for the same key.
    pub min_request_interval: Duration,
    /// Threads used for multi-symbol lookups.
    pub workers: usize,
}

impl ServiceConfig {
    pub fn stocks() -> Self {
        Self {
            cache_ttl: Duration::from_secs(900),
            max_failures: DEFAULT_MAX_FAILURES,
            min_request_interval: Duration::from_millis(1000),
            workers: 3,
        }
    }

    pub fn crypto() -> Self {
        Self {
            cache_ttl: Duration::from_secs(180),
            workers: 10,
            ..Self::stocks()
        }
    }
}

/// Bookkeeping shared by both services: failure tracking, throttling and counters.
pub(crate) struct ServiceCore {
    provider: String,
    tracker: Mutex<FailureTracker>,
    last_request: Mutex<HashMap<String, Instant>>,
    min_interval: Duration,
    requests: AtomicU64,
    fallbacks: AtomicU64,
}

impl ServiceCore {
    pub(crate) fn new(provider: &str, config: &ServiceConfig) -> Self {
        Self {
            provider: provider.to_string(),
            tracker: Mutex::new(FailureTracker::new(config.max_failures)),
            last_request: Mutex::new(HashMap::new()),
            min_interval: config.min_request_interval,
            requests: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        }
    }

    /// `true` when `key` went to the provider less than the minimum interval ago.
    /// Otherwise the current call is recorded and `false` returned.
    fn throttled(&self, key: &str) -> Result<bool> {
        let mut last = self.last_request.lock()?;
        let now = Instant::now();
        if let Some(at) = last.get(key) {
            if now.duration_since(*at) < self.min_interval {
                return Ok(true);
            }
        }
        last.insert(key.to_string(), now);
        if last.len() > PURGE_THRESHOLD {
            last.retain(|_, at| now.duration_since(*at) < self.min_interval);
            if last.len() > PURGE_THRESHOLD {
                // Too many distinct keys inside one interval: start over.
                last.clear();
                last.insert(key.to_string(), now);
            }
            debug!("{}: tracking {} recent requests", self.provider, last.len());
        }
        Ok(false)
    }

    #[cfg(test)]
    fn tracked_requests(&self) -> usize {
        self.last_request.lock().map(|last| last.len()).unwrap_or(0)
    }

    pub(crate) fn record_success(&self) -> Result<()> {
        self.tracker.lock()?.record_success();
        Ok(())
    }

    pub(crate) fn record_failure(&self, context: &str, err: &market_common::MarketError) -> Result<()> {
        warn!("{}: {context} failed: {err}", self.provider);
        self.tracker.lock()?.record_failure(err);
        Ok(())
    }

    pub(crate) fn count_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn forget_requests(&self) -> Result<()> {
        self.last_request.lock()?.clear();
        Ok(())
    }

    pub(crate) fn status(&self) -> Result<SourceStatus> {
        Ok(self.tracker.lock()?.status())
    }

    pub(crate) fn metrics(&self, cache: CacheStats) -> Result<ServiceMetrics> {
        let tracker = self.tracker.lock()?;
        Ok(ServiceMetrics {
            provider: self.provider.clone(),
            status: tracker.status(),
            consecutive_failures: tracker.consecutive_failures(),
            requests: self.requests.load(Ordering::Relaxed),
            provider_failures: tracker.total_failures(),
            fallbacks_served: self.fallbacks.load(Ordering::Relaxed),
            last_error: tracker.last_error().map(str::to_string),
            last_success: tracker.last_success(),
            cache,
        })
    }

    /// Single-key lookup with the cache policy both services share.
    ///
    /// Order: fresh cache, throttle (stale value or nothing), provider. A provider
    /// error is recorded and answered with the stale value if one exists; an unknown
    /// key counts as a successful call.
    pub(crate) fn lookup<V, F>(&self, cache: &Mutex<TtlCache<V>>, key: &str, fetch: F) -> Result<Option<V>>
    where
        V: Clone,
        F: FnOnce() -> Result<Option<V>>,
    {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if let Some(value) = cache.lock()?.get_fresh(key) {
            debug!("{}: cache hit for {key}", self.provider);
            return Ok(Some(value));
        }

        if self.throttled(key)? {
            debug!("{}: {key} throttled, serving cache", self.provider);
            return Ok(cache.lock()?.get_any(key));
        }

        match fetch() {
            Ok(Some(value)) => {
                self.record_success()?;
                let mut cache = cache.lock()?;
                cache.insert(key, value.clone());
                if cache.len() > PURGE_THRESHOLD {
                    let purged = cache.purge_expired();
                    debug!("{}: purged {purged} expired entries", self.provider);
                }
                Ok(Some(value))
            }
            Ok(None) => {
                self.record_success()?;
                Ok(None)
            }
            Err(err) => {
                self.record_failure(key, &err)?;
                let stale = cache.lock()?.get_any(key);
                if stale.is_some() {
                    self.count_fallback();
                }
                Ok(stale)
            }
        }
    }
}

/// Sum of several cache occupancies; the TTL is taken from the first.
pub(crate) fn merge_stats(stats: &[CacheStats]) -> CacheStats {
    CacheStats {
        total_entries: stats.iter().map(|s| s.total_entries).sum(),
        active_entries: stats.iter().map(|s| s.active_entries).sum(),
        ttl_secs: stats.first().map(|s| s.ttl_secs).unwrap_or(0),
    }
}
