//! Health and metrics models reported by the dashboard services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health of a single upstream data source.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SourceStatus {
    /// Last call succeeded.
    #[default]
    Available,
    /// Recent calls failed, but fewer than the configured maximum in a row.
    Degraded,
    /// The consecutive-failure limit was reached; only cached or sample data is served.
    Unavailable,
}

/// Health of the whole dashboard, folded from its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OverallHealth {
    /// Every source is available.
    Healthy,
    /// At least one source is degraded, none unavailable.
    Degraded,
    /// At least one source is unavailable.
    Unhealthy,
}

impl OverallHealth {
    /// Any unavailable source makes the dashboard unhealthy, any degraded one degraded.
    pub fn from_sources<I: IntoIterator<Item = SourceStatus>>(statuses: I) -> Self {
        let mut health = OverallHealth::Healthy;
        for status in statuses {
            match status {
                SourceStatus::Unavailable => return OverallHealth::Unhealthy,
                SourceStatus::Degraded => health = OverallHealth::Degraded,
                SourceStatus::Available => {}
            }
        }
        health
    }
}

/// Occupancy of a TTL cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Entries held, expired ones included.
    pub total_entries: usize,
    /// Entries younger than the TTL.
    pub active_entries: usize,
    /// Time to live of a fresh entry.
    pub ttl_secs: u64,
}

/// Counters and state of one data service.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetrics {
    pub provider: String,
    pub status: SourceStatus,
    pub consecutive_failures: u32,
    /// Quote lookups served, cached or not.
    pub requests: u64,
    pub provider_failures: u64,
    /// Responses answered with stale or synthetic data.
    pub fallbacks_served: u64,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
    pub cache: CacheStats,
}

/// Timing and error counters of one HTTP route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointStats {
    /// Route template, e.g. `/api/v3/stocks/{symbol}`.
    pub endpoint: String,
    /// Requests answered.
    pub requests: u64,
    /// Requests answered with a 4xx or 5xx status.
    pub errors: u64,
    /// `errors / requests`, in percent.
    pub error_rate: f64,
    /// Mean response time in milliseconds.
    pub avg_ms: f64,
    /// Fastest response in milliseconds.
    pub min_ms: f64,
    /// Slowest response in milliseconds.
    pub max_ms: f64,
    /// 95th percentile over the most recent responses, in milliseconds.
    pub p95_ms: f64,
}

/// A request answered with an error status.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestError {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub endpoint: String,
    pub status: u16,
}

/// Request timing of the HTTP surface since start-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RequestReport {
    /// Requests answered on every route.
    pub total_requests: u64,
    /// Requests answered with a 4xx or 5xx status.
    pub total_errors: u64,
    /// `total_errors / total_requests`, in percent.
    pub error_rate: f64,
    /// Per-route figures, sorted by route.
    pub endpoints: Vec<EndpointStats>,
    /// Routes whose mean response time is over the slow threshold, slowest first.
    pub slow_endpoints: Vec<EndpointStats>,
    /// Latest error responses, oldest first.
    pub recent_errors: Vec<RequestError>,
}

/// Answer of the health endpoint.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: OverallHealth,
    pub stock_service: SourceStatus,
    pub crypto_service: SourceStatus,
    pub timestamp: DateTime<Utc>,
}

/// Answer of the metrics endpoint.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub uptime_secs: u64,
    pub stock_service: ServiceMetrics,
    pub crypto_service: ServiceMetrics,
    /// Per-route timing of the HTTP surface.
    pub requests: RequestReport,
    pub timestamp: DateTime<Utc>,
}

/// Answer of the cache statistics endpoint.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheReport {
    pub stock_cache: CacheStats,
    pub crypto_cache: CacheStats,
    pub timestamp: DateTime<Utc>,
}

/// Answer of the cache-clear endpoint.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearReport {
    pub stock_entries_removed: usize,
    pub crypto_entries_removed: usize,
    pub timestamp: DateTime<Utc>,
}
