//! Per-route response timing of the HTTP surface.
//!
//! Every answered request is recorded under its route template, so the number of
//! tracked routes is bounded by the router. Percentiles are taken over the most
//! recent responses of each route. The store is not synchronized; wrap it in a
//! `Mutex` when shared.

use chrono::Utc;
use market_common::quote::round_to;
use market_common::status::{EndpointStats, RequestError, RequestReport};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

/// Responses kept per route for percentiles.
const RECENT_SAMPLES: usize = 100;
/// Error responses kept for the report.
const RECENT_ERRORS: usize = 10;
/// Mean response time above which a route is reported slow.
const SLOW_THRESHOLD: Duration = Duration::from_secs(1);
/// A route needs more requests than this before it can be reported slow.
const SLOW_MIN_REQUESTS: u64 = 5;

#[derive(Default)]
struct RouteTimings {
    requests: u64,
    errors: u64,
    total: Duration,
    min: Option<Duration>,
    max: Duration,
    recent: VecDeque<Duration>,
}

impl RouteTimings {
    fn record(&mut self, elapsed: Duration, is_error: bool) {
        self.requests += 1;
        if is_error {
            self.errors += 1;
        }
        self.total += elapsed;
        self.min = Some(self.min.map_or(elapsed, |min| min.min(elapsed)));
        self.max = self.max.max(elapsed);
        if self.recent.len() == RECENT_SAMPLES {
            self.recent.pop_front();
        }
        self.recent.push_back(elapsed);
    }

    fn mean(&self) -> Duration {
        if self.requests == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.total.as_secs_f64() / self.requests as f64)
    }

    fn is_slow(&self) -> bool {
        self.requests > SLOW_MIN_REQUESTS && self.mean() > SLOW_THRESHOLD
    }

    fn stats(&self, endpoint: &str) -> EndpointStats {
        EndpointStats {
            endpoint: endpoint.to_string(),
            requests: self.requests,
            errors: self.errors,
            error_rate: error_rate(self.errors, self.requests),
            avg_ms: millis(self.mean()),
            min_ms: millis(self.min.unwrap_or_default()),
            max_ms: millis(self.max),
            p95_ms: millis(percentile(&self.recent, 95)),
        }
    }
}

/// Request counters and response times, keyed by route template.
#[derive(Default)]
pub struct RequestStats {
    routes: BTreeMap<String, RouteTimings>,
    recent_errors: VecDeque<RequestError>,
    total_requests: u64,
    total_errors: u64,
}

impl RequestStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one answered request; a 4xx or 5xx `status` counts as an error.
    pub fn record(&mut self, method: &str, endpoint: &str, elapsed: Duration, status: u16) {
        let is_error = status >= 400;
        self.total_requests += 1;
        self.routes
            .entry(endpoint.to_string())
            .or_default()
            .record(elapsed, is_error);

        if is_error {
            self.total_errors += 1;
            if self.recent_errors.len() == RECENT_ERRORS {
                self.recent_errors.pop_front();
            }
            self.recent_errors.push_back(RequestError {
                timestamp: Utc::now(),
                method: method.to_string(),
                endpoint: endpoint.to_string(),
                status,
            });
        }
    }

    pub fn report(&self) -> RequestReport {
        let endpoints = self
            .routes
            .iter()
            .map(|(endpoint, timings)| timings.stats(endpoint))
            .collect();
        let mut slow_endpoints: Vec<EndpointStats> = self
            .routes
            .iter()
            .filter(|(_, timings)| timings.is_slow())
            .map(|(endpoint, timings)| timings.stats(endpoint))
            .collect();
        slow_endpoints.sort_by(|a, b| b.avg_ms.total_cmp(&a.avg_ms));

        RequestReport {
            total_requests: self.total_requests,
            total_errors: self.total_errors,
            error_rate: error_rate(self.total_errors, self.total_requests),
            endpoints,
            slow_endpoints,
            recent_errors: self.recent_errors.iter().cloned().collect(),
        }
    }
}

fn error_rate(errors: u64, requests: u64) -> f64 {
    round_to(errors as f64 / requests.max(1) as f64 * 100.0, 2)
}

fn millis(duration: Duration) -> f64 {
    round_to(duration.as_secs_f64() * 1000.0, 2)
}

/// Nearest-rank percentile; zero for no samples.
fn percentile(samples: &VecDeque<Duration>, pct: usize) -> Duration {
    let mut sorted: Vec<Duration> = samples.iter().copied().collect();
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    sorted.sort_unstable();
    let index = (pct * sorted.len() / 100).min(sorted.len() - 1);
    sorted[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn counts_requests_and_errors_per_route() {
        let mut stats = RequestStats::new();
        stats.record("GET", "/api/v3/health", ms(10), 200);
        stats.record("GET", "/api/v3/health", ms(30), 200);
        stats.record("GET", "/api/v3/stocks/{symbol}", ms(20), 404);
        stats.record("GET", "/api/v3/stocks/{symbol}", ms(40), 200);

        let report = stats.report();
        assert_eq!(report.total_requests, 4);
        assert_eq!(report.total_errors, 1);
        assert_eq!(report.error_rate, 25.0);
        assert!(report.slow_endpoints.is_empty());

        let health = &report.endpoints[0];
        assert_eq!(health.endpoint, "/api/v3/health");
        assert_eq!(health.requests, 2);
        assert_eq!(health.avg_ms, 20.0);
        assert_eq!(health.min_ms, 10.0);
        assert_eq!(health.max_ms, 30.0);

        let stock = &report.endpoints[1];
        assert_eq!(stock.errors, 1);
        assert_eq!(stock.error_rate, 50.0);
        assert_eq!(report.recent_errors[0].status, 404);
        assert_eq!(report.recent_errors[0].endpoint, "/api/v3/stocks/{symbol}");
    }

    #[test]
    fn slow_routes_need_enough_requests() {
        let mut stats = RequestStats::new();
        for _ in 0..5 {
            stats.record("GET", "/htmx/stocks/trending", ms(2_500), 200);
        }
        assert!(stats.report().slow_endpoints.is_empty());

        stats.record("GET", "/htmx/stocks/trending", ms(2_500), 200);
        for _ in 0..6 {
            stats.record("GET", "/htmx/crypto/trending", ms(1_500), 200);
            stats.record("GET", "/api/v3/health", ms(1), 200);
        }
        let slow: Vec<String> = stats
            .report()
            .slow_endpoints
            .into_iter()
            .map(|e| e.endpoint)
            .collect();
        assert_eq!(slow, ["/htmx/stocks/trending", "/htmx/crypto/trending"]);
    }

    #[test]
    fn keeps_only_latest_errors_and_samples() {
        let mut stats = RequestStats::new();
        for status in 0..15u16 {
            stats.record("POST", "/", ms(1), 400 + status);
        }
        let report = stats.report();
        assert_eq!(report.recent_errors.len(), RECENT_ERRORS);
        assert_eq!(report.recent_errors[0].status, 405);

        for i in 0..(RECENT_SAMPLES as u64 + 50) {
            stats.record("GET", "/x", ms(i), 200);
        }
        let x = stats.report().endpoints.into_iter().find(|e| e.endpoint == "/x").unwrap();
        assert_eq!(x.min_ms, 0.0);
        // The percentile only sees the latest samples (50..150 ms).
        assert_eq!(x.p95_ms, 145.0);
    }

    #[test]
    fn percentile_of_nothing_is_zero() {
        assert_eq!(percentile(&VecDeque::new(), 95), Duration::ZERO);
        let one: VecDeque<Duration> = [ms(7)].into_iter().collect();
        assert_eq!(percentile(&one, 99), ms(7));
    }
}
