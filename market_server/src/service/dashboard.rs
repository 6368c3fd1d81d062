//! Facade bundling both data services for the HTTP layer.

use super::crypto::CryptoService;
use super::stock::StockService;
use crate::currency::CurrencyConverter;
use crate::model::request_stats::RequestStats;
use chrono::Utc;
use log::info;
use market_common::Result;
use market_common::status::{CacheReport, ClearReport, HealthReport, MetricsReport, OverallHealth};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Everything a request handler needs.
pub struct Dashboard {
    pub stocks: StockService,
    pub crypto: CryptoService,
    pub converter: CurrencyConverter,
    requests: Mutex<RequestStats>,
    started: Instant,
}

impl Dashboard {
    pub fn new(stocks: StockService, crypto: CryptoService, converter: CurrencyConverter) -> Self {
        Self {
            stocks,
            crypto,
            converter,
            requests: Mutex::new(RequestStats::new()),
            started: Instant::now(),
        }
    }

    /// Health derived from the failure trackers; providers are not probed.
    pub fn health(&self) -> Result<HealthReport> {
        let stock_service = self.stocks.status()?;
        let crypto_service = self.crypto.status()?;
        Ok(HealthReport {
            status: OverallHealth::from_sources([stock_service, crypto_service]),
            stock_service,
            crypto_service,
            timestamp: Utc::now(),
        })
    }

    pub fn metrics(&self) -> Result<MetricsReport> {
        Ok(MetricsReport {
            uptime_secs: self.started.elapsed().as_secs(),
            stock_service: self.stocks.metrics()?,
            crypto_service: self.crypto.metrics()?,
            requests: self.requests.lock()?.report(),
            timestamp: Utc::now(),
        })
    }

    /// Note one answered HTTP request under its route template.
    pub fn record_request(&self, method: &str, endpoint: &str, elapsed: Duration, status: u16) -> Result<()> {
        self.requests.lock()?.record(method, endpoint, elapsed, status);
        Ok(())
    }

    pub fn cache_stats(&self) -> Result<CacheReport> {
        Ok(CacheReport {
            stock_cache: self.stocks.cache_stats()?,
            crypto_cache: self.crypto.cache_stats()?,
            timestamp: Utc::now(),
        })
    }

    pub fn clear_caches(&self) -> Result<ClearReport> {
        let stock_entries_removed = self.stocks.clear_cache()?;
        let crypto_entries_removed = self.crypto.clear_cache()?;
        info!(
            "caches cleared: {stock_entries_removed} stock and {crypto_entries_removed} crypto entries"
        );
        Ok(ClearReport {
            stock_entries_removed,
            crypto_entries_removed,
            timestamp: Utc::now(),
        })
    }
}
