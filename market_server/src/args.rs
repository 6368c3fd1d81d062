//! Command-line and environment configuration of the dashboard server.
use crate::currency::{DEFAULT_RATES_URL, DEFAULT_USD_BRL};
use crate::model::failure_tracker::DEFAULT_MAX_FAILURES;
use crate::provider::{coingecko, yahoo};
use crate::service::ServiceConfig;
use clap::Parser;
use market_common::net::{DEFAULT_BIND, DEFAULT_PORT};
use std::time::Duration;

/// Parsed command-line arguments; every flag can also come from the environment.
#[derive(Debug, Parser)]
#[command(version, about = "Stock and crypto market dashboard", long_about = None)]
pub struct Args {
    /// Address to bind the HTTP server to.
    #[arg(long, env = "DASHBOARD_HOST", default_value = DEFAULT_BIND)]
    pub host: String,

    #[arg(long, env = "DASHBOARD_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Serve the built-in demo tables instead of calling Yahoo Finance and CoinGecko.
    #[arg(long, env = "USE_MOCK_DATA")]
    pub use_mock_data: bool,

    /// Seconds a stock quote stays fresh.
    #[arg(long, env = "STOCK_CACHE_TTL", default_value_t = 900)]
    pub stock_cache_ttl: u64,

    /// Seconds crypto quotes, listings and the overview stay fresh.
    #[arg(long, env = "CRYPTO_CACHE_TTL", default_value_t = 180)]
    pub crypto_cache_ttl: u64,

    /// Consecutive provider failures before a source is reported unavailable.
    #[arg(long, env = "MAX_FAILURES", default_value_t = DEFAULT_MAX_FAILURES)]
    pub max_failures: u32,

    /// Minimum milliseconds between two provider calls for the same symbol.
    #[arg(long, env = "MIN_REQUEST_INTERVAL_MS", default_value_t = 1000)]
    pub min_request_interval_ms: u64,

    #[arg(long, env = "STOCK_WORKERS", default_value_t = 3)]
    pub stock_workers: usize,

    #[arg(long, env = "CRYPTO_WORKERS", default_value_t = 10)]
    pub crypto_workers: usize,

    /// Runtime worker threads answering HTTP requests.
    #[arg(long, env = "HTTP_WORKERS", default_value_t = 8)]
    pub http_workers: usize,

    /// Timeout in seconds of every provider request.
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 10)]
    pub request_timeout: u64,

    /// USD to BRL rate used for BRL prices.
    #[arg(long, env = "USD_BRL_RATE", default_value_t = DEFAULT_USD_BRL)]
    pub usd_brl: f64,

    /// Fetch the current USD/BRL rate at startup.
    #[arg(long, env = "REFRESH_EXCHANGE_RATE")]
    pub refresh_exchange_rate: bool,

    #[arg(long, env = "YAHOO_BASE_URL", default_value = yahoo::DEFAULT_BASE_URL)]
    pub yahoo_base_url: String,

    #[arg(long, env = "COINGECKO_BASE_URL", default_value = coingecko::DEFAULT_BASE_URL)]
    pub coingecko_base_url: String,

    #[arg(long, env = "EXCHANGE_RATES_URL", default_value = DEFAULT_RATES_URL)]
    pub exchange_rates_url: String,
}

impl Args {
    pub fn bind_addr(&self) -> String {
        market_common::net::addr(&self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn stock_config(&self) -> ServiceConfig {
        ServiceConfig {
            cache_ttl: Duration::from_secs(self.stock_cache_ttl),
            max_failures: self.max_failures,
            min_request_interval: Duration::from_millis(self.min_request_interval_ms),
            workers: self.stock_workers,
        }
    }

    pub fn crypto_config(&self) -> ServiceConfig {
        ServiceConfig {
            cache_ttl: Duration::from_secs(self.crypto_cache_ttl),
            workers: self.crypto_workers,
            ..self.stock_config()
        }
    }
}
