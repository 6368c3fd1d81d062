//! Upstream market data providers.
//!
//! The provider traits abstract over data sources (Yahoo Finance, CoinGecko, the
//! built-in demo tables) so services can swap implementations and tests can use
//! scripted ones. Providers know nothing about caching or fallbacks; the services
//! sit above them.
//!
//! Every fetch distinguishes three outcomes:
//! - `Ok(Some(_))`: live data;
//! - `Ok(None)`: the source answered, but does not know the symbol;
//! - `Err(_)`: the source could not be used (network, rate limit, bad payload).

use log::debug;
use market_common::quote::{CryptoOrder, CryptoOverview, CryptoQuote, CryptoSearchHit, StockQuote};
use market_common::{MarketError, Result};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub mod coingecko;
pub mod mock;
pub mod yahoo;

/// Source of stock and index quotes.
pub trait StockProvider: Send + Sync {
    /// Short identifier used in logs and metrics.
    fn name(&self) -> &str;

    /// Latest quote for `symbol` (already normalized).
    fn fetch_quote(&self, symbol: &str) -> Result<Option<StockQuote>>;
}

/// Source of cryptocurrency quotes and market data.
pub trait CryptoProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Latest quote for `symbol` (already normalized).
    fn fetch_quote(&self, symbol: &str) -> Result<Option<CryptoQuote>>;

    /// Up to `limit` coins ranked by `order`, best first.
    fn fetch_markets(&self, order: CryptoOrder, limit: usize) -> Result<Vec<CryptoQuote>>;

    /// Global market figures with the largest coins.
    fn fetch_global(&self) -> Result<CryptoOverview>;

    /// Coins whose name or symbol matches `query`.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<CryptoSearchHit>>;
}

/// Blocking HTTP client shared by the live providers.
pub fn http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent("Mozilla/5.0 (X11; Linux x86_64) market-dashboard/0.1")
        .build()?;
    Ok(client)
}

/// Join `segments` onto `base` and append `query` pairs.
pub(crate) fn endpoint(base: &str, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
    let mut url =
        Url::parse(base).map_err(|e| MarketError::InvalidUrl(format!("{base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| MarketError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// GET `url` and decode the JSON body.
///
/// 404 is reported as `Ok(None)`, 429 as `MarketError::RateLimited`, any other
/// non-success status as `MarketError::Status`.
pub(crate) fn get_json<T: DeserializeOwned>(
    client: &Client,
    source: &str,
    url: Url,
) -> Result<Option<T>> {
    debug!("{source}: GET {url}");
    let resp = client.get(url.clone()).send()?;
    let status = resp.status();

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(MarketError::RateLimited(source.to_string()));
    }
    if !status.is_success() {
        return Err(MarketError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = resp.text()?;
    let value = serde_json::from_str(&body)
        .map_err(|e| MarketError::ResponseFormat(format!("{source}: {e}")))?;
    Ok(Some(value))
}
