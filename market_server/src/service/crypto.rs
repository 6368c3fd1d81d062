//! Crypto quotes, ranked listings, global overview and coin search.

use super::{ServiceConfig, ServiceCore, merge_stats};
use crate::fanout::fetch_all;
use crate::model::sample_data::sample_trending_cryptos;
use crate::model::ttl_cache::TtlCache;
use crate::provider::CryptoProvider;
use log::{info, warn};
use market_common::Result;
use market_common::quote::{CryptoOrder, CryptoOverview, CryptoQuote, CryptoSearchHit};
use market_common::status::{CacheStats, ServiceMetrics, SourceStatus};
use market_common::symbols::normalize_symbol;
use std::sync::{Arc, Mutex};

const OVERVIEW_KEY: &str = "global";

/// Cached, failure-aware access to a [`CryptoProvider`].
pub struct CryptoService {
    provider: Arc<dyn CryptoProvider>,
    quotes: Mutex<TtlCache<CryptoQuote>>,
    /// Ranked listings keyed by `{order}:{limit}`.
    listings: Mutex<TtlCache<Vec<CryptoQuote>>>,
    overview: Mutex<TtlCache<CryptoOverview>>,
    core: ServiceCore,
    workers: usize,
}

impl CryptoService {
    pub fn new(provider: Arc<dyn CryptoProvider>, config: ServiceConfig) -> Self {
        Self {
            core: ServiceCore::new(provider.name(), &config),
            quotes: Mutex::new(TtlCache::new(config.cache_ttl)),
            listings: Mutex::new(TtlCache::new(config.cache_ttl)),
            overview: Mutex::new(TtlCache::new(config.cache_ttl)),
            workers: config.workers,
            provider,
        }
    }

    pub fn get_quote(&self, symbol: &str) -> Result<Option<CryptoQuote>> {
        let symbol = normalize_symbol(symbol)?;
        self.core
            .lookup(&self.quotes, &symbol, || self.provider.fetch_quote(&symbol))
    }

    pub fn get_quotes(&self, symbols: &[String]) -> Result<Vec<CryptoQuote>> {
        let symbols = symbols
            .iter()
            .map(|s| normalize_symbol(s))
            .collect::<Result<Vec<_>>>()?;
        let quotes = fetch_all(&symbols, self.workers, |symbol| {
            self.get_quote(symbol).unwrap_or_else(|err| {
                warn!("crypto lookup for {symbol} failed: {err}");
                None
            })
        });
        Ok(quotes.into_iter().map(|(_, quote)| quote).collect())
    }

    /// Top `limit` coins ranked by `order`.
    ///
    /// A failed or empty provider answer is replaced by the last listing for the same
    /// key, or by sample data when there is none.
    pub fn trending(&self, limit: usize, order: CryptoOrder) -> Result<Vec<CryptoQuote>> {
        let key = format!("{order}:{limit}");
        if let Some(listing) = self.listings.lock()?.get_fresh(&key) {
            return Ok(listing);
        }

        match self.provider.fetch_markets(order, limit) {
            Ok(listing) if !listing.is_empty() => {
                self.core.record_success()?;
                self.listings.lock()?.insert(&key, listing.clone());
                return Ok(listing);
            }
            Ok(_) => {
                self.core.record_success()?;
                info!("empty crypto listing for {key}");
            }
            Err(err) => self.core.record_failure(&key, &err)?,
        }

        self.core.count_fallback();
        if let Some(stale) = self.listings.lock()?.get_any(&key) {
            return Ok(stale);
        }
        info!("serving sample crypto listing for {key}");
        Ok(sample_trending_cryptos(limit, order, &mut rand::rng()))
    }

    /// Global market figures; `None` when the provider fails and nothing is cached.
    pub fn overview(&self) -> Result<Option<CryptoOverview>> {
        if let Some(overview) = self.overview.lock()?.get_fresh(OVERVIEW_KEY) {
            return Ok(Some(overview));
        }

        match self.provider.fetch_global() {
            Ok(overview) => {
                self.core.record_success()?;
                self.overview.lock()?.insert(OVERVIEW_KEY, overview.clone());
                Ok(Some(overview))
            }
            Err(err) => {
                self.core.record_failure(OVERVIEW_KEY, &err)?;
                let stale = self.overview.lock()?.get_any(OVERVIEW_KEY);
                if stale.is_some() {
                    self.core.count_fallback();
                }
                Ok(stale)
            }
        }
    }

    /// Coins matching `query`; provider errors yield an empty list.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<CryptoSearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        match self.provider.search(query, limit) {
            Ok(hits) => {
                self.core.record_success()?;
                Ok(hits)
            }
            Err(err) => {
                self.core.record_failure("search", &err)?;
                Ok(Vec::new())
            }
        }
    }

    /// Drop quotes, listings and the overview; returns how many entries were removed.
    pub fn clear_cache(&self) -> Result<usize> {
        self.core.forget_requests()?;
        let removed = self.quotes.lock()?.clear()
            + self.listings.lock()?.clear()
            + self.overview.lock()?.clear();
        Ok(removed)
    }

    pub fn cache_stats(&self) -> Result<CacheStats> {
        Ok(merge_stats(&[
            self.quotes.lock()?.stats(),
            self.listings.lock()?.stats(),
            self.overview.lock()?.stats(),
        ]))
    }

    pub fn status(&self) -> Result<SourceStatus> {
        self.core.status()
    }

    pub fn metrics(&self) -> Result<ServiceMetrics> {
        self.core.metrics(self.cache_stats()?)
    }
}
