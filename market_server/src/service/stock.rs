//! Stock quotes, trending lists and regional overviews.

use super::{ServiceConfig, ServiceCore};
use crate::fanout::fetch_all;
use crate::model::sample_data::{sample_stock, sample_trending_stocks};
use crate::model::ttl_cache::TtlCache;
use crate::provider::StockProvider;
use log::{info, warn};
use market_common::Result;
use market_common::quote::{StockOverview, StockQuote, sort_by_change_desc};
use market_common::status::{CacheStats, ServiceMetrics, SourceStatus};
use market_common::symbols::{Region, normalize_symbol};
use std::sync::{Arc, Mutex};

/// Cached, failure-aware access to a [`StockProvider`].
pub struct StockService {
    provider: Arc<dyn StockProvider>,
    cache: Mutex<TtlCache<StockQuote>>,
    core: ServiceCore,
    workers: usize,
}

impl StockService {
    pub fn new(provider: Arc<dyn StockProvider>, config: ServiceConfig) -> Self {
        Self {
            core: ServiceCore::new(provider.name(), &config),
            cache: Mutex::new(TtlCache::new(config.cache_ttl)),
            workers: config.workers,
            provider,
        }
    }

    /// Quote for `symbol`, from cache or provider.
    ///
    /// `Ok(None)` when the symbol is unknown, or when the provider is failing and
    /// nothing was cached for it.
    pub fn get_quote(&self, symbol: &str) -> Result<Option<StockQuote>> {
        let symbol = normalize_symbol(symbol)?;
        self.core
            .lookup(&self.cache, &symbol, || self.provider.fetch_quote(&symbol))
    }

    /// Quotes for several symbols fetched in parallel; unknown symbols are left out.
    pub fn get_quotes(&self, symbols: &[String]) -> Result<Vec<StockQuote>> {
        let symbols = symbols
            .iter()
            .map(|s| normalize_symbol(s))
            .collect::<Result<Vec<_>>>()?;
        let quotes = fetch_all(&symbols, self.workers, |symbol| {
            self.get_quote(symbol).unwrap_or_else(|err| {
                warn!("stock lookup for {symbol} failed: {err}");
                None
            })
        });
        Ok(quotes.into_iter().map(|(_, quote)| quote).collect())
    }

    /// Best performers of `region`, best first, at most `limit` of them.
    ///
    /// When fewer than half of `limit` (at least one) live quotes come back the
    /// list is replaced by sample data.
    pub fn trending(&self, region: Region, limit: usize) -> Result<Vec<StockQuote>> {
        let candidates = region.trending_symbols();
        let scan = (limit * 2).min(candidates.len());
        let symbols: Vec<String> = candidates[..scan].iter().map(|s| s.to_string()).collect();

        let mut quotes = self.get_quotes(&symbols)?;
        if quotes.len() < (limit / 2).max(1) {
            info!(
                "only {} live {region} quotes for trending, serving sample data",
                quotes.len()
            );
            self.core.count_fallback();
            return Ok(sample_trending_stocks(region, limit, &mut rand::rng()));
        }

        sort_by_change_desc(&mut quotes);
        quotes.truncate(limit);
        Ok(quotes)
    }

    /// Indices and headline stocks of `region`.
    pub fn overview(&self, region: Region) -> Result<StockOverview> {
        let indices = self.get_quotes(&owned(region.index_symbols()))?;
        let top_stocks = self.get_quotes(&owned(region.headline_symbols()))?;
        if !top_stocks.is_empty() {
            return Ok(StockOverview::new(region, indices, top_stocks, false));
        }

        info!("no live headline quotes for {region}, serving sample overview");
        self.core.count_fallback();
        let mut rng = rand::rng();
        let samples = region
            .headline_symbols()
            .iter()
            .map(|symbol| sample_stock(symbol, &mut rng))
            .collect();
        Ok(StockOverview::new(region, indices, samples, true))
    }

    /// Drop every cached quote; returns how many were removed.
    pub fn clear_cache(&self) -> Result<usize> {
        self.core.forget_requests()?;
        Ok(self.cache.lock()?.clear())
    }

    pub fn cache_stats(&self) -> Result<CacheStats> {
        Ok(self.cache.lock()?.stats())
    }

    pub fn status(&self) -> Result<SourceStatus> {
        self.core.status()
    }

    pub fn metrics(&self) -> Result<ServiceMetrics> {
        self.core.metrics(self.cache_stats()?)
    }
}

fn owned(symbols: &[&str]) -> Vec<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use market_common::MarketError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Provider answering from a table, optionally failing every call.
    pub(crate) struct ScriptedStocks {
        quotes: HashMap<String, StockQuote>,
        pub(crate) failing: AtomicBool,
        pub(crate) calls: AtomicUsize,
    }

    impl ScriptedStocks {
        pub(crate) fn new(rows: &[(&str, f64, f64)]) -> Self {
            let quotes = rows
                .iter()
                .map(|(symbol, previous, price)| {
                    let quote = StockQuote::from_history(
                        symbol,
                        symbol,
                        &[*previous, *price],
                        &[1_000],
                        "USD",
                        "TEST",
                    )
                    .unwrap();
                    (symbol.to_string(), quote)
                })
                .collect();
            Self {
                quotes,
                failing: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl StockProvider for ScriptedStocks {
        fn name(&self) -> &str {
            "scripted"
        }

        fn fetch_quote(&self, symbol: &str) -> Result<Option<StockQuote>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(MarketError::RateLimited("scripted".into()));
            }
            Ok(self.quotes.get(symbol).cloned())
        }
    }

    pub(crate) fn test_config() -> ServiceConfig {
        ServiceConfig {
            min_request_interval: Duration::ZERO,
            ..ServiceConfig::stocks()
        }
    }

    fn setup(rows: &[(&str, f64, f64)]) -> (Arc<ScriptedStocks>, StockService) {
        let provider = Arc::new(ScriptedStocks::new(rows));
        let service = StockService::new(provider.clone(), test_config());
        (provider, service)
    }

    #[test]
    fn quote_is_cached_after_first_fetch() {
        let (provider, service) = setup(&[("AAPL", 100.0, 110.0)]);
        let first = service.get_quote(" aapl ").unwrap().unwrap();
        let second = service.get_quote("AAPL").unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.cache_stats().unwrap().total_entries, 1);
    }

    #[test]
    fn unknown_and_invalid_symbols() {
        let (_, service) = setup(&[]);
        assert!(service.get_quote("NOPE").unwrap().is_none());
        assert!(matches!(
            service.get_quote("BAD SYMBOL"),
            Err(MarketError::InvalidSymbol(_))
        ));
        assert_eq!(service.status().unwrap(), SourceStatus::Available);
    }

    #[test]
    fn provider_failures_degrade_then_recover() {
        let (provider, service) = setup(&[("AAPL", 100.0, 110.0)]);
        provider.failing.store(true, Ordering::SeqCst);
        assert!(service.get_quote("AAPL").unwrap().is_none());
        assert_eq!(service.status().unwrap(), SourceStatus::Degraded);
        for _ in 0..4 {
            let _ = service.get_quote("AAPL").unwrap();
        }
        assert_eq!(service.status().unwrap(), SourceStatus::Unavailable);

        provider.failing.store(false, Ordering::SeqCst);
        assert!(service.get_quote("AAPL").unwrap().is_some());
        assert_eq!(service.status().unwrap(), SourceStatus::Available);
    }

    #[test]
    fn get_quotes_skips_unknown_symbols() {
        let (_, service) = setup(&[("AAPL", 100.0, 110.0), ("MSFT", 100.0, 90.0)]);
        let symbols = vec!["MSFT".to_string(), "ZZZ".to_string(), "AAPL".to_string()];
        let quotes = service.get_quotes(&symbols).unwrap();
        let found: Vec<&str> = quotes.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(found, ["MSFT", "AAPL"]);
    }

    #[test]
    fn trending_sorts_live_quotes() {
        let (_, service) = setup(&[
            ("AAPL", 100.0, 101.0),
            ("MSFT", 100.0, 105.0),
            ("GOOGL", 100.0, 99.0),
            ("AMZN", 100.0, 103.0),
        ]);
        let trending = service.trending(Region::US, 3).unwrap();
        let order: Vec<&str> = trending.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(order, ["MSFT", "AMZN", "AAPL"]);
        assert!(trending.iter().all(|q| !q.is_sample_data));
    }

    #[test]
    fn trending_single_slot_needs_one_live_quote() {
        let (_, service) = setup(&[("MSFT", 100.0, 104.0)]);
        let trending = service.trending(Region::US, 1).unwrap();
        assert_eq!(trending.len(), 1);
        assert_eq!(trending[0].symbol, "MSFT");
        assert!(!trending[0].is_sample_data);
        assert_eq!(service.metrics().unwrap().fallbacks_served, 0);

        // TSLA is outside the two symbols scanned for a single slot.
        let (_, service) = setup(&[("TSLA", 100.0, 104.0)]);
        let trending = service.trending(Region::US, 1).unwrap();
        assert_eq!(trending.len(), 1);
        assert!(trending[0].is_sample_data);
        assert_eq!(service.metrics().unwrap().fallbacks_served, 1);
    }

    #[test]
    fn trending_falls_back_to_sample_data() {
        let (_, service) = setup(&[("AAPL", 100.0, 101.0)]);
        let trending = service.trending(Region::US, 10).unwrap();
        assert_eq!(trending.len(), 10);
        assert!(trending.iter().all(|q| q.is_sample_data));
        assert_eq!(service.metrics().unwrap().fallbacks_served, 1);
    }

    #[test]
    fn overview_uses_sample_headlines_when_empty() {
        let (_, service) = setup(&[("^BVSP", 120_000.0, 121_000.0)]);
        let overview = service.overview(Region::BR).unwrap();
        assert_eq!(overview.indices.len(), 1);
        assert!(overview.is_sample_data);
        assert_eq!(overview.top_stocks.len(), 4);

        let (_, service) = setup(&[("AAPL", 100.0, 110.0)]);
        let overview = service.overview(Region::US).unwrap();
        assert!(!overview.is_sample_data);
        assert_eq!(overview.top_stocks.len(), 1);
        assert_eq!(overview.average_change, 10.0);
    }

    #[test]
    fn clear_cache_reports_removed_entries() {
        let (provider, service) = setup(&[("AAPL", 100.0, 110.0)]);
        service.get_quote("AAPL").unwrap();
        assert_eq!(service.clear_cache().unwrap(), 1);
        service.get_quote("AAPL").unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
