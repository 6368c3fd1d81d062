//! Demo providers backed by fixed tables.
//!
//! Selected with `--use-mock-data`, they let the dashboard run without network
//! access. Prices get a small random jitter at construction time so the page does
//! not look frozen between restarts.

use super::{CryptoProvider, StockProvider};
use chrono::Utc;
use market_common::Result;
use market_common::quote::{CryptoOrder, CryptoOverview, CryptoQuote, CryptoSearchHit, StockQuote};
use rand::Rng;
use std::collections::HashMap;

/// Fixed demo stock table.
pub struct MockStockProvider {
    quotes: HashMap<String, StockQuote>,
}

impl MockStockProvider {
    pub fn new() -> Self {
        let mut rng = rand::rng();
        let rows: [(&str, &str, f64, f64, f64, f64); 3] = [
            ("AAPL", "Apple Inc.", 175.50, 172.30, 5.0, 2.8e12),
            ("GOOGL", "Alphabet Inc.", 2450.75, 2425.60, 50.0, 1.6e12),
            ("MSFT", "Microsoft Corporation", 335.20, 330.15, 10.0, 2.5e12),
        ];

        let quotes = rows
            .into_iter()
            .filter_map(|(symbol, name, price, previous, jitter, market_cap)| {
                let price = price + rng.random_range(-jitter..jitter);
                let volume = rng.random_range(20_000_000..55_000_000);
                let mut quote = StockQuote::from_history(
                    symbol,
                    name,
                    &[previous, price],
                    &[volume],
                    "USD",
                    "NASDAQ",
                )?;
                quote.market_cap = Some(market_cap);
                Some((symbol.to_string(), quote))
            })
            .collect();
        Self { quotes }
    }
}

impl Default for MockStockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StockProvider for MockStockProvider {
    fn name(&self) -> &str {
        "mock_stocks"
    }

    fn fetch_quote(&self, symbol: &str) -> Result<Option<StockQuote>> {
        Ok(self.quotes.get(symbol).cloned().map(|mut quote| {
            quote.last_updated = Utc::now();
            quote
        }))
    }
}

/// Fixed demo crypto table.
pub struct MockCryptoProvider {
    quotes: Vec<CryptoQuote>,
}

impl MockCryptoProvider {
    pub fn new() -> Self {
        let mut rng = rand::rng();
        let rows: [(&str, &str, f64, f64, f64, f64); 5] = [
            ("BTC", "Bitcoin", 45000.50, 2000.0, 8.5e11, 2.5e10),
            ("ETH", "Ethereum", 3200.75, 200.0, 3.8e11, 1.5e10),
            ("ADA", "Cardano", 1.25, 0.2, 4.0e10, 2.0e9),
            ("DOT", "Polkadot", 25.30, 3.0, 2.5e10, 1.0e9),
            ("LINK", "Chainlink", 18.75, 2.0, 9.0e9, 5.5e8),
        ];

        let quotes = rows
            .into_iter()
            .enumerate()
            .map(|(rank, (symbol, name, price, jitter, market_cap, volume))| {
                let price = price + rng.random_range(-jitter..jitter);
                let change = rng.random_range(-3.0..8.0);
                let mut quote = CryptoQuote::from_price(symbol, name, price, change);
                quote.market_cap = Some(market_cap);
                quote.volume_24h = Some(volume);
                quote.market_cap_rank = Some(rank as u32 + 1);
                quote
            })
            .collect();
        Self { quotes }
    }
}

impl Default for MockCryptoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoProvider for MockCryptoProvider {
    fn name(&self) -> &str {
        "mock_crypto"
    }

    fn fetch_quote(&self, symbol: &str) -> Result<Option<CryptoQuote>> {
        Ok(self.quotes.iter().find(|q| q.symbol == symbol).cloned())
    }

    fn fetch_markets(&self, order: CryptoOrder, limit: usize) -> Result<Vec<CryptoQuote>> {
        let mut quotes = self.quotes.clone();
        order.sort(&mut quotes);
        quotes.truncate(limit);
        Ok(quotes)
    }

    fn fetch_global(&self) -> Result<CryptoOverview> {
        let total_market_cap: f64 = self.quotes.iter().filter_map(|q| q.market_cap).sum();
        let share = |symbol: &str| {
            self.quotes
                .iter()
                .find(|q| q.symbol == symbol)
                .and_then(|q| q.market_cap)
                .map(|cap| market_common::quote::round_to(cap / total_market_cap * 100.0, 2))
                .unwrap_or(0.0)
        };
        Ok(CryptoOverview {
            total_market_cap,
            total_volume_24h: self.quotes.iter().filter_map(|q| q.volume_24h).sum(),
            btc_dominance: share("BTC"),
            eth_dominance: share("ETH"),
            active_cryptocurrencies: self.quotes.len() as u64,
            markets: 1,
            top_cryptos: self.fetch_markets(CryptoOrder::MarketCap, 5)?,
            last_updated: Utc::now(),
        })
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<CryptoSearchHit>> {
        let needle = query.trim().to_ascii_lowercase();
        Ok(self
            .quotes
            .iter()
            .filter(|q| {
                q.symbol.to_ascii_lowercase().contains(&needle)
                    || q.name.to_ascii_lowercase().contains(&needle)
            })
            .take(limit)
            .map(|q| CryptoSearchHit {
                id: q.name.to_ascii_lowercase(),
                name: q.name.clone(),
                symbol: q.symbol.clone(),
                thumb: None,
                market_cap_rank: q.market_cap_rank,
            })
            .collect())
    }
}
