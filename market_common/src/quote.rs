//! Quote data models served by the dashboard.
//!
//! A `StockQuote` is built from a short daily close history, a `CryptoQuote` from a
//! current price and its 24h change. Both carry an `is_sample_data` flag so that
//! synthetic fallback values are never mistaken for live ones.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::symbols::Region;

/// Rounds `value` to `decimals` digits after the point.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Crypto prices below one unit keep eight decimals, everything else two.
pub fn round_crypto_price(value: f64) -> f64 {
    if value.abs() < 1.0 {
        round_to(value, 8)
    } else {
        round_to(value, 2)
    }
}

/// Percentage change from `previous` to `current`; zero when `previous` is not positive.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    }
}

/// Market quote for a single stock or index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    /// Upper-case symbol (e.g., `AAPL`, `PETR4.SA`, `^GSPC`).
    pub symbol: String,
    /// Company or index name.
    pub name: String,
    /// Last close.
    pub price: f64,
    /// Close of the session before the last one.
    pub previous_close: f64,
    /// `price - previous_close`.
    pub change_amount: f64,
    /// Change against the previous close, in percent.
    pub change_percent: f64,
    /// Not every source reports it.
    pub market_cap: Option<f64>,
    /// Volume of the last session.
    pub volume: u64,
    /// Simple moving average over the last five closes.
    pub sma_5: f64,
    /// Standard deviation of daily percentage changes, in percent.
    pub volatility: f64,
    /// ISO currency code of the prices.
    pub currency: String,
    /// Exchange code as reported by the provider.
    pub exchange: String,
    /// When the quote was built.
    pub last_updated: DateTime<Utc>,
    /// `true` when the values were synthesized because the provider failed.
    #[serde(default)]
    pub is_sample_data: bool,
}

impl StockQuote {
    /// Builds a quote from daily closes and volumes, oldest first.
    ///
    /// Returns `None` when `closes` is empty.
    pub fn from_history(
        symbol: &str,
        name: &str,
        closes: &[f64],
        volumes: &[u64],
        currency: &str,
        exchange: &str,
    ) -> Option<Self> {
        let price = *closes.last()?;
        let previous_close = if closes.len() > 1 {
            closes[closes.len() - 2]
        } else {
            price
        };

        let window = &closes[closes.len().saturating_sub(5)..];
        let sma_5 = window.iter().sum::<f64>() / window.len() as f64;

        Some(StockQuote {
            symbol: symbol.to_ascii_uppercase(),
            name: name.to_string(),
            price: round_to(price, 2),
            previous_close: round_to(previous_close, 2),
            change_amount: round_to(price - previous_close, 2),
            change_percent: round_to(percent_change(price, previous_close), 2),
            market_cap: None,
            volume: volumes.last().copied().unwrap_or(0),
            sma_5: round_to(sma_5, 2),
            volatility: round_to(volatility(closes), 2),
            currency: currency.to_string(),
            exchange: exchange.to_string(),
            last_updated: Utc::now(),
            is_sample_data: false,
        })
    }

    /// `true` when the last session closed higher than the one before.
    pub fn is_gaining(&self) -> bool {
        self.change_amount > 0.0
    }
}

/// Sample standard deviation of day-over-day percentage changes, in percent.
///
/// Fewer than two changes carry no dispersion information and yield zero.
fn volatility(closes: &[f64]) -> f64 {
    let changes: Vec<f64> = closes
        .windows(2)
        .filter(|pair| pair[0] != 0.0)
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect();
    if changes.len() < 2 {
        return 0.0;
    }
    let mean = changes.iter().sum::<f64>() / changes.len() as f64;
    let variance = changes.iter().map(|c| (c - mean).powi(2)).sum::<f64>()
        / (changes.len() - 1) as f64;
    variance.sqrt() * 100.0
}

/// Market quote for a single cryptocurrency, priced in USD.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoQuote {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    /// Price 24 hours ago, derived from the 24h change.
    pub previous_close: f64,
    pub change_amount: f64,
    pub change_percent_24h: f64,
    pub change_percent_7d: Option<f64>,
    pub change_percent_30d: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub market_cap_rank: Option<u32>,
    /// Logo URL.
    pub image: Option<String>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub is_sample_data: bool,
}

impl CryptoQuote {
    /// Builds a quote from the current USD price and its 24h percentage change.
    ///
    /// All optional market fields start empty; callers fill in what their source
    /// reports.
    pub fn from_price(symbol: &str, name: &str, price: f64, change_percent_24h: f64) -> Self {
        let previous_close = if change_percent_24h != 0.0 {
            price / (1.0 + change_percent_24h / 100.0)
        } else {
            price
        };
        let change_amount = price - previous_close;

        CryptoQuote {
            symbol: symbol.to_ascii_uppercase(),
            name: name.to_string(),
            price: round_crypto_price(price),
            previous_close: round_crypto_price(previous_close),
            change_amount: if price.abs() < 1.0 {
                round_to(change_amount, 8)
            } else {
                round_to(change_amount, 2)
            },
            change_percent_24h: round_to(change_percent_24h, 2),
            change_percent_7d: None,
            change_percent_30d: None,
            market_cap: None,
            volume_24h: None,
            circulating_supply: None,
            total_supply: None,
            max_supply: None,
            market_cap_rank: None,
            image: None,
            last_updated: Utc::now(),
            is_sample_data: false,
        }
    }

    /// `true` when the price rose over the last 24 hours.
    pub fn is_gaining(&self) -> bool {
        self.change_amount > 0.0
    }
}

/// Ranking key for crypto listings; every ordering is descending.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[clap(rename_all = "snake_case")]
pub enum CryptoOrder {
    /// Change over the last 24 hours.
    #[default]
    #[strum(serialize = "percent_change_24h")]
    #[serde(rename = "percent_change_24h")]
    #[value(name = "percent_change_24h")]
    PercentChange24h,
    /// Market capitalization.
    MarketCap,
    /// Traded volume over the last 24 hours.
    Volume,
    /// USD price.
    Price,
}

impl CryptoOrder {
    fn key(self, quote: &CryptoQuote) -> f64 {
        match self {
            CryptoOrder::PercentChange24h => quote.change_percent_24h,
            CryptoOrder::MarketCap => quote.market_cap.unwrap_or(0.0),
            CryptoOrder::Volume => quote.volume_24h.unwrap_or(0.0),
            CryptoOrder::Price => quote.price,
        }
    }

    /// Sorts `quotes` by this key, largest first. The sort is stable.
    pub fn sort(self, quotes: &mut [CryptoQuote]) {
        quotes.sort_by(|a, b| self.key(b).total_cmp(&self.key(a)));
    }
}

/// Sorts stocks by percentage change, best performer first.
pub fn sort_by_change_desc(quotes: &mut [StockQuote]) {
    quotes.sort_by(|a, b| b.change_percent.total_cmp(&a.change_percent));
}

/// Search hit returned by the crypto provider's search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoSearchHit {
    /// Provider-specific coin id.
    pub id: String,
    /// Coin name.
    pub name: String,
    /// Ticker symbol, upper case.
    pub symbol: String,
    /// Small logo URL.
    pub thumb: Option<String>,
    /// Rank by market cap, when the coin is ranked.
    pub market_cap_rank: Option<u32>,
}

/// Snapshot of a stock market region: indices plus headline stocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockOverview {
    /// Region the overview covers.
    pub region: Region,
    /// Index quotes, e.g. S&P 500 or Ibovespa.
    pub indices: Vec<StockQuote>,
    /// Headline stocks of the region.
    pub top_stocks: Vec<StockQuote>,
    /// Sum of the headline stocks' session volume.
    pub total_volume: u64,
    /// Mean change of the headline stocks, in percent.
    pub average_change: f64,
    /// `true` when any part was synthesized.
    pub is_sample_data: bool,
    /// When the overview was assembled.
    pub timestamp: DateTime<Utc>,
}

impl StockOverview {
    /// Aggregates volume and average change over `top_stocks`.
    pub fn new(
        region: Region,
        indices: Vec<StockQuote>,
        top_stocks: Vec<StockQuote>,
        is_sample_data: bool,
    ) -> Self {
        let total_volume = top_stocks.iter().map(|s| s.volume).sum();
        let average_change = if top_stocks.is_empty() {
            0.0
        } else {
            top_stocks.iter().map(|s| s.change_percent).sum::<f64>() / top_stocks.len() as f64
        };
        StockOverview {
            region,
            indices,
            top_stocks,
            total_volume,
            average_change: round_to(average_change, 2),
            is_sample_data,
            timestamp: Utc::now(),
        }
    }
}

/// Global crypto market figures.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoOverview {
    pub total_market_cap: f64,
    pub total_volume_24h: f64,
    pub btc_dominance: f64,
    pub eth_dominance: f64,
    pub active_cryptocurrencies: u64,
    pub markets: u64,
    /// Largest coins by market cap, at most five.
    pub top_cryptos: Vec<CryptoQuote>,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn stock_from_history_computes_changes() {
        let closes = [100.0, 102.0, 101.0, 103.0, 110.0];
        let volumes = [10, 20, 30, 40, 50];
        let quote = StockQuote::from_history("aapl", "Apple", &closes, &volumes, "USD", "NMS")
            .unwrap();

        assert_eq!(quote.symbol, "AAPL");
        assert!(approx(quote.price, 110.0));
        assert!(approx(quote.previous_close, 103.0));
        assert!(approx(quote.change_amount, 7.0));
        assert!(approx(quote.change_percent, 6.8));
        assert!(approx(quote.sma_5, 103.2));
        assert_eq!(quote.volume, 50);
        assert!(quote.volatility > 0.0);
        assert!(quote.is_gaining());
        assert!(!quote.is_sample_data);
    }

    #[test]
    fn stock_from_single_close() {
        let quote = StockQuote::from_history("X", "X", &[42.0], &[], "USD", "").unwrap();
        assert!(approx(quote.previous_close, 42.0));
        assert!(approx(quote.change_percent, 0.0));
        assert!(approx(quote.volatility, 0.0));
        assert_eq!(quote.volume, 0);
        assert!(!quote.is_gaining());
    }

    #[test]
    fn stock_from_empty_history_is_none() {
        assert!(StockQuote::from_history("X", "X", &[], &[], "USD", "").is_none());
    }

    #[test]
    fn volatility_uses_sample_deviation() {
        // Changes: +10%, -10% -> mean 0, sample variance 0.02, std 0.1414...
        let closes = [100.0, 110.0, 99.0];
        let v = volatility(&closes);
        assert!((v - 14.142135623730951).abs() < 1e-6);
    }

    #[test]
    fn sma_uses_only_last_five_closes() {
        let closes = [1000.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        let quote = StockQuote::from_history("X", "X", &closes, &[], "USD", "").unwrap();
        assert!(approx(quote.sma_5, 10.0));
    }

    #[test]
    fn crypto_previous_close_from_change() {
        let quote = CryptoQuote::from_price("btc", "Bitcoin", 110.0, 10.0);
        assert_eq!(quote.symbol, "BTC");
        assert!(approx(quote.previous_close, 100.0));
        assert!(approx(quote.change_amount, 10.0));
        assert!(quote.is_gaining());
    }

    #[test]
    fn crypto_without_change_keeps_price() {
        let quote = CryptoQuote::from_price("USDT", "Tether", 1.0, 0.0);
        assert!(approx(quote.previous_close, 1.0));
        assert!(approx(quote.change_amount, 0.0));
    }

    #[test]
    fn crypto_small_prices_keep_eight_decimals() {
        let quote = CryptoQuote::from_price("SHIB", "Shiba Inu", 0.0000123456789, 0.0);
        assert!(approx(quote.price, 0.00001235));
        let quote = CryptoQuote::from_price("ETH", "Ethereum", 3200.456, 0.0);
        assert!(approx(quote.price, 3200.46));
    }

    #[test]
    fn overview_aggregates_headline_stocks() {
        let mk = |symbol: &str, closes: &[f64], volume: u64| {
            StockQuote::from_history(symbol, symbol, closes, &[volume], "USD", "").unwrap()
        };
        let stocks = vec![mk("A", &[100.0, 110.0], 5), mk("B", &[100.0, 90.0], 7)];
        let overview = StockOverview::new(Region::US, Vec::new(), stocks, false);
        assert_eq!(overview.total_volume, 12);
        assert!(approx(overview.average_change, 0.0));

        let empty = StockOverview::new(Region::BR, Vec::new(), Vec::new(), true);
        assert_eq!(empty.total_volume, 0);
        assert!(approx(empty.average_change, 0.0));
    }

    #[test]
    fn crypto_order_parses_and_sorts() {
        assert_eq!(
            "percent_change_24h".parse::<CryptoOrder>().unwrap(),
            CryptoOrder::PercentChange24h
        );
        assert_eq!("market_cap".parse::<CryptoOrder>().unwrap(), CryptoOrder::MarketCap);
        assert_eq!(CryptoOrder::Volume.to_string(), "volume");
        assert!("rank".parse::<CryptoOrder>().is_err());

        let mut a = CryptoQuote::from_price("A", "A", 10.0, 1.0);
        a.market_cap = Some(5.0);
        let mut b = CryptoQuote::from_price("B", "B", 5.0, 9.0);
        b.market_cap = Some(50.0);
        let c = CryptoQuote::from_price("C", "C", 20.0, -3.0);

        let mut quotes = vec![a.clone(), b.clone(), c.clone()];
        CryptoOrder::PercentChange24h.sort(&mut quotes);
        assert_eq!(symbols(&quotes), ["B", "A", "C"]);
        CryptoOrder::Price.sort(&mut quotes);
        assert_eq!(symbols(&quotes), ["C", "A", "B"]);
        CryptoOrder::MarketCap.sort(&mut quotes);
        assert_eq!(symbols(&quotes), ["B", "A", "C"]);
    }

    fn symbols(quotes: &[CryptoQuote]) -> Vec<&str> {
        quotes.iter().map(|q| q.symbol.as_str()).collect()
    }

    #[test]
    fn stocks_sort_by_change() {
        let mk = |symbol: &str, last: f64| {
            StockQuote::from_history(symbol, symbol, &[100.0, last], &[], "USD", "").unwrap()
        };
        let mut quotes = vec![mk("LOW", 90.0), mk("HIGH", 120.0), mk("MID", 101.0)];
        sort_by_change_desc(&mut quotes);
        let order: Vec<&str> = quotes.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(order, ["HIGH", "MID", "LOW"]);
    }

    #[test]
    fn percent_change_guards_zero_previous() {
        assert!(approx(percent_change(5.0, 0.0), 0.0));
        assert!(approx(percent_change(5.0, 4.0), 25.0));
    }
}
