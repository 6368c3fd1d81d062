//! CoinGecko crypto provider.
//!
//! Uses the public v3 API:
//! - `/coins/{id}` for a detailed quote,
//! - `/search` to resolve symbols missing from the built-in id table (resolved ids
//!   are memoized),
//! - `/coins/markets` for ranked listings,
//! - `/global` for the market overview.
//!
//! CoinGecko can only rank server-side by market cap or volume. Other orderings
//! fetch a wider page by market cap and rank it locally.

use super::{CryptoProvider, endpoint, get_json};
use chrono::Utc;
use log::debug;
use market_common::quote::{
    CryptoOrder, CryptoOverview, CryptoQuote, CryptoSearchHit, round_to,
};
use market_common::symbols::coingecko_id;
use market_common::{MarketError, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// Public base URL of the v3 API.
pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Largest page `/coins/markets` accepts.
const MAX_PAGE: usize = 250;
/// Page fetched when the ranking is applied locally.
const LOCAL_RANK_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct CoinDetail {
    name: String,
    market_cap_rank: Option<u32>,
    image: Option<CoinImage>,
    market_data: Option<CoinMarketData>,
}

#[derive(Debug, Deserialize)]
struct CoinImage {
    small: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinMarketData {
    #[serde(default)]
    current_price: HashMap<String, f64>,
    price_change_percentage_24h: Option<f64>,
    price_change_percentage_7d: Option<f64>,
    price_change_percentage_30d: Option<f64>,
    #[serde(default)]
    market_cap: HashMap<String, f64>,
    #[serde(default)]
    total_volume: HashMap<String, f64>,
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
    max_supply: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MarketCoin {
    symbol: String,
    name: String,
    current_price: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    price_change_percentage_7d_in_currency: Option<f64>,
    price_change_percentage_30d_in_currency: Option<f64>,
    market_cap: Option<f64>,
    total_volume: Option<f64>,
    market_cap_rank: Option<u32>,
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
    max_supply: Option<f64>,
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    coins: Vec<SearchCoin>,
}

#[derive(Debug, Deserialize)]
struct SearchCoin {
    id: String,
    name: String,
    symbol: String,
    thumb: Option<String>,
    market_cap_rank: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GlobalResponse {
    data: GlobalData,
}

#[derive(Debug, Deserialize)]
struct GlobalData {
    #[serde(default)]
    active_cryptocurrencies: u64,
    #[serde(default)]
    markets: u64,
    #[serde(default)]
    total_market_cap: HashMap<String, f64>,
    #[serde(default)]
    total_volume: HashMap<String, f64>,
    #[serde(default)]
    market_cap_percentage: HashMap<String, f64>,
}

/// CoinGecko v3 provider.
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
    /// Ids resolved through `/search`, keyed by upper-case symbol.
    learned_ids: Mutex<HashMap<String, String>>,
}

impl CoinGeckoProvider {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            learned_ids: Mutex::new(HashMap::new()),
        }
    }

    fn resolve_id(&self, symbol: &str) -> Result<Option<String>> {
        if let Some(id) = coingecko_id(symbol) {
            return Ok(Some(id.to_string()));
        }
        if let Some(id) = self.learned_ids.lock()?.get(symbol) {
            return Ok(Some(id.clone()));
        }

        let Some(found) = self.search_coins(symbol)? else {
            return Ok(None);
        };
        let hit = found
            .coins
            .iter()
            .find(|coin| coin.symbol.eq_ignore_ascii_case(symbol))
            .or_else(|| found.coins.first());
        let Some(hit) = hit else {
            return Ok(None);
        };

        debug!("coingecko: resolved {symbol} to {}", hit.id);
        self.learned_ids
            .lock()?
            .insert(symbol.to_string(), hit.id.clone());
        Ok(Some(hit.id.clone()))
    }

    fn search_coins(&self, query: &str) -> Result<Option<SearchResponse>> {
        let url = endpoint(&self.base_url, &["search"], &[("query", query)])?;
        get_json(&self.client, self.name(), url)
    }

    fn quote_from_detail(symbol: &str, detail: CoinDetail) -> Result<CryptoQuote> {
        let market = detail.market_data.ok_or_else(|| {
            MarketError::ResponseFormat(format!("no market data for {symbol}"))
        })?;
        let price = *market.current_price.get("usd").ok_or_else(|| {
            MarketError::ResponseFormat(format!("no USD price for {symbol}"))
        })?;

        let mut quote = CryptoQuote::from_price(
            symbol,
            &detail.name,
            price,
            market.price_change_percentage_24h.unwrap_or(0.0),
        );
        quote.change_percent_7d = market.price_change_percentage_7d.map(|v| round_to(v, 2));
        quote.change_percent_30d = market.price_change_percentage_30d.map(|v| round_to(v, 2));
        quote.market_cap = market.market_cap.get("usd").copied();
        quote.volume_24h = market.total_volume.get("usd").copied();
        quote.circulating_supply = market.circulating_supply;
        quote.total_supply = market.total_supply;
        quote.max_supply = market.max_supply;
        quote.market_cap_rank = detail.market_cap_rank;
        quote.image = detail.image.and_then(|image| image.small);
        Ok(quote)
    }

    fn quote_from_market(coin: MarketCoin) -> Option<CryptoQuote> {
        let price = coin.current_price?;
        let mut quote = CryptoQuote::from_price(
            &coin.symbol,
            &coin.name,
            price,
            coin.price_change_percentage_24h.unwrap_or(0.0),
        );
        quote.change_percent_7d = coin
            .price_change_percentage_7d_in_currency
            .map(|v| round_to(v, 2));
        quote.change_percent_30d = coin
            .price_change_percentage_30d_in_currency
            .map(|v| round_to(v, 2));
        quote.market_cap = coin.market_cap;
        quote.volume_24h = coin.total_volume;
        quote.market_cap_rank = coin.market_cap_rank;
        quote.circulating_supply = coin.circulating_supply;
        quote.total_supply = coin.total_supply;
        quote.max_supply = coin.max_supply;
        quote.image = coin.image;
        Some(quote)
    }

    /// Server-side ordering and page size for a requested ranking.
    fn market_query(order: CryptoOrder, limit: usize) -> (&'static str, usize) {
        let limit = limit.clamp(1, MAX_PAGE);
        match order {
            CryptoOrder::MarketCap => ("market_cap_desc", limit),
            CryptoOrder::Volume => ("volume_desc", limit),
            CryptoOrder::PercentChange24h | CryptoOrder::Price => {
                ("market_cap_desc", limit.max(LOCAL_RANK_PAGE))
            }
        }
    }

    fn overview_from(global: GlobalData, top_cryptos: Vec<CryptoQuote>) -> CryptoOverview {
        let usd = |map: &HashMap<String, f64>| map.get("usd").copied().unwrap_or(0.0);
        let share = |coin: &str| {
            round_to(
                global.market_cap_percentage.get(coin).copied().unwrap_or(0.0),
                2,
            )
        };
        CryptoOverview {
            total_market_cap: usd(&global.total_market_cap),
            total_volume_24h: usd(&global.total_volume),
            btc_dominance: share("btc"),
            eth_dominance: share("eth"),
            active_cryptocurrencies: global.active_cryptocurrencies,
            markets: global.markets,
            top_cryptos,
            last_updated: Utc::now(),
        }
    }
}

impl CryptoProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        "coingecko"
    }

    fn fetch_quote(&self, symbol: &str) -> Result<Option<CryptoQuote>> {
        let Some(id) = self.resolve_id(symbol)? else {
            return Ok(None);
        };
        let url = endpoint(
            &self.base_url,
            &["coins", id.as_str()],
            &[
                ("localization", "false"),
                ("tickers", "false"),
                ("market_data", "true"),
                ("community_data", "false"),
                ("developer_data", "false"),
                ("sparkline", "false"),
            ],
        )?;
        match get_json::<CoinDetail>(&self.client, self.name(), url)? {
            Some(detail) => Self::quote_from_detail(symbol, detail).map(Some),
            None => Ok(None),
        }
    }

    fn fetch_markets(&self, order: CryptoOrder, limit: usize) -> Result<Vec<CryptoQuote>> {
        let (api_order, per_page) = Self::market_query(order, limit);
        let per_page = per_page.to_string();
        let url = endpoint(
            &self.base_url,
            &["coins", "markets"],
            &[
                ("vs_currency", "usd"),
                ("order", api_order),
                ("per_page", per_page.as_str()),
                ("page", "1"),
                ("sparkline", "false"),
                ("price_change_percentage", "24h,7d,30d"),
            ],
        )?;
        let coins: Vec<MarketCoin> = get_json(&self.client, self.name(), url)?
            .ok_or_else(|| MarketError::ResponseFormat("coins/markets not found".into()))?;

        let mut quotes: Vec<CryptoQuote> =
            coins.into_iter().filter_map(Self::quote_from_market).collect();
        order.sort(&mut quotes);
        quotes.truncate(limit.clamp(1, MAX_PAGE));
        Ok(quotes)
    }

    fn fetch_global(&self) -> Result<CryptoOverview> {
        let url = endpoint(&self.base_url, &["global"], &[])?;
        let global: GlobalResponse = get_json(&self.client, self.name(), url)?
            .ok_or_else(|| MarketError::ResponseFormat("global not found".into()))?;
        let top = self.fetch_markets(CryptoOrder::MarketCap, 5)?;
        Ok(Self::overview_from(global.data, top))
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<CryptoSearchHit>> {
        let Some(found) = self.search_coins(query)? else {
            return Ok(Vec::new());
        };
        Ok(found
            .coins
            .into_iter()
            .take(limit)
            .map(|coin| CryptoSearchHit {
                id: coin.id,
                name: coin.name,
                symbol: coin.symbol.to_ascii_uppercase(),
                thumb: coin.thumb,
                market_cap_rank: coin.market_cap_rank,
            })
            .collect())
    }
}
