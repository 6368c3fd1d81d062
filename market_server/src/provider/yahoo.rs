//! Yahoo Finance stock provider.
//!
//! Fetches the last five daily bars from Yahoo's v8 chart API and derives the quote
//! (price, previous close, SMA, volatility) from them. Yahoo Finance has no official
//! API and is subject to unannounced format changes; unknown shapes surface as
//! `MarketError::ResponseFormat` so the service can fall back.

use super::{StockProvider, endpoint, get_json};
use market_common::quote::StockQuote;
use market_common::{MarketError, Result};
use reqwest::blocking::Client;
use serde::Deserialize;

/// Public base URL of the chart API.
pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    currency: Option<String>,
    exchange_name: Option<String>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Yahoo Finance chart API provider.
pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }

    /// Turn a chart payload into a quote.
    ///
    /// Sessions without a close (holidays, the current session before the open) are
    /// skipped. A "Not Found" chart error or an empty close series means Yahoo does
    /// not know the symbol.
    fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Option<StockQuote>> {
        let Some(results) = resp.chart.result else {
            return match resp.chart.error {
                Some(err) if err.code == "Not Found" => Ok(None),
                Some(err) => Err(MarketError::ResponseFormat(format!(
                    "{}: {}",
                    err.code, err.description
                ))),
                None => Err(MarketError::ResponseFormat(
                    "empty chart result with no error".into(),
                )),
            };
        };

        let Some(data) = results.into_iter().next() else {
            return Ok(None);
        };
        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| MarketError::ResponseFormat("no quote indicators".into()))?;

        let mut closes = Vec::with_capacity(quote.close.len());
        let mut volumes = Vec::with_capacity(quote.close.len());
        for (i, close) in quote.close.iter().enumerate() {
            if let Some(close) = close {
                closes.push(*close);
                volumes.push(quote.volume.get(i).copied().flatten().unwrap_or(0));
            }
        }

        let meta = data.meta;
        let name = meta
            .long_name
            .or(meta.short_name)
            .unwrap_or_else(|| symbol.to_string());
        Ok(StockQuote::from_history(
            symbol,
            &name,
            &closes,
            &volumes,
            meta.currency.as_deref().unwrap_or("USD"),
            meta.exchange_name.as_deref().unwrap_or(""),
        ))
    }
}

impl StockProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_quote(&self, symbol: &str) -> Result<Option<StockQuote>> {
        let url = endpoint(
            &self.base_url,
            &["v8", "finance", "chart", symbol],
            &[("range", "5d"), ("interval", "1d")],
        )?;
        match get_json::<ChartResponse>(&self.client, self.name(), url)? {
            Some(chart) => Self::parse_chart(symbol, chart),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(symbol: &str, json: &str) -> Result<Option<StockQuote>> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_chart(symbol, resp)
    }

    #[test]
    fn parses_chart_and_skips_null_sessions() {
        let json = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "currency": "USD",
                        "symbol": "AAPL",
                        "exchangeName": "NMS",
                        "longName": "Apple Inc.",
                        "regularMarketPrice": 190.0
                    },
                    "timestamp": [1, 2, 3, 4],
                    "indicators": {
                        "quote": [{
                            "open": [1.0, 2.0, 3.0, 4.0],
                            "close": [180.0, null, 185.0, 190.0],
                            "volume": [100, null, 300, 400]
                        }]
                    }
                }],
                "error": null
            }
        }"#;
        let quote = parse("AAPL", json).unwrap().unwrap();
        assert_eq!(quote.name, "Apple Inc.");
        assert_eq!(quote.exchange, "NMS");
        assert_eq!(quote.price, 190.0);
        assert_eq!(quote.previous_close, 185.0);
        assert_eq!(quote.volume, 400);
        assert_eq!(quote.sma_5, 185.0);
    }

    #[test]
    fn falls_back_to_short_name_and_defaults() {
        let json = r#"{"chart": {"result": [{
            "meta": {"shortName": "PETROBRAS PN"},
            "indicators": {"quote": [{"close": [30.0, 31.5]}]}
        }], "error": null}}"#;
        let quote = parse("PETR4.SA", json).unwrap().unwrap();
        assert_eq!(quote.name, "PETROBRAS PN");
        assert_eq!(quote.currency, "USD");
        assert_eq!(quote.volume, 0);
    }

    #[test]
    fn not_found_error_means_unknown_symbol() {
        let json = r#"{"chart": {"result": null,
            "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        assert!(parse("NOPE", json).unwrap().is_none());
    }

    #[test]
    fn other_chart_errors_are_format_errors() {
        let json = r#"{"chart": {"result": null,
            "error": {"code": "Bad Request", "description": "Invalid input"}}}"#;
        let err = parse("X", json).unwrap_err();
        assert!(matches!(err, MarketError::ResponseFormat(msg) if msg.contains("Bad Request")));
    }

    #[test]
    fn empty_close_series_is_unknown_symbol() {
        let json = r#"{"chart": {"result": [{
            "meta": {},
            "indicators": {"quote": [{"close": [null, null]}]}
        }], "error": null}}"#;
        assert!(parse("X", json).unwrap().is_none());
    }
}
