//! Blocking client of the dashboard's JSON API.
use log::debug;
use market_common::net::{API_PREFIX, MAX_BATCH_SYMBOLS};
use market_common::quote::{CryptoOrder, CryptoQuote, StockQuote};
use market_common::session::MarketStatus;
use market_common::status::HealthReport;
use market_common::symbols::Region;
use market_common::{ApiResponse, MarketError, Result};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Talks to one dashboard server.
pub struct DashboardClient {
    client: Client,
    base: Url,
}

impl DashboardClient {
    /// `server` is `host:port`.
    pub fn new(server: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(&format!("http://{}", server.trim()))
            .map_err(|e| MarketError::InvalidUrl(format!("{server}: {e}")))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    /// URL of an API route below the API prefix.
    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| MarketError::InvalidUrl(self.base.to_string()))?
            .clear()
            .extend(API_PREFIX.split('/').filter(|s| !s.is_empty()))
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// GET `url` and unwrap the envelope; 404 is `Ok(None)`.
    fn get<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        debug!("GET {url}");
        let resp = self.client.get(url.clone()).send()?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = resp.text()?;
        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|_| MarketError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })?;
        unwrap_envelope(status, envelope)
    }

    pub fn stock(&self, symbol: &str) -> Result<Option<StockQuote>> {
        self.get(self.url(&["stocks", symbol], &[])?)
    }

    pub fn crypto(&self, symbol: &str) -> Result<Option<CryptoQuote>> {
        self.get(self.url(&["crypto", symbol], &[])?)
    }

    /// Batch quotes, asked for in requests of at most `MAX_BATCH_SYMBOLS` symbols.
    pub fn stocks(&self, symbols: &[String]) -> Result<Vec<StockQuote>> {
        let mut quotes = Vec::with_capacity(symbols.len());
        for url in self.batch_urls(symbols)? {
            quotes.extend(self.get::<Vec<StockQuote>>(url)?.unwrap_or_default());
        }
        Ok(quotes)
    }

    fn batch_urls(&self, symbols: &[String]) -> Result<Vec<Url>> {
        symbols
            .chunks(MAX_BATCH_SYMBOLS)
            .map(|chunk| self.url(&["stocks"], &[("symbols", chunk.join(","))]))
            .collect()
    }

    pub fn trending_stocks(&self, limit: usize, region: Region) -> Result<Vec<StockQuote>> {
        let query = [("limit", limit.to_string()), ("region", region.to_string())];
        Ok(self.get(self.url(&["stocks", "trending"], &query)?)?.unwrap_or_default())
    }

    pub fn trending_cryptos(&self, limit: usize, order: CryptoOrder) -> Result<Vec<CryptoQuote>> {
        let query = [("limit", limit.to_string()), ("order_by", order.to_string())];
        Ok(self.get(self.url(&["crypto", "trending"], &query)?)?.unwrap_or_default())
    }

    pub fn market_status(&self, region: Region) -> Result<MarketStatus> {
        let query = [("region", region.to_string())];
        self.get(self.url(&["market", "status"], &query)?)?
            .ok_or_else(|| MarketError::ResponseFormat("market status missing".into()))
    }

    pub fn health(&self) -> Result<HealthReport> {
        self.get(self.url(&["health"], &[])?)?
            .ok_or_else(|| MarketError::ResponseFormat("health report missing".into()))
    }
}

/// Data of a successful envelope; a 400 becomes `InvalidRequest`, other failures `Status`.
fn unwrap_envelope<T>(status: StatusCode, envelope: ApiResponse<T>) -> Result<Option<T>> {
    if envelope.success {
        return Ok(envelope.data);
    }
    let message = envelope.error.unwrap_or_else(|| status.to_string());
    if status == StatusCode::BAD_REQUEST {
        Err(MarketError::InvalidRequest(message))
    } else {
        Err(MarketError::ResponseFormat(format!("server answered {status}: {message}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> DashboardClient {
        DashboardClient::new("127.0.0.1:8000", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn builds_api_urls() {
        let url = client().url(&["stocks", "^GSPC"], &[]).unwrap();
        assert!(url.as_str().starts_with("http://127.0.0.1:8000/api/v3/stocks/"));
        assert!(url.as_str().ends_with("GSPC"));

        let query = [("limit", "5".to_string()), ("region", "BR".to_string())];
        let url = client().url(&["stocks", "trending"], &query).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8000/api/v3/stocks/trending?limit=5&region=BR"
        );
    }

    #[test]
    fn large_watchlists_are_split_into_batches() {
        let symbols: Vec<String> = (0..45).map(|i| format!("S{i}")).collect();
        let urls = client().batch_urls(&symbols).unwrap();
        assert_eq!(urls.len(), 3);

        let mut asked = Vec::new();
        for url in &urls {
            let (_, list) = url.query_pairs().find(|(k, _)| k == "symbols").unwrap();
            let chunk: Vec<String> = list.split(',').map(str::to_string).collect();
            assert!(chunk.len() <= MAX_BATCH_SYMBOLS);
            asked.extend(chunk);
        }
        assert_eq!(asked, symbols);
        assert!(client().batch_urls(&[]).unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_server() {
        assert!(matches!(
            DashboardClient::new("bad host:x", Duration::from_secs(1)),
            Err(MarketError::InvalidUrl(_))
        ));
    }

    #[test]
    fn envelope_errors_map_by_status() {
        let ok: ApiResponse<u32> = ApiResponse::ok(3);
        assert_eq!(unwrap_envelope(StatusCode::OK, ok).unwrap(), Some(3));

        let bad: ApiResponse<u32> = ApiResponse::error("limit must be between 1 and 50");
        assert!(matches!(
            unwrap_envelope(StatusCode::BAD_REQUEST, bad),
            Err(MarketError::InvalidRequest(msg)) if msg.contains("limit")
        ));

        let down: ApiResponse<u32> = ApiResponse::error("Crypto market data unavailable");
        assert!(matches!(
            unwrap_envelope(StatusCode::SERVICE_UNAVAILABLE, down),
            Err(MarketError::ResponseFormat(_))
        ));
    }
}
