//! HTTP routes of the dashboard.
//!
//! `/api/v3` answers with the JSON envelope, `/api/v2` keeps the trending and
//! cache routes of the previous API, `/htmx` returns HTML fragments and `/` the
//! page shell. Fragment routes never fail at the HTTP level: errors are rendered
//! as an error box with status 200 so the page can swap them in.
//!
//! Service calls may block on upstream HTTP, so handlers run them on tokio's
//! blocking pool. Every answered request is timed under its route template.

use crate::currency::Currency;
use crate::render;
use crate::service::dashboard::Dashboard;
use axum::extract::{MatchedPath, OriginalUri, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{debug, error, warn};
use market_common::net::{API_PREFIX, HTMX_PREFIX, LEGACY_API_PREFIX, MAX_BATCH_SYMBOLS};
use market_common::quote::CryptoOrder;
use market_common::session::MarketStatus;
use market_common::symbols::{Region, parse_symbol_list};
use market_common::{ApiResponse, MarketError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

/// Largest `limit` of the JSON API.
pub const MAX_API_LIMIT: usize = 50;
/// Largest `limit` of the HTML fragments.
pub const MAX_HTMX_LIMIT: usize = 20;
const DEFAULT_LIMIT: usize = 10;
/// Endpoint name under which requests matching no route are timed.
const UNMATCHED: &str = "unmatched";

type AppState = Arc<Dashboard>;
type ApiResult = Result<Response, ApiError>;

/// The whole HTTP surface over `dashboard`.
pub fn app(dashboard: AppState) -> Router {
    Router::new()
        .route("/", get(page))
        .nest(API_PREFIX, api_routes())
        .nest(LEGACY_API_PREFIX, legacy_routes())
        .nest(HTMX_PREFIX, htmx_routes())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&dashboard),
            track_request,
        ))
        .with_state(dashboard)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/stocks", get(stocks))
        .route("/stocks/trending", get(stock_trending))
        .route("/stocks/overview", get(stock_overview))
        .route("/stocks/{symbol}", get(stock))
        .route("/crypto/trending", get(crypto_trending))
        .route("/crypto/overview", get(crypto_overview))
        .route("/crypto/search", get(crypto_search))
        .route("/crypto/{symbol}", get(crypto))
        .route("/market/status", get(market_status))
        .route("/health", get(health))
        .route("/admin/metrics", get(metrics))
        .route("/admin/cache/stats", get(cache_stats))
        .route("/admin/cache/clear", post(clear_cache))
}

/// Routes still served under the previous API prefix.
fn legacy_routes() -> Router<AppState> {
    Router::new()
        .route("/stocks/trending", get(stock_trending))
        .route("/crypto/trending", get(crypto_trending))
        .route("/admin/cache/stats", get(cache_stats))
        .route("/admin/cache/clear", post(clear_cache))
}

fn htmx_routes() -> Router<AppState> {
    Router::new()
        .route("/stocks/trending", get(htmx_stock_trending))
        .route("/crypto/trending", get(htmx_crypto_trending))
        .route("/stocks/overview", get(htmx_stock_overview))
        .route("/crypto/overview", get(htmx_crypto_overview))
        .route("/market/status", get(htmx_market_status))
        .route("/status", get(htmx_status))
}

/// Query string of every route; each handler reads the keys it knows.
#[derive(Debug, Default, Deserialize)]
struct Params {
    symbols: Option<String>,
    limit: Option<String>,
    region: Option<String>,
    order_by: Option<String>,
    currency: Option<String>,
    q: Option<String>,
}

impl Params {
    fn limit(&self, max: usize) -> Result<usize> {
        let Some(raw) = self.limit.as_deref() else {
            return Ok(DEFAULT_LIMIT.min(max));
        };
        raw.trim()
            .parse::<usize>()
            .ok()
            .filter(|limit| (1..=max).contains(limit))
            .ok_or_else(|| MarketError::InvalidRequest(format!("limit must be between 1 and {max}")))
    }

    fn region(&self) -> Result<Region> {
        parse_param(self.region.as_deref(), "region")
    }

    fn order(&self) -> Result<CryptoOrder> {
        parse_param(self.order_by.as_deref(), "order_by")
    }

    fn currency(&self) -> Result<Currency> {
        parse_param(self.currency.as_deref(), "currency")
    }
}

/// Parse an optional query value, falling back to the type's default when absent.
fn parse_param<T: FromStr + Default>(raw: Option<&str>, name: &str) -> Result<T> {
    raw.map_or(Ok(T::default()), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|_| MarketError::InvalidRequest(format!("unknown {name} {raw}")))
    })
}

/// Error answer of a JSON route: 400 for bad input, 500 for everything else.
struct ApiError(MarketError);

impl From<MarketError> for ApiError {
    fn from(err: MarketError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_client_error() {
            envelope_error(StatusCode::BAD_REQUEST, self.0.to_string())
        } else {
            error!("request failed: {}", self.0);
            envelope_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

fn ok<T: Serialize>(data: T) -> ApiResult {
    Ok(Json(ApiResponse::ok(data)).into_response())
}

fn envelope_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::error(message))).into_response()
}

/// Run a service call on the blocking pool.
async fn blocking<T, F>(dashboard: &AppState, call: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Dashboard) -> Result<T> + Send + 'static,
{
    let dashboard = Arc::clone(dashboard);
    tokio::task::spawn_blocking(move || call(&dashboard))
        .await
        .map_err(|e| MarketError::Worker(e.to_string()))?
}

async fn track_request(State(dashboard): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED, MatchedPath::as_str)
        .to_string();

    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed = started.elapsed();

    let status = response.status();
    debug!("{method} {endpoint} -> {status} in {elapsed:?}");
    if let Err(e) = dashboard.record_request(&method, &endpoint, elapsed, status.as_u16()) {
        warn!("request timing not recorded: {e}");
    }
    response
}

async fn page() -> Html<String> {
    Html(render::dashboard_page())
}

async fn not_found(OriginalUri(uri): OriginalUri) -> Response {
    let path = uri.path();
    if path.starts_with("/api/") {
        envelope_error(StatusCode::NOT_FOUND, format!("No route for {path}"))
    } else if path.starts_with(&format!("{HTMX_PREFIX}/")) {
        let body = render::error_box(&format!("Unknown fragment {path}"));
        (StatusCode::NOT_FOUND, Html(body)).into_response()
    } else {
        (StatusCode::NOT_FOUND, Html(render::not_found_page(path))).into_response()
    }
}

async fn stocks(State(dashboard): State<AppState>, Query(params): Query<Params>) -> ApiResult {
    let raw = params
        .symbols
        .as_deref()
        .ok_or_else(|| MarketError::InvalidRequest("missing symbols parameter".into()))?;
    let symbols = parse_symbol_list(raw)?;
    if symbols.is_empty() || symbols.len() > MAX_BATCH_SYMBOLS {
        return Err(MarketError::InvalidRequest(format!(
            "between 1 and {MAX_BATCH_SYMBOLS} symbols are required"
        ))
        .into());
    }
    ok(blocking(&dashboard, move |d| d.stocks.get_quotes(&symbols)).await?)
}

async fn stock(State(dashboard): State<AppState>, Path(symbol): Path<String>) -> ApiResult {
    let lookup = symbol.clone();
    match blocking(&dashboard, move |d| d.stocks.get_quote(&lookup)).await? {
        Some(quote) => ok(quote),
        None => Ok(envelope_error(
            StatusCode::NOT_FOUND,
            format!("Stock {symbol} not found"),
        )),
    }
}

async fn stock_trending(State(dashboard): State<AppState>, Query(params): Query<Params>) -> ApiResult {
    let limit = params.limit(MAX_API_LIMIT)?;
    let region = params.region()?;
    ok(blocking(&dashboard, move |d| d.stocks.trending(region, limit)).await?)
}

async fn stock_overview(State(dashboard): State<AppState>, Query(params): Query<Params>) -> ApiResult {
    let region = params.region()?;
    ok(blocking(&dashboard, move |d| d.stocks.overview(region)).await?)
}

async fn crypto(State(dashboard): State<AppState>, Path(symbol): Path<String>) -> ApiResult {
    let lookup = symbol.clone();
    match blocking(&dashboard, move |d| d.crypto.get_quote(&lookup)).await? {
        Some(quote) => ok(quote),
        None => Ok(envelope_error(
            StatusCode::NOT_FOUND,
            format!("Cryptocurrency {symbol} not found"),
        )),
    }
}

async fn crypto_trending(State(dashboard): State<AppState>, Query(params): Query<Params>) -> ApiResult {
    let limit = params.limit(MAX_API_LIMIT)?;
    let order = params.order()?;
    ok(blocking(&dashboard, move |d| d.crypto.trending(limit, order)).await?)
}

async fn crypto_overview(State(dashboard): State<AppState>) -> ApiResult {
    match blocking(&dashboard, |d| d.crypto.overview()).await? {
        Some(overview) => ok(overview),
        None => Ok(envelope_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Crypto market data unavailable",
        )),
    }
}

async fn crypto_search(State(dashboard): State<AppState>, Query(params): Query<Params>) -> ApiResult {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default().to_string();
    if query.is_empty() {
        return Err(MarketError::InvalidRequest("missing search query q".into()).into());
    }
    let limit = params.limit(MAX_API_LIMIT)?;
    ok(blocking(&dashboard, move |d| d.crypto.search(&query, limit)).await?)
}

async fn market_status(Query(params): Query<Params>) -> ApiResult {
    ok(MarketStatus::now(params.region()?))
}

async fn health(State(dashboard): State<AppState>) -> ApiResult {
    ok(dashboard.health()?)
}

async fn metrics(State(dashboard): State<AppState>) -> ApiResult {
    ok(dashboard.metrics()?)
}

async fn cache_stats(State(dashboard): State<AppState>) -> ApiResult {
    ok(dashboard.cache_stats()?)
}

async fn clear_cache(State(dashboard): State<AppState>) -> ApiResult {
    ok(dashboard.clear_caches()?)
}

/// Render a fragment on the blocking pool; failures become an inline error box.
async fn fragment<F>(dashboard: &AppState, name: &str, build: F) -> Html<String>
where
    F: FnOnce(&Dashboard) -> Result<String> + Send + 'static,
{
    let html = blocking(dashboard, build).await.unwrap_or_else(|err| {
        if !err.is_client_error() {
            error!("fragment {name} failed: {err}");
        }
        render::error_box(&err.to_string())
    });
    Html(html)
}

async fn htmx_stock_trending(State(dashboard): State<AppState>, Query(params): Query<Params>) -> Html<String> {
    fragment(&dashboard, "stocks/trending", move |d| {
        let limit = params.limit(MAX_HTMX_LIMIT)?;
        let region = params.region()?;
        let currency = params.currency()?;
        let stocks = d.stocks.trending(region, limit)?;
        Ok(render::stock_table(&stocks, region, currency, &d.converter))
    })
    .await
}

async fn htmx_crypto_trending(State(dashboard): State<AppState>, Query(params): Query<Params>) -> Html<String> {
    fragment(&dashboard, "crypto/trending", move |d| {
        let limit = params.limit(MAX_HTMX_LIMIT)?;
        let order = params.order()?;
        let currency = params.currency()?;
        let cryptos = d.crypto.trending(limit, order)?;
        Ok(render::crypto_table(&cryptos, order, currency, &d.converter))
    })
    .await
}

async fn htmx_stock_overview(State(dashboard): State<AppState>, Query(params): Query<Params>) -> Html<String> {
    fragment(&dashboard, "stocks/overview", move |d| {
        let overview = d.stocks.overview(params.region()?)?;
        Ok(render::stock_overview(&overview, &d.converter))
    })
    .await
}

async fn htmx_crypto_overview(State(dashboard): State<AppState>) -> Html<String> {
    fragment(&dashboard, "crypto/overview", |d| {
        Ok(render::crypto_overview(d.crypto.overview()?.as_ref()))
    })
    .await
}

async fn htmx_market_status() -> Html<String> {
    let statuses = [MarketStatus::now(Region::US), MarketStatus::now(Region::BR)];
    Html(render::market_badges(&statuses))
}

async fn htmx_status(State(dashboard): State<AppState>) -> Html<String> {
    fragment(&dashboard, "status", |d| Ok(render::status_badges(&d.health()?))).await
}
