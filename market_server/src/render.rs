//! Server-rendered HTML fragments swapped into the dashboard page by HTMX.
//!
//! Every piece of provider or request text goes through [`escape`] before it is
//! written into markup.

use crate::currency::{Currency, CurrencyConverter};
use market_common::net::HTMX_PREFIX;
use market_common::quote::{
    CryptoOrder, CryptoOverview, CryptoQuote, StockOverview, StockQuote, round_to,
};
use market_common::session::MarketStatus;
use market_common::status::{HealthReport, SourceStatus};
use market_common::symbols::Region;

/// Escape the five HTML special characters.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Scale, suffix and decimals of the [`compact`] units, smallest first.
const UNITS: [(f64, &str, i32); 4] = [(1e3, "K", 1), (1e6, "M", 2), (1e9, "B", 2), (1e12, "T", 2)];

/// `1.23T`, `4.56B`, `7.89M`, `1.2K`, plain integer below a thousand.
pub fn compact(value: f64) -> String {
    let abs = value.abs();
    if abs.round() < 1e3 {
        return format!("{value:.0}");
    }
    let mut unit = UNITS.iter().rposition(|(scale, _, _)| abs >= *scale).unwrap_or(0);
    // Rounding may carry into the next unit, e.g. 999_999 is 1.00M, not 1000.0K.
    while unit + 1 < UNITS.len() {
        let (scale, _, decimals) = UNITS[unit];
        if round_to(abs / scale, decimals) < 1e3 {
            break;
        }
        unit += 1;
    }
    let (scale, suffix, decimals) = UNITS[unit];
    format!("{:.*}{suffix}", decimals as usize, value / scale)
}

fn change_class(change: f64) -> &'static str {
    if change > 0.0 {
        "positive"
    } else if change < 0.0 {
        "negative"
    } else {
        "neutral"
    }
}

fn signed_percent(change: f64) -> String {
    format!("<span class=\"{}\">{change:+.2}%</span>", change_class(change))
}

fn money(converter: &CurrencyConverter, amount: f64, code: &str) -> String {
    match code.parse::<Currency>() {
        Ok(currency) => converter.format(amount, currency),
        Err(_) => format!("{amount:.2} {}", escape(code)),
    }
}

fn crypto_money(converter: &CurrencyConverter, amount: f64, currency: Currency) -> String {
    let decimals = if amount.abs() < 1.0 { 8 } else { 2 };
    converter.format_decimals(amount, currency, decimals)
}

fn sample_badge(is_sample: bool) -> &'static str {
    if is_sample {
        " <span class=\"badge sample\">sample data</span>"
    } else {
        ""
    }
}

/// Red box shown in place of a fragment that could not be produced.
pub fn error_box(message: &str) -> String {
    format!("<div class=\"error\">{}</div>", escape(message))
}

/// Trending stocks table, prices converted to `currency`.
pub fn stock_table(
    stocks: &[StockQuote],
    region: Region,
    currency: Currency,
    converter: &CurrencyConverter,
) -> String {
    if stocks.is_empty() {
        return error_box(&format!("No {region} stocks available right now."));
    }
    let is_sample = stocks.iter().any(|s| s.is_sample_data);

    let mut out = String::new();
    out.push_str(&format!(
        "<table class=\"quotes stocks\" data-region=\"{region}\">\n<caption>Trending {region} stocks{}</caption>\n",
        sample_badge(is_sample)
    ));
    out.push_str(
        "<tr><th>Symbol</th><th>Name</th><th>Price</th><th>Change</th><th>Volume</th><th>Market cap</th></tr>\n",
    );
    for stock in stocks {
        let stock = converter.localize_stock(stock, currency);
        out.push_str(&format!(
            "<tr><td class=\"symbol\">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(&stock.symbol),
            escape(&stock.name),
            money(converter, stock.price, &stock.currency),
            signed_percent(stock.change_percent),
            compact(stock.volume as f64),
            stock.market_cap.map(compact).unwrap_or_else(|| "-".to_string()),
        ));
    }
    out.push_str("</table>\n");
    out
}

/// Trending crypto table, prices converted from USD to `currency`.
pub fn crypto_table(
    cryptos: &[CryptoQuote],
    order: CryptoOrder,
    currency: Currency,
    converter: &CurrencyConverter,
) -> String {
    if cryptos.is_empty() {
        return error_box("No cryptocurrencies available right now.");
    }
    let is_sample = cryptos.iter().any(|c| c.is_sample_data);

    let mut out = String::new();
    out.push_str(&format!(
        "<table class=\"quotes crypto\" data-order=\"{order}\">\n<caption>Top cryptocurrencies{}</caption>\n",
        sample_badge(is_sample)
    ));
    out.push_str(
        "<tr><th>#</th><th>Symbol</th><th>Name</th><th>Price</th><th>24h</th><th>Volume 24h</th><th>Market cap</th></tr>\n",
    );
    for crypto in cryptos {
        let crypto = converter.localize_crypto(crypto, currency);
        let rank = crypto
            .market_cap_rank
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "<tr><td>{rank}</td><td class=\"symbol\">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(&crypto.symbol),
            escape(&crypto.name),
            crypto_money(converter, crypto.price, currency),
            signed_percent(crypto.change_percent_24h),
            crypto.volume_24h.map(compact).unwrap_or_else(|| "-".to_string()),
            crypto.market_cap.map(compact).unwrap_or_else(|| "-".to_string()),
        ));
    }
    out.push_str("</table>\n");
    out
}

/// Index cards and headline stocks of a region.
pub fn stock_overview(overview: &StockOverview, converter: &CurrencyConverter) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<section class=\"overview stocks\">\n<h3>{} market{}</h3>\n",
        overview.region,
        sample_badge(overview.is_sample_data)
    ));

    out.push_str("<div class=\"indices\">\n");
    for index in &overview.indices {
        out.push_str(&format!(
            "<div class=\"card\"><span class=\"name\">{}</span> <span class=\"value\">{:.2}</span> {}</div>\n",
            escape(&index.name),
            index.price,
            signed_percent(index.change_percent),
        ));
    }
    out.push_str("</div>\n<ul class=\"headlines\">\n");
    for stock in &overview.top_stocks {
        out.push_str(&format!(
            "<li><span class=\"symbol\">{}</span> {} {}</li>\n",
            escape(&stock.symbol),
            money(converter, stock.price, &stock.currency),
            signed_percent(stock.change_percent),
        ));
    }
    out.push_str(&format!(
        "</ul>\n<p class=\"summary\">Volume {} &middot; average change {}</p>\n</section>\n",
        compact(overview.total_volume as f64),
        signed_percent(overview.average_change),
    ));
    out
}

/// Global crypto figures, or an error box when they are unavailable.
pub fn crypto_overview(overview: Option<&CryptoOverview>) -> String {
    let Some(overview) = overview else {
        return error_box("Crypto market overview unavailable.");
    };
    let mut out = String::new();
    out.push_str("<section class=\"overview crypto\">\n<h3>Crypto market</h3>\n<dl>\n");
    out.push_str(&format!(
        "<dt>Market cap</dt><dd>${}</dd>\n<dt>Volume 24h</dt><dd>${}</dd>\n",
        compact(overview.total_market_cap),
        compact(overview.total_volume_24h),
    ));
    out.push_str(&format!(
        "<dt>BTC dominance</dt><dd>{:.2}%</dd>\n<dt>ETH dominance</dt><dd>{:.2}%</dd>\n",
        overview.btc_dominance, overview.eth_dominance,
    ));
    out.push_str(&format!(
        "<dt>Active coins</dt><dd>{}</dd>\n</dl>\n<ul class=\"headlines\">\n",
        overview.active_cryptocurrencies
    ));
    for crypto in &overview.top_cryptos {
        out.push_str(&format!(
            "<li><span class=\"symbol\">{}</span> ${} {}</li>\n",
            escape(&crypto.symbol),
            compact(crypto.market_cap.unwrap_or(0.0)),
            signed_percent(crypto.change_percent_24h),
        ));
    }
    out.push_str("</ul>\n</section>\n");
    out
}

fn status_badge(label: &str, status: SourceStatus) -> String {
    format!("<span class=\"badge status-{status}\">{label}: {status}</span>")
}

/// Source status badges for the page header.
pub fn status_badges(report: &HealthReport) -> String {
    format!(
        "<div class=\"status overall-{}\">{} {}</div>\n",
        report.status,
        status_badge("Stocks", report.stock_service),
        status_badge("Crypto", report.crypto_service),
    )
}

/// Open/closed badge of each exchange with its local time.
pub fn market_badges(statuses: &[MarketStatus]) -> String {
    let mut out = String::from("<div class=\"markets\">");
    for status in statuses {
        let class = if status.is_open { "open" } else { "closed" };
        out.push_str(&format!(
            " <span class=\"badge market-{class}\" title=\"{}\">{} {} {}</span>",
            escape(&status.message),
            escape(&status.exchange),
            status.status,
            status.local_time.format("%H:%M"),
        ));
    }
    out.push_str("</div>\n");
    out
}

/// Plain page for unknown non-API paths.
pub fn not_found_page(path: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><title>Not found</title></head><body><h1>404</h1><p>{} does not exist.</p><p><a href=\"/\">Back to the dashboard</a></p></body></html>\n",
        escape(path)
    )
}

fn panel(id: &str, route: &str, every_secs: u32) -> String {
    format!(
        "<div id=\"{id}\" hx-get=\"{HTMX_PREFIX}{route}\" hx-trigger=\"load, every {every_secs}s\"><p class=\"loading\">Loading...</p></div>\n"
    )
}

/// The dashboard shell; every panel loads itself through an HTMX fragment route.
pub fn dashboard_page() -> String {
    let mut out = String::new();
    out.push_str(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Market Dashboard</title>\n\
<script src=\"https://unpkg.com/htmx.org@1.9.12\"></script>\n<style>\n\
body{font-family:sans-serif;margin:2rem;background:#f7f7f9}\n\
table{border-collapse:collapse;width:100%;margin-bottom:1rem}\n\
td,th{padding:.3rem .6rem;border-bottom:1px solid #ddd;text-align:left}\n\
.positive{color:#0a7d32}.negative{color:#c0262d}.neutral{color:#666}\n\
.badge{padding:.1rem .4rem;border-radius:.3rem;background:#eee;font-size:.8rem}\n\
.sample{background:#ffe8a3}.status-degraded{background:#ffe8a3}.status-unavailable{background:#f7b2b2}\n\
.market-open{background:#c8efd4}.market-closed{background:#e4e4e4}\n\
.error{padding:.6rem;border:1px solid #c0262d;background:#fde8e8;color:#c0262d}\n\
</style>\n</head>\n<body>\n<header><h1>Market Dashboard</h1>\n",
    );
    out.push_str(&panel("status", "/status", 30));
    out.push_str(&panel("market-status", "/market/status", 60));
    out.push_str("</header>\n<main>\n");
    out.push_str(&panel("stock-overview", "/stocks/overview?region=US", 120));
    out.push_str(&panel("crypto-overview", "/crypto/overview", 120));
    out.push_str(&panel("stock-trending", "/stocks/trending?limit=10&region=US", 60));
    out.push_str(&panel("crypto-trending", "/crypto/trending?limit=10", 60));
    out.push_str("</main>\n</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use market_common::status::OverallHealth;

    fn stock(symbol: &str, name: &str, last: f64) -> StockQuote {
        StockQuote::from_history(symbol, name, &[100.0, last], &[2_500_000], "USD", "TEST")
            .unwrap()
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape("<b>\"AT&T\"</b> 'x'"),
            "&lt;b&gt;&quot;AT&amp;T&quot;&lt;/b&gt; &#39;x&#39;"
        );
    }

    #[test]
    fn compact_numbers() {
        assert_eq!(compact(1.234e12), "1.23T");
        assert_eq!(compact(4.561e9), "4.56B");
        assert_eq!(compact(7_890_000.0), "7.89M");
        assert_eq!(compact(1_234.0), "1.2K");
        assert_eq!(compact(999.0), "999");
        assert_eq!(compact(-2.5e9), "-2.50B");
    }

    #[test]
    fn compact_rounds_before_picking_the_unit() {
        assert_eq!(compact(999_999.0), "1.00M");
        assert_eq!(compact(999_950.0), "1.00M");
        assert_eq!(compact(999_940.0), "999.9K");
        assert_eq!(compact(999.6), "1.0K");
        assert_eq!(compact(999.4), "999");
        assert_eq!(compact(999_995_000.0), "1.00B");
        assert_eq!(compact(-999_999.0), "-1.00M");
    }

    #[test]
    fn market_badges_show_state_and_local_time() {
        use chrono::TimeZone;
        let open = MarketStatus::at(Region::US, Utc.with_ymd_and_hms(2026, 10, 19, 14, 5, 0).unwrap());
        let closed = MarketStatus::at(Region::BR, Utc.with_ymd_and_hms(2026, 10, 19, 21, 0, 0).unwrap());
        let html = market_badges(&[open, closed]);
        assert!(html.contains("market-open"));
        assert!(html.contains("NYSE OPEN 10:05"));
        assert!(html.contains("B3 CLOSED 18:00"));
    }

    #[test]
    fn stock_table_marks_changes_and_escapes_names() {
        let stocks = vec![stock("AT", "<AT&T>", 110.0), stock("DN", "Down", 90.0)];
        let html = stock_table(&stocks, Region::US, Currency::USD, &CurrencyConverter::default());
        assert!(html.contains("&lt;AT&amp;T&gt;"));
        assert!(html.contains("<span class=\"positive\">+10.00%</span>"));
        assert!(html.contains("<span class=\"negative\">-10.00%</span>"));
        assert!(html.contains("$110.00"));
        assert!(html.contains("2.50M"));
        assert!(!html.contains("sample data"));
    }

    #[test]
    fn stock_table_converts_and_flags_samples() {
        let mut quote = stock("AAPL", "Apple", 110.0);
        quote.is_sample_data = true;
        let html = stock_table(&[quote], Region::US, Currency::BRL, &CurrencyConverter::new(5.0));
        assert!(html.contains("R$ 550,00"));
        assert!(html.contains("sample data"));
    }

    #[test]
    fn empty_tables_render_error_boxes() {
        let html = stock_table(&[], Region::BR, Currency::USD, &CurrencyConverter::default());
        assert!(html.starts_with("<div class=\"error\">"));
        assert!(html.contains("BR"));
        assert!(crypto_overview(None).contains("class=\"error\""));
    }

    #[test]
    fn crypto_table_keeps_small_prices_precise() {
        let mut coin = CryptoQuote::from_price("SHIB", "Shiba Inu", 0.00001234, -2.0);
        coin.market_cap_rank = Some(12);
        let html = crypto_table(
            &[coin],
            CryptoOrder::MarketCap,
            Currency::USD,
            &CurrencyConverter::default(),
        );
        assert!(html.contains("$0.00001234"));
        assert!(html.contains("<td>12</td>"));
        assert!(html.contains("data-order=\"market_cap\""));
        assert!(html.contains("negative"));
    }

    #[test]
    fn status_badges_show_each_source() {
        let report = HealthReport {
            status: OverallHealth::Degraded,
            stock_service: SourceStatus::Degraded,
            crypto_service: SourceStatus::Available,
            timestamp: Utc::now(),
        };
        let html = status_badges(&report);
        assert!(html.contains("overall-degraded"));
        assert!(html.contains("Stocks: degraded"));
        assert!(html.contains("Crypto: available"));
    }

    #[test]
    fn page_wires_every_panel() {
        let page = dashboard_page();
        for route in [
            "/htmx/status",
            "/htmx/market/status",
            "/htmx/stocks/overview",
            "/htmx/crypto/overview",
            "/htmx/stocks/trending",
            "/htmx/crypto/trending",
        ] {
            assert!(page.contains(route), "missing {route}");
        }
    }
}
