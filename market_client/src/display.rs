//! One-line text renderings of server answers.
use chrono::Local;
use market_common::quote::{CryptoQuote, StockQuote};
use market_common::session::MarketStatus;
use market_common::status::HealthReport;

const SAMPLE_MARK: &str = " [sample]";

fn sample_mark(is_sample: bool) -> &'static str {
    if is_sample { SAMPLE_MARK } else { "" }
}

pub fn stock_line(quote: &StockQuote) -> String {
    format!(
        "{:<10} {:>12.2} {} {:>+8.2}% vol={}{}",
        quote.symbol,
        quote.price,
        quote.currency,
        quote.change_percent,
        quote.volume,
        sample_mark(quote.is_sample_data)
    )
}

pub fn crypto_line(quote: &CryptoQuote) -> String {
    let decimals = if quote.price < 1.0 { 8 } else { 2 };
    let rank = quote
        .market_cap_rank
        .map(|r| format!("#{r}"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<6} {:>4} {:>16.*} USD {:>+8.2}%{}",
        quote.symbol,
        rank,
        decimals,
        quote.price,
        quote.change_percent_24h,
        sample_mark(quote.is_sample_data)
    )
}

pub fn health_lines(report: &HealthReport) -> Vec<String> {
    vec![
        format!("overall: {}", report.status),
        format!("stocks:  {}", report.stock_service),
        format!("crypto:  {}", report.crypto_service),
        format!(
            "checked: {}",
            report.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ),
    ]
}

/// Exchange state, its local time and the next opening when closed.
pub fn market_line(status: &MarketStatus) -> String {
    let mut line = format!(
        "{} {} {} ({})",
        status.exchange,
        status.status,
        status.local_time.format("%H:%M"),
        status.message
    );
    if let Some(next) = status.next_open {
        line.push_str(&format!(", opens {}", next.with_timezone(&Local).format("%a %H:%M")));
    }
    line
}

/// Header printed before each watchlist poll.
pub fn poll_header(count: usize) -> String {
    format!("--- {} ({count} symbols) ---", Local::now().format("%H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use chrono::TimeZone;
    use market_common::status::{OverallHealth, SourceStatus};
    use market_common::symbols::Region;

    #[test]
    fn stock_line_marks_sample_data() {
        let mut quote =
            StockQuote::from_history("AAPL", "Apple", &[100.0, 110.0], &[42], "USD", "NMS").unwrap();
        let line = stock_line(&quote);
        assert!(line.starts_with("AAPL"));
        assert!(line.contains("110.00 USD"));
        assert!(line.contains("+10.00%"));
        assert!(line.contains("vol=42"));
        assert!(!line.contains("[sample]"));

        quote.is_sample_data = true;
        assert!(stock_line(&quote).ends_with("[sample]"));
    }

    #[test]
    fn crypto_line_uses_more_decimals_below_one_dollar() {
        let mut quote = CryptoQuote::from_price("ADA", "Cardano", 0.45, -2.5);
        quote.market_cap_rank = Some(8);
        let line = crypto_line(&quote);
        assert!(line.contains("#8"));
        assert!(line.contains("0.45000000"));
        assert!(line.contains("-2.50%"));

        let btc = CryptoQuote::from_price("BTC", "Bitcoin", 43250.5, 1.0);
        assert!(crypto_line(&btc).contains("43250.50"));
    }

    #[test]
    fn health_lists_both_sources() {
        let report = HealthReport {
            status: OverallHealth::Degraded,
            stock_service: SourceStatus::Available,
            crypto_service: SourceStatus::Degraded,
            timestamp: Utc::now(),
        };
        let lines = health_lines(&report);
        assert_eq!(lines[0], "overall: degraded");
        assert_eq!(lines[2], "crypto:  degraded");
    }

    #[test]
    fn market_line_mentions_next_opening_only_when_closed() {
        let monday = Utc.with_ymd_and_hms(2026, 10, 19, 14, 0, 0).unwrap();
        let open = market_line(&MarketStatus::at(Region::US, monday));
        assert!(open.starts_with("NYSE OPEN 10:00"));
        assert!(!open.contains("opens"));

        let evening = Utc.with_ymd_and_hms(2026, 10, 19, 21, 0, 0).unwrap();
        let closed = market_line(&MarketStatus::at(Region::BR, evening));
        assert!(closed.starts_with("B3 CLOSED 18:00"));
        assert!(closed.contains(", opens "));
    }
}
