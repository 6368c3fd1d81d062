//! Synthetic quotes served when the live providers fail.
//!
//! Every generator takes the random source as a parameter so the service can use
//! `rand::rng()` while tests pass a seeded `StdRng`. All produced quotes carry
//! `is_sample_data = true`.

use chrono::Utc;
use market_common::quote::{
    CryptoOrder, CryptoQuote, StockQuote, round_crypto_price, round_to, sort_by_change_desc,
};
use market_common::symbols::{DEFAULT_CRYPTOS, Region, region_of};
use rand::Rng;

/// Real symbols used before sample stock lists switch to placeholders.
const SAMPLE_HEADLINE: usize = 5;

fn company_name(symbol: &str) -> String {
    let known = match symbol {
        "AAPL" => "Apple Inc.",
        "MSFT" => "Microsoft Corporation",
        "GOOGL" => "Alphabet Inc.",
        "AMZN" => "Amazon.com Inc.",
        "TSLA" => "Tesla Inc.",
        "NVDA" => "NVIDIA Corporation",
        "META" => "Meta Platforms Inc.",
        "NFLX" => "Netflix Inc.",
        "V" => "Visa Inc.",
        "JPM" => "JPMorgan Chase & Co.",
        "UNH" => "UnitedHealth Group Inc.",
        "HD" => "The Home Depot Inc.",
        "PG" => "Procter & Gamble Co.",
        "JNJ" => "Johnson & Johnson",
        "MA" => "Mastercard Inc.",
        "VALE3.SA" => "Vale S.A.",
        "PETR4.SA" => "Petróleo Brasileiro S.A.",
        "ITUB4.SA" => "Itaú Unibanco Holding S.A.",
        "BBDC4.SA" => "Banco Bradesco S.A.",
        "ABEV3.SA" => "Ambev S.A.",
        "WEGE3.SA" => "WEG S.A.",
        "RENT3.SA" => "Localiza Rent a Car S.A.",
        "MGLU3.SA" => "Magazine Luiza S.A.",
        "B3SA3.SA" => "B3 S.A.",
        "SUZB3.SA" => "Suzano S.A.",
        _ => return format!("{symbol} Corporation"),
    };
    known.to_string()
}

fn crypto_name(symbol: &str) -> String {
    let known = match symbol {
        "BTC" => "Bitcoin",
        "ETH" => "Ethereum",
        "BNB" => "BNB",
        "XRP" => "XRP",
        "ADA" => "Cardano",
        "SOL" => "Solana",
        "DOGE" => "Dogecoin",
        "MATIC" => "Polygon",
        "DOT" => "Polkadot",
        "AVAX" => "Avalanche",
        "LINK" => "Chainlink",
        "UNI" => "Uniswap",
        "LTC" => "Litecoin",
        "ATOM" => "Cosmos",
        "FIL" => "Filecoin",
        _ => return format!("{symbol} Token"),
    };
    known.to_string()
}

/// Generate a plausible stock quote for `symbol`.
///
/// The price is drawn from `[50, 500)` and the change from `[-5%, +5%)`; previous
/// close and change amount are derived so the three stay consistent. B3 symbols are
/// quoted in BRL on BOVESPA, everything else in USD on NYSE.
pub fn sample_stock<R: Rng>(symbol: &str, rng: &mut R) -> StockQuote {
    let symbol = symbol.to_ascii_uppercase();
    let price: f64 = rng.random_range(50.0..500.0);
    let change_percent: f64 = rng.random_range(-5.0..5.0);
    let change_amount = price * change_percent / 100.0;
    let (currency, exchange) = match region_of(&symbol) {
        Region::BR => ("BRL", "BOVESPA"),
        Region::US => ("USD", "NYSE"),
    };

    StockQuote {
        name: company_name(&symbol),
        price: round_to(price, 2),
        previous_close: round_to(price - change_amount, 2),
        change_amount: round_to(change_amount, 2),
        change_percent: round_to(change_percent, 2),
        market_cap: Some(rng.random_range(1e9..1e12_f64).round()),
        volume: rng.random_range(1_000_000..100_000_000),
        sma_5: round_to(price * rng.random_range(0.95..1.05_f64), 2),
        volatility: round_to(rng.random_range(1.0..10.0), 2),
        currency: currency.to_string(),
        exchange: exchange.to_string(),
        last_updated: Utc::now(),
        is_sample_data: true,
        symbol,
    }
}

/// Generate a plausible crypto quote for `symbol`.
pub fn sample_crypto<R: Rng>(symbol: &str, rng: &mut R) -> CryptoQuote {
    let symbol = symbol.to_ascii_uppercase();
    let price: f64 = rng.random_range(0.01..50_000.0);
    let change: f64 = rng.random_range(-10.0..10.0);

    let mut quote = CryptoQuote::from_price(&symbol, &crypto_name(&symbol), price, change);
    quote.market_cap = Some(rng.random_range(1e8..5e11_f64).round());
    quote.volume_24h = Some(rng.random_range(1e7..1e10_f64).round());
    quote.market_cap_rank = Some(rng.random_range(1..=100));
    quote.is_sample_data = true;
    quote
}

/// Exactly `limit` sample stocks for `region`, all gaining, best performer first.
///
/// The region's headline list is padded with `STOCK{n}` placeholders when `limit`
/// exceeds it.
pub fn sample_trending_stocks<R: Rng>(
    region: Region,
    limit: usize,
    rng: &mut R,
) -> Vec<StockQuote> {
    let headline = region.trending_symbols();
    let headline = &headline[..headline.len().min(SAMPLE_HEADLINE)];
    let mut stocks: Vec<StockQuote> = padded_symbols(headline, "STOCK", limit)
        .iter()
        .map(|symbol| {
            let mut stock = sample_stock(symbol, rng);
            stock.change_percent = stock.change_percent.abs();
            stock.change_amount = stock.change_amount.abs();
            stock.previous_close = round_to(stock.price - stock.change_amount, 2);
            stock
        })
        .collect();
    sort_by_change_desc(&mut stocks);
    stocks
}

/// Exactly `limit` sample cryptos, all gaining, sorted by `order`.
pub fn sample_trending_cryptos<R: Rng>(
    limit: usize,
    order: CryptoOrder,
    rng: &mut R,
) -> Vec<CryptoQuote> {
    let mut cryptos: Vec<CryptoQuote> = padded_symbols(DEFAULT_CRYPTOS, "COIN", limit)
        .iter()
        .map(|symbol| {
            let mut crypto = sample_crypto(symbol, rng);
            crypto.change_percent_24h = crypto.change_percent_24h.abs();
            crypto.change_amount = crypto.change_amount.abs();
            crypto.previous_close = round_crypto_price(crypto.price - crypto.change_amount);
            crypto
        })
        .collect();
    order.sort(&mut cryptos);
    cryptos
}

fn padded_symbols(base: &[&str], prefix: &str, limit: usize) -> Vec<String> {
    let mut symbols: Vec<String> = base.iter().take(limit).map(|s| s.to_string()).collect();
    while symbols.len() < limit {
        symbols.push(format!("{prefix}{}", symbols.len()));
    }
    symbols
}
