//! Market symbols, regions and parsing helpers shared between server and client.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::BufRead;
use strum::{Display, EnumString};

use crate::error::MarketError;

/// Longest symbol accepted from a request or a watchlist file.
pub const MAX_SYMBOL_LEN: usize = 20;

/// Trait providing watchlist parsing from any buffered reader.
pub trait SymbolListParser {
    /// Parses symbols from a buffered reader.
    ///
    /// Symbols may be separated by commas, whitespace or new lines. Each one is
    /// normalized with [`normalize_symbol`]; duplicates are dropped, keeping the
    /// first occurrence. Returns an error if any entry is not a valid symbol.
    fn parse_from_reader<R: BufRead>(reader: R) -> Result<Vec<String>, MarketError>;
}

/// Marker type implementing [`SymbolListParser`] for plain symbol strings.
pub struct Watchlist;

impl SymbolListParser for Watchlist {
    fn parse_from_reader<R: BufRead>(reader: R) -> Result<Vec<String>, MarketError> {
        let mut seen = HashSet::new();
        let mut symbols = Vec::new();

        for line_result in reader.lines() {
            let line = line_result.map_err(MarketError::Io)?;
            for symbol in parse_symbol_list(&line)? {
                if seen.insert(symbol.clone()) {
                    symbols.push(symbol);
                }
            }
        }
        Ok(symbols)
    }
}

/// Market region a stock list belongs to.
#[allow(missing_docs)]
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    ValueEnum,
    Display,
    EnumString,
    Hash,
    Eq,
    PartialEq,
    Default,
)]
#[clap(rename_all = "upper")]
#[strum(ascii_case_insensitive)]
pub enum Region {
    #[default]
    US,
    BR,
}

impl Region {
    /// Symbols scanned when ranking the region's trending stocks.
    pub fn trending_symbols(self) -> &'static [&'static str] {
        match self {
            Region::US => US_TRENDING,
            Region::BR => BR_TRENDING,
        }
    }

    /// Index symbols shown in the region's market overview.
    pub fn index_symbols(self) -> &'static [&'static str] {
        match self {
            Region::US => &["^GSPC", "^DJI", "^IXIC"],
            Region::BR => &["^BVSP"],
        }
    }

    /// Headline stocks shown in the region's market overview.
    pub fn headline_symbols(self) -> &'static [&'static str] {
        match self {
            Region::US => &["AAPL", "MSFT", "GOOGL", "AMZN"],
            Region::BR => &["VALE3.SA", "PETR4.SA", "ITUB4.SA", "BBDC4.SA"],
        }
    }
}

const US_TRENDING: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "NVDA", "META", "NFLX", "V", "JPM", "UNH", "HD",
    "PG", "JNJ", "MA",
];

const BR_TRENDING: &[&str] = &[
    "VALE3.SA", "PETR4.SA", "ITUB4.SA", "BBDC4.SA", "ABEV3.SA", "WEGE3.SA", "RENT3.SA",
    "MGLU3.SA", "B3SA3.SA", "SUZB3.SA", "JBSS3.SA", "LREN3.SA", "TOTS3.SA", "RADL3.SA",
    "VIVT3.SA",
];

/// Cryptocurrencies tracked by default.
pub const DEFAULT_CRYPTOS: &[&str] = &[
    "BTC", "ETH", "ADA", "DOT", "LINK", "BNB", "XRP", "MATIC", "SOL", "AVAX",
];

/// CoinGecko coin ids for well-known symbols.
const COINGECKO_IDS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("BNB", "binancecoin"),
    ("XRP", "ripple"),
    ("ADA", "cardano"),
    ("DOGE", "dogecoin"),
    ("SOL", "solana"),
    ("TRX", "tron"),
    ("DOT", "polkadot"),
    ("MATIC", "matic-network"),
    ("LTC", "litecoin"),
    ("SHIB", "shiba-inu"),
    ("AVAX", "avalanche-2"),
    ("UNI", "uniswap"),
    ("LINK", "chainlink"),
    ("ATOM", "cosmos"),
    ("ETC", "ethereum-classic"),
    ("XLM", "stellar"),
    ("BCH", "bitcoin-cash"),
    ("FIL", "filecoin"),
];

/// Looks up the CoinGecko id of a well-known crypto symbol.
pub fn coingecko_id(symbol: &str) -> Option<&'static str> {
    COINGECKO_IDS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(symbol))
        .map(|(_, id)| *id)
}

/// Region a stock symbol trades in: B3 tickers carry the `.SA` suffix.
pub fn region_of(symbol: &str) -> Region {
    if symbol.to_ascii_uppercase().ends_with(".SA") {
        Region::BR
    } else {
        Region::US
    }
}

/// Trims and upper-cases a symbol, rejecting anything a provider could not know.
pub fn normalize_symbol(raw: &str) -> Result<String, MarketError> {
    let symbol = raw.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(MarketError::InvalidSymbol("empty symbol".to_string()));
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(MarketError::InvalidSymbol(format!(
            "{symbol} is longer than {MAX_SYMBOL_LEN} characters"
        )));
    }
    let valid = symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-'));
    if !valid {
        return Err(MarketError::InvalidSymbol(symbol));
    }
    Ok(symbol)
}

/// Splits a comma/whitespace separated list into normalized, de-duplicated symbols.
pub fn parse_symbol_list(raw: &str) -> Result<Vec<String>, MarketError> {
    let mut seen = HashSet::new();
    let mut symbols = Vec::new();
    for part in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        if part.trim().is_empty() {
            continue;
        }
        let symbol = normalize_symbol(part)?;
        if seen.insert(symbol.clone()) {
            symbols.push(symbol);
        }
    }
    Ok(symbols)
}
