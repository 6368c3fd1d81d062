//! USD/BRL conversion and money formatting for the HTML views.

use crate::provider::get_json;
use log::{info, warn};
use market_common::quote::{CryptoQuote, StockQuote, round_crypto_price, round_to};
use market_common::{MarketError, Result};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};

/// Rate used until (and unless) a live one is fetched.
pub const DEFAULT_USD_BRL: f64 = 5.20;

/// Public endpoint returning USD-based exchange rates.
pub const DEFAULT_RATES_URL: &str = "https://api.exchangerate-api.com/v4/latest/USD";

/// Display currency of prices.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[strum(ascii_case_insensitive)]
pub enum Currency {
    #[default]
    USD,
    BRL,
}

impl Currency {
    fn prefix(self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::BRL => "R$ ",
        }
    }

    fn separators(self) -> (char, char) {
        match self {
            Currency::USD => (',', '.'),
            Currency::BRL => ('.', ','),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

/// Converts between USD and BRL at a single rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrencyConverter {
    usd_brl: f64,
}

impl Default for CurrencyConverter {
    fn default() -> Self {
        Self::new(DEFAULT_USD_BRL)
    }
}

impl CurrencyConverter {
    /// Non-positive rates fall back to [`DEFAULT_USD_BRL`].
    pub fn new(usd_brl: f64) -> Self {
        let usd_brl = if usd_brl > 0.0 { usd_brl } else { DEFAULT_USD_BRL };
        Self { usd_brl }
    }

    pub fn usd_brl(&self) -> f64 {
        self.usd_brl
    }

    pub fn convert(&self, amount: f64, from: Currency, to: Currency) -> f64 {
        match (from, to) {
            (Currency::USD, Currency::BRL) => amount * self.usd_brl,
            (Currency::BRL, Currency::USD) => amount / self.usd_brl,
            _ => amount,
        }
    }

    /// `$1,234.56` or `R$ 1.234,56`; the sign goes before the currency symbol.
    pub fn format(&self, amount: f64, currency: Currency) -> String {
        self.format_decimals(amount, currency, 2)
    }

    /// Like [`CurrencyConverter::format`] with `decimals` digits after the separator.
    pub fn format_decimals(&self, amount: f64, currency: Currency, decimals: usize) -> String {
        let (thousands, decimal) = currency.separators();
        let fixed = format!("{:.*}", decimals.max(1), amount.abs());
        let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "0"));

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, digit) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(thousands);
            }
            grouped.push(digit);
        }

        let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
        let sign = if amount < 0.0 && !is_zero { "-" } else { "" };
        format!("{sign}{}{grouped}{decimal}{frac_part}", currency.prefix())
    }

    /// Copy of `quote` with every money field in `target`.
    ///
    /// Quotes in a currency other than USD or BRL are returned unchanged.
    pub fn localize_stock(&self, quote: &StockQuote, target: Currency) -> StockQuote {
        let mut localized = quote.clone();
        let Ok(from) = quote.currency.parse::<Currency>() else {
            return localized;
        };
        if from == target {
            return localized;
        }
        let conv = |v: f64| round_to(self.convert(v, from, target), 2);
        localized.price = conv(quote.price);
        localized.previous_close = conv(quote.previous_close);
        localized.change_amount = conv(quote.change_amount);
        localized.sma_5 = conv(quote.sma_5);
        localized.market_cap = quote.market_cap.map(|cap| self.convert(cap, from, target).round());
        localized.currency = target.to_string();
        localized
    }

    /// Copy of a USD-priced crypto quote with every money field in `target`.
    pub fn localize_crypto(&self, quote: &CryptoQuote, target: Currency) -> CryptoQuote {
        let mut localized = quote.clone();
        if target == Currency::USD {
            return localized;
        }
        let conv = |v: f64| self.convert(v, Currency::USD, target);
        localized.price = round_crypto_price(conv(quote.price));
        localized.previous_close = round_crypto_price(conv(quote.previous_close));
        localized.change_amount = round_crypto_price(conv(quote.change_amount));
        localized.market_cap = quote.market_cap.map(|v| conv(v).round());
        localized.volume_24h = quote.volume_24h.map(|v| conv(v).round());
        localized
    }

    /// Replace the rate with the `rates.BRL` value served at `url`.
    ///
    /// The current rate is kept when the request fails or the payload has no usable
    /// BRL rate.
    pub fn refresh(&mut self, client: &Client, url: &str) -> Result<f64> {
        let url = Url::parse(url).map_err(|e| MarketError::InvalidUrl(format!("{url}: {e}")))?;
        let fetched = get_json::<RatesResponse>(client, "exchange_rates", url)
            .and_then(|resp| {
                resp.and_then(|r| r.rates.get("BRL").copied())
                    .filter(|rate| *rate > 0.0)
                    .ok_or_else(|| MarketError::ResponseFormat("no BRL rate".into()))
            });
        match fetched {
            Ok(rate) => {
                info!("USD/BRL rate updated to {rate}");
                self.usd_brl = rate;
                Ok(rate)
            }
            Err(err) => {
                warn!("keeping USD/BRL rate {}: {err}", self.usd_brl);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(currency: &str) -> StockQuote {
        let mut quote =
            StockQuote::from_history("X", "X", &[10.0, 12.0], &[5], currency, "").unwrap();
        quote.market_cap = Some(1_000.0);
        quote
    }

    #[test]
    fn formats_both_locales() {
        let conv = CurrencyConverter::default();
        assert_eq!(conv.format(1234.56, Currency::USD), "$1,234.56");
        assert_eq!(conv.format(1234.56, Currency::BRL), "R$ 1.234,56");
        assert_eq!(conv.format(-1234567.891, Currency::USD), "-$1,234,567.89");
        assert_eq!(conv.format(0.5, Currency::BRL), "R$ 0,50");
        assert_eq!(conv.format(999.999, Currency::USD), "$1,000.00");
        assert_eq!(conv.format(-0.001, Currency::USD), "$0.00");
        assert_eq!(
            conv.format_decimals(0.00001234, Currency::BRL, 8),
            "R$ 0,00001234"
        );
    }

    #[test]
    fn converts_in_both_directions() {
        let conv = CurrencyConverter::new(5.0);
        assert_eq!(conv.convert(2.0, Currency::USD, Currency::BRL), 10.0);
        assert_eq!(conv.convert(10.0, Currency::BRL, Currency::USD), 2.0);
        assert_eq!(conv.convert(3.0, Currency::BRL, Currency::BRL), 3.0);
        assert_eq!(CurrencyConverter::new(-1.0).usd_brl(), DEFAULT_USD_BRL);
    }

    #[test]
    fn localizes_stock_from_its_own_currency() {
        let conv = CurrencyConverter::new(5.0);
        let brl = conv.localize_stock(&stock("USD"), Currency::BRL);
        assert_eq!(brl.price, 60.0);
        assert_eq!(brl.change_amount, 10.0);
        assert_eq!(brl.market_cap, Some(5_000.0));
        assert_eq!(brl.currency, "BRL");
        assert_eq!(brl.change_percent, 20.0);

        let usd = conv.localize_stock(&stock("BRL"), Currency::USD);
        assert_eq!(usd.price, 2.4);

        let unchanged = conv.localize_stock(&stock("EUR"), Currency::BRL);
        assert_eq!(unchanged.price, 12.0);
        assert_eq!(unchanged.currency, "EUR");
    }

    #[test]
    fn localizes_crypto_from_usd() {
        let conv = CurrencyConverter::new(5.0);
        let mut quote = CryptoQuote::from_price("BTC", "Bitcoin", 100.0, 0.0);
        quote.volume_24h = Some(10.0);
        let brl = conv.localize_crypto(&quote, Currency::BRL);
        assert_eq!(brl.price, 500.0);
        assert_eq!(brl.volume_24h, Some(50.0));
        assert_eq!(conv.localize_crypto(&quote, Currency::USD).price, 100.0);
    }

    #[test]
    fn currency_parses_case_insensitively() {
        assert_eq!("brl".parse::<Currency>().unwrap(), Currency::BRL);
        assert!("eur".parse::<Currency>().is_err());
        assert_eq!(Currency::USD.to_string(), "USD");
    }
}
