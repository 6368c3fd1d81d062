//! Market dashboard server.
//!
//! Serves a stock and cryptocurrency dashboard over HTTP. Quotes come from Yahoo
//! Finance and CoinGecko (or from built-in demo tables with `--use-mock-data`) and
//! flow through a small set of building blocks:
//!
//! - `provider`: blocking HTTP clients for the upstream APIs behind two traits.
//! - `service`: per-source caches with TTL, failure tracking, throttling and the
//!   fallback to stale or synthetic data; `Dashboard` bundles both services.
//! - `fanout`: bounded parallel fetch of several symbols.
//! - `listener` / `router`: the axum server on a tokio runtime, and the mapping
//!   of routes onto JSON API calls and HTML fragments. Service calls run on the
//!   blocking pool since the upstream clients are blocking.
//!
//! Configuration comes from flags or environment variables (see `args`). Logging
//! uses `env_logger` with `info` as default level; set `RUST_LOG` to change it.
use crate::args::Args;
use crate::currency::CurrencyConverter;
use crate::provider::coingecko::CoinGeckoProvider;
use crate::provider::mock::{MockCryptoProvider, MockStockProvider};
use crate::provider::yahoo::YahooProvider;
use crate::provider::{CryptoProvider, StockProvider, http_client};
use crate::service::crypto::CryptoService;
use crate::service::dashboard::Dashboard;
use crate::service::stock::StockService;
use clap::Parser;
use log::{error, info};
use market_common::Result;
use std::sync::Arc;

mod args;
mod currency;
mod fanout;
mod listener;
mod model;
mod provider;
mod render;
mod router;
mod service;

fn main() {
    init_logger();
    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let client = http_client(args.request_timeout())?;

    let (stocks, crypto): (Arc<dyn StockProvider>, Arc<dyn CryptoProvider>) = if args.use_mock_data
    {
        info!("Using demo data instead of live providers");
        (
            Arc::new(MockStockProvider::new()),
            Arc::new(MockCryptoProvider::new()),
        )
    } else {
        (
            Arc::new(YahooProvider::new(client.clone(), &args.yahoo_base_url)),
            Arc::new(CoinGeckoProvider::new(client.clone(), &args.coingecko_base_url)),
        )
    };

    let mut converter = CurrencyConverter::new(args.usd_brl);
    if args.refresh_exchange_rate && !args.use_mock_data {
        converter.refresh(&client, &args.exchange_rates_url).ok();
    }
    info!("Converting prices at USD/BRL {}", converter.usd_brl());

    let dashboard = Arc::new(Dashboard::new(
        StockService::new(stocks, args.stock_config()),
        CryptoService::new(crypto, args.crypto_config()),
        converter,
    ));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.http_workers.max(1))
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let socket = listener::bind(&args.bind_addr()).await?;
        listener::serve(socket, Arc::clone(&dashboard)).await
    })
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
