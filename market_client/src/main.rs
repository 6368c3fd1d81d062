//! Market Client: a command-line client of the market dashboard server.
//!
//! It asks the server's JSON API for single quotes, trending lists, exchange hours
//! or the health of the data sources and prints them one per line. The `watch` command reads a
//! watchlist file and polls the quotes of its symbols until Ctrl+C, in batches the
//! server accepts.
//!
//! Usage example (CLI):
//! ```bash
//! market_client --server 192.168.0.10:8000 trending cryptos --order-by market_cap
//! market_client watch --path ./symbols.txt --interval 60
//! ```
//!
//! The watchlist file should contain symbols separated by commas, spaces, or new
//! lines. See `market_common::symbols` for details.
#![warn(missing_docs)]
mod api;
mod args;
mod display;

use crate::api::DashboardClient;
use crate::args::{Args, Command, TrendingKind};
use clap::Parser;
use log::{error, info, warn};
use market_common::symbols::{SymbolListParser, Watchlist};
use market_common::{MarketError, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

/// Granularity at which the watch loop notices a shutdown request.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

fn main() {
    init_logger();
    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let client = DashboardClient::new(&args.server, Duration::from_secs(args.timeout))?;

    match args.command {
        Command::Stock { symbol } => match client.stock(&symbol)? {
            Some(quote) => println!("{}", display::stock_line(&quote)),
            None => warn!("No data for stock {symbol}"),
        },
        Command::Crypto { symbol } => match client.crypto(&symbol)? {
            Some(quote) => println!("{}", display::crypto_line(&quote)),
            None => warn!("No data for cryptocurrency {symbol}"),
        },
        Command::Trending { kind } => match kind {
            TrendingKind::Stocks { limit, region } => {
                for quote in client.trending_stocks(limit, region)? {
                    println!("{}", display::stock_line(&quote));
                }
            }
            TrendingKind::Cryptos { limit, order_by } => {
                for quote in client.trending_cryptos(limit, order_by)? {
                    println!("{}", display::crypto_line(&quote));
                }
            }
        },
        Command::Health => {
            for line in display::health_lines(&client.health()?) {
                println!("{line}");
            }
        }
        Command::Market { region } => {
            println!("{}", display::market_line(&client.market_status(region)?));
        }
        Command::Watch { path, interval } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let shutdown = shutdown.clone();
                ctrlc::set_handler(move || {
                    info!("Ctrl+C received. Shutting down client...");
                    shutdown.store(true, Ordering::SeqCst);
                })
                .map_err(|e| MarketError::Io(std::io::Error::other(e)))?;
            }
            let symbols = read_watchlist(&normalize_path(&path))?;
            info!("Watching {} symbols: {:?}", symbols.len(), symbols);
            watch(&client, &symbols, Duration::from_secs(interval.max(1)), &shutdown);
        }
    }
    Ok(())
}

/// Polls `symbols` every `interval` until `shutdown` is set.
///
/// A failed poll is logged and retried on the next tick.
fn watch(client: &DashboardClient, symbols: &[String], interval: Duration, shutdown: &AtomicBool) {
    info!("Client is running. Press Ctrl+C to exit.");
    while !shutdown.load(Ordering::Relaxed) {
        match client.stocks(symbols) {
            Ok(quotes) => {
                println!("{}", display::poll_header(quotes.len()));
                for quote in &quotes {
                    println!("{}", display::stock_line(quote));
                }
            }
            Err(e) => error!("Poll failed: {e}"),
        }

        let next = Instant::now() + interval;
        while !shutdown.load(Ordering::Relaxed) && Instant::now() < next {
            thread::sleep(SHUTDOWN_POLL);
        }
    }
    info!("Watch loop stopping...");
}

fn read_watchlist(path: &Path) -> Result<Vec<String>> {
    if !is_file_exist(path) {
        return Err(MarketError::InvalidRequest(format!(
            "watchlist file {} does not exist",
            path.display()
        )));
    }
    let symbols = Watchlist::parse_from_reader(BufReader::new(File::open(path)?))?;
    if symbols.is_empty() {
        return Err(MarketError::InvalidRequest(format!(
            "watchlist file {} holds no symbols",
            path.display()
        )));
    }
    Ok(symbols)
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}

fn is_file_exist(path: &Path) -> bool {
    path.exists() && path.is_file()
}
