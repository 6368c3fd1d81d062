//! Command-line arguments for the dashboard client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::{Parser, Subcommand};
use market_common::net::{DEFAULT_PORT, addr};
use market_common::quote::CryptoOrder;
use market_common::symbols::Region;

fn default_server() -> String {
    addr("127.0.0.1", DEFAULT_PORT)
}

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about = "Query a market dashboard server", long_about = None)]
pub struct Args {
    /// Dashboard server as `host:port`.
    #[arg(long, env = "DASHBOARD_SERVER", default_value_t = default_server())]
    pub server: String,

    /// Timeout in seconds of each request to the server.
    #[arg(long, default_value_t = 15)]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Latest quote of one stock or index (e.g. `AAPL`, `PETR4.SA`, `^GSPC`).
    Stock { symbol: String },

    /// Latest quote of one cryptocurrency (e.g. `BTC`).
    Crypto { symbol: String },

    /// Best performing stocks or top cryptocurrencies.
    Trending {
        #[command(subcommand)]
        kind: TrendingKind,
    },

    /// Health of the server's data sources.
    Health,

    /// Whether the region's stock exchange is open.
    Market {
        #[arg(long, value_enum, default_value_t = Region::US)]
        region: Region,
    },

    /// Poll the quotes of a watchlist file until Ctrl+C.
    Watch {
        /// Text file with symbols separated by commas, spaces, or new lines.
        /// Surrounding quotes are stripped, so quoted Windows paths work.
        #[arg(long)]
        path: String,

        /// Seconds between two polls.
        #[arg(long, default_value_t = 30)]
        interval: u64,
    },
}

#[derive(Debug, Subcommand)]
pub enum TrendingKind {
    Stocks {
        #[arg(long, default_value_t = 10)]
        limit: usize,

        #[arg(long, value_enum, default_value_t = Region::US)]
        region: Region,
    },
    Cryptos {
        #[arg(long, default_value_t = 10)]
        limit: usize,

        #[arg(long, value_enum, default_value_t = CryptoOrder::PercentChange24h)]
        order_by: CryptoOrder,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trending_subcommands() {
        let args = Args::try_parse_from([
            "market_client",
            "trending",
            "stocks",
            "--limit",
            "5",
            "--region",
            "BR",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Trending {
                kind: TrendingKind::Stocks {
                    limit: 5,
                    region: Region::BR
                }
            }
        ));

        let args = Args::try_parse_from([
            "market_client",
            "--server",
            "10.0.0.2:8000",
            "trending",
            "cryptos",
            "--order-by",
            "market_cap",
        ])
        .unwrap();
        assert_eq!(args.server, "10.0.0.2:8000");
        assert!(matches!(
            args.command,
            Command::Trending {
                kind: TrendingKind::Cryptos {
                    limit: 10,
                    order_by: CryptoOrder::MarketCap
                }
            }
        ));
    }

    #[test]
    fn watch_defaults_interval() {
        let args =
            Args::try_parse_from(["market_client", "watch", "--path", "symbols.txt"]).unwrap();
        match args.command {
            Command::Watch { path, interval } => {
                assert_eq!(path, "symbols.txt");
                assert_eq!(interval, 30);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
