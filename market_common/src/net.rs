//! Shared networking constants and helpers used by server and client.

/// TCP port the dashboard HTTP server listens on by default.
pub const DEFAULT_PORT: u16 = 8000;
/// Default bind address of the dashboard HTTP server.
pub const DEFAULT_BIND: &str = "0.0.0.0";
/// Prefix of the current JSON API.
pub const API_PREFIX: &str = "/api/v3";
/// Prefix of the previous JSON API, still served for trending and cache routes.
pub const LEGACY_API_PREFIX: &str = "/api/v2";
/// Prefix of the HTML fragment routes.
pub const HTMX_PREFIX: &str = "/htmx";
/// Most symbols accepted by one batch quote request.
pub const MAX_BATCH_SYMBOLS: usize = 20;

/// Helper to format an IPv4 address with a port like "ip:port".
pub fn addr(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_host_and_port() {
        assert_eq!(addr("127.0.0.1", DEFAULT_PORT), "127.0.0.1:8000");
    }
}
