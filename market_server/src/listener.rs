//! HTTP front door of the dashboard.
//!
//! Binds the TCP socket and serves the router with axum until Ctrl-C. A failed
//! connection is handled inside hyper and never stops the server.

use crate::router;
use crate::service::dashboard::Dashboard;
use log::{error, info};
use market_common::Result;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Bind to `bind_addr` (e.g., `0.0.0.0:8000`; port 0 picks a free one).
pub async fn bind(bind_addr: &str) -> Result<TcpListener> {
    Ok(TcpListener::bind(bind_addr).await?)
}

/// Serve the dashboard on `socket` until the process is interrupted.
pub async fn serve(socket: TcpListener, dashboard: Arc<Dashboard>) -> Result<()> {
    info!("Dashboard available at http://{}", socket.local_addr()?);
    axum::serve(socket, router::app(dashboard))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Dashboard HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested, finishing open requests"),
        Err(e) => {
            error!("Cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::dashboard::tests::mock_dashboard;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn exchange(addr: SocketAddr, raw: &str) -> String {
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(raw.as_bytes()).await.unwrap();
        let mut answer = String::new();
        client.read_to_string(&mut answer).await.unwrap();
        answer
    }

    #[tokio::test]
    async fn serves_requests_over_loopback() {
        let socket = bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(serve(socket, Arc::new(mock_dashboard())));

        let answer = exchange(
            addr,
            "GET /api/v3/health HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(answer.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(answer.contains("\"success\":true"));

        // A malformed request does not take the server down.
        let answer = exchange(addr, "NONSENSE\r\n\r\n").await;
        assert!(answer.starts_with("HTTP/1.1 400"));

        let answer = exchange(
            addr,
            "GET /htmx/status HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(answer.contains("Stocks: available"));
    }
}
