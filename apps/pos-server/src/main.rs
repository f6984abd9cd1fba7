//! # Beacon POS Server
//!
//! Serves the static device pages and hosts the relay hub in one process.
//!
//! ## Routes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         POS Server Routes                               │
//! │                                                                         │
//! │  GET /            home page (device picker)                            │
//! │  GET /pos         POS terminal page                                    │
//! │  GET /scanner     barcode scanner page                                 │
//! │  GET /analytics   sales analytics page                                 │
//! │  *                404 with the home page body                          │
//! │                                                                         │
//! │  GET /ws          relay hub WebSocket (Join handshake)                 │
//! │  GET /health      hub liveness                                         │
//! │                                                                         │
//! │  Port: BEACON_PORT, then PORT, default 8000                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use beacon_relay::hub::{hub_router, HubState};

/// Default listen port.
const DEFAULT_PORT: u16 = 8000;

// =============================================================================
// Static Pages
// =============================================================================

const HOME_PAGE: &str = include_str!("../static/home.html");
const POS_PAGE: &str = include_str!("../static/pos.html");
const SCANNER_PAGE: &str = include_str!("../static/scanner.html");
const ANALYTICS_PAGE: &str = include_str!("../static/analytics.html");

async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}

async fn pos_page() -> Html<&'static str> {
    Html(POS_PAGE)
}

async fn scanner_page() -> Html<&'static str> {
    Html(SCANNER_PAGE)
}

async fn analytics_page() -> Html<&'static str> {
    Html(ANALYTICS_PAGE)
}

/// Unknown paths get the home page body with a 404 status.
async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(HOME_PAGE))
}

// =============================================================================
// Router
// =============================================================================

/// Builds the full application router: pages plus relay hub.
fn app_router(hub: std::sync::Arc<HubState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/pos", get(pos_page))
        .route("/scanner", get(scanner_page))
        .route("/analytics", get(analytics_page))
        .merge(hub_router(hub))
        .fallback(not_found)
}

/// Listen port: BEACON_PORT wins, then PORT, then the default.
fn listen_port() -> u16 {
    std::env::var("BEACON_PORT")
        .or_else(|_| std::env::var("PORT"))
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

// =============================================================================
// Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; RUST_LOG overrides the default level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Beacon POS server...");

    let hub = HubState::new();
    let app = app_router(hub);

    let addr: SocketAddr = format!("0.0.0.0:{}", listen_port()).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_when_env_unset() {
        // Only meaningful when the variables are absent, which is the
        // normal test environment.
        if std::env::var("BEACON_PORT").is_err() && std::env::var("PORT").is_err() {
            assert_eq!(listen_port(), DEFAULT_PORT);
        }
    }

    #[tokio::test]
    async fn test_pages_and_404_fallback() {
        let app = app_router(HubState::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let get = |path: &str| {
            let addr = addr;
            let path = path.to_string();
            async move {
                use tokio::io::{AsyncReadExt, AsyncWriteExt};
                let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
                stream
                    .write_all(
                        format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
                            .as_bytes(),
                    )
                    .await
                    .unwrap();
                let mut response = String::new();
                stream.read_to_string(&mut response).await.unwrap();
                response
            }
        };

        let home = get("/").await;
        assert!(home.starts_with("HTTP/1.1 200"));
        assert!(home.contains("Beacon POS"));

        assert!(get("/pos").await.starts_with("HTTP/1.1 200"));
        assert!(get("/scanner").await.starts_with("HTTP/1.1 200"));
        assert!(get("/analytics").await.starts_with("HTTP/1.1 200"));
        assert!(get("/health").await.starts_with("HTTP/1.1 200"));

        let missing = get("/no-such-page").await;
        assert!(missing.starts_with("HTTP/1.1 404"));
        assert!(missing.contains("Beacon POS"));
    }
}
