//! HTTP server for the health surface.

use anyhow::Result;
use axum::{Router, routing::get};
use hermes_agent::SessionStore;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::health_api;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub started_at: Instant,
    pub sessions: Arc<SessionStore>,
    pub version: &'static str,
}

impl GatewayState {
    pub fn new(sessions: Arc<SessionStore>, version: &'static str) -> Self {
        Self {
            started_at: Instant::now(),
            sessions,
            version,
        }
    }
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_api::get_health))
        .route("/health", get(health_api::get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves.
#[instrument(skip(state, shutdown))]
pub async fn start_server(
    addr: SocketAddr,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Gateway HTTP server listening on {}", listener.local_addr()?);
    serve(listener, state, shutdown).await
}

pub async fn serve(
    listener: TcpListener,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn serves_health_on_both_paths() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = GatewayState::new(Arc::new(SessionStore::default()), "0.1.0");
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, state, async {
            let _ = stop_rx.await;
        }));

        for path in ["/health", "/"] {
            let response = get(addr, path).await;
            assert!(response.starts_with("HTTP/1.1 200"), "{response}");
            assert!(response.contains("\"status\":\"ok\""));
            assert!(response.contains("\"version\":\"0.1.0\""));
        }
        assert!(get(addr, "/missing").await.starts_with("HTTP/1.1 404"));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
