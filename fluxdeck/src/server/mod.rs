//! Local gallery server.
//!
//! Serves a session directory as static files so galleries can be browsed
//! over HTTP instead of `file://`.
//!
//! Endpoints:
//! - GET /api/session - The session summary, rebuilt from run records
//! - GET /* - Files under the session directory (`index.html` for `/`)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Json, Router};
use tower_http::services::ServeDir;

use crate::models::SessionSummary;
use crate::session::Session;

pub const DEFAULT_PORT: u16 = 58240;

struct ServerState {
    session: Session,
}

/// Build the router for a session.
pub fn router(session: Session) -> Router {
    let files = ServeDir::new(session.root()).append_index_html_on_directories(true);
    let state = Arc::new(ServerState { session });

    Router::new()
        .route("/api/session", get(session_summary))
        .fallback_service(files)
        .with_state(state)
}

/// Serve `session` on localhost until interrupted.
pub async fn start_server(session: Session, port: u16, open_browser: bool) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    println!("Serving {} on http://{addr}", session.root().display());
    tracing::info!(session = %session.name(), %addr, "gallery server listening");

    if open_browser {
        if let Err(e) = open::that(format!("http://{addr}")) {
            tracing::warn!(error = %e, "failed to open browser");
        }
    }

    axum::serve(listener, router(session))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
    }
}

async fn session_summary(State(state): State<Arc<ServerState>>) -> Json<SessionSummary> {
    Json(state.session.summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use chrono::{NaiveDate, TimeDelta};
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn get_raw(addr: SocketAddr, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request =
            format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_serves_session_files_and_summary() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path(), TimeDelta::hours(4));
        let now = NaiveDate::from_ymd_opt(2025, 3, 8)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let session = store.resolve(false, now);
        session.ensure_created().unwrap();
        std::fs::write(session.root().join("index.html"), "<h1>gallery</h1>").unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(session)).await.unwrap();
        });

        let page = get_raw(addr, "/").await;
        assert!(page.starts_with("HTTP/1.1 200"));
        assert!(page.contains("<h1>gallery</h1>"));

        let summary = get_raw(addr, "/api/session").await;
        assert!(summary.contains("\"name\":\"mflux_output_20250308_093000\""));

        let missing = get_raw(addr, "/nope.png").await;
        assert!(missing.starts_with("HTTP/1.1 404"));
    }
}
