use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use super::api::{self, AppState, SharedState};
use super::db::{BoardDb, DatabaseLocation};
use super::ws;

/// Configuration for the board server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database: DatabaseLocation,
    pub key_prefix: String,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 2718,
            database: DatabaseLocation::Local(PathBuf::from(".skiff/board.db")),
            key_prefix: "APP".to_string(),
            dev_mode: false,
        }
    }
}

/// Build the full application router: REST API plus the WebSocket event
/// stream.
pub fn build_router(state: SharedState) -> Router {
    api::api_router()
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

/// Start the board server and block until shutdown.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    // Ensure parent directory exists for a local database file.
    if let DatabaseLocation::Local(path) = &config.database {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
    }

    let db = BoardDb::connect(&config.database)
        .await
        .context("Failed to initialize board database")?;
    let (ws_tx, _rx) = broadcast::channel::<String>(256);
    let state = Arc::new(AppState::new(db, ws_tx, config.key_prefix.clone()));

    let mut app = build_router(state);
    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    // Dev mode binds all interfaces so a containerized UI dev server can
    // reach the API.
    let host = if config.dev_mode {
        "0.0.0.0"
    } else {
        config.host.as_str()
    };
    let addr = format!("{}:{}", host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!("Skiff board serving at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn test_router() -> Router {
        let db = BoardDb::open_in_memory().await.unwrap();
        let (ws_tx, _) = broadcast::channel(16);
        let state = Arc::new(AppState::new(db, ws_tx, "APP".to_string()));
        build_router(state)
    }

    #[tokio::test]
    async fn test_health_via_full_router() {
        let app = test_router().await;
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_routes_mounted() {
        let app = test_router().await;
        let req = Request::builder()
            .uri("/api/issues")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_issue_via_full_router() {
        let app = test_router().await;
        let req = Request::builder()
            .method("POST")
            .uri("/api/issues")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "summary": "Router test",
                    "description": "Create through the assembled router",
                    "acceptance_criteria": "Issue is stored",
                    "issue_type": "Task",
                    "priority": "P2",
                })
                .to_string(),
            ))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let issue: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(issue["issue_key"], "APP-0001");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = test_router().await;
        let req = Request::builder()
            .uri("/api/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 2718);
        assert_eq!(
            config.database,
            DatabaseLocation::Local(PathBuf::from(".skiff/board.db"))
        );
        assert_eq!(config.key_prefix, "APP");
        assert!(!config.dev_mode);
    }
}
