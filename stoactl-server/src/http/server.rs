//! Axum server setup
//!
//! - Localhost-only CORS by default
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use sqlx::PgPool;
use stoactl_core::config::ReminderSection;
use stoactl_core::StoaConfig;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;
use crate::leasing::LeasingService;
use crate::mail::{LogMailer, Mailer};
use crate::storage::{self, FileStore};

/// Upper bound for request bodies (file uploads, dataset chunks).
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:3030)
    pub bind_addr: SocketAddr,

    /// Allow any origin (default: false = localhost only)
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            cors_permissive: false,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub pool: PgPool,
    pub leasing: LeasingService,
    pub files: Arc<dyn FileStore>,
    pub mailer: Arc<dyn Mailer>,
    pub reminders: ReminderSection,
}

impl AppState {
    /// Wire services from configuration. Must be called inside a Tokio runtime
    /// (the leasing service spawns its rebuild debouncer).
    pub fn new(pool: PgPool, config: &StoaConfig) -> Self {
        let files = storage::from_config(&config.storage);
        tracing::info!(store = %files.describe(), "file storage configured");
        Self {
            leasing: LeasingService::new(pool.clone(), &config.leasing, config.domo.clone()),
            pool,
            files,
            mailer: Arc::new(LogMailer),
            reminders: config.reminders.clone(),
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_file_store(mut self, files: Arc<dyn FileStore>) -> Self {
        self.files = files;
        self
    }
}

fn cors_layer(permissive: bool) -> CorsLayer {
    if permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:3030"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
            HeaderValue::from_static("http://127.0.0.1:3030"),
        ])
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Assemble the full application router.
pub fn build_router(state: AppState, cors_permissive: bool) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/core", routes::core_router())
        .nest("/api/banking", routes::banking_router())
        .nest("/api/leasing", routes::leasing::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(cors_permissive))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Run the HTTP server until Ctrl+C or SIGTERM.
pub async fn run_server(state: AppState, config: ServerConfig) -> Result<(), ServerError> {
    let app = build_router(state, config.cors_permissive);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3030);
        assert!(!config.cors_permissive);
    }

    /// Router over a pool that never connects; only DB-free paths are exercised.
    fn app() -> Router {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        build_router(AppState::new(pool, &StoaConfig::default()), false)
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (status, body) =
            send(Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn non_numeric_id_is_bad_request() {
        let (status, body) = send(
            Request::builder()
                .uri("/api/core/projects/abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"]["message"].as_str().unwrap().contains("id"));
    }

    #[tokio::test]
    async fn missing_required_field_is_bad_request() {
        let (status, body) = send(json_request("POST", "/api/core/banks", "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn invalid_enum_is_bad_request() {
        let (status, _) = send(json_request(
            "POST",
            "/api/banking/loans",
            r#"{"ProjectId": 1, "FixedOrFloating": "Sideways"}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_update_is_bad_request() {
        let (status, body) = send(json_request("PUT", "/api/core/projects/7", "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "no fields to update");
    }

    #[tokio::test]
    async fn malformed_json_uses_error_envelope() {
        let (status, body) = send(json_request("POST", "/api/core/persons", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn unknown_dataset_is_reported_not_rejected() {
        let (status, body) = send(json_request(
            "POST",
            "/api/leasing/sync",
            r#"{"rentroll": [{"Property": "Elm"}]}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"][0]["dataset"], "rentroll");
        assert!(body["synced"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn chunked_sync_requires_single_dataset() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/leasing/sync")
            .header("content-type", "application/json")
            .header("x-leasing-sync-first-chunk", "true")
            .body(Body::from(r#"{"leasing": [], "units": []}"#))
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_dataset_rows_is_bad_request() {
        let (status, _) = send(
            Request::builder()
                .uri("/api/leasing/datasets/rentroll")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_requires_file_name() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/banking/projects/3/files")
            .body(Body::from("%PDF-1.4"))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains("fileName"));
    }

    #[tokio::test]
    async fn domo_sync_without_credentials_is_bad_request() {
        let (status, body) = send(json_request("POST", "/api/leasing/sync-from-domo", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn dashboard_honours_if_none_match() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let state = AppState::new(pool, &StoaConfig::default());
        let as_of = chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let dashboard = stoactl_core::leasing::compute_dashboard(
            &stoactl_core::leasing::DashboardInputs::new(),
            as_of,
            stoactl_core::leasing::KpiWindows::default(),
        );
        let snapshot = state.leasing.snapshots().prime(dashboard).await.unwrap();
        let app = build_router(state, false);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/leasing/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let etag = response.headers()["etag"].to_str().unwrap().to_owned();
        assert_eq!(etag, snapshot.etag);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/leasing/dashboard")
                    .header("if-none-match", &etag)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(response.headers()["etag"], etag.as_str());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }
}
