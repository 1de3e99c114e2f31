pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod error;
pub mod jwt;
pub mod password;
pub mod session;

use api::create_api_router;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, OriginalUri},
    routing::get,
};
use db::Database;
use error::ApiError;
use jwt::TokenIssuer;
use password::PasswordHasher;
use session::SessionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 10 * 1024;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// HMAC secret for signing both token kinds
    pub jwt_secret: Vec<u8>,
    /// Lifetime of access tokens
    pub access_ttl: Duration,
    /// Lifetime of refresh tokens
    pub refresh_ttl: Duration,
    /// Argon2 cost parameters for password hashing
    pub password_params: argon2::Params,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let issuer = Arc::new(TokenIssuer::new(
        &config.jwt_secret,
        config.access_ttl,
        config.refresh_ttl,
    ));
    let passwords = PasswordHasher::new(config.password_params.clone());
    let sessions = SessionManager::new(config.db.clone(), issuer.clone(), passwords);

    Router::new()
        .route("/health", get(health))
        .nest("/api", create_api_router(config.db.clone(), issuer, sessions))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "OK" }))
}

async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    let path = uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_else(|| uri.path());
    ApiError::not_found(format!("Resource not found: {}", path))
}

/// Resolves when the process receives Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

/// Run the server on the given listener until a shutdown signal arrives.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}
