mod admin;
mod auth;
mod envelope;
mod error;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::TokenIssuer;
use crate::session::SessionManager;

pub use envelope::Success;
pub use error::JsonBody;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    issuer: Arc<TokenIssuer>,
    sessions: SessionManager,
) -> Router {
    let admin_state = admin::AdminState {
        db: db.clone(),
        issuer: issuer.clone(),
        sessions: sessions.clone(),
    };

    let auth_state = auth::AuthState {
        db,
        issuer,
        sessions,
    };

    Router::new()
        .nest("/auth", auth::router(auth_state))
        .nest("/admin", admin::router(admin_state))
}
