//! Admin API endpoints.
//!
//! All endpoints require admin role.

use axum::{Router, extract::State, middleware, response::IntoResponse, routing::get};
use serde::Serialize;
use std::sync::Arc;

use super::envelope::Success;
use crate::auth::{AdminOnly, Auth, require_auth};
use crate::db::{Database, PublicUser};
use crate::error::ApiError;
use crate::impl_gate_state;
use crate::jwt::TokenIssuer;
use crate::session::SessionManager;

/// State for admin endpoints.
#[derive(Clone)]
pub struct AdminState {
    pub db: Database,
    pub issuer: Arc<TokenIssuer>,
    pub sessions: SessionManager,
}

impl_gate_state!(AdminState);

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth::<AdminState>,
        ))
        .with_state(state)
}

#[derive(Serialize)]
struct UsersData {
    users: Vec<PublicUser>,
}

/// List every user, the caller included.
async fn list_users(
    State(state): State<AdminState>,
    _auth: Auth<AdminOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.sessions.list_all().await?;
    Ok(Success::data(UsersData { users }))
}
