//! Session API endpoints.
//!
//! - POST `/register` - Create an account and start a session
//! - POST `/login` - Verify credentials and start a session
//! - POST `/refresh-token` - Exchange the current refresh token for a new pair
//! - POST `/logout` - Revoke the refresh token (authenticated)
//! - GET `/me` - Current user's public profile (authenticated)
//! - GET `/all` - Every other user's public profile (authenticated)

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::envelope::Success;
use super::error::JsonBody;
use crate::auth::{Auth, require_auth};
use crate::db::{Database, PublicUser};
use crate::error::ApiError;
use crate::impl_gate_state;
use crate::jwt::{TokenIssuer, TokenPair};
use crate::session::SessionManager;

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub issuer: Arc<TokenIssuer>,
    pub sessions: SessionManager,
}

impl_gate_state!(AuthState);

pub fn router(state: AuthState) -> Router {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/all", get(all_users))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth::<AuthState>,
        ));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .merge(protected)
        .with_state(state)
}

#[derive(Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
    name: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Serialize)]
struct TokensData {
    tokens: TokenPair,
}

#[derive(Serialize)]
struct UserData {
    user: PublicUser,
}

#[derive(Serialize)]
struct UsersData {
    users: Vec<PublicUser>,
}

async fn register(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .sessions
        .register(&req.email, &req.password, &req.name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Success::new("User registered successfully", session),
    ))
}

async fn login(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.login(&req.email, &req.password).await?;
    Ok(Success::new("Logged in successfully", session))
}

async fn refresh_token(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state.sessions.refresh(req.refresh_token.as_deref()).await?;
    Ok(Success::new("Token refreshed successfully", TokensData { tokens }))
}

async fn logout(
    State(state): State<AuthState>,
    auth: Auth,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.logout(&auth.context().user_id).await?;
    Ok(Success::message("Logged out successfully"))
}

async fn me(State(state): State<AuthState>, auth: Auth) -> Result<impl IntoResponse, ApiError> {
    let user = state.sessions.current_user(&auth.context().user_id).await?;
    Ok(Success::data(UserData { user }))
}

async fn all_users(
    State(state): State<AuthState>,
    auth: Auth,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.sessions.list_others(&auth.context().user_id).await?;
    Ok(Success::data(UsersData { users }))
}
