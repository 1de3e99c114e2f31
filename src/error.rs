//! Error taxonomy shared by the lifecycle manager, the gate and the HTTP layer.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Message used for every expired access token, so clients can branch on it.
pub const TOKEN_EXPIRED_MESSAGE: &str = "Token expired";

/// Message returned for every internal failure. The real cause is only logged.
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn db_err(self, context: &str) -> Result<T, ApiError>;
    fn internal_err(self, context: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, context: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::db_error(context, e))
    }
    fn internal_err(self, context: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::internal_error(context, e))
    }
}

/// API error type with automatic response conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Missing or invalid required input.
    BadRequest(String),
    /// A unique field is already taken.
    Conflict(String),
    /// Missing, invalid, revoked or wrong credential.
    Unauthenticated(String),
    /// The access token itself has expired; the client should refresh.
    TokenExpired,
    /// Authenticated, but the role is not allowed.
    Forbidden(String),
    /// The referenced identity or resource no longer exists.
    NotFound(String),
    /// Storage, hashing or signing failure. Detail is logged, never returned.
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal() -> Self {
        Self::Internal(INTERNAL_MESSAGE.into())
    }

    pub fn db_error(context: &str, e: impl std::fmt::Display) -> Self {
        error!(error = %e, "{}", context);
        Self::internal()
    }

    pub fn internal_error(context: &str, e: impl std::fmt::Display) -> Self {
        error!(error = %e, "{}", context);
        Self::internal()
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthenticated(_) | ApiError::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unauthenticated(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Internal(msg) => msg,
            ApiError::TokenExpired => TOKEN_EXPIRED_MESSAGE,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status_code().as_u16(), self.message())
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    status: &'static str,
    code: u16,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            status: "error",
            code: status.as_u16(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::unauthenticated("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::internal().status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_detail_hidden() {
        let result: Result<(), &str> = Err("disk I/O error at /var/lib/db");
        let err = result.db_err("Failed to load user").unwrap_err();
        assert_eq!(err.message(), "Internal server error");
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::TokenExpired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], 401);
        assert_eq!(json["message"], "Token expired");
    }
}
