//! Access token verification and role checks.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::bearer::bearer_token;
use super::state::GateState;
use super::types::AuthContext;
use crate::db::UserRole;
use crate::error::{ApiError, ResultExt};
use crate::jwt::{JwtError, TokenType};

/// Verify the bearer access token in `headers` and resolve it to a live user.
///
/// - no usable `Authorization: Bearer` header: `Unauthenticated`
/// - validly signed but expired: `TokenExpired`
/// - bad signature, unparsable, or a refresh token: `Unauthenticated`
/// - user deleted since issuance: `Unauthenticated`
pub async fn authenticate<S>(headers: &HeaderMap, state: &S) -> Result<AuthContext, ApiError>
where
    S: GateState + Send + Sync,
{
    let token =
        bearer_token(headers).ok_or_else(|| ApiError::unauthenticated("Authentication required"))?;

    let claims = state.issuer().codec().decode(token).map_err(|e| match e {
        JwtError::Expired => ApiError::TokenExpired,
        _ => ApiError::unauthenticated("Invalid token"),
    })?;

    if claims.token_type != TokenType::Access {
        return Err(ApiError::unauthenticated("Invalid token type"));
    }

    let user = state
        .db()
        .users()
        .get_by_uuid(&claims.sub)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::unauthenticated("User not found"))?;

    Ok(AuthContext {
        user_id: user.uuid,
        role: user.role,
        name: user.name,
    })
}

/// Check that a request was authenticated and that its role is one of `allowed`.
pub fn authorize<'a>(
    context: Option<&'a AuthContext>,
    allowed: &[UserRole],
) -> Result<&'a AuthContext, ApiError> {
    let context = context.ok_or_else(|| ApiError::unauthenticated("Authentication required"))?;

    if !allowed.contains(&context.role) {
        return Err(ApiError::forbidden("Forbidden - Insufficient permissions"));
    }

    Ok(context)
}

/// Middleware that authenticates every request and stores the `AuthContext`
/// in the request extensions. Short-circuits with the mapped error otherwise.
pub async fn require_auth<S>(State(state): State<S>, mut request: Request, next: Next) -> Response
where
    S: GateState + Clone + Send + Sync + 'static,
{
    match authenticate(request.headers(), &state).await {
        Ok(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::db::Database;
    use crate::impl_gate_state;
    use crate::jwt::{TokenBody, TokenIssuer};

    #[derive(Clone)]
    struct TestState {
        db: Database,
        issuer: Arc<TokenIssuer>,
    }

    impl_gate_state!(TestState);

    async fn state_with_user(role: UserRole) -> TestState {
        let db = Database::open(":memory:").await.unwrap();
        db.users()
            .create("uuid-1", "a@x.com", "Alice", "hash", None)
            .await
            .unwrap();
        if role == UserRole::Admin {
            db.users()
                .set_role_by_email("a@x.com", UserRole::Admin)
                .await
                .unwrap();
        }
        let issuer = Arc::new(TokenIssuer::new(
            b"gate-test-secret",
            Duration::from_secs(60),
            Duration::from_secs(3600),
        ));
        TestState { db, issuer }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    fn context(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: "uuid-1".to_string(),
            role,
            name: "Alice".to_string(),
        }
    }

    #[tokio::test]
    async fn test_valid_access_token() {
        let state = state_with_user(UserRole::Member).await;
        let token = state
            .issuer
            .codec()
            .encode(TokenBody::access("uuid-1", UserRole::Member), 60)
            .unwrap();

        let ctx = authenticate(&bearer(&token.token), &state).await.unwrap();
        assert_eq!(ctx, context(UserRole::Member));
    }

    #[tokio::test]
    async fn test_context_role_comes_from_store() {
        let state = state_with_user(UserRole::Admin).await;
        // Token was issued before the promotion
        let token = state
            .issuer
            .codec()
            .encode(TokenBody::access("uuid-1", UserRole::Member), 60)
            .unwrap();

        let ctx = authenticate(&bearer(&token.token), &state).await.unwrap();
        assert_eq!(ctx.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_missing_header() {
        let state = state_with_user(UserRole::Member).await;
        let err = authenticate(&HeaderMap::new(), &state).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_expired_access_token() {
        let state = state_with_user(UserRole::Member).await;
        let token = state
            .issuer
            .codec()
            .encode(TokenBody::access("uuid-1", UserRole::Member), -1)
            .unwrap();

        let err = authenticate(&bearer(&token.token), &state).await.unwrap_err();
        assert_eq!(err, ApiError::TokenExpired);
    }

    #[tokio::test]
    async fn test_refresh_token_rejected() {
        let state = state_with_user(UserRole::Member).await;
        let token = state
            .issuer
            .codec()
            .encode(TokenBody::refresh("uuid-1"), 60)
            .unwrap();

        let err = authenticate(&bearer(&token.token), &state).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_foreign_secret_rejected() {
        let state = state_with_user(UserRole::Member).await;
        let other = TokenIssuer::new(
            b"another-secret",
            Duration::from_secs(60),
            Duration::from_secs(60),
        );
        let token = other
            .codec()
            .encode(TokenBody::access("uuid-1", UserRole::Admin), -5)
            .unwrap();

        let err = authenticate(&bearer(&token.token), &state).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let state = state_with_user(UserRole::Member).await;
        let token = state
            .issuer
            .codec()
            .encode(TokenBody::access("uuid-gone", UserRole::Member), 60)
            .unwrap();

        let err = authenticate(&bearer(&token.token), &state).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[test]
    fn test_authorize_roles() {
        let member = context(UserRole::Member);
        let admin = context(UserRole::Admin);

        assert!(matches!(
            authorize(Some(&member), &[UserRole::Admin]),
            Err(ApiError::Forbidden(_))
        ));
        assert!(authorize(Some(&admin), &[UserRole::Admin]).is_ok());
        assert!(authorize(Some(&member), &[UserRole::Member, UserRole::Admin]).is_ok());
    }

    #[test]
    fn test_authorize_without_context() {
        assert!(matches!(
            authorize(None, &[UserRole::Member]),
            Err(ApiError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_authorize_empty_allow_list() {
        let admin = context(UserRole::Admin);
        assert!(matches!(
            authorize(Some(&admin), &[]),
            Err(ApiError::Forbidden(_))
        ));
    }
}
