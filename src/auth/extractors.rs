//! Axum extractors for authenticated handlers.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::gate::authorize;
use super::types::AuthContext;
use crate::db::UserRole;
use crate::error::ApiError;

/// The set of roles a route accepts.
pub trait RoleConstraint: Send + Sync + 'static {
    const ALLOWED: &'static [UserRole];
}

/// Any authenticated user.
pub struct AnyRole;

impl RoleConstraint for AnyRole {
    const ALLOWED: &'static [UserRole] = &[UserRole::Member, UserRole::Admin];
}

/// Administrators only.
pub struct AdminOnly;

impl RoleConstraint for AdminOnly {
    const ALLOWED: &'static [UserRole] = &[UserRole::Admin];
}

/// Extractor for handlers behind the `require_auth` layer.
///
/// Reads the `AuthContext` the gate attached to the request and checks its role
/// against `R`. A route that forgot the layer has no context and is rejected as
/// unauthenticated rather than silently served.
pub struct Auth<R: RoleConstraint = AnyRole>(pub AuthContext, PhantomData<R>);

impl<R: RoleConstraint> Auth<R> {
    pub fn context(&self) -> &AuthContext {
        &self.0
    }
}

impl<S, R> FromRequestParts<S> for Auth<R>
where
    S: Send + Sync,
    R: RoleConstraint,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = authorize(parts.extensions.get::<AuthContext>(), R::ALLOWED)?;
        Ok(Auth(context.clone(), PhantomData))
    }
}
