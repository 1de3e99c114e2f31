//! Per-request authentication types.

use crate::db::UserRole;

/// Identity attached to a request by the gate. Lives for one request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// User UUID (the token subject)
    pub user_id: String,
    /// Role as currently stored, not as claimed by the token
    pub role: UserRole,
    /// Display name
    pub name: String,
}
