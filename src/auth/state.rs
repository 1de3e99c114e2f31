//! What the gate needs from a router's state.

use crate::db::Database;
use crate::jwt::TokenIssuer;

/// Router state that can verify access tokens and look users up.
pub trait GateState {
    fn issuer(&self) -> &TokenIssuer;
    fn db(&self) -> &Database;
}

/// Implement `GateState` for a state struct with `issuer: Arc<TokenIssuer>`
/// and `db: Database` fields.
#[macro_export]
macro_rules! impl_gate_state {
    ($state_type:ty) => {
        impl $crate::auth::GateState for $state_type {
            fn issuer(&self) -> &$crate::jwt::TokenIssuer {
                &self.issuer
            }
            fn db(&self) -> &$crate::db::Database {
                &self.db
            }
        }
    };
}
