//! Bearer-token authentication with role-based access control.
//!
//! The `require_auth` layer verifies the access token on every request and
//! attaches an `AuthContext`. Handlers take an `Auth<R>` extractor, which reads
//! that context and enforces the role set `R`. An expired access token is
//! reported as `TokenExpired` so clients know to call refresh instead of
//! logging in again.

mod bearer;
mod extractors;
mod gate;
mod state;
mod types;

pub use bearer::{BEARER_SCHEME, bearer_token};
pub use extractors::{AdminOnly, AnyRole, Auth, RoleConstraint};
pub use gate::{authenticate, authorize, require_auth};
pub use state::GateState;
pub use types::AuthContext;
