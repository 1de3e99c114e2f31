//! Signed, self-contained session tokens.
//!
//! Two token kinds share one HS256 secret:
//! - Access tokens: short-lived, carry the user's role, checked statelessly by the gate
//! - Refresh tokens: long-lived, carry a unique `jti`, and are only accepted while they
//!   equal the single refresh credential stored on the user record

mod codec;
mod issuer;

pub use codec::{Claims, EncodedToken, JwtError, TokenBody, TokenCodec, TokenType};
pub use issuer::{IssuedToken, TokenIssuer, TokenPair};
