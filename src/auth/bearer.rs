//! Authorization header parsing.

use axum::http::{HeaderMap, header};

/// The only accepted authorization scheme.
pub const BEARER_SCHEME: &str = "Bearer";

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// Returns `None` if the header is absent, not valid UTF-8, uses another scheme,
/// or does not contain exactly one non-empty token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }

    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_simple() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_scheme_case_insensitive() {
        let headers = headers_with("bearer abc");
        assert_eq!(bearer_token(&headers), Some("abc"));
    }

    #[test]
    fn test_bearer_with_spaces() {
        let headers = headers_with("  Bearer   abc  ");
        assert_eq!(bearer_token(&headers), Some("abc"));
    }

    #[test]
    fn test_no_header() {
        let headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_wrong_scheme() {
        assert_eq!(bearer_token(&headers_with("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers_with("Token abc")), None);
    }

    #[test]
    fn test_missing_or_extra_token() {
        assert_eq!(bearer_token(&headers_with("Bearer")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&headers_with("Bearer a b")), None);
        assert_eq!(bearer_token(&headers_with("abc")), None);
    }
}
