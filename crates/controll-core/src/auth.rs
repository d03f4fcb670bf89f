// Bearer-token gate for the management API.
//
// Exact string comparison against the hub token. No rate limiting and no
// constant-time comparison.

use controll_api::header::{AUTHORIZATION, HeaderMap};

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
}

/// `true` iff `headers` carry `Authorization: Bearer <expected>`.
///
/// An empty `expected` token never authorizes.
pub fn authorize(headers: &HeaderMap, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    bearer_token(headers) == Some(expected)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use controll_api::header::HeaderValue;

    use super::*;

    fn with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(!authorize(&HeaderMap::new(), "secret"));
    }

    #[test]
    fn bare_token_without_scheme_is_rejected() {
        assert!(!authorize(&with_auth("secret"), "secret"));
    }

    #[test]
    fn wrong_token_is_rejected() {
        assert!(!authorize(&with_auth("Bearer wrong"), "secret"));
    }

    #[test]
    fn matching_token_is_accepted() {
        assert!(authorize(&with_auth("Bearer secret"), "secret"));
    }

    #[test]
    fn scheme_is_case_sensitive() {
        assert!(!authorize(&with_auth("bearer secret"), "secret"));
    }

    #[test]
    fn empty_expected_token_never_authorizes() {
        assert!(!authorize(&with_auth("Bearer "), ""));
        assert!(!authorize(&HeaderMap::new(), ""));
    }

    #[test]
    fn bearer_token_extracts_value() {
        assert_eq!(bearer_token(&with_auth("Bearer abc_def")), Some("abc_def"));
        assert_eq!(bearer_token(&with_auth("Basic abc")), None);
    }
}
