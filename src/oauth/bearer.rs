//! Bearer credential extraction (RFC 6750 Section 2.1).

use axum::http::{HeaderMap, header};

use crate::secret::SecretString;

/// The raw bearer credential presented by a caller.
///
/// The value is kept exactly as received so it can be forwarded downstream
/// unchanged. Formatting it never reveals the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(SecretString);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::with_label(token, "BEARER"))
    }

    /// The credential as it must appear after `Bearer ` in an
    /// `Authorization` header.
    pub fn expose(&self) -> &str {
        self.0.expose()
    }
}

/// Extract the bearer credential from request headers.
///
/// Returns `None` when the `Authorization` header is absent, is not valid
/// visible ASCII, uses another scheme, or carries an empty or
/// whitespace-containing token. The scheme name is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<BearerToken> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, credential) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let credential = credential.trim_matches(' ');
    if credential.is_empty() || credential.contains(char::is_whitespace) {
        return None;
    }

    Some(BearerToken::new(credential))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extracts_token_verbatim() {
        let token = bearer_token(&headers("Bearer eyJhbGciOiJSUzI1NiJ9.e30.c2ln")).unwrap();
        assert_eq!(token.expose(), "eyJhbGciOiJSUzI1NiJ9.e30.c2ln");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        assert!(bearer_token(&headers("bearer abc")).is_some());
        assert!(bearer_token(&headers("BEARER abc")).is_some());
    }

    #[test]
    fn test_absent_header() {
        assert!(bearer_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_malformed_values_are_absent() {
        for value in [
            "Bearer",
            "Bearer ",
            "Bearer    ",
            "Basic dXNlcjpwYXNz",
            "Bearerabc",
            "Bearer abc def",
            "Token abc",
        ] {
            assert!(bearer_token(&headers(value)).is_none(), "{value:?}");
        }
    }

    #[test]
    fn test_non_ascii_header_is_absent() {
        let mut map = HeaderMap::new();
        map.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap(),
        );
        assert!(bearer_token(&map).is_none());
    }

    #[test]
    fn test_debug_does_not_leak() {
        let token = BearerToken::new("top-secret");
        assert!(!format!("{:?}", token).contains("top-secret"));
    }
}
