//! OAuth 2.1 error types and WWW-Authenticate header construction.
//!
//! Implements error responses per RFC 6750 Section 3, including the
//! `resource_metadata` parameter from RFC 9728 for Protected Resource
//! Metadata discovery.

use std::fmt;

/// Authentication failure at the resource server.
///
/// Every variant is answered with HTTP 401 and a `WWW-Authenticate` challenge
/// that points at the protected resource metadata document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthError {
    /// No bearer token was provided in the request.
    MissingToken,

    /// The provided token is invalid (malformed, signature mismatch, unknown key).
    InvalidToken {
        /// Human-readable description of why the token is invalid.
        description: String,
    },

    /// The token's audience does not match this resource server.
    InvalidAudience,

    /// The token was issued by an untrusted authorization server.
    InvalidIssuer,

    /// The token has expired.
    ExpiredToken,
}

impl OAuthError {
    pub fn status_code(&self) -> u16 {
        401
    }

    /// Builds the `WWW-Authenticate` header value per RFC 6750 Section 3.
    ///
    /// When `resource_metadata_url` is provided, includes the `resource_metadata`
    /// parameter per RFC 9728 so clients can discover the authorization server.
    pub fn www_authenticate(&self, resource_metadata_url: Option<&str>) -> String {
        let mut parts = Vec::new();

        if let Some(url) = resource_metadata_url {
            parts.push(format!("resource_metadata=\"{}\"", url));
        }

        // RFC 6750 Section 3: a request without credentials gets no error code
        if let Some(description) = self.error_description() {
            parts.push("error=\"invalid_token\"".to_string());
            parts.push(format!(
                "error_description=\"{}\"",
                description.replace(['"', '\\'], "'")
            ));
        }

        if parts.is_empty() {
            "Bearer".to_string()
        } else {
            format!("Bearer {}", parts.join(", "))
        }
    }

    fn error_description(&self) -> Option<String> {
        match self {
            OAuthError::MissingToken => None,
            OAuthError::InvalidToken { description } => Some(description.clone()),
            OAuthError::InvalidAudience => {
                Some("The token audience does not match this resource".to_string())
            }
            OAuthError::InvalidIssuer => {
                Some("The token was not issued by a trusted authorization server".to_string())
            }
            OAuthError::ExpiredToken => Some("The access token has expired".to_string()),
        }
    }
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OAuthError::MissingToken => write!(f, "missing bearer token"),
            OAuthError::InvalidToken { description } => {
                write!(f, "invalid token: {}", description)
            }
            OAuthError::InvalidAudience => write!(f, "token audience does not match"),
            OAuthError::InvalidIssuer => write!(f, "token issuer is not trusted"),
            OAuthError::ExpiredToken => write!(f, "token has expired"),
        }
    }
}

impl std::error::Error for OAuthError {}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA_URL: &str = "https://mcp.example.com/.well-known/oauth-protected-resource";

    #[test]
    fn test_missing_token_has_no_error_code() {
        let header = OAuthError::MissingToken.www_authenticate(Some(METADATA_URL));
        assert_eq!(header, format!("Bearer resource_metadata=\"{}\"", METADATA_URL));
        assert_eq!(OAuthError::MissingToken.www_authenticate(None), "Bearer");
    }

    #[test]
    fn test_invalid_token_challenge() {
        let err = OAuthError::InvalidToken {
            description: "bad \"sig\"".to_string(),
        };
        let header = err.www_authenticate(Some(METADATA_URL));
        assert!(header.starts_with("Bearer resource_metadata="));
        assert!(header.contains("error=\"invalid_token\""));
        assert!(header.contains("error_description=\"bad 'sig'\""));
    }

    #[test]
    fn test_audience_issuer_and_expiry_are_invalid_token() {
        for err in [
            OAuthError::InvalidAudience,
            OAuthError::InvalidIssuer,
            OAuthError::ExpiredToken,
        ] {
            assert_eq!(err.status_code(), 401);
            assert!(err.www_authenticate(None).contains("error=\"invalid_token\""));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(OAuthError::MissingToken.to_string(), "missing bearer token");
        assert_eq!(
            OAuthError::InvalidAudience.to_string(),
            "token audience does not match"
        );
    }
}
