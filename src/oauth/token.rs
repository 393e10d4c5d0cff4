//! Token validation for OAuth 2.1 resource servers.
//!
//! Provides the typed [`TokenClaims`] produced by a successful validation,
//! the [`TokenValidator`] trait for pluggable validation, and
//! [`JwtValidator`] for JWT validation with static keys. Key discovery via
//! JWKS lives in [`jwks`](super::jwks).

use std::future::Future;
use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Deserializer, Serialize};

use super::error::OAuthError;

/// Audience claim value, which can be a single string or array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenAudience {
    Single(String),
    Multiple(Vec<String>),
}

impl TokenAudience {
    pub fn contains(&self, value: &str) -> bool {
        match self {
            TokenAudience::Single(s) => s == value,
            TokenAudience::Multiple(v) => v.iter().any(|s| s == value),
        }
    }
}

/// Claims of a validated access token.
///
/// Populated once during validation and carried with the request; nothing
/// looks claims up dynamically afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user/client identifier).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<TokenAudience>,

    /// Expiration time (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,

    /// Display name of the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Role claim; identity providers emit either a string or an array.
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub roles: Vec<String>,

    /// Space-delimited scope string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(role)) => vec![role],
        Some(OneOrMany::Many(roles)) => roles,
    })
}

impl TokenClaims {
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.as_deref().unwrap_or("").split_whitespace()
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().any(|s| s == scope)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn audience_matches(&self, resource: &str) -> bool {
        self.aud.as_ref().is_some_and(|aud| aud.contains(resource))
    }
}

/// Trait for validating OAuth access tokens.
///
/// # Example
///
/// ```rust
/// use webinar_mcp::oauth::{OAuthError, TokenClaims, TokenValidator};
///
/// #[derive(Clone)]
/// struct RejectAll;
///
/// impl TokenValidator for RejectAll {
///     async fn validate_token(&self, _token: &str) -> Result<TokenClaims, OAuthError> {
///         Err(OAuthError::InvalidToken { description: "rejected".into() })
///     }
/// }
/// ```
pub trait TokenValidator: Clone + Send + Sync + 'static {
    /// Validate an access token and return the extracted claims.
    fn validate_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<TokenClaims, OAuthError>> + Send;
}

/// Baseline validation settings: `exp` required and checked, audience and
/// issuer checked only once configured.
pub(crate) fn base_validation(algorithm: Algorithm) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.validate_aud = false;
    validation
}

pub(crate) fn require_audience(validation: &mut Validation, audience: &str) {
    validation.set_audience(&[audience]);
    validation.validate_aud = true;
    validation.required_spec_claims.insert("aud".to_string());
}

pub(crate) fn require_issuer(validation: &mut Validation, issuer: &str) {
    validation.set_issuer(&[issuer]);
    validation.required_spec_claims.insert("iss".to_string());
}

pub(crate) fn disable_exp(validation: &mut Validation) {
    validation.validate_exp = false;
    validation.required_spec_claims.remove("exp");
}

/// Decode and verify a JWT, mapping library failures onto [`OAuthError`].
pub(crate) fn decode_claims(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<TokenClaims, OAuthError> {
    jsonwebtoken::decode::<TokenClaims>(token, key, validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => OAuthError::ExpiredToken,
            ErrorKind::InvalidAudience => OAuthError::InvalidAudience,
            ErrorKind::InvalidIssuer => OAuthError::InvalidIssuer,
            _ => OAuthError::InvalidToken {
                description: e.to_string(),
            },
        })
}

/// JWT token validator using a static key.
///
/// # Example
///
/// ```rust
/// use webinar_mcp::oauth::JwtValidator;
///
/// let validator = JwtValidator::from_secret(b"my-secret-key")
///     .expected_audience("https://mcp.example.com/")
///     .expected_issuer("https://auth.example.com");
/// ```
#[derive(Clone)]
pub struct JwtValidator {
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl JwtValidator {
    /// Create a validator from an HMAC secret (HS256).
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            validation: Arc::new(base_validation(Algorithm::HS256)),
        }
    }

    /// Create a validator from an RSA PEM-encoded public key (RS256).
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM data is invalid.
    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self {
            decoding_key: Arc::new(DecodingKey::from_rsa_pem(pem)?),
            validation: Arc::new(base_validation(Algorithm::RS256)),
        })
    }

    fn update(mut self, f: impl FnOnce(&mut Validation)) -> Self {
        let mut validation = (*self.validation).clone();
        f(&mut validation);
        self.validation = Arc::new(validation);
        self
    }

    /// Reject tokens whose `aud` does not contain `audience`, or that have none.
    pub fn expected_audience(self, audience: &str) -> Self {
        self.update(|v| require_audience(v, audience))
    }

    /// Reject tokens whose `iss` differs from `issuer`, or that have none.
    pub fn expected_issuer(self, issuer: &str) -> Self {
        self.update(|v| require_issuer(v, issuer))
    }

    /// Use with caution: tokens without expiration checks may be reused
    /// indefinitely.
    pub fn disable_exp_validation(self) -> Self {
        self.update(disable_exp)
    }

    pub fn algorithms(self, algorithms: Vec<Algorithm>) -> Self {
        self.update(|v| v.algorithms = algorithms)
    }
}

impl TokenValidator for JwtValidator {
    async fn validate_token(&self, token: &str) -> Result<TokenClaims, OAuthError> {
        decode_claims(token, &self.decoding_key, &self.validation)
    }
}
