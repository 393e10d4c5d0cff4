//! Redacting string wrapper for credentials.
//!
//! The bearer credential travels from the OAuth layer through the request
//! extensions into the downstream client. [`SecretString`] keeps it out of
//! `Debug`/`Display` output so that structured logging of requests, callers
//! or errors can never leak it.
//!
//! ```rust
//! use webinar_mcp::SecretString;
//!
//! let token = SecretString::with_label("eyJhbGciOi...", "BEARER");
//! assert_eq!(format!("{:?}", token), "[BEARER]");
//! assert_eq!(token.expose(), "eyJhbGciOi...");
//! ```

use std::borrow::Cow;
use std::fmt::{self, Debug, Display, Formatter};

const DEFAULT_LABEL: &str = "REDACTED";

/// A string whose contents are hidden from formatting.
///
/// Use [`expose()`](SecretString::expose) at the single point where the
/// value is actually needed (for example, when writing an `Authorization`
/// header).
#[derive(Clone)]
pub struct SecretString {
    value: String,
    label: Cow<'static, str>,
}

impl SecretString {
    pub fn new(s: impl Into<String>) -> Self {
        Self {
            value: s.into(),
            label: Cow::Borrowed(DEFAULT_LABEL),
        }
    }

    /// Create a secret whose redacted form is `[LABEL]`.
    pub fn with_label(s: impl Into<String>, label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            value: s.into(),
            label: label.into(),
        }
    }

    /// Expose the underlying value. Do not log the result.
    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl Debug for SecretString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.label)
    }
}

impl Display for SecretString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.label)
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
