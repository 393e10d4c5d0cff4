//! Protected Resource Metadata (RFC 9728 Section 3).
//!
//! Defines the metadata document served at `/.well-known/oauth-protected-resource`
//! to enable OAuth 2.1 client discovery of authorization servers.

use serde::{Deserialize, Serialize};
use url::Url;

/// Protected Resource Metadata per RFC 9728 Section 3.
///
/// Built once at startup and shared read-only afterwards. The `resource`
/// value is the audience every accepted token must carry.
///
/// # Example
///
/// ```rust
/// use webinar_mcp::oauth::ProtectedResourceMetadata;
///
/// let metadata = ProtectedResourceMetadata::new("https://mcp.example.com/")
///     .resource_name("Example MCP")
///     .authorization_server("https://auth.example.com")
///     .scope("openid");
///
/// assert_eq!(
///     metadata.metadata_url(),
///     "https://mcp.example.com/.well-known/oauth-protected-resource"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    /// The resource server's identifier URL.
    pub resource: String,

    /// Human-readable name of the protected resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,

    /// Authorization server issuer URLs that can issue tokens for this resource.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorization_servers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes_supported: Vec<String>,

    /// Defaults to `["header"]` per RFC 6750.
    #[serde(default = "default_bearer_methods")]
    pub bearer_methods_supported: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_documentation: Option<String>,
}

fn default_bearer_methods() -> Vec<String> {
    vec!["header".to_string()]
}

impl ProtectedResourceMetadata {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            resource_name: None,
            authorization_servers: Vec::new(),
            scopes_supported: Vec::new(),
            bearer_methods_supported: default_bearer_methods(),
            resource_documentation: None,
        }
    }

    pub fn resource_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = Some(name.into());
        self
    }

    /// Add an authorization server issuer URL.
    pub fn authorization_server(mut self, issuer_url: impl Into<String>) -> Self {
        self.authorization_servers.push(issuer_url.into());
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes_supported.push(scope.into());
        self
    }

    pub fn scopes<I, S>(self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        scopes.into_iter().fold(self, |m, s| m.scope(s))
    }

    pub fn resource_documentation(mut self, url: impl Into<String>) -> Self {
        self.resource_documentation = Some(url.into());
        self
    }

    /// Path of the metadata endpoint relative to the server root.
    pub fn well_known_path() -> &'static str {
        "/.well-known/oauth-protected-resource"
    }

    /// Absolute URL of the metadata document, referenced by challenges.
    pub fn metadata_url(&self) -> String {
        let relative = Self::well_known_path().trim_start_matches('/');
        let base = if self.resource.ends_with('/') {
            self.resource.clone()
        } else {
            format!("{}/", self.resource)
        };

        match Url::parse(&base).and_then(|url| url.join(relative)) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", base, relative),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let metadata = ProtectedResourceMetadata::new("http://localhost:7071/")
            .resource_name("Latino .Net Online MCP")
            .authorization_server("https://ids.latinonet.online")
            .scopes(["latinonetonline_api", "openid", "profile"]);

        assert_eq!(metadata.resource, "http://localhost:7071/");
        assert_eq!(
            metadata.authorization_servers,
            vec!["https://ids.latinonet.online"]
        );
        assert_eq!(
            metadata.scopes_supported,
            vec!["latinonetonline_api", "openid", "profile"]
        );
        assert_eq!(metadata.bearer_methods_supported, vec!["header"]);
    }

    #[test]
    fn test_serialization_shape() {
        let metadata = ProtectedResourceMetadata::new("https://mcp.example.com/")
            .resource_name("Example")
            .authorization_server("https://auth.example.com");
        let json = serde_json::to_value(&metadata).unwrap();

        assert_eq!(json["resource"], "https://mcp.example.com/");
        assert_eq!(json["resource_name"], "Example");
        assert_eq!(json["authorization_servers"][0], "https://auth.example.com");
        assert_eq!(json["bearer_methods_supported"][0], "header");
        assert!(json.get("scopes_supported").is_none());
        assert!(json.get("resource_documentation").is_none());
    }

    #[test]
    fn test_metadata_url_never_doubles_slash() {
        let with_slash = ProtectedResourceMetadata::new("http://localhost:7071/");
        let without_slash = ProtectedResourceMetadata::new("http://localhost:7071");
        let expected = "http://localhost:7071/.well-known/oauth-protected-resource";

        assert_eq!(with_slash.metadata_url(), expected);
        assert_eq!(without_slash.metadata_url(), expected);
    }

    #[test]
    fn test_metadata_url_under_path_prefix() {
        let metadata = ProtectedResourceMetadata::new("https://example.com/mcp/");
        assert_eq!(
            metadata.metadata_url(),
            "https://example.com/mcp/.well-known/oauth-protected-resource"
        );
    }
}
