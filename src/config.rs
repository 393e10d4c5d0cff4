//! Command line and environment configuration.
//!
//! [`Cli`] is what clap parses; [`Settings`] is the validated, immutable
//! value the server is built from.

use std::time::Duration;

use clap::Parser;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {name} '{value}': {source}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{name} must be an http(s) URL, got '{value}'")]
    UnsupportedScheme { name: &'static str, value: String },

    #[error("cannot derive a bind address from '{0}'; pass --bind or --port")]
    NoBindAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, Parser)]
#[command(name = "webinar-mcp")]
#[command(about = "OAuth-protected MCP server for the LatinoNet webinar API")]
#[command(version)]
pub struct Cli {
    /// Externally reachable base URL of this server; tokens must name it as audience
    #[arg(long, env = "SERVICE_BASE_URL", default_value = "http://localhost:7071/")]
    pub service_base_url: String,

    /// Authorization server (trusted token issuer)
    #[arg(long, env = "AUTH_SERVER_URL", default_value = "https://ids.latinonet.online")]
    pub auth_server_url: String,

    /// Base URL of the webinar API
    #[arg(
        long,
        env = "DOWNSTREAM_BASE_URL",
        default_value = "https://api.latinonet.online"
    )]
    pub downstream_base_url: String,

    /// Timeout for each webinar API call, in seconds
    #[arg(long, env = "DOWNSTREAM_TIMEOUT_SECONDS", default_value_t = 30)]
    pub downstream_timeout_seconds: u64,

    /// Listen on 0.0.0.0:PORT
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Explicit listen address, takes precedence over --port. Defaults to the
    /// host and port of the service base URL
    #[arg(long, env = "BIND_ADDRESS")]
    pub bind: Option<String>,

    /// Scopes advertised in the resource metadata
    #[arg(
        long = "scope",
        env = "SUPPORTED_SCOPES",
        value_delimiter = ',',
        default_values_t = ["latinonetonline_api".to_string(), "openid".to_string(), "profile".to_string()]
    )]
    pub scopes: Vec<String>,

    /// Human-readable resource name in the metadata document
    #[arg(long, env = "RESOURCE_NAME", default_value = "Latino .Net Online MCP")]
    pub resource_name: String,

    /// How long signing keys are cached, in seconds
    #[arg(long, env = "JWKS_CACHE_SECONDS", default_value_t = 300)]
    pub jwks_cache_seconds: u64,

    /// Expose the speaker search tool
    #[arg(long, env = "ENABLE_SPEAKER_SEARCH")]
    pub enable_speaker_search: bool,

    /// Log level for this crate (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Validated server configuration. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Always ends with `/`.
    pub service_base_url: Url,
    /// The configured base URL with a trailing `/` and otherwise untouched.
    /// Host case and explicit default ports are preserved.
    audience: String,
    pub auth_server_url: String,
    pub downstream_base_url: Url,
    pub downstream_timeout: Duration,
    pub bind_address: String,
    pub scopes: Vec<String>,
    pub resource_name: String,
    pub jwks_cache_ttl: Duration,
    pub enable_speaker_search: bool,
    pub log_level: String,
}

impl Settings {
    /// The audience every accepted token must carry.
    pub fn audience(&self) -> &str {
        &self.audience
    }
}

impl TryFrom<Cli> for Settings {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        // Token audiences are compared as strings, so keep what was configured
        let audience = normalize_base_url(&cli.service_base_url);
        let service_base_url = parse_http_url("service base URL", &audience)?;
        let downstream_base_url = parse_http_url("downstream base URL", &cli.downstream_base_url)?;
        // Validated but kept verbatim: it must equal the token `iss` exactly
        parse_http_url("auth server URL", &cli.auth_server_url)?;

        if cli.downstream_timeout_seconds == 0 {
            return Err(ConfigError::Zero("downstream timeout"));
        }

        let bind_address = match (cli.bind, cli.port) {
            (Some(bind), _) => bind,
            (None, Some(port)) => format!("0.0.0.0:{}", port),
            (None, None) => bind_address_from(&service_base_url)?,
        };

        let scopes = cli
            .scopes
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            service_base_url,
            audience,
            auth_server_url: cli.auth_server_url,
            downstream_base_url,
            downstream_timeout: Duration::from_secs(cli.downstream_timeout_seconds),
            bind_address,
            scopes,
            resource_name: cli.resource_name,
            jwks_cache_ttl: Duration::from_secs(cli.jwks_cache_seconds),
            enable_speaker_search: cli.enable_speaker_search,
            log_level: cli.log_level,
        })
    }
}

/// Append a trailing `/` unless present.
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

fn parse_http_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::UnsupportedScheme {
            name,
            value: value.to_string(),
        }),
    }
}

fn bind_address_from(url: &Url) -> Result<String, ConfigError> {
    let host = url
        .host_str()
        .ok_or_else(|| ConfigError::NoBindAddress(url.to_string()))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| ConfigError::NoBindAddress(url.to_string()))?;
    Ok(format!("{}:{}", host, port))
}
