//! JWT validation against keys published by the authorization server.
//!
//! [`JwksValidator`] fetches a JSON Web Key Set, caches the decoded keys and
//! picks the verification key by the token's `kid`. The set is refreshed when
//! the cache TTL runs out or when a token names an unknown key (rotation).
//! Refreshes are rate limited, and a failed refresh keeps the previous keys.
//! An expired set keeps serving known keys while it is refreshed in the
//! background; the fetch itself never holds the cache lock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use super::error::OAuthError;
use super::token::{
    TokenClaims, TokenValidator, base_validation, decode_claims, disable_exp, require_audience,
    require_issuer,
};

const DEFAULT_TTL: Duration = Duration::from_secs(300);
const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while fetching or decoding key material.
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("failed to fetch key set: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("invalid key set document: {0}")]
    Parse(String),

    #[error("discovery failed: {0}")]
    Discovery(String),

    #[error("key set at {0} contains no usable keys")]
    NoUsableKeys(String),
}

#[derive(Clone)]
struct CachedKey {
    kid: Option<String>,
    key: DecodingKey,
}

struct KeyCache {
    keys: Vec<CachedKey>,
    fetched_at: Instant,
}

impl KeyCache {
    fn find(&self, kid: Option<&str>) -> Option<DecodingKey> {
        match kid {
            Some(kid) => self
                .keys
                .iter()
                .find(|k| k.kid.as_deref() == Some(kid))
                .map(|k| k.key.clone()),
            // Without a kid only an unambiguous set can be used
            None if self.keys.len() == 1 => Some(self.keys[0].key.clone()),
            None => None,
        }
    }
}

struct Inner {
    jwks_url: String,
    client: reqwest::Client,
    validation: Validation,
    ttl: Duration,
    min_refresh_interval: Duration,
    cache: RwLock<KeyCache>,
    /// Time of the last fetch attempt. Held for the duration of a refresh so
    /// only one fetch runs at a time; the key cache itself is only locked to
    /// swap in the result.
    last_attempt: Mutex<Instant>,
}

/// Token validator backed by a remote JWKS endpoint.
///
/// # Example
///
/// ```rust,no_run
/// use webinar_mcp::oauth::JwksValidator;
///
/// # async fn example() -> Result<(), webinar_mcp::oauth::JwksError> {
/// let validator = JwksValidator::discover("https://auth.example.com")
///     .await?
///     .expected_audience("https://mcp.example.com/")
///     .expected_issuer("https://auth.example.com")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct JwksValidator {
    inner: Arc<Inner>,
}

impl JwksValidator {
    /// Start configuring a validator for a known JWKS URL.
    pub fn builder(jwks_url: impl Into<String>) -> JwksValidatorBuilder {
        JwksValidatorBuilder::new(jwks_url.into())
    }

    /// Look up `jwks_uri` in the authority's OpenID Connect discovery document.
    pub async fn discover(authority: &str) -> Result<JwksValidatorBuilder, JwksError> {
        #[derive(Deserialize)]
        struct Discovery {
            jwks_uri: Option<String>,
        }

        let url = format!(
            "{}/.well-known/openid-configuration",
            authority.trim_end_matches('/')
        );
        let client = default_client()?;

        tracing::debug!(url = %url, "fetching openid configuration");
        let response = client.get(&url).send().await?.error_for_status()?;
        let document: Discovery = response
            .json()
            .await
            .map_err(|e| JwksError::Discovery(e.to_string()))?;

        let jwks_uri = document
            .jwks_uri
            .ok_or_else(|| JwksError::Discovery(format!("{} has no jwks_uri", url)))?;

        Ok(JwksValidatorBuilder::new(jwks_uri).http_client(client))
    }

    pub fn jwks_url(&self) -> &str {
        &self.inner.jwks_url
    }

    /// Fetch the key set unless an attempt was made within the minimum
    /// refresh interval. On failure the previous keys stay in place.
    async fn fetch_and_swap(&self, last_attempt: &mut Instant) {
        if last_attempt.elapsed() < self.inner.min_refresh_interval {
            return;
        }
        *last_attempt = Instant::now();

        match fetch_keys(&self.inner.client, &self.inner.jwks_url).await {
            Ok(keys) => {
                tracing::debug!(url = %self.inner.jwks_url, keys = keys.len(), "refreshed key set");
                let mut cache = self.inner.cache.write().await;
                cache.keys = keys;
                cache.fetched_at = Instant::now();
            }
            Err(e) => {
                tracing::warn!(
                    url = %self.inner.jwks_url,
                    error = %e,
                    "key set refresh failed, keeping cached keys"
                );
            }
        }
    }

    /// Refresh for a token whose key is not cached, then look it up again.
    ///
    /// Callers queue behind a refresh already in flight, which may bring in
    /// the key they need.
    async fn refresh_for(&self, kid: Option<&str>) -> Option<DecodingKey> {
        let mut last_attempt = self.inner.last_attempt.lock().await;
        if let (Some(key), _) = self.lookup(kid).await {
            return Some(key);
        }
        self.fetch_and_swap(&mut last_attempt).await;
        drop(last_attempt);
        self.lookup(kid).await.0
    }

    /// Refresh an expired key set without holding up the current request.
    /// Skipped when a refresh is already running.
    fn refresh_in_background(&self) {
        let validator = self.clone();
        tokio::spawn(async move {
            let Ok(mut last_attempt) = validator.inner.last_attempt.try_lock() else {
                return;
            };
            validator.fetch_and_swap(&mut last_attempt).await;
        });
    }

    async fn lookup(&self, kid: Option<&str>) -> (Option<DecodingKey>, bool) {
        let cache = self.inner.cache.read().await;
        let expired = cache.fetched_at.elapsed() >= self.inner.ttl;
        (cache.find(kid), expired)
    }
}

impl TokenValidator for JwksValidator {
    async fn validate_token(&self, token: &str) -> Result<TokenClaims, OAuthError> {
        let header = jsonwebtoken::decode_header(token).map_err(|e| OAuthError::InvalidToken {
            description: e.to_string(),
        })?;
        let kid = header.kid.as_deref();

        let key = match self.lookup(kid).await {
            (Some(key), false) => Some(key),
            // Expired but still known: serve from cache while refreshing
            (Some(key), true) => {
                self.refresh_in_background();
                Some(key)
            }
            (None, _) => self.refresh_for(kid).await,
        };

        let key = key.ok_or_else(|| OAuthError::InvalidToken {
            description: match kid {
                Some(kid) => format!("no signing key with kid {}", kid),
                None => "token has no kid and the key set is ambiguous".to_string(),
            },
        })?;

        decode_claims(token, &key, &self.inner.validation)
    }
}

/// Builder for [`JwksValidator`].
pub struct JwksValidatorBuilder {
    jwks_url: String,
    client: Option<reqwest::Client>,
    ttl: Duration,
    min_refresh_interval: Duration,
    validation: Validation,
}

impl JwksValidatorBuilder {
    fn new(jwks_url: String) -> Self {
        Self {
            jwks_url,
            client: None,
            ttl: DEFAULT_TTL,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            validation: base_validation(Algorithm::RS256),
        }
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// How long fetched keys are trusted before a refresh is attempted.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Lower bound between two fetches of the key set.
    pub fn min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn expected_audience(mut self, audience: &str) -> Self {
        require_audience(&mut self.validation, audience);
        self
    }

    pub fn expected_issuer(mut self, issuer: &str) -> Self {
        require_issuer(&mut self.validation, issuer);
        self
    }

    pub fn disable_exp_validation(mut self) -> Self {
        disable_exp(&mut self.validation);
        self
    }

    /// Accepted signing algorithms. Defaults to RS256.
    pub fn algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.validation.algorithms = algorithms;
        self
    }

    /// Fetch the initial key set. Fails if it cannot be fetched.
    pub async fn build(self) -> Result<JwksValidator, JwksError> {
        let client = match self.client {
            Some(client) => client,
            None => default_client()?,
        };

        let keys = fetch_keys(&client, &self.jwks_url).await?;
        tracing::info!(url = %self.jwks_url, keys = keys.len(), "loaded signing keys");

        let now = Instant::now();
        Ok(JwksValidator {
            inner: Arc::new(Inner {
                jwks_url: self.jwks_url,
                client,
                validation: self.validation,
                ttl: self.ttl,
                min_refresh_interval: self.min_refresh_interval,
                cache: RwLock::new(KeyCache {
                    keys,
                    fetched_at: now,
                }),
                last_attempt: Mutex::new(now),
            }),
        })
    }
}

fn default_client() -> Result<reqwest::Client, JwksError> {
    Ok(reqwest::Client::builder()
        .timeout(DEFAULT_FETCH_TIMEOUT)
        .build()?)
}

async fn fetch_keys(client: &reqwest::Client, url: &str) -> Result<Vec<CachedKey>, JwksError> {
    #[derive(Deserialize)]
    struct KeySet {
        keys: Vec<serde_json::Value>,
    }

    let response = client.get(url).send().await?.error_for_status()?;
    let body = response.bytes().await?;
    let set: KeySet = serde_json::from_slice(&body).map_err(|e| JwksError::Parse(e.to_string()))?;

    // Keys this library cannot decode (unsupported kty/alg) are skipped
    let keys: Vec<CachedKey> = set
        .keys
        .into_iter()
        .filter_map(|value| {
            let jwk: Jwk = serde_json::from_value(value)
                .inspect_err(|e| tracing::debug!(error = %e, "skipping unparseable key"))
                .ok()?;
            let key = DecodingKey::from_jwk(&jwk)
                .inspect_err(|e| tracing::debug!(error = %e, "skipping unusable key"))
                .ok()?;
            Some(CachedKey {
                kid: jwk.common.key_id.clone(),
                key,
            })
        })
        .collect();

    if keys.is_empty() {
        return Err(JwksError::NoUsableKeys(url.to_string()));
    }
    Ok(keys)
}
