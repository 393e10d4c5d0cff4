//! Integration tests for JWKS-based JWT validation.
//!
//! These tests spin up a lightweight axum server acting as the identity
//! server (discovery document plus key set), then use `JwksValidator` to
//! validate tokens signed with keys from that endpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use webinar_mcp::oauth::{JwksError, JwksValidator, OAuthError, TokenValidator};

const AUDIENCE: &str = "http://localhost:7071/";

/// HMAC test key published as an `oct` JWK. `k` is the base64url encoding
/// of the secret.
const SECRET: &[u8] = b"secret-key-for-testing-only";
const SECRET_B64: &str = "c2VjcmV0LWtleS1mb3ItdGVzdGluZy1vbmx5";

/// A second key, for rotation.
const ROTATED_SECRET: &[u8] = b"rotated-key-for-testing-abc";
const ROTATED_SECRET_B64: &str = "cm90YXRlZC1rZXktZm9yLXRlc3RpbmctYWJj";

fn oct_jwk(kid: &str, k: &str) -> Value {
    json!({"kty": "oct", "kid": kid, "alg": "HS256", "k": k})
}

struct IdentityServer {
    base_url: String,
    keys: Arc<RwLock<Value>>,
    fetches: Arc<AtomicUsize>,
    delay_ms: Arc<AtomicU64>,
    handle: tokio::task::JoinHandle<()>,
}

impl IdentityServer {
    fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.base_url)
    }

    async fn publish(&self, keys: Value) {
        *self.keys.write().await = keys;
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Delay every later key set response.
    fn slow_down(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn wait_for_fetches(&self, expected: usize) {
        for _ in 0..100 {
            if self.fetches() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} fetches, saw {}", expected, self.fetches());
    }
}

/// Spin up a mock identity server publishing `keys`.
async fn start_identity_server(keys: Value) -> IdentityServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let keys = Arc::new(RwLock::new(keys));
    let fetches = Arc::new(AtomicUsize::new(0));
    let delay_ms = Arc::new(AtomicU64::new(0));

    let discovery = json!({
        "issuer": base_url,
        "jwks_uri": format!("{}/.well-known/jwks.json", base_url),
    });

    let app = Router::new()
        .route(
            "/.well-known/openid-configuration",
            get(move || {
                let discovery = discovery.clone();
                async move { axum::Json(discovery) }
            }),
        )
        .route(
            "/.well-known/jwks.json",
            get({
                let keys = keys.clone();
                let fetches = fetches.clone();
                let delay_ms = delay_ms.clone();
                move || {
                    let keys = keys.clone();
                    let fetches = fetches.clone();
                    let delay = Duration::from_millis(delay_ms.load(Ordering::SeqCst));
                    async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(delay).await;
                        axum::Json(keys.read().await.clone())
                    }
                }
            }),
        );

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    IdentityServer {
        base_url,
        keys,
        fetches,
        delay_ms,
        handle,
    }
}

fn sign(claims: &Value, secret: &[u8], kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = kid.map(String::from);
    jsonwebtoken::encode(&header, claims, &EncodingKey::from_secret(secret)).unwrap()
}

fn claims(sub: &str) -> Value {
    json!({"sub": sub, "aud": AUDIENCE, "exp": 4_102_444_800u64})
}

#[tokio::test]
async fn test_discovery_finds_key_set() {
    let server = start_identity_server(json!({"keys": [oct_jwk("k1", SECRET_B64)]})).await;

    let validator = JwksValidator::discover(&server.base_url)
        .await
        .unwrap()
        .algorithms(vec![Algorithm::HS256])
        .expected_audience(AUDIENCE)
        .build()
        .await
        .unwrap();

    assert_eq!(validator.jwks_url(), server.jwks_url());

    let validated = validator
        .validate_token(&sign(&claims("user123"), SECRET, Some("k1")))
        .await
        .unwrap();
    assert_eq!(validated.sub.as_deref(), Some("user123"));
}

#[tokio::test]
async fn test_discovery_with_trailing_slash() {
    let server = start_identity_server(json!({"keys": [oct_jwk("k1", SECRET_B64)]})).await;

    let builder = JwksValidator::discover(&format!("{}/", server.base_url))
        .await
        .unwrap();
    let validator = builder.algorithms(vec![Algorithm::HS256]).build().await.unwrap();
    assert_eq!(validator.jwks_url(), server.jwks_url());
}

#[tokio::test]
async fn test_discovery_failure() {
    let result = JwksValidator::discover("http://127.0.0.1:1").await;
    assert!(matches!(result, Err(JwksError::Fetch(_))));
}

#[tokio::test]
async fn test_issuer_and_audience_are_enforced() {
    let server = start_identity_server(json!({"keys": [oct_jwk("k1", SECRET_B64)]})).await;

    let validator = JwksValidator::builder(server.jwks_url())
        .algorithms(vec![Algorithm::HS256])
        .expected_audience(AUDIENCE)
        .expected_issuer("https://ids.example.com")
        .build()
        .await
        .unwrap();

    let mut good = claims("user789");
    good["iss"] = json!("https://ids.example.com");
    let result = validator.validate_token(&sign(&good, SECRET, Some("k1"))).await;
    assert!(result.is_ok(), "expected Ok, got: {:?}", result.err());

    let mut wrong_audience = good.clone();
    wrong_audience["aud"] = json!("https://other.example.com/");
    let result = validator
        .validate_token(&sign(&wrong_audience, SECRET, Some("k1")))
        .await;
    assert_eq!(result.unwrap_err(), OAuthError::InvalidAudience);

    let mut wrong_issuer = good.clone();
    wrong_issuer["iss"] = json!("https://evil.example.com");
    let result = validator
        .validate_token(&sign(&wrong_issuer, SECRET, Some("k1")))
        .await;
    assert_eq!(result.unwrap_err(), OAuthError::InvalidIssuer);
}

#[tokio::test]
async fn test_token_signed_with_other_key_is_rejected() {
    let server = start_identity_server(json!({"keys": [oct_jwk("k1", SECRET_B64)]})).await;

    let validator = JwksValidator::builder(server.jwks_url())
        .algorithms(vec![Algorithm::HS256])
        .build()
        .await
        .unwrap();

    let result = validator
        .validate_token(&sign(&claims("mallory"), ROTATED_SECRET, Some("k1")))
        .await;
    assert!(matches!(result, Err(OAuthError::InvalidToken { .. })));
}

#[tokio::test]
async fn test_refreshes_on_unknown_kid() {
    let server = start_identity_server(json!({"keys": [oct_jwk("old-key", SECRET_B64)]})).await;

    let validator = JwksValidator::builder(server.jwks_url())
        .algorithms(vec![Algorithm::HS256])
        .min_refresh_interval(Duration::ZERO)
        .build()
        .await
        .unwrap();

    // Key rotation on the identity server
    server
        .publish(json!({"keys": [oct_jwk("new-key", ROTATED_SECRET_B64)]}))
        .await;

    let token = sign(&claims("user456"), ROTATED_SECRET, Some("new-key"));
    let result = validator.validate_token(&token).await;
    assert!(result.is_ok(), "expected Ok after rotation, got: {:?}", result.err());
    assert_eq!(server.fetches(), 2);
}

#[tokio::test]
async fn test_refresh_is_rate_limited() {
    let server = start_identity_server(json!({"keys": [oct_jwk("old-key", SECRET_B64)]})).await;

    // Default minimum refresh interval is far longer than this test
    let validator = JwksValidator::builder(server.jwks_url())
        .algorithms(vec![Algorithm::HS256])
        .build()
        .await
        .unwrap();

    server
        .publish(json!({"keys": [oct_jwk("new-key", ROTATED_SECRET_B64)]}))
        .await;

    let token = sign(&claims("user456"), ROTATED_SECRET, Some("new-key"));
    for _ in 0..3 {
        let result = validator.validate_token(&token).await;
        assert!(matches!(result, Err(OAuthError::InvalidToken { .. })));
    }
    assert_eq!(server.fetches(), 1);
}

#[tokio::test]
async fn test_stale_keys_survive_failed_refresh() {
    let server = start_identity_server(json!({"keys": [oct_jwk("k1", SECRET_B64)]})).await;

    let validator = JwksValidator::builder(server.jwks_url())
        .algorithms(vec![Algorithm::HS256])
        .default_ttl(Duration::from_millis(50))
        .min_refresh_interval(Duration::ZERO)
        .build()
        .await
        .unwrap();

    let token = sign(&claims("stale-test"), SECRET, Some("k1"));
    assert!(validator.validate_token(&token).await.is_ok());

    // Take the identity server away and let the cache expire
    server.handle.abort();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let result = validator.validate_token(&token).await;
    assert!(
        result.is_ok(),
        "expected stale keys to validate, got: {:?}",
        result.err()
    );
}

#[tokio::test]
async fn test_expired_keys_do_not_wait_for_refresh() {
    let server = start_identity_server(json!({"keys": [oct_jwk("k1", SECRET_B64)]})).await;

    let validator = JwksValidator::builder(server.jwks_url())
        .algorithms(vec![Algorithm::HS256])
        .default_ttl(Duration::from_millis(50))
        .min_refresh_interval(Duration::ZERO)
        .build()
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    server.slow_down(Duration::from_secs(5));

    // Several validations while the slow refresh is in flight
    let token = sign(&claims("busy"), SECRET, Some("k1"));
    for _ in 0..3 {
        let result =
            tokio::time::timeout(Duration::from_millis(500), validator.validate_token(&token)).await;
        assert!(
            matches!(result, Ok(Ok(_))),
            "validation waited on the key set refresh"
        );
    }
    server.wait_for_fetches(2).await;
    assert_eq!(server.fetches(), 2);
}

#[tokio::test]
async fn test_expired_key_set_refreshes_in_background() {
    let server = start_identity_server(json!({"keys": [oct_jwk("k1", SECRET_B64)]})).await;

    let validator = JwksValidator::builder(server.jwks_url())
        .algorithms(vec![Algorithm::HS256])
        .default_ttl(Duration::from_millis(300))
        .min_refresh_interval(Duration::ZERO)
        .build()
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(350)).await;
    server
        .publish(json!({"keys": [
            oct_jwk("k1", SECRET_B64),
            oct_jwk("k2", ROTATED_SECRET_B64),
        ]}))
        .await;

    let old = sign(&claims("old"), SECRET, Some("k1"));
    assert!(validator.validate_token(&old).await.is_ok());
    server.wait_for_fetches(2).await;
    // Give the refresh time to swap in the keys
    tokio::time::sleep(Duration::from_millis(20)).await;

    // The new key arrived with the background refresh
    let new = sign(&claims("new"), ROTATED_SECRET, Some("k2"));
    assert!(validator.validate_token(&new).await.is_ok());
    assert_eq!(server.fetches(), 2);
}

#[tokio::test]
async fn test_token_without_kid() {
    let single = start_identity_server(json!({"keys": [oct_jwk("k1", SECRET_B64)]})).await;
    let validator = JwksValidator::builder(single.jwks_url())
        .algorithms(vec![Algorithm::HS256])
        .build()
        .await
        .unwrap();
    let token = sign(&claims("no-kid"), SECRET, None);
    assert!(validator.validate_token(&token).await.is_ok());

    let ambiguous = start_identity_server(json!({"keys": [
        oct_jwk("k1", SECRET_B64),
        oct_jwk("k2", ROTATED_SECRET_B64),
    ]}))
    .await;
    let validator = JwksValidator::builder(ambiguous.jwks_url())
        .algorithms(vec![Algorithm::HS256])
        .build()
        .await
        .unwrap();
    assert!(matches!(
        validator.validate_token(&token).await,
        Err(OAuthError::InvalidToken { .. })
    ));
}

#[tokio::test]
async fn test_unusable_keys_are_skipped() {
    let server = start_identity_server(json!({"keys": [
        {"kty": "unknown-type", "kid": "weird"},
        oct_jwk("k1", SECRET_B64),
    ]}))
    .await;

    let validator = JwksValidator::builder(server.jwks_url())
        .algorithms(vec![Algorithm::HS256])
        .build()
        .await
        .unwrap();
    let token = sign(&claims("user"), SECRET, Some("k1"));
    assert!(validator.validate_token(&token).await.is_ok());
}

#[tokio::test]
async fn test_key_set_without_usable_keys() {
    let server = start_identity_server(json!({"keys": [{"kty": "unknown-type"}]})).await;

    let result = JwksValidator::builder(server.jwks_url()).build().await;
    assert!(matches!(result, Err(JwksError::NoUsableKeys(_))));
}

#[tokio::test]
async fn test_initial_fetch_failure() {
    let result = JwksValidator::builder("http://127.0.0.1:1/.well-known/jwks.json")
        .build()
        .await;
    assert!(matches!(result, Err(JwksError::Fetch(_))));
}

#[tokio::test]
async fn test_garbage_token() {
    let server = start_identity_server(json!({"keys": [oct_jwk("k1", SECRET_B64)]})).await;
    let validator = JwksValidator::builder(server.jwks_url())
        .algorithms(vec![Algorithm::HS256])
        .build()
        .await
        .unwrap();

    assert!(matches!(
        validator.validate_token("not-a-jwt").await,
        Err(OAuthError::InvalidToken { .. })
    ));
}
