//! Downstream webinar API client.
//!
//! [`WebinarApi`] is the seam the gateway talks to; [`HttpWebinarClient`] is
//! the reqwest implementation. Every call forwards the caller's bearer token
//! unchanged and asks for JSON. No retries.

use std::future::Future;
use std::time::Duration;

use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::models::{ApiResponse, ProposalWithSpeakers, Speaker};
use crate::oauth::BearerToken;

pub const PROPOSALS_PATH: &str = "/api/v1/webinars-module/Proposals";
pub const SPEAKER_SEARCH_PATH: &str = "/api/v1/webinars-module/Speakers/search";

/// `None` means the downstream answered with a `null` body.
pub type EnvelopeResult<T> = Result<Option<ApiResponse<Vec<T>>>, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response (connect, timeout, body read).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid downstream url: {0}")]
    Url(#[from] url::ParseError),

    /// A 2xx response whose body is not an envelope.
    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    /// A non-2xx response that still carried an envelope.
    #[error("downstream rejected the request with HTTP {status}")]
    Rejected { status: u16, error: Option<String> },

    /// A non-2xx response without an envelope.
    #[error("downstream responded with HTTP {status}")]
    Status { status: u16 },
}

/// Body of a non-2xx response. Only counts as an envelope when `isSuccess`
/// is actually present.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FailureEnvelope {
    is_success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Read operations of the webinar API.
pub trait WebinarApi: Send + Sync + 'static {
    fn proposals_with_speakers(
        &self,
        token: &BearerToken,
    ) -> impl Future<Output = EnvelopeResult<ProposalWithSpeakers>> + Send;

    fn search_speakers(
        &self,
        token: &BearerToken,
        search_term: &str,
        max_results: u32,
    ) -> impl Future<Output = EnvelopeResult<Speaker>> + Send;
}

/// reqwest-backed [`WebinarApi`].
///
/// Base address and timeout are fixed at construction. Cloning shares the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpWebinarClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpWebinarClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(
        &self,
        token: &BearerToken,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<ApiResponse<T>>, ClientError> {
        let url = self.base_url.join(path)?;
        tracing::debug!(path = %path, "calling downstream api");

        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(token.expose())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(match serde_json::from_slice::<FailureEnvelope>(&body) {
                Ok(FailureEnvelope {
                    is_success: false,
                    error,
                }) => ClientError::Rejected {
                    status: status.as_u16(),
                    error,
                },
                _ => ClientError::Status {
                    status: status.as_u16(),
                },
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

impl WebinarApi for HttpWebinarClient {
    async fn proposals_with_speakers(
        &self,
        token: &BearerToken,
    ) -> EnvelopeResult<ProposalWithSpeakers> {
        self.get(token, PROPOSALS_PATH, &[]).await
    }

    async fn search_speakers(
        &self,
        token: &BearerToken,
        search_term: &str,
        max_results: u32,
    ) -> EnvelopeResult<Speaker> {
        let query = [
            ("searchTerm", search_term.to_string()),
            ("maxResults", max_results.to_string()),
        ];
        self.get(token, SPEAKER_SEARCH_PATH, &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::Router;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use std::collections::HashMap;

    async fn serve(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{}", addr)).unwrap()
    }

    fn client(base: Url) -> HttpWebinarClient {
        HttpWebinarClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_headers_reach_downstream() {
        let app = Router::new().route(
            PROPOSALS_PATH,
            get(|headers: HeaderMap| async move {
                let ok = headers["authorization"] == "Bearer abc.def.ghi"
                    && headers["accept"] == "application/json";
                Json(serde_json::json!({"result": [], "isSuccess": ok}))
            }),
        );
        let envelope = client(serve(app).await)
            .proposals_with_speakers(&BearerToken::new("abc.def.ghi"))
            .await
            .unwrap()
            .unwrap();
        assert!(envelope.is_success);
    }

    #[tokio::test]
    async fn test_search_query_parameters() {
        let app = Router::new().route(
            SPEAKER_SEARCH_PATH,
            get(|Query(q): Query<HashMap<String, String>>| async move {
                Json(serde_json::json!({
                    "result": [{"name": q["searchTerm"], "lastName": q["maxResults"]}],
                    "isSuccess": true
                }))
            }),
        );
        let envelope = client(serve(app).await)
            .search_speakers(&BearerToken::new("t"), "ana maría", 7)
            .await
            .unwrap()
            .unwrap();
        let speaker = &envelope.result.unwrap()[0];
        assert_eq!(speaker.name, "ana maría");
        assert_eq!(speaker.last_name, "7");
    }

    #[tokio::test]
    async fn test_null_body_is_absent_envelope() {
        let app = Router::new().route(PROPOSALS_PATH, get(|| async { "null" }));
        let envelope = client(serve(app).await)
            .proposals_with_speakers(&BearerToken::new("t"))
            .await
            .unwrap();
        assert!(envelope.is_none());
    }

    #[tokio::test]
    async fn test_non_json_body_is_decode_error() {
        let app = Router::new().route(PROPOSALS_PATH, get(|| async { "<html></html>" }));
        let err = client(serve(app).await)
            .proposals_with_speakers(&BearerToken::new("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn test_error_status_with_envelope() {
        let app = Router::new().route(
            PROPOSALS_PATH,
            get(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(serde_json::json!({"isSuccess": false, "error": "rate limited"})),
                )
                    .into_response()
            }),
        );
        let err = client(serve(app).await)
            .proposals_with_speakers(&BearerToken::new("t"))
            .await
            .unwrap_err();
        match err {
            ClientError::Rejected { status, error } => {
                assert_eq!(status, 429);
                assert_eq!(error.as_deref(), Some("rate limited"));
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_without_envelope() {
        let app = Router::new().route(
            PROPOSALS_PATH,
            get(|| async { (StatusCode::BAD_GATEWAY, "upstream down").into_response() }),
        );
        let err = client(serve(app).await)
            .proposals_with_speakers(&BearerToken::new("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 502 }));
    }

    #[tokio::test]
    async fn test_error_status_with_problem_details() {
        for body in [
            serde_json::json!({"title": "Service Unavailable", "status": 503}),
            serde_json::json!({}),
            serde_json::json!({"isSuccess": true, "result": []}),
        ] {
            let app = Router::new().route(
                PROPOSALS_PATH,
                get(move || {
                    let body = body.clone();
                    async move { (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response() }
                }),
            );
            let err = client(serve(app).await)
                .proposals_with_speakers(&BearerToken::new("t"))
                .await
                .unwrap_err();
            assert!(
                matches!(err, ClientError::Status { status: 503 }),
                "expected Status, got {:?}",
                err
            );
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let err = client(Url::parse("http://127.0.0.1:1").unwrap())
            .proposals_with_speakers(&BearerToken::new("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
