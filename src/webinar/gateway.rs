//! The tool gateway: runs one webinar operation for an authenticated caller.
//!
//! Every operation forwards the caller's token to the downstream API,
//! interprets the `{result, isSuccess, error}` envelope and renders the
//! payload. Any failure, including a panic, leaves as a [`GatewayError`].

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use super::client::{ClientError, WebinarApi};
use super::error::GatewayError;
use super::format;
use super::models::ApiResponse;
use crate::oauth::BearerToken;

/// Result-count bound used when the caller's is missing or out of range.
pub const DEFAULT_MAX_RESULTS: u32 = 5;
/// Largest result-count bound passed through unchanged.
pub const MAX_RESULTS_LIMIT: u32 = 50;

/// Clamp a requested result-count bound into `1..=50`, falling back to 5.
///
/// Out-of-range values are replaced, never rejected.
pub fn effective_max_results(requested: Option<i64>) -> u32 {
    match requested {
        Some(n) if n > 0 && n <= i64::from(MAX_RESULTS_LIMIT) => n as u32,
        _ => DEFAULT_MAX_RESULTS,
    }
}

#[derive(Debug, Clone)]
pub struct WebinarGateway<C> {
    client: C,
}

impl<C: WebinarApi> WebinarGateway<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// List upcoming webinars with their speakers.
    pub async fn list_upcoming_webinars(
        &self,
        token: Option<&BearerToken>,
    ) -> Result<String, GatewayError> {
        guard("get_upcoming_webinars", async {
            let token = token.ok_or_else(GatewayError::unauthenticated)?;

            let envelope = self
                .client
                .proposals_with_speakers(token)
                .await
                .map_err(|e| client_failure("webinar data", e))?;

            let Some(items) = successful_payload(envelope)? else {
                return Ok("No webinar data available.".to_string());
            };
            if items.is_empty() {
                return Ok("No upcoming webinars found.".to_string());
            }
            Ok(format::render_proposals(&items))
        })
        .await
    }

    /// Search speakers by name.
    ///
    /// A blank term is rejected before the downstream API is called.
    pub async fn search_speakers(
        &self,
        token: Option<&BearerToken>,
        search_term: &str,
        max_results: Option<i64>,
    ) -> Result<String, GatewayError> {
        guard("search_speakers", async {
            let token = token.ok_or_else(GatewayError::unauthenticated)?;

            let term = search_term.trim();
            if term.is_empty() {
                return Err(GatewayError::invalid_argument(
                    "Search term must not be empty.",
                ));
            }
            let max_results = effective_max_results(max_results);

            let envelope = self
                .client
                .search_speakers(token, term, max_results)
                .await
                .map_err(|e| client_failure("speaker data", e))?;

            let Some(speakers) = successful_payload(envelope)? else {
                return Ok("No speaker data available.".to_string());
            };
            if speakers.is_empty() {
                return Ok(format!("No speakers found matching '{}'.", term));
            }
            Ok(format::render_speakers(&speakers))
        })
        .await
    }
}

/// Interpret an envelope.
///
/// `Ok(None)` when there is no data at all, `Ok(Some(items))` on success
/// (possibly empty), and a reported failure when `isSuccess` is false. The
/// payload of an unsuccessful envelope is never looked at.
fn successful_payload<T>(
    envelope: Option<ApiResponse<Vec<T>>>,
) -> Result<Option<Vec<T>>, GatewayError> {
    let Some(envelope) = envelope else {
        return Ok(None);
    };
    if !envelope.is_success {
        let message = envelope
            .error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(GatewayError::reported_failure(message));
    }
    Ok(Some(envelope.result.unwrap_or_default()))
}

fn client_failure(what: &str, err: ClientError) -> GatewayError {
    match err {
        ClientError::Transport(e) => {
            GatewayError::unavailable(format!("Failed to fetch {}: {}", what, e))
        }
        ClientError::Status { status } => GatewayError::unavailable(format!(
            "Failed to fetch {}: downstream responded with HTTP {}",
            what, status
        )),
        ClientError::Decode(e) => {
            GatewayError::malformed(format!("Failed to parse {} response: {}", what, e))
        }
        ClientError::Rejected { status, error } => GatewayError::reported_failure(
            error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| format!("HTTP {}", status)),
        ),
        ClientError::Url(e) => {
            tracing::error!(error = %e, "downstream url could not be built");
            GatewayError::unexpected()
        }
    }
}

/// Run an operation, turning panics into `Unexpected` and logging failures.
async fn guard<F>(operation: &'static str, fut: F) -> Result<String, GatewayError>
where
    F: Future<Output = Result<String, GatewayError>>,
{
    let result = match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(operation, "gateway operation panicked");
            Err(GatewayError::unexpected())
        }
    };

    if let Err(err) = &result {
        tracing::warn!(operation, kind = %err.kind, message = %err.message, "gateway operation failed");
    }
    result
}
