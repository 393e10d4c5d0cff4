//! Caller-facing failures of the webinar gateway.

use std::fmt;

use serde::Serialize;

use crate::protocol::CallToolResult;

/// Message used for failures nothing more specific is known about.
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred while processing the request.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    /// No authenticated caller reached the gateway.
    Unauthenticated,
    /// Rejected before any downstream call.
    InvalidArgument,
    /// The downstream API could not be reached.
    UpstreamUnavailable,
    /// The downstream answered with something that is not an envelope.
    UpstreamMalformed,
    /// The envelope parsed but reported `isSuccess: false`.
    UpstreamReportedFailure,
    Unexpected,
}

impl GatewayErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayErrorKind::Unauthenticated => "unauthenticated",
            GatewayErrorKind::InvalidArgument => "invalid_argument",
            GatewayErrorKind::UpstreamUnavailable => "upstream_unavailable",
            GatewayErrorKind::UpstreamMalformed => "upstream_malformed",
            GatewayErrorKind::UpstreamReportedFailure => "upstream_reported_failure",
            GatewayErrorKind::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only failure type a gateway operation returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthenticated() -> Self {
        Self::new(
            GatewayErrorKind::Unauthenticated,
            "Authentication token is required to access webinar data.",
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::InvalidArgument, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::UpstreamUnavailable, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::UpstreamMalformed, message)
    }

    pub fn reported_failure(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::UpstreamReportedFailure, message)
    }

    pub fn unexpected() -> Self {
        Self::new(GatewayErrorKind::Unexpected, UNEXPECTED_MESSAGE)
    }

    pub fn into_tool_result(self) -> CallToolResult {
        let structured = serde_json::json!({
            "kind": self.kind,
            "message": self.message,
        });
        CallToolResult::error(self.message).with_structured_content(structured)
    }
}

impl From<GatewayError> for CallToolResult {
    fn from(err: GatewayError) -> Self {
        err.into_tool_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_value(GatewayErrorKind::UpstreamReportedFailure).unwrap();
        assert_eq!(json, "upstream_reported_failure");
        assert_eq!(
            GatewayErrorKind::InvalidArgument.to_string(),
            "invalid_argument"
        );
    }

    #[test]
    fn test_into_tool_result() {
        let result: CallToolResult = GatewayError::reported_failure("rate limited").into();
        assert!(result.is_error);
        assert_eq!(result.all_text(), "rate limited");

        let structured = result.structured_content.unwrap();
        assert_eq!(structured["kind"], "upstream_reported_failure");
        assert_eq!(structured["message"], "rate limited");
    }

    #[test]
    fn test_display_is_message() {
        assert_eq!(GatewayError::unexpected().to_string(), UNEXPECTED_MESSAGE);
    }
}
