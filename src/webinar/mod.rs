//! Token-forwarding gateway to the LatinoNet webinar API.
//!
//! - [`WebinarApi`] / [`HttpWebinarClient`]: downstream calls carrying the
//!   caller's bearer token.
//! - [`WebinarGateway`]: the two operations (list upcoming webinars, search
//!   speakers) with envelope interpretation and error mapping.
//! - [`webinar_tools`]: the operations registered as MCP tools.

pub mod client;
pub mod error;
pub mod format;
pub mod gateway;
pub mod models;
pub mod tools;

pub use client::{ClientError, HttpWebinarClient, WebinarApi};
pub use error::{GatewayError, GatewayErrorKind};
pub use gateway::{DEFAULT_MAX_RESULTS, WebinarGateway, effective_max_results};
pub use models::{ApiResponse, Proposal, ProposalWithSpeakers, Speaker};
pub use tools::{SEARCH_SPEAKERS_TOOL, UPCOMING_WEBINARS_TOOL, webinar_tools};
