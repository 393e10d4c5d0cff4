//! MCP tools exposing the gateway operations.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Number;

use super::client::WebinarApi;
use super::gateway::WebinarGateway;
use crate::context::RequestContext;
use crate::error::Result;
use crate::oauth::{AuthenticatedCaller, BearerToken};
use crate::protocol::CallToolResult;
use crate::tool::{NoParams, Tool, ToolBuilder};

pub const UPCOMING_WEBINARS_TOOL: &str = "get_upcoming_webinars";
pub const SEARCH_SPEAKERS_TOOL: &str = "search_speakers";

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchSpeakersInput {
    /// Text matched against speaker names
    pub search_term: String,
    /// Maximum number of speakers to return (1-50, default 5)
    #[serde(default)]
    pub max_results: Option<Number>,
}

impl SearchSpeakersInput {
    /// Requested bound as an integer. Fractions and values outside `i64`
    /// count as absent and fall back to the default bound.
    pub fn requested_max_results(&self) -> Option<i64> {
        self.max_results.as_ref().and_then(Number::as_i64)
    }
}

fn caller_token(ctx: &RequestContext) -> Option<BearerToken> {
    ctx.extension::<AuthenticatedCaller>()
        .map(|caller| caller.token.clone())
}

pub fn upcoming_webinars_tool<C: WebinarApi>(gateway: Arc<WebinarGateway<C>>) -> Result<Tool> {
    ToolBuilder::new(UPCOMING_WEBINARS_TOOL)
        .title("Upcoming webinars")
        .description("Get all upcoming webinars from the LatinoNet platform.")
        .read_only()
        .idempotent()
        .handler_with_state_and_context(
            gateway,
            |gateway: Arc<WebinarGateway<C>>, ctx: RequestContext, _: NoParams| async move {
                let token = caller_token(&ctx);
                Ok(match gateway.list_upcoming_webinars(token.as_ref()).await {
                    Ok(text) => CallToolResult::text(text),
                    Err(err) => err.into(),
                })
            },
        )
        .build()
}

pub fn search_speakers_tool<C: WebinarApi>(gateway: Arc<WebinarGateway<C>>) -> Result<Tool> {
    ToolBuilder::new(SEARCH_SPEAKERS_TOOL)
        .title("Search speakers")
        .description("Search LatinoNet webinar speakers by name.")
        .read_only()
        .idempotent()
        .handler_with_state_and_context(
            gateway,
            |gateway: Arc<WebinarGateway<C>>,
             ctx: RequestContext,
             input: SearchSpeakersInput| async move {
                let token = caller_token(&ctx);
                let result = gateway
                    .search_speakers(
                        token.as_ref(),
                        &input.search_term,
                        input.requested_max_results(),
                    )
                    .await;
                Ok(match result {
                    Ok(text) => CallToolResult::text(text),
                    Err(err) => err.into(),
                })
            },
        )
        .build()
}

/// All webinar tools. Speaker search is only included when enabled.
pub fn webinar_tools<C: WebinarApi>(
    gateway: Arc<WebinarGateway<C>>,
    enable_speaker_search: bool,
) -> Result<Vec<Tool>> {
    let mut tools = vec![upcoming_webinars_tool(gateway.clone())?];
    if enable_speaker_search {
        tools.push(search_speakers_tool(gateway)?);
    }
    Ok(tools)
}
