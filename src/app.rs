//! Assembly of the protected MCP application from [`Settings`].

use std::sync::Arc;

use axum::Router;

use crate::config::Settings;
use crate::error::Result;
use crate::oauth::{OAuthLayer, ProtectedResourceMetadata, TokenValidator};
use crate::router::McpRouter;
use crate::transport::HttpTransport;
use crate::transport::http::HEALTH_PATH;
use crate::webinar::{WebinarApi, WebinarGateway, webinar_tools};

const INSTRUCTIONS: &str = "Tools for the Latino .Net Online community. \
Every call must carry a bearer token issued by the community identity server; \
the token is forwarded to the webinar API.";

/// The resource metadata document advertised by this server.
pub fn resource_metadata(settings: &Settings) -> ProtectedResourceMetadata {
    ProtectedResourceMetadata::new(settings.audience())
        .resource_name(settings.resource_name.clone())
        .authorization_server(settings.auth_server_url.clone())
        .scopes(settings.scopes.iter().cloned())
}

/// The MCP router with the webinar tools registered.
pub fn mcp_router<C: WebinarApi>(settings: &Settings, client: C) -> Result<McpRouter> {
    let gateway = Arc::new(WebinarGateway::new(client));
    let tools = webinar_tools(gateway, settings.enable_speaker_search)?;

    Ok(McpRouter::new()
        .instructions(INSTRUCTIONS)
        .tools(tools))
}

/// The complete HTTP application: MCP endpoint, health and metadata routes,
/// all behind the bearer token gate.
pub fn build_app<V, C>(settings: &Settings, validator: V, client: C) -> Result<Router>
where
    V: TokenValidator,
    C: WebinarApi,
{
    let metadata = resource_metadata(settings);
    let router = mcp_router(settings, client)?;

    let oauth = OAuthLayer::new(validator, metadata.clone()).public_path(HEALTH_PATH);

    Ok(HttpTransport::new(router)
        .metadata(metadata)
        .into_router()
        .layer(oauth))
}
