//! OAuth-protected MCP server for the LatinoNet webinar API.
//!
//! ```bash
//! # Discover the authorization server (public endpoint)
//! curl http://localhost:7071/.well-known/oauth-protected-resource
//!
//! # Without a token: 401 with WWW-Authenticate: Bearer resource_metadata="..."
//! curl -i -X POST http://localhost:7071/ -H "Content-Type: application/json" \
//!   -d '{"jsonrpc":"2.0","id":1,"method":"tools/list"}'
//!
//! # With a token issued for audience http://localhost:7071/
//! curl -X POST http://localhost:7071/ -H "Content-Type: application/json" \
//!   -H "Authorization: Bearer <jwt>" \
//!   -d '{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"get_upcoming_webinars"}}'
//! ```

use clap::Parser;
use tracing_subscriber::EnvFilter;

use webinar_mcp::BoxError;
use webinar_mcp::app::{build_app, resource_metadata};
use webinar_mcp::config::{Cli, Settings};
use webinar_mcp::oauth::JwksValidator;
use webinar_mcp::webinar::HttpWebinarClient;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let settings = Settings::try_from(Cli::parse())?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("webinar_mcp={}", settings.log_level).parse()?),
        )
        .init();

    let validator = JwksValidator::discover(&settings.auth_server_url)
        .await?
        .default_ttl(settings.jwks_cache_ttl)
        .expected_audience(settings.audience())
        .expected_issuer(&settings.auth_server_url)
        .build()
        .await?;

    let client = HttpWebinarClient::new(
        settings.downstream_base_url.clone(),
        settings.downstream_timeout,
    )?;

    let app = build_app(&settings, validator, client)?;

    let listener = tokio::net::TcpListener::bind(&settings.bind_address).await?;
    tracing::info!(
        address = %settings.bind_address,
        resource = %settings.audience(),
        "webinar MCP server listening"
    );
    tracing::info!(authority = %settings.auth_server_url, "trusting identity server");
    tracing::info!(
        url = %resource_metadata(&settings).metadata_url(),
        "protected resource metadata"
    );
    if settings.enable_speaker_search {
        tracing::info!("speaker search tool enabled");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
