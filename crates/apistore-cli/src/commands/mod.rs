//! CLI command implementations.

mod api;
mod endpoints;
mod watch;

pub use api::{add_server, create_api, generate_raml, list_servers, session};
pub use endpoints::{add_endpoint, delete_endpoint, get_endpoint, list_endpoints};
pub use watch::watch;

use crate::output::OutputFormat;
use anyhow::{Context as _, Result};
use apistore_bridge::{ConnectionOptions, NoopSink, RemoteTransport, StoreClient};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Settings shared by every command.
pub struct Context {
    pub remote: Url,
    pub session: Option<String>,
    pub options: ConnectionOptions,
    pub format: OutputFormat,
}

/// Open a store client against the remote service.
///
/// Reuses `--session` when given, otherwise starts a new session.
pub async fn connect(ctx: &Context) -> Result<StoreClient> {
    let transport = Arc::new(RemoteTransport::new(ctx.remote.clone()));

    match &ctx.session {
        Some(session) => transport.attach_session(session.clone()),
        None => {
            let session = transport
                .init_session()
                .await
                .with_context(|| format!("Could not start a session at {}", ctx.remote))?;
            debug!(session = %session, "Started store session");
        }
    }

    Ok(StoreClient::with_options(
        transport,
        ctx.options.clone(),
        Arc::new(NoopSink),
    ))
}
