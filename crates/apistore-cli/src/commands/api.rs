//! Document-level commands.

use super::{connect, Context};
use crate::output::{self, OutputFormat};
use anyhow::{Context as _, Result};
use apistore_bridge::{ApiInit, RemoteTransport};
use serde_json::Value;

/// Start a session and print its id.
pub async fn session(ctx: &Context) -> Result<()> {
    let transport = RemoteTransport::new(ctx.remote.clone());
    let id = transport
        .init_session()
        .await
        .with_context(|| format!("Could not start a session at {}", ctx.remote))?;

    match ctx.format {
        OutputFormat::Text => println!("{}", id),
        OutputFormat::Json => println!("{}", serde_json::json!({ "session": id })),
    }
    Ok(())
}

/// Create a new web API document.
pub async fn create_api(ctx: &Context, name: Option<String>, version: Option<String>) -> Result<()> {
    let client = connect(ctx).await?;
    let init = ApiInit {
        name,
        version,
        ..Default::default()
    };

    let id = client.store().create_web_api(&init).await?;
    output::print_success("API created", Some(&id), &ctx.format);

    client.shutdown().await;
    Ok(())
}

/// Add a server to the current document.
pub async fn add_server(ctx: &Context, url: &str) -> Result<()> {
    let client = connect(ctx).await?;

    let id = client.store().add_server(url).await?;
    output::print_success("Server added", Some(&id), &ctx.format);

    client.shutdown().await;
    Ok(())
}

/// List servers of the current document.
pub async fn list_servers(ctx: &Context) -> Result<()> {
    let client = connect(ctx).await?;
    let servers = client.store().list_servers().await?;

    match ctx.format {
        OutputFormat::Text => {
            output::print_table(&servers, &[("id", 36), ("url", 48)], "No servers found")
        }
        OutputFormat::Json => output::print_value(&Value::Array(servers))?,
    }

    client.shutdown().await;
    Ok(())
}

/// Print the document serialized as RAML.
pub async fn generate_raml(ctx: &Context) -> Result<()> {
    let client = connect(ctx).await?;
    let raml = client.store().generate_raml().await?;

    match ctx.format {
        OutputFormat::Text => print!("{}", raml),
        OutputFormat::Json => println!("{}", serde_json::json!({ "raml": raml })),
    }

    client.shutdown().await;
    Ok(())
}
