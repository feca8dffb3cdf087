//! Endpoint commands.

use super::{connect, Context};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use apistore_bridge::EndPointInit;
use serde_json::Value;

/// Add an endpoint.
pub async fn add_endpoint(ctx: &Context, path: &str, name: Option<String>) -> Result<()> {
    let client = connect(ctx).await?;

    let mut init = EndPointInit::new(path);
    if let Some(name) = name {
        init = init.with_name(name);
    }

    let id = client.store().add_endpoint(&init).await?;
    output::print_success("Endpoint added", Some(&id), &ctx.format);

    client.shutdown().await;
    Ok(())
}

/// List endpoints.
pub async fn list_endpoints(ctx: &Context) -> Result<()> {
    let client = connect(ctx).await?;
    let endpoints = client.store().list_endpoints().await?;

    match ctx.format {
        OutputFormat::Text => output::print_table(
            &endpoints,
            &[("id", 36), ("path", 30), ("name", 24)],
            "No endpoints found",
        ),
        OutputFormat::Json => output::print_value(&Value::Array(endpoints))?,
    }

    client.shutdown().await;
    Ok(())
}

/// Show one endpoint.
pub async fn get_endpoint(ctx: &Context, id: &str) -> Result<()> {
    let client = connect(ctx).await?;
    let endpoint = client.store().get_endpoint(id).await?;

    output::print_value(&endpoint)?;

    client.shutdown().await;
    Ok(())
}

/// Delete an endpoint.
pub async fn delete_endpoint(ctx: &Context, id: &str) -> Result<()> {
    let client = connect(ctx).await?;

    client.store().delete_endpoint(id).await?;
    output::print_success("Endpoint deleted", Some(id), &ctx.format);

    client.shutdown().await;
    Ok(())
}
