//! Follow change notifications from the store.

use super::{connect, Context};
use crate::output::OutputFormat;
use anyhow::Result;
use apistore_protocol::change_event_names;
use chrono::Local;
use serde_json::{json, Value};
use tracing::info;

/// Print every change event until interrupted.
pub async fn watch(ctx: &Context) -> Result<()> {
    let client = connect(ctx).await?;

    let format = ctx.format;
    for name in change_event_names() {
        client.bus().on(&name, move |detail| {
            let record = detail.args().first().cloned().unwrap_or(Value::Null);
            print_change(detail.name(), &record, format);
        });
    }

    client.watch_changes().await?;
    info!(remote = %ctx.remote, "Watching store changes");
    if format == OutputFormat::Text {
        eprintln!("Watching {} (Ctrl-C to stop)", ctx.remote);
    }

    tokio::signal::ctrl_c().await?;

    client.shutdown().await;
    Ok(())
}

fn print_change(event: &str, record: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            let graph_id = record
                .get("graphId")
                .and_then(|v| v.as_str())
                .unwrap_or("-");
            println!(
                "{} {:<36} {}",
                Local::now().format("%H:%M:%S"),
                event,
                graph_id
            );
        }
        OutputFormat::Json => {
            println!("{}", json!({ "event": event, "record": record }));
        }
    }
}
