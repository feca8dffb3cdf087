//! apistore CLI - edit an API document held by a remote store service.

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use apistore_bridge::ConnectionOptions;
use apistore_config::{init_logging, Config, Paths};
use clap::{Parser, Subcommand};
use output::OutputFormat;
use tracing::debug;

/// apistore CLI.
#[derive(Parser)]
#[command(name = "apistore")]
#[command(about = "Edit an API document held by a remote store service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Store service URL (overrides config and APISTORE_REMOTE_URL)
    #[arg(long, global = true)]
    remote: Option<String>,

    /// Reuse an existing session instead of starting a new one
    #[arg(long, global = true)]
    session: Option<String>,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Base directory for config and logs. Defaults to ~/.apistore
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session and print its id
    Session,
    /// Print the effective configuration
    Config,
    /// Create a new web API document
    CreateApi {
        /// API title
        #[arg(short, long)]
        name: Option<String>,
        /// API version
        #[arg(long)]
        version: Option<String>,
    },
    /// Add a server
    AddServer {
        /// Server base URI
        url: String,
    },
    /// List servers
    ListServers,
    /// Add an endpoint
    AddEndpoint {
        /// Relative path, e.g. /people
        path: String,
        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List endpoints
    ListEndpoints,
    /// Show an endpoint
    GetEndpoint {
        /// Endpoint id
        id: String,
    },
    /// Delete an endpoint
    DeleteEndpoint {
        /// Endpoint id
        id: String,
    },
    /// Print the document as RAML
    GenerateRaml,
    /// Follow change notifications until interrupted
    Watch,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e), &format);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let mut config = Config::load(&paths)?;
    if let Some(remote) = cli.remote {
        config.remote_url = remote;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_logging(&config.log_level, &paths);
    debug!(remote = %config.remote_url, "Loaded configuration");

    if let Commands::Config = cli.command {
        return output::print_value(&serde_json::to_value(&config)?);
    }

    let ctx = commands::Context {
        remote: config.remote_url()?,
        session: cli.session,
        options: ConnectionOptions {
            request_timeout: config.request_timeout(),
            change_capacity: config.push_channel_capacity,
        },
        format: cli.format,
    };

    match cli.command {
        Commands::Session => commands::session(&ctx).await,
        Commands::Config => Ok(()),
        Commands::CreateApi { name, version } => commands::create_api(&ctx, name, version).await,
        Commands::AddServer { url } => commands::add_server(&ctx, &url).await,
        Commands::ListServers => commands::list_servers(&ctx).await,
        Commands::AddEndpoint { path, name } => commands::add_endpoint(&ctx, &path, name).await,
        Commands::ListEndpoints => commands::list_endpoints(&ctx).await,
        Commands::GetEndpoint { id } => commands::get_endpoint(&ctx, &id).await,
        Commands::DeleteEndpoint { id } => commands::delete_endpoint(&ctx, &id).await,
        Commands::GenerateRaml => commands::generate_raml(&ctx).await,
        Commands::Watch => commands::watch(&ctx).await,
    }
}
