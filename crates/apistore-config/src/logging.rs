//! Logging initialization for apistore binaries.
//!
//! Structured JSONL goes to `~/.apistore/logs/apistore.jsonl`, with a compact
//! copy on stderr for interactive use.

use crate::Paths;

/// Initialize the logging system.
///
/// `level` is the default filter; `RUST_LOG` overrides it.
///
/// ```ignore
/// init_logging("info", &paths);
/// tracing::info!("client started");
/// ```
pub fn init_logging(level: &str, paths: &Paths) {
    observability::init_with_config(observability::LogConfig {
        service_name: "apistore".into(),
        default_level: parse_level(level).to_string().to_lowercase(),
        log_path: Some(paths.log_file()),
        also_stderr: true,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
