//! Configuration for apistore clients.

use crate::{ConfigError, ConfigResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default store service URL.
pub const DEFAULT_REMOTE_URL: &str = "http://127.0.0.1:8080";

/// Default per-request deadline in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Default number of buffered change notifications per subscriber.
pub const DEFAULT_PUSH_CHANNEL_CAPACITY: usize = 256;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL of the remote store service.
    #[serde(default = "default_remote_url")]
    pub remote_url: String,
    /// Deadline for each call, in milliseconds. 0 disables it.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Buffered change notifications per subscriber.
    #[serde(default = "default_push_channel_capacity")]
    pub push_channel_capacity: usize,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_remote_url() -> String {
    DEFAULT_REMOTE_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_push_channel_capacity() -> usize {
    DEFAULT_PUSH_CHANNEL_CAPACITY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            remote_url: default_remote_url(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            push_channel_capacity: DEFAULT_PUSH_CHANNEL_CAPACITY,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file if present, then apply
    /// environment overrides.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `APISTORE_*` overrides from `lookup`. Unparseable numbers are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("APISTORE_LOG_LEVEL").and_then(non_empty) {
            self.log_level = level;
        }
        if let Some(url) = lookup("APISTORE_REMOTE_URL").and_then(non_empty) {
            self.remote_url = url;
        }
        if let Some(timeout) = lookup("APISTORE_REQUEST_TIMEOUT_MS")
            .and_then(non_empty)
            .and_then(|raw| raw.parse::<u64>().ok())
        {
            self.request_timeout_ms = timeout;
        }
    }

    /// Remote store URL, parsed.
    pub fn remote_url(&self) -> ConfigResult<Url> {
        let url = Url::parse(&self.remote_url)?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Config(format!(
                "remote_url must be http or https, got {}",
                other
            ))),
        }
    }

    /// Per-request deadline, `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
