//! Configuration, paths and logging bootstrap for apistore binaries.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_LOG_LEVEL, DEFAULT_PUSH_CHANNEL_CAPACITY, DEFAULT_REMOTE_URL,
    DEFAULT_REQUEST_TIMEOUT_MS,
};
pub use error::{ConfigError, ConfigResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
