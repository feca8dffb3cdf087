//! Bridge error types.

use thiserror::Error;

/// Bridge error type.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The channel itself broke; not attributable to one operation
    #[error("Transport fault: {0}")]
    TransportFault(String),

    /// The engine failed a specific operation
    #[error("Operation failed: {message}")]
    Operation {
        message: String,
        stack: Option<String>,
    },

    /// An id was registered twice
    #[error("Request id {0} is already pending")]
    DuplicateId(u64),

    /// A reply arrived for an id with no pending request
    #[error("No pending request for reply id {0}")]
    StaleReply(u64),

    /// Call attempted before the remote session was bootstrapped
    #[error("Transport not initialized: {0}")]
    NotInitialized(String),

    /// No bus listener attached a result
    #[error("No handler for command: {0}")]
    NoHandler(String),

    /// Per-request deadline expired
    #[error("Request {id} timed out after {after_ms} ms")]
    Timeout { id: u64, after_ms: u64 },

    /// The pending request was dropped without an outcome
    #[error("Reply channel closed")]
    ChannelClosed,

    /// A result did not have the expected shape
    #[error("Invalid result: {0}")]
    InvalidResult(String),

    /// Invalid command arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// URL parse error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl BridgeError {
    /// Remote stack trace, when the engine supplied one.
    pub fn stack(&self) -> Option<&str> {
        match self {
            BridgeError::Operation { stack, .. } => stack.as_deref(),
            _ => None,
        }
    }

    /// Whether the error came from the channel rather than the operation.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BridgeError::TransportFault(_) | BridgeError::Http(_) | BridgeError::WebSocket(_)
        )
    }
}

impl From<apistore_protocol::OperationFailure> for BridgeError {
    fn from(failure: apistore_protocol::OperationFailure) -> Self {
        BridgeError::Operation {
            message: failure.message,
            stack: failure.stack,
        }
    }
}

/// Result type alias using BridgeError.
pub type BridgeResult<T> = Result<T, BridgeError>;
