//! Wire types for the apistore correlation layer.
//!
//! This crate provides:
//! - Call and reply envelopes
//! - Change records and notifications
//! - The operation table and the bus/push event name tables

mod change;
mod command;
mod envelope;

pub use change::{
    change_event_name, change_event_names, parse_push_event_name, push_event_name,
    recognized_push_events, ChangeNotification, ChangePhase, ChangeRecord, DomainType,
};
pub use command::{bus_event_names, StoreCommand};
pub use envelope::{Inbound, MessageEnvelope, OperationFailure, ReplyEnvelope};

use thiserror::Error;

/// Error decoding an inbound payload.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is valid JSON but not a reply or a change notification
    #[error("Unexpected payload shape: {0}")]
    Shape(String),
}
