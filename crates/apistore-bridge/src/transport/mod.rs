//! Transports carry envelopes to the engine and bring replies and change
//! notifications back.
//!
//! Two implementations share the [`Transport`] trait:
//! - [`WorkerTransport`]: an in-process worker reached over mpsc channels
//! - [`RemoteTransport`]: HTTP calls plus a WebSocket push channel

mod remote;
mod worker;

pub use remote::RemoteTransport;
pub use worker::{EngineWorker, ModelEngine, Notifier, WorkerChannel, WorkerSpawner, WorkerTransport};

use crate::error::BridgeResult;
use apistore_protocol::{Inbound, MessageEnvelope};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Callback for every reply and change notification a transport receives.
pub type MessageHandler = Arc<dyn Fn(Inbound) + Send + Sync>;

/// Callback for channel-level failures.
pub type FaultHandler = Arc<dyn Fn(Fault) + Send + Sync>;

/// A broken channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub message: String,
    /// Set when the failure is known to belong to one request.
    pub request_id: Option<u64>,
}

impl Fault {
    /// Fault with no request to attribute it to.
    pub fn channel(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            request_id: None,
        }
    }

    /// Fault that belongs to a single request.
    pub fn request(id: u64, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            request_id: Some(id),
        }
    }
}

/// A channel to the engine.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Hand the envelope to the channel. Does not wait for the reply.
    async fn send(&self, envelope: MessageEnvelope) -> BridgeResult<()>;

    /// Install the message callback, replacing any previous one.
    fn on_message(&self, handler: MessageHandler);

    /// Install the fault callback, replacing any previous one.
    fn on_fault(&self, handler: FaultHandler);

    /// Open the notification path where it is separate from the call path.
    async fn open_notifications(&self) -> BridgeResult<()> {
        Ok(())
    }

    /// Tear the channel down.
    async fn close(&self);
}

/// Handler slots shared by both transports and their background tasks.
#[derive(Clone, Default)]
pub(crate) struct TransportHandlers {
    message: Arc<RwLock<Option<MessageHandler>>>,
    fault: Arc<RwLock<Option<FaultHandler>>>,
}

impl TransportHandlers {
    pub(crate) fn set_message(&self, handler: MessageHandler) {
        *self.message.write() = Some(handler);
    }

    pub(crate) fn set_fault(&self, handler: FaultHandler) {
        *self.fault.write() = Some(handler);
    }

    pub(crate) fn deliver(&self, inbound: Inbound) {
        let handler = self.message.read().clone();
        match handler {
            Some(handler) => handler(inbound),
            None => debug!("No message handler installed, dropping inbound payload"),
        }
    }

    /// Classify a raw payload and deliver it. Malformed payloads are dropped.
    pub(crate) fn deliver_value(&self, value: Value) {
        match Inbound::classify(value) {
            Ok(inbound) => self.deliver(inbound),
            Err(e) => warn!(error = %e, "Dropping malformed payload"),
        }
    }

    pub(crate) fn fault(&self, fault: Fault) {
        let handler = self.fault.read().clone();
        match handler {
            Some(handler) => handler(fault),
            None => warn!(message = %fault.message, "Transport fault with no handler installed"),
        }
    }
}
