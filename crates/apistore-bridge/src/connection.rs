//! A correlator wired to a transport.

use crate::correlator::Correlator;
use crate::error::{BridgeError, BridgeResult};
use crate::transport::{Fault, Transport};
use apistore_protocol::{ChangeNotification, Inbound, MessageEnvelope};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default capacity of the change notification broadcast.
pub const DEFAULT_CHANGE_CAPACITY: usize = 256;

/// Connection tuning.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Deadline for each call. `None` waits forever.
    pub request_timeout: Option<Duration>,
    /// Buffered change notifications per subscriber.
    pub change_capacity: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            change_capacity: DEFAULT_CHANGE_CAPACITY,
        }
    }
}

/// Issues calls over a transport and routes the replies back.
pub struct Connection {
    correlator: Arc<Correlator>,
    transport: Arc<dyn Transport>,
    changes: broadcast::Sender<ChangeNotification>,
    request_timeout: Option<Duration>,
}

impl Connection {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_options(transport, ConnectionOptions::default())
    }

    /// Create a connection and install its handlers on `transport`.
    pub fn with_options(transport: Arc<dyn Transport>, options: ConnectionOptions) -> Self {
        let correlator = Arc::new(Correlator::new());
        let (changes, _) = broadcast::channel(options.change_capacity.max(1));

        let replies = correlator.clone();
        let notifications = changes.clone();
        transport.on_message(Arc::new(move |inbound| match inbound {
            Inbound::Reply(reply) => {
                let id = reply.id;
                match reply.into_outcome() {
                    Ok(value) => {
                        replies.resolve(id, value);
                    }
                    Err(failure) => {
                        replies.reject(id, failure.into());
                    }
                }
            }
            Inbound::Change(notification) => {
                // No subscribers is fine
                let _ = notifications.send(notification);
            }
        }));

        let faults = correlator.clone();
        transport.on_fault(Arc::new(move |fault: Fault| match fault.request_id {
            Some(id) => {
                faults.reject(id, BridgeError::TransportFault(fault.message));
            }
            None => {
                faults.fail_all(BridgeError::TransportFault(fault.message));
            }
        }));

        Self {
            correlator,
            transport,
            changes,
            request_timeout: options.request_timeout,
        }
    }

    /// Call `operation` on the engine and wait for its reply.
    ///
    /// Dropping the returned future before it completes removes the pending entry.
    pub async fn call(&self, operation: &str, arguments: Vec<Value>) -> BridgeResult<Value> {
        let id = self.correlator.next_id();
        let mut pending = self.correlator.register(id)?;
        let _entry = PendingEntry {
            correlator: self.correlator.as_ref(),
            id,
        };

        debug!(id, operation = %operation, "Calling");
        let envelope = MessageEnvelope::new(id, operation, arguments);
        if let Err(e) = self.transport.send(envelope).await {
            warn!(id, operation = %operation, error = %e, "Failed to send call");
            return Err(e);
        }

        let Some(limit) = self.request_timeout else {
            return pending.await;
        };

        match tokio::time::timeout(limit, &mut pending).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(id, operation = %operation, timeout_ms = limit.as_millis() as u64, "Call timed out");
                self.correlator.expire(id, limit);
                // Resolves right away, unless the reply won the race
                pending.await
            }
        }
    }

    /// Receive every change notification the transport delivers from now on.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeNotification> {
        self.changes.subscribe()
    }

    /// Open the transport's notification path.
    pub async fn open_notifications(&self) -> BridgeResult<()> {
        self.transport.open_notifications().await
    }

    pub fn pending_count(&self) -> usize {
        self.correlator.pending_count()
    }

    pub fn correlator(&self) -> &Arc<Correlator> {
        &self.correlator
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Close the underlying transport and reject every call still waiting.
    pub async fn close(&self) {
        self.transport.close().await;
        let rejected = self
            .correlator
            .reject_all(|| BridgeError::TransportFault("connection closed".to_string()));
        if rejected > 0 {
            debug!(rejected, "Rejected pending calls on close");
        }
    }
}

/// Removes a call's pending entry when the call finishes or is cancelled.
///
/// A no-op once the entry was completed.
struct PendingEntry<'a> {
    correlator: &'a Correlator,
    id: u64,
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        if self.correlator.forget(self.id) {
            debug!(id = self.id, "Dropped pending entry without a reply");
        }
    }
}
