//! In-process worker transport.
//!
//! The worker is any task that reads call envelopes from one unbounded
//! channel and writes replies and change notifications to another. It is
//! spawned on the first `send`, reused while alive, and spawned again after
//! it exits.

use super::{Fault, FaultHandler, MessageHandler, Transport, TransportHandlers};
use crate::error::{BridgeError, BridgeResult};
use apistore_protocol::{ChangeNotification, MessageEnvelope, OperationFailure, ReplyEnvelope};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Both ends of a freshly spawned worker, seen from the transport.
pub struct WorkerChannel {
    /// Envelopes into the worker.
    pub tx: mpsc::UnboundedSender<Value>,
    /// Replies and notifications out of the worker.
    pub rx: mpsc::UnboundedReceiver<Value>,
}

/// Produces workers on demand.
pub trait WorkerSpawner: Send + Sync {
    fn spawn(&self) -> BridgeResult<WorkerChannel>;
}

struct LiveWorker {
    generation: u64,
    tx: mpsc::UnboundedSender<Value>,
    reader: JoinHandle<()>,
}

#[derive(Default)]
struct WorkerState {
    live: Option<LiveWorker>,
    generation: u64,
}

/// Transport backed by an in-process worker.
pub struct WorkerTransport {
    spawner: Arc<dyn WorkerSpawner>,
    handlers: TransportHandlers,
    state: Arc<Mutex<WorkerState>>,
}

impl WorkerTransport {
    /// Create a transport. No worker is spawned until the first `send`.
    pub fn new(spawner: Arc<dyn WorkerSpawner>) -> Self {
        Self {
            spawner,
            handlers: TransportHandlers::default(),
            state: Arc::new(Mutex::new(WorkerState::default())),
        }
    }

    /// Whether a worker is currently attached.
    pub fn is_live(&self) -> bool {
        self.state
            .lock()
            .live
            .as_ref()
            .is_some_and(|live| !live.tx.is_closed())
    }

    /// Sender for the live worker, spawning one if needed.
    fn ensure_worker(&self) -> BridgeResult<mpsc::UnboundedSender<Value>> {
        let mut state = self.state.lock();

        if let Some(live) = state.live.as_ref() {
            if !live.tx.is_closed() {
                return Ok(live.tx.clone());
            }
        }

        // The exited worker's reader keeps running until it has forwarded
        // every queued reply; its generation no longer matches, so it ends quietly.
        if let Some(stale) = state.live.take() {
            debug!(generation = stale.generation, "Replacing exited worker");
        }

        let channel = self.spawner.spawn()?;
        state.generation += 1;
        let generation = state.generation;

        let reader = tokio::spawn(read_worker(
            channel.rx,
            self.handlers.clone(),
            self.state.clone(),
            generation,
        ));

        info!(generation, "Spawned worker");
        state.live = Some(LiveWorker {
            generation,
            tx: channel.tx.clone(),
            reader,
        });

        Ok(channel.tx)
    }

    fn drop_worker(&self) -> Option<LiveWorker> {
        self.state.lock().live.take()
    }
}

/// Forward everything the worker writes until its channel closes.
async fn read_worker(
    mut rx: mpsc::UnboundedReceiver<Value>,
    handlers: TransportHandlers,
    state: Arc<Mutex<WorkerState>>,
    generation: u64,
) {
    while let Some(value) = rx.recv().await {
        handlers.deliver_value(value);
    }

    let was_current = {
        let mut state = state.lock();
        let current = state
            .live
            .as_ref()
            .is_some_and(|live| live.generation == generation);
        if current {
            state.live = None;
        }
        current
    };

    if was_current {
        warn!(generation, "Worker exited");
        handlers.fault(Fault::channel("worker exited"));
    }
}

#[async_trait]
impl Transport for WorkerTransport {
    async fn send(&self, envelope: MessageEnvelope) -> BridgeResult<()> {
        let id = envelope.id;
        let payload = serde_json::to_value(&envelope)?;
        let tx = self.ensure_worker()?;

        debug!(id, operation = %envelope.operation, "Posting to worker");
        if tx.send(payload).is_err() {
            if let Some(stale) = self.drop_worker() {
                debug!(generation = stale.generation, "Worker stopped accepting messages");
            }
            return Err(BridgeError::TransportFault(
                "worker stopped accepting messages".to_string(),
            ));
        }

        Ok(())
    }

    fn on_message(&self, handler: MessageHandler) {
        self.handlers.set_message(handler);
    }

    fn on_fault(&self, handler: FaultHandler) {
        self.handlers.set_fault(handler);
    }

    async fn close(&self) {
        if let Some(live) = self.drop_worker() {
            live.reader.abort();
            info!(generation = live.generation, "Worker closed");
        }
    }
}

impl Drop for WorkerTransport {
    fn drop(&mut self) {
        if let Some(live) = self.state.lock().live.take() {
            live.reader.abort();
        }
    }
}

/// Handle an engine uses to publish change notifications.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Value>,
}

impl Notifier {
    /// Publish a notification. Returns false once the transport is gone.
    pub fn notify(&self, notification: &ChangeNotification) -> bool {
        match serde_json::to_value(notification) {
            Ok(value) => self.tx.send(value).is_ok(),
            Err(e) => {
                warn!(error = %e, "Failed to serialize change notification");
                false
            }
        }
    }
}

/// The external document engine, driven one call at a time.
pub trait ModelEngine: Send + 'static {
    fn handle(
        &mut self,
        operation: &str,
        arguments: Vec<Value>,
        notifier: &Notifier,
    ) -> Result<Value, OperationFailure>;
}

/// Spawner running a fresh [`ModelEngine`] on a tokio task per worker.
pub struct EngineWorker<F> {
    factory: F,
}

impl<F, E> EngineWorker<F>
where
    F: Fn() -> E + Send + Sync,
    E: ModelEngine,
{
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<F, E> WorkerSpawner for EngineWorker<F>
where
    F: Fn() -> E + Send + Sync,
    E: ModelEngine,
{
    fn spawn(&self) -> BridgeResult<WorkerChannel> {
        let (in_tx, mut in_rx) = mpsc::unbounded_channel::<Value>();
        let (out_tx, out_rx) = mpsc::unbounded_channel::<Value>();
        let mut engine = (self.factory)();

        tokio::spawn(async move {
            let notifier = Notifier { tx: out_tx.clone() };

            while let Some(value) = in_rx.recv().await {
                let envelope: MessageEnvelope = match serde_json::from_value(value) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        warn!(error = %e, "Worker received malformed envelope");
                        continue;
                    }
                };

                let id = envelope.id;
                let reply = match engine.handle(&envelope.operation, envelope.arguments, &notifier)
                {
                    Ok(result) => ReplyEnvelope::success(id, result),
                    Err(failure) => ReplyEnvelope::failure(id, failure.message, failure.stack),
                };

                let reply = match serde_json::to_value(&reply) {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!(id, error = %e, "Failed to serialize reply");
                        continue;
                    }
                };

                if out_tx.send(reply).is_err() {
                    debug!("Transport went away, stopping worker");
                    break;
                }
            }
        });

        Ok(WorkerChannel {
            tx: in_tx,
            rx: out_rx,
        })
    }
}
