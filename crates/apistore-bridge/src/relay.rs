//! Re-dispatches change notifications on the command bus.

use crate::bus::CommandBus;
use crate::connection::Connection;
use crate::error::BridgeResult;
use apistore_protocol::{change_event_name, ChangeNotification};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Turns the connection's change stream into bus events such as
/// `store endpoint created`.
pub struct ChangeRelay {
    connection: Arc<Connection>,
    bus: CommandBus,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ChangeRelay {
    pub fn new(connection: Arc<Connection>, bus: CommandBus) -> Self {
        Self {
            connection,
            bus,
            task: Mutex::new(None),
        }
    }

    /// Open the notification path and start relaying. A second call is a no-op.
    pub async fn start(&self) -> BridgeResult<()> {
        if self.is_running() {
            debug!("Change relay already running");
            return Ok(());
        }

        // Subscribe before opening so nothing sent right after the open is missed
        let changes = self.connection.subscribe_changes();
        self.connection.open_notifications().await?;

        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }
        *task = Some(tokio::spawn(run_relay(changes, self.bus.clone())));
        info!("Change relay started");
        Ok(())
    }

    /// Stop relaying. Safe to call when not running.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            info!("Change relay stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Re-dispatch one notification. Returns how many listeners ran.
    pub fn relay(&self, notification: &ChangeNotification) -> usize {
        relay_to(&self.bus, notification)
    }
}

impl Drop for ChangeRelay {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

fn relay_to(bus: &CommandBus, notification: &ChangeNotification) -> usize {
    let Some((domain_type, phase)) = notification.kind() else {
        debug!(event = %notification.event, "Not relaying unrecognized change");
        return 0;
    };

    let payload = match serde_json::to_value(&notification.data) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(event = %notification.event, error = %e, "Failed to encode change record");
            return 0;
        }
    };

    let name = change_event_name(domain_type, phase);
    debug!(event = %name, graph_id = %notification.data.graph_id, "Relaying change");
    bus.emit(&name, payload)
}

async fn run_relay(mut changes: broadcast::Receiver<ChangeNotification>, bus: CommandBus) {
    loop {
        match changes.recv().await {
            Ok(notification) => {
                relay_to(&bus, &notification);
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Change relay lagged, notifications were dropped");
            }
            Err(RecvError::Closed) => {
                debug!("Change stream closed, relay exiting");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{EngineWorker, ModelEngine, Notifier, WorkerTransport};
    use apistore_protocol::{ChangePhase, ChangeRecord, DomainType, OperationFailure};
    use serde_json::{json, Value};
    use std::time::Duration;

    struct Quiet;

    impl ModelEngine for Quiet {
        fn handle(
            &mut self,
            _operation: &str,
            _arguments: Vec<Value>,
            _notifier: &Notifier,
        ) -> Result<Value, OperationFailure> {
            Ok(Value::Null)
        }
    }

    fn relay() -> (ChangeRelay, CommandBus) {
        let transport = Arc::new(WorkerTransport::new(Arc::new(EngineWorker::new(|| Quiet))));
        let connection = Arc::new(Connection::new(transport));
        let bus = CommandBus::new();
        (ChangeRelay::new(connection, bus.clone()), bus)
    }

    #[test]
    fn test_relay_endpoint_created() {
        let (relay, bus) = relay();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.on("store endpoint created", move |detail| {
            sink.lock().push(detail.args()[0].clone());
        });

        let notification = ChangeNotification::new(
            DomainType::EndPoint,
            ChangePhase::Created,
            ChangeRecord::created("e1", DomainType::EndPoint, json!({"path": "/a"})),
        );
        assert_eq!(relay.relay(&notification), 1);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["graphId"], "e1");
        assert_eq!(seen[0]["item"]["path"], "/a");
        assert_eq!(relay.connection.pending_count(), 0);
    }

    #[test]
    fn test_relay_custom_property_family() {
        let (relay, bus) = relay();
        let count = Arc::new(parking_lot::Mutex::new(0));
        let counter = count.clone();
        bus.on("store custom property deleted", move |_| *counter.lock() += 1);

        let notification = ChangeNotification::new(
            DomainType::CustomDomainProperty,
            ChangePhase::Deleted,
            ChangeRecord::deleted("cp1", DomainType::CustomDomainProperty),
        );
        assert_eq!(notification.event, "CustomDomainProperty#property-deleted");
        relay.relay(&notification);

        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_unrecognized_event_not_relayed() {
        let (relay, _bus) = relay();
        let notification = ChangeNotification {
            event: "EndPoint#exploded".to_string(),
            data: ChangeRecord::deleted("e1", DomainType::EndPoint),
        };
        assert_eq!(relay.relay(&notification), 0);
    }

    #[tokio::test]
    async fn test_start_stop_idempotent() {
        let (relay, _bus) = relay();

        relay.stop();
        relay.start().await.unwrap();
        relay.start().await.unwrap();
        assert!(relay.is_running());

        relay.stop();
        relay.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!relay.is_running());
    }
}
