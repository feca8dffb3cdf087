//! Bus listeners that turn store commands into engine calls.
//!
//! One listener is bound per [`StoreCommand`]. It attaches a future that
//! issues the call through the [`Connection`]; when the command mutates the
//! document, the future also builds a [`ChangeRecord`], emits it on the bus
//! under its change event name and hands it to the [`ChangeSink`].

use crate::bus::{CommandBus, ListenerId, WeakCommandBus};
use crate::connection::Connection;
use crate::error::BridgeResult;
use apistore_protocol::{change_event_name, ChangePhase, ChangeRecord, StoreCommand};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Persists change records produced by local mutations.
#[async_trait]
pub trait ChangeSink: Send + Sync {
    async fn record(&self, phase: ChangePhase, record: &ChangeRecord) -> BridgeResult<()>;
}

/// Sink that keeps nothing.
pub struct NoopSink;

#[async_trait]
impl ChangeSink for NoopSink {
    async fn record(&self, _phase: ChangePhase, _record: &ChangeRecord) -> BridgeResult<()> {
        Ok(())
    }
}

/// The listeners bound for every store command.
pub struct StoreBindings {
    bus: CommandBus,
    listeners: Vec<(StoreCommand, ListenerId)>,
}

impl StoreBindings {
    /// Bind a listener for every store command.
    pub fn attach(bus: &CommandBus, connection: Arc<Connection>, sink: Arc<dyn ChangeSink>) -> Self {
        let listeners = StoreCommand::ALL
            .iter()
            .map(|&command| {
                let connection = connection.clone();
                let sink = sink.clone();
                let bus_ref = bus.downgrade();

                let id = bus.on(command.event_name(), move |detail| {
                    let args = detail.args().to_vec();
                    let connection = connection.clone();
                    let sink = sink.clone();
                    let bus_ref = bus_ref.clone();
                    detail.set_result(async move {
                        execute(command, args, &connection, &bus_ref, sink.as_ref()).await
                    });
                });
                (command, id)
            })
            .collect();

        debug!(commands = StoreCommand::ALL.len(), "Store bindings attached");
        Self {
            bus: bus.clone(),
            listeners,
        }
    }

    /// Unbind every listener. Safe to call twice.
    pub fn detach(&mut self) {
        for (command, id) in self.listeners.drain(..) {
            self.bus.off(command.event_name(), id);
        }
    }

    pub fn is_attached(&self) -> bool {
        !self.listeners.is_empty()
    }
}

async fn execute(
    command: StoreCommand,
    args: Vec<Value>,
    connection: &Connection,
    bus: &WeakCommandBus,
    sink: &dyn ChangeSink,
) -> BridgeResult<Value> {
    let result = connection.call(command.operation(), args.clone()).await?;

    let Some((domain_type, phase)) = command.mutation() else {
        return Ok(result);
    };

    let Some(record) = build_record(command, &args, &result) else {
        warn!(command = %command, "Mutation result did not identify the changed object");
        return Ok(result);
    };

    if let Some(bus) = bus.upgrade() {
        match serde_json::to_value(&record) {
            Ok(payload) => {
                bus.emit(&change_event_name(domain_type, phase), payload);
            }
            Err(e) => warn!(command = %command, error = %e, "Failed to encode change record"),
        }
    }

    if let Err(e) = sink.record(phase, &record).await {
        warn!(command = %command, graph_id = %record.graph_id, error = %e, "Change sink failed");
    }

    Ok(result)
}

/// Change record for a successful mutating call, `None` for queries.
fn build_record(command: StoreCommand, args: &[Value], result: &Value) -> Option<ChangeRecord> {
    let (domain_type, _) = command.mutation()?;

    match command {
        StoreCommand::CreateWebApi
        | StoreCommand::AddEndpoint
        | StoreCommand::AddDocumentation
        | StoreCommand::AddCustomDomainProperty => {
            let id = created_id(result)?;
            let item = with_id(args.first(), &id);
            Some(ChangeRecord::created(id, domain_type, item))
        }
        StoreCommand::AddServer => {
            let id = created_id(result)?;
            let url = args.first().cloned().unwrap_or(Value::Null);
            Some(ChangeRecord::created(
                id.clone(),
                domain_type,
                json!({ "id": id, "url": url }),
            ))
        }
        StoreCommand::AddOperation => {
            let id = created_id(result)?;
            let item = with_id(args.get(1), &id);
            let record = ChangeRecord::created(id, domain_type, item);
            Some(match arg_str(args, 0) {
                Some(parent) => record.with_parent(parent),
                None => record,
            })
        }
        StoreCommand::UpdateApiProperty => {
            let property = arg_str(args, 0)?;
            let value = args.get(1).cloned().unwrap_or(Value::Null);
            let id = result.get("id").and_then(Value::as_str).unwrap_or_default();
            Some(ChangeRecord::updated(
                id,
                domain_type,
                property.clone(),
                updated_item(result, &property, value),
            ))
        }
        StoreCommand::UpdateServerProperty
        | StoreCommand::UpdateEndpointProperty
        | StoreCommand::UpdateOperationProperty
        | StoreCommand::UpdateDocumentationProperty
        | StoreCommand::UpdateCustomDomainProperty => {
            let id = arg_str(args, 0)?;
            let property = arg_str(args, 1)?;
            let value = args.get(2).cloned().unwrap_or(Value::Null);
            Some(ChangeRecord::updated(
                id,
                domain_type,
                property.clone(),
                updated_item(result, &property, value),
            ))
        }
        StoreCommand::DeleteOperation => {
            let record = ChangeRecord::deleted(arg_str(args, 0)?, domain_type);
            Some(match arg_str(args, 1) {
                Some(parent) => record.with_parent(parent),
                None => record,
            })
        }
        StoreCommand::DeleteServer
        | StoreCommand::DeleteEndpoint
        | StoreCommand::DeleteDocumentation
        | StoreCommand::DeleteCustomDomainProperty => {
            Some(ChangeRecord::deleted(arg_str(args, 0)?, domain_type))
        }
        StoreCommand::LoadGraph
        | StoreCommand::LoadApi
        | StoreCommand::GenerateRaml
        | StoreCommand::GenerateGraph
        | StoreCommand::GetApi
        | StoreCommand::ListServers
        | StoreCommand::GetServer
        | StoreCommand::ListEndpoints
        | StoreCommand::GetEndpoint
        | StoreCommand::GetOperation
        | StoreCommand::ListDocumentations => None,
    }
}

/// Id returned by an add: either the bare id or an object carrying `id`.
fn created_id(result: &Value) -> Option<String> {
    match result {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn arg_str(args: &[Value], index: usize) -> Option<String> {
    args.get(index).and_then(Value::as_str).map(str::to_string)
}

fn with_id(init: Option<&Value>, id: &str) -> Value {
    match init {
        Some(Value::Object(map)) => {
            let mut map = map.clone();
            map.insert("id".to_string(), json!(id));
            Value::Object(map)
        }
        _ => json!({ "id": id }),
    }
}

fn updated_item(result: &Value, property: &str, value: Value) -> Value {
    if result.is_null() {
        json!({ property: value })
    } else {
        result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{EngineWorker, ModelEngine, Notifier, WorkerTransport};
    use apistore_protocol::{DomainType, OperationFailure};

    #[test]
    fn test_add_endpoint_record() {
        let record = build_record(
            StoreCommand::AddEndpoint,
            &[json!({"path": "/people"})],
            &json!("ep-1"),
        )
        .unwrap();

        assert_eq!(record.graph_id, "ep-1");
        assert_eq!(record.domain_type, DomainType::EndPoint);
        assert_eq!(record.item, Some(json!({"path": "/people", "id": "ep-1"})));
    }

    #[test]
    fn test_add_server_record() {
        let record =
            build_record(StoreCommand::AddServer, &[json!("https://x")], &json!({"id": "s1"}))
                .unwrap();
        assert_eq!(record.graph_id, "s1");
        assert_eq!(record.item, Some(json!({"id": "s1", "url": "https://x"})));
    }

    #[test]
    fn test_add_operation_has_parent() {
        let record = build_record(
            StoreCommand::AddOperation,
            &[json!("ep-1"), json!({"method": "get"})],
            &json!("op-1"),
        )
        .unwrap();
        assert_eq!(record.domain_parent.as_deref(), Some("ep-1"));
        assert_eq!(record.item.unwrap()["method"], "get");
    }

    #[test]
    fn test_update_record_falls_back_to_property_value() {
        let record = build_record(
            StoreCommand::UpdateEndpointProperty,
            &[json!("ep-1"), json!("name"), json!("People")],
            &Value::Null,
        )
        .unwrap();

        assert_eq!(record.property.as_deref(), Some("name"));
        assert_eq!(record.item, Some(json!({"name": "People"})));
    }

    #[test]
    fn test_update_api_record_uses_result_id() {
        let record = build_record(
            StoreCommand::UpdateApiProperty,
            &[json!("version"), json!("v2")],
            &json!({"id": "doc", "version": "v2"}),
        )
        .unwrap();
        assert_eq!(record.graph_id, "doc");
        assert_eq!(record.domain_type, DomainType::Document);
    }

    #[test]
    fn test_delete_records() {
        let record =
            build_record(StoreCommand::DeleteEndpoint, &[json!("ep-1")], &Value::Null).unwrap();
        assert_eq!(record.graph_id, "ep-1");
        assert!(record.item.is_none());

        let record = build_record(
            StoreCommand::DeleteOperation,
            &[json!("op-1"), json!("ep-1")],
            &Value::Null,
        )
        .unwrap();
        assert_eq!(record.domain_parent.as_deref(), Some("ep-1"));
    }

    #[test]
    fn test_queries_have_no_record() {
        for command in StoreCommand::ALL {
            if command.mutation().is_none() {
                assert!(build_record(command, &[json!("x")], &json!("y")).is_none());
            }
        }
    }

    #[test]
    fn test_add_without_id_has_no_record() {
        assert!(build_record(StoreCommand::AddEndpoint, &[json!({})], &json!(42)).is_none());
    }

    struct Nothing;

    impl ModelEngine for Nothing {
        fn handle(
            &mut self,
            _operation: &str,
            _arguments: Vec<Value>,
            _notifier: &Notifier,
        ) -> Result<Value, OperationFailure> {
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn test_attach_and_detach() {
        let transport = Arc::new(WorkerTransport::new(Arc::new(EngineWorker::new(|| Nothing))));
        let connection = Arc::new(Connection::new(transport));
        let bus = CommandBus::new();

        let mut bindings = StoreBindings::attach(&bus, connection, Arc::new(NoopSink));
        assert!(bindings.is_attached());
        for command in StoreCommand::ALL {
            assert_eq!(bus.listener_count(command.event_name()), 1);
        }

        bindings.detach();
        bindings.detach();
        assert!(!bindings.is_attached());
        for command in StoreCommand::ALL {
            assert_eq!(bus.listener_count(command.event_name()), 0);
        }
    }
}
