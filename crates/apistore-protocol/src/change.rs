//! Change records and the names they travel under.
//!
//! A change record describes a create, update or delete on one object of the
//! API document. On the wire it is wrapped in a [`ChangeNotification`] whose
//! `event` names the domain type and lifecycle phase. Locally the relay
//! re-dispatches it on the command bus under [`change_event_name`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of object a change record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainType {
    Document,
    Server,
    EndPoint,
    Operation,
    Parameter,
    Payload,
    Request,
    Response,
    Example,
    Documentation,
    CustomDomainProperty,
    Shape,
}

impl DomainType {
    pub const ALL: [DomainType; 12] = [
        DomainType::Document,
        DomainType::Server,
        DomainType::EndPoint,
        DomainType::Operation,
        DomainType::Parameter,
        DomainType::Payload,
        DomainType::Request,
        DomainType::Response,
        DomainType::Example,
        DomainType::Documentation,
        DomainType::CustomDomainProperty,
        DomainType::Shape,
    ];

    /// Name used in `domainType` and in push event names.
    pub fn wire_name(&self) -> &'static str {
        match self {
            DomainType::Document => "Document",
            DomainType::Server => "Server",
            DomainType::EndPoint => "EndPoint",
            DomainType::Operation => "Operation",
            DomainType::Parameter => "Parameter",
            DomainType::Payload => "Payload",
            DomainType::Request => "Request",
            DomainType::Response => "Response",
            DomainType::Example => "Example",
            DomainType::Documentation => "Documentation",
            DomainType::CustomDomainProperty => "CustomDomainProperty",
            DomainType::Shape => "Shape",
        }
    }

    /// Lower-case label used in bus event names.
    pub fn label(&self) -> &'static str {
        match self {
            DomainType::Document => "api",
            DomainType::Server => "server",
            DomainType::EndPoint => "endpoint",
            DomainType::Operation => "operation",
            DomainType::Parameter => "parameter",
            DomainType::Payload => "payload",
            DomainType::Request => "request",
            DomainType::Response => "response",
            DomainType::Example => "example",
            DomainType::Documentation => "documentation",
            DomainType::CustomDomainProperty => "custom property",
            DomainType::Shape => "shape",
        }
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Lifecycle phase of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangePhase {
    Created,
    Updated,
    Deleted,
}

impl ChangePhase {
    pub const ALL: [ChangePhase; 3] = [
        ChangePhase::Created,
        ChangePhase::Updated,
        ChangePhase::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangePhase::Created => "created",
            ChangePhase::Updated => "updated",
            ChangePhase::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A create/update/delete on a remote domain object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Identifier of the affected object.
    pub graph_id: String,
    /// Kind of the affected object.
    pub domain_type: DomainType,
    /// The object after the change (create/update only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Value>,
    /// Name of the changed property (update only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    /// Owner of the object, for child objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_parent: Option<String>,
}

impl ChangeRecord {
    /// Record for a newly created object.
    pub fn created(graph_id: impl Into<String>, domain_type: DomainType, item: Value) -> Self {
        Self {
            graph_id: graph_id.into(),
            domain_type,
            item: Some(item),
            property: None,
            domain_parent: None,
        }
    }

    /// Record for an updated property.
    pub fn updated(
        graph_id: impl Into<String>,
        domain_type: DomainType,
        property: impl Into<String>,
        item: Value,
    ) -> Self {
        Self {
            graph_id: graph_id.into(),
            domain_type,
            item: Some(item),
            property: Some(property.into()),
            domain_parent: None,
        }
    }

    /// Record for a removed object.
    pub fn deleted(graph_id: impl Into<String>, domain_type: DomainType) -> Self {
        Self {
            graph_id: graph_id.into(),
            domain_type,
            item: None,
            property: None,
            domain_parent: None,
        }
    }

    /// Attach the owning object's id.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.domain_parent = Some(parent.into());
        self
    }

    /// Phase implied by the fields present: a property means updated, an
    /// item alone means created, neither means deleted.
    pub fn inferred_phase(&self) -> ChangePhase {
        match (&self.property, &self.item) {
            (Some(_), _) => ChangePhase::Updated,
            (None, Some(_)) => ChangePhase::Created,
            (None, None) => ChangePhase::Deleted,
        }
    }
}

/// Wire wrapper for a change record on the notification path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotification {
    /// Push event name, see [`push_event_name`].
    pub event: String,
    /// The change itself.
    pub data: ChangeRecord,
}

impl ChangeNotification {
    pub fn new(domain_type: DomainType, phase: ChangePhase, data: ChangeRecord) -> Self {
        Self {
            event: push_event_name(domain_type, phase),
            data,
        }
    }

    /// Wrap a bare record, naming it after its domain type and inferred phase.
    pub fn from_record(data: ChangeRecord) -> Self {
        Self::new(data.domain_type, data.inferred_phase(), data)
    }

    /// Domain type and phase encoded in the event name, if it is a recognised one.
    pub fn kind(&self) -> Option<(DomainType, ChangePhase)> {
        parse_push_event_name(&self.event)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Push channel event name for a domain type and phase.
///
/// Custom domain properties use the `property-*` family.
pub fn push_event_name(domain_type: DomainType, phase: ChangePhase) -> String {
    match domain_type {
        DomainType::CustomDomainProperty => {
            format!("{}#property-{}", domain_type.wire_name(), phase.as_str())
        }
        _ => format!("{}#{}", domain_type.wire_name(), phase.as_str()),
    }
}

/// Inverse of [`push_event_name`]. Unknown names yield `None`.
pub fn parse_push_event_name(name: &str) -> Option<(DomainType, ChangePhase)> {
    DomainType::ALL.iter().find_map(|domain_type| {
        ChangePhase::ALL
            .iter()
            .find(|phase| push_event_name(*domain_type, **phase) == name)
            .map(|phase| (*domain_type, *phase))
    })
}

/// Every event name the push channel may carry.
pub fn recognized_push_events() -> Vec<String> {
    DomainType::ALL
        .iter()
        .flat_map(|domain_type| {
            ChangePhase::ALL
                .iter()
                .map(move |phase| push_event_name(*domain_type, *phase))
        })
        .collect()
}

/// Command bus name a change is re-dispatched under, e.g. `store endpoint created`.
pub fn change_event_name(domain_type: DomainType, phase: ChangePhase) -> String {
    format!("store {} {}", domain_type.label(), phase.as_str())
}

/// Every change event name on the command bus.
pub fn change_event_names() -> Vec<String> {
    DomainType::ALL
        .iter()
        .flat_map(|domain_type| {
            ChangePhase::ALL
                .iter()
                .map(move |phase| change_event_name(*domain_type, *phase))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_record_uses_camel_case() {
        let record = ChangeRecord::deleted("op-1", DomainType::Operation).with_parent("ep-1");
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.contains("\"graphId\":\"op-1\""));
        assert!(json.contains("\"domainType\":\"Operation\""));
        assert!(json.contains("\"domainParent\":\"ep-1\""));
        assert!(!json.contains("\"item\""));
    }

    #[test]
    fn test_record_from_wire() {
        let record: ChangeRecord = serde_json::from_value(json!({
            "graphId": "s1",
            "domainType": "Server",
            "item": {"url": "https://x"},
            "property": "url"
        }))
        .unwrap();

        assert_eq!(record.domain_type, DomainType::Server);
        assert_eq!(record.property.as_deref(), Some("url"));
        assert!(record.domain_parent.is_none());
    }

    #[test]
    fn test_unknown_domain_type_rejected() {
        let result: Result<ChangeRecord, _> =
            serde_json::from_value(json!({"graphId": "x", "domainType": "Spaceship"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_push_event_names() {
        assert_eq!(
            push_event_name(DomainType::EndPoint, ChangePhase::Created),
            "EndPoint#created"
        );
        assert_eq!(
            push_event_name(DomainType::CustomDomainProperty, ChangePhase::Deleted),
            "CustomDomainProperty#property-deleted"
        );
    }

    #[test]
    fn test_push_event_name_parse_roundtrip() {
        for name in recognized_push_events() {
            let (domain_type, phase) = parse_push_event_name(&name).unwrap();
            assert_eq!(push_event_name(domain_type, phase), name);
        }
        assert!(parse_push_event_name("EndPoint#exploded").is_none());
        assert!(parse_push_event_name("CustomDomainProperty#created").is_none());
    }

    #[test]
    fn test_recognized_push_events_unique() {
        let names = recognized_push_events();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), DomainType::ALL.len() * ChangePhase::ALL.len());
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_change_event_name() {
        assert_eq!(
            change_event_name(DomainType::EndPoint, ChangePhase::Created),
            "store endpoint created"
        );
        assert_eq!(
            change_event_name(DomainType::CustomDomainProperty, ChangePhase::Updated),
            "store custom property updated"
        );
    }

    #[test]
    fn test_notification_kind() {
        let notification = ChangeNotification::new(
            DomainType::Server,
            ChangePhase::Updated,
            ChangeRecord::updated("s1", DomainType::Server, "url", json!({"url": "y"})),
        );
        assert_eq!(notification.event, "Server#updated");
        assert_eq!(
            notification.kind(),
            Some((DomainType::Server, ChangePhase::Updated))
        );
    }
}
