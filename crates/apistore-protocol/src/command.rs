//! The operation table.
//!
//! Every public store operation has a wire name (sent to the engine in
//! [`MessageEnvelope::operation`](crate::MessageEnvelope)) and a bus name
//! (the command bus event the binding layer listens on).

use crate::change::{change_event_names, ChangePhase, DomainType};
use std::fmt;

/// Store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCommand {
    // Document
    CreateWebApi,
    LoadGraph,
    LoadApi,
    GenerateRaml,
    GenerateGraph,
    GetApi,
    UpdateApiProperty,

    // Servers
    AddServer,
    ListServers,
    GetServer,
    UpdateServerProperty,
    DeleteServer,

    // Endpoints
    AddEndpoint,
    ListEndpoints,
    GetEndpoint,
    UpdateEndpointProperty,
    DeleteEndpoint,

    // Operations
    AddOperation,
    GetOperation,
    UpdateOperationProperty,
    DeleteOperation,

    // Documentation
    AddDocumentation,
    ListDocumentations,
    UpdateDocumentationProperty,
    DeleteDocumentation,

    // Custom domain properties
    AddCustomDomainProperty,
    UpdateCustomDomainProperty,
    DeleteCustomDomainProperty,
}

impl StoreCommand {
    pub const ALL: [StoreCommand; 28] = [
        StoreCommand::CreateWebApi,
        StoreCommand::LoadGraph,
        StoreCommand::LoadApi,
        StoreCommand::GenerateRaml,
        StoreCommand::GenerateGraph,
        StoreCommand::GetApi,
        StoreCommand::UpdateApiProperty,
        StoreCommand::AddServer,
        StoreCommand::ListServers,
        StoreCommand::GetServer,
        StoreCommand::UpdateServerProperty,
        StoreCommand::DeleteServer,
        StoreCommand::AddEndpoint,
        StoreCommand::ListEndpoints,
        StoreCommand::GetEndpoint,
        StoreCommand::UpdateEndpointProperty,
        StoreCommand::DeleteEndpoint,
        StoreCommand::AddOperation,
        StoreCommand::GetOperation,
        StoreCommand::UpdateOperationProperty,
        StoreCommand::DeleteOperation,
        StoreCommand::AddDocumentation,
        StoreCommand::ListDocumentations,
        StoreCommand::UpdateDocumentationProperty,
        StoreCommand::DeleteDocumentation,
        StoreCommand::AddCustomDomainProperty,
        StoreCommand::UpdateCustomDomainProperty,
        StoreCommand::DeleteCustomDomainProperty,
    ];

    /// Operation name understood by the engine.
    pub fn operation(&self) -> &'static str {
        match self {
            StoreCommand::CreateWebApi => "createWebApi",
            StoreCommand::LoadGraph => "loadGraph",
            StoreCommand::LoadApi => "loadApi",
            StoreCommand::GenerateRaml => "generateRaml",
            StoreCommand::GenerateGraph => "generateGraph",
            StoreCommand::GetApi => "getApi",
            StoreCommand::UpdateApiProperty => "updateApiProperty",
            StoreCommand::AddServer => "addServer",
            StoreCommand::ListServers => "listServers",
            StoreCommand::GetServer => "getServer",
            StoreCommand::UpdateServerProperty => "updateServerProperty",
            StoreCommand::DeleteServer => "deleteServer",
            StoreCommand::AddEndpoint => "addEndpoint",
            StoreCommand::ListEndpoints => "listEndpoints",
            StoreCommand::GetEndpoint => "getEndpoint",
            StoreCommand::UpdateEndpointProperty => "updateEndpointProperty",
            StoreCommand::DeleteEndpoint => "deleteEndpoint",
            StoreCommand::AddOperation => "addOperation",
            StoreCommand::GetOperation => "getOperation",
            StoreCommand::UpdateOperationProperty => "updateOperationProperty",
            StoreCommand::DeleteOperation => "deleteOperation",
            StoreCommand::AddDocumentation => "addDocumentation",
            StoreCommand::ListDocumentations => "listDocumentations",
            StoreCommand::UpdateDocumentationProperty => "updateDocumentationProperty",
            StoreCommand::DeleteDocumentation => "deleteDocumentation",
            StoreCommand::AddCustomDomainProperty => "addCustomDomainProperty",
            StoreCommand::UpdateCustomDomainProperty => "updateCustomDomainProperty",
            StoreCommand::DeleteCustomDomainProperty => "deleteCustomDomainProperty",
        }
    }

    /// Command bus event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            StoreCommand::CreateWebApi => "store api create",
            StoreCommand::LoadGraph => "store api load graph",
            StoreCommand::LoadApi => "store api load api",
            StoreCommand::GenerateRaml => "store api generate raml",
            StoreCommand::GenerateGraph => "store api generate graph",
            StoreCommand::GetApi => "store api get",
            StoreCommand::UpdateApiProperty => "store api update property",
            StoreCommand::AddServer => "store server add",
            StoreCommand::ListServers => "store server list",
            StoreCommand::GetServer => "store server get",
            StoreCommand::UpdateServerProperty => "store server update property",
            StoreCommand::DeleteServer => "store server delete",
            StoreCommand::AddEndpoint => "store endpoint add",
            StoreCommand::ListEndpoints => "store endpoint list",
            StoreCommand::GetEndpoint => "store endpoint get",
            StoreCommand::UpdateEndpointProperty => "store endpoint update property",
            StoreCommand::DeleteEndpoint => "store endpoint delete",
            StoreCommand::AddOperation => "store operation add",
            StoreCommand::GetOperation => "store operation get",
            StoreCommand::UpdateOperationProperty => "store operation update property",
            StoreCommand::DeleteOperation => "store operation delete",
            StoreCommand::AddDocumentation => "store documentation add",
            StoreCommand::ListDocumentations => "store documentation list",
            StoreCommand::UpdateDocumentationProperty => "store documentation update property",
            StoreCommand::DeleteDocumentation => "store documentation delete",
            StoreCommand::AddCustomDomainProperty => "store custom property add",
            StoreCommand::UpdateCustomDomainProperty => "store custom property update",
            StoreCommand::DeleteCustomDomainProperty => "store custom property delete",
        }
    }

    /// The change a successful call produces, if the command mutates the document.
    pub fn mutation(&self) -> Option<(DomainType, ChangePhase)> {
        match self {
            StoreCommand::CreateWebApi => Some((DomainType::Document, ChangePhase::Created)),
            StoreCommand::UpdateApiProperty => Some((DomainType::Document, ChangePhase::Updated)),
            StoreCommand::AddServer => Some((DomainType::Server, ChangePhase::Created)),
            StoreCommand::UpdateServerProperty => Some((DomainType::Server, ChangePhase::Updated)),
            StoreCommand::DeleteServer => Some((DomainType::Server, ChangePhase::Deleted)),
            StoreCommand::AddEndpoint => Some((DomainType::EndPoint, ChangePhase::Created)),
            StoreCommand::UpdateEndpointProperty => {
                Some((DomainType::EndPoint, ChangePhase::Updated))
            }
            StoreCommand::DeleteEndpoint => Some((DomainType::EndPoint, ChangePhase::Deleted)),
            StoreCommand::AddOperation => Some((DomainType::Operation, ChangePhase::Created)),
            StoreCommand::UpdateOperationProperty => {
                Some((DomainType::Operation, ChangePhase::Updated))
            }
            StoreCommand::DeleteOperation => Some((DomainType::Operation, ChangePhase::Deleted)),
            StoreCommand::AddDocumentation => {
                Some((DomainType::Documentation, ChangePhase::Created))
            }
            StoreCommand::UpdateDocumentationProperty => {
                Some((DomainType::Documentation, ChangePhase::Updated))
            }
            StoreCommand::DeleteDocumentation => {
                Some((DomainType::Documentation, ChangePhase::Deleted))
            }
            StoreCommand::AddCustomDomainProperty => {
                Some((DomainType::CustomDomainProperty, ChangePhase::Created))
            }
            StoreCommand::UpdateCustomDomainProperty => {
                Some((DomainType::CustomDomainProperty, ChangePhase::Updated))
            }
            StoreCommand::DeleteCustomDomainProperty => {
                Some((DomainType::CustomDomainProperty, ChangePhase::Deleted))
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

    /// Look a command up by its wire operation name.
    pub fn from_operation(operation: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|command| command.operation() == operation)
    }

    /// Look a command up by its bus event name.
    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|command| command.event_name() == name)
    }
}

impl fmt::Display for StoreCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation())
    }
}

/// Every name the command bus carries: one per operation plus one per change kind.
pub fn bus_event_names() -> Vec<String> {
    StoreCommand::ALL
        .iter()
        .map(|command| command.event_name().to_string())
        .chain(change_event_names())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_bus_event_names_globally_unique() {
        let names = bus_event_names();
        let mut seen = HashSet::new();
        for name in &names {
            assert!(seen.insert(name.as_str()), "duplicate bus event name: {}", name);
        }
        assert_eq!(
            names.len(),
            StoreCommand::ALL.len() + DomainType::ALL.len() * ChangePhase::ALL.len()
        );
    }

    #[test]
    fn test_operation_names_unique() {
        let names: HashSet<_> = StoreCommand::ALL.iter().map(|c| c.operation()).collect();
        assert_eq!(names.len(), StoreCommand::ALL.len());
    }

    #[test]
    fn test_lookup_roundtrip() {
        for command in StoreCommand::ALL {
            assert_eq!(StoreCommand::from_operation(command.operation()), Some(command));
            assert_eq!(StoreCommand::from_event_name(command.event_name()), Some(command));
        }
        assert_eq!(StoreCommand::from_operation("launchRocket"), None);
    }

    #[test]
    fn test_mutations() {
        assert_eq!(
            StoreCommand::AddEndpoint.mutation(),
            Some((DomainType::EndPoint, ChangePhase::Created))
        );
        assert_eq!(
            StoreCommand::DeleteCustomDomainProperty.mutation(),
            Some((DomainType::CustomDomainProperty, ChangePhase::Deleted))
        );
        assert_eq!(StoreCommand::ListEndpoints.mutation(), None);
        assert_eq!(StoreCommand::GenerateRaml.mutation(), None);
    }
}
