//! Typed store facade.
//!
//! Each method dispatches one store command on the bus and decodes the
//! result. Nothing here talks to a transport directly; whatever is bound to
//! the command names answers.

use crate::bus::{CommandBus, Dispatch};
use crate::error::{BridgeError, BridgeResult};
use crate::model::{
    ApiInit, ApiProperty, CustomDomainPropertyInit, CustomPropertyField, DocumentationInit,
    DocumentationProperty, EndPointInit, EndPointProperty, OperationInit, OperationProperty,
    ServerProperty,
};
use apistore_protocol::StoreCommand;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

/// Typed access to the API document.
#[derive(Clone)]
pub struct ApiStore {
    bus: CommandBus,
}

impl ApiStore {
    pub fn new(bus: CommandBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &CommandBus {
        &self.bus
    }

    /// Dispatch `command` and return the raw result.
    pub async fn request(&self, command: StoreCommand, args: Vec<Value>) -> BridgeResult<Value> {
        match self.bus.dispatch(command.event_name(), args).await? {
            Dispatch::Handled(value) => Ok(value),
            Dispatch::NoHandler => Err(BridgeError::NoHandler(command.event_name().to_string())),
        }
    }

    async fn request_as<T: DeserializeOwned>(
        &self,
        command: StoreCommand,
        args: Vec<Value>,
    ) -> BridgeResult<T> {
        let value = self.request(command, args).await?;
        serde_json::from_value(value)
            .map_err(|e| BridgeError::InvalidResult(format!("{}: {}", command, e)))
    }

    async fn request_id(&self, command: StoreCommand, args: Vec<Value>) -> BridgeResult<String> {
        let value = self.request(command, args).await?;
        match &value {
            Value::String(id) => Ok(id.clone()),
            Value::Object(map) => map
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| BridgeError::InvalidResult(format!("{}: missing id", command))),
            other => Err(BridgeError::InvalidResult(format!(
                "{}: expected an id, got {}",
                command, other
            ))),
        }
    }

    // Document

    /// Create an empty web API. Returns its id.
    pub async fn create_web_api(&self, init: &ApiInit) -> BridgeResult<String> {
        self.request_id(StoreCommand::CreateWebApi, vec![to_arg(init)?])
            .await
    }

    /// Load a serialized graph model into the store.
    pub async fn load_graph(&self, model: &str) -> BridgeResult<()> {
        self.request(StoreCommand::LoadGraph, vec![json!(model)])
            .await
            .map(drop)
    }

    /// Parse an API definition and load it. `vendor` names the source format.
    pub async fn load_api(&self, contents: &str, vendor: &str, main_file: Option<&str>) -> BridgeResult<()> {
        self.request(
            StoreCommand::LoadApi,
            vec![json!(contents), json!(vendor), json!(main_file)],
        )
        .await
        .map(drop)
    }

    pub async fn generate_raml(&self) -> BridgeResult<String> {
        self.request_as(StoreCommand::GenerateRaml, vec![]).await
    }

    pub async fn generate_graph(&self) -> BridgeResult<String> {
        self.request_as(StoreCommand::GenerateGraph, vec![]).await
    }

    pub async fn get_api(&self) -> BridgeResult<Value> {
        self.request(StoreCommand::GetApi, vec![]).await
    }

    pub async fn update_api_property(&self, property: ApiProperty) -> BridgeResult<Value> {
        let (name, value) = property.into_pair();
        self.request(StoreCommand::UpdateApiProperty, vec![json!(name), value])
            .await
    }

    // Servers

    /// Add a server. Returns its id.
    pub async fn add_server(&self, url: &str) -> BridgeResult<String> {
        self.request_id(StoreCommand::AddServer, vec![json!(url)]).await
    }

    pub async fn list_servers(&self) -> BridgeResult<Vec<Value>> {
        self.request_as(StoreCommand::ListServers, vec![]).await
    }

    pub async fn get_server(&self, id: &str) -> BridgeResult<Value> {
        self.request(StoreCommand::GetServer, vec![json!(id)]).await
    }

    pub async fn update_server_property(
        &self,
        id: &str,
        property: ServerProperty,
    ) -> BridgeResult<Value> {
        let (name, value) = property.into_pair();
        self.request(
            StoreCommand::UpdateServerProperty,
            vec![json!(id), json!(name), value],
        )
        .await
    }

    pub async fn delete_server(&self, id: &str) -> BridgeResult<()> {
        self.request(StoreCommand::DeleteServer, vec![json!(id)])
            .await
            .map(drop)
    }

    // Endpoints

    /// Add an endpoint. Returns its id.
    pub async fn add_endpoint(&self, init: &EndPointInit) -> BridgeResult<String> {
        self.request_id(StoreCommand::AddEndpoint, vec![to_arg(init)?])
            .await
    }

    pub async fn list_endpoints(&self) -> BridgeResult<Vec<Value>> {
        self.request_as(StoreCommand::ListEndpoints, vec![]).await
    }

    pub async fn get_endpoint(&self, id: &str) -> BridgeResult<Value> {
        self.request(StoreCommand::GetEndpoint, vec![json!(id)]).await
    }

    pub async fn update_endpoint_property(
        &self,
        id: &str,
        property: EndPointProperty,
    ) -> BridgeResult<Value> {
        let (name, value) = property.into_pair();
        self.request(
            StoreCommand::UpdateEndpointProperty,
            vec![json!(id), json!(name), value],
        )
        .await
    }

    pub async fn delete_endpoint(&self, id: &str) -> BridgeResult<()> {
        self.request(StoreCommand::DeleteEndpoint, vec![json!(id)])
            .await
            .map(drop)
    }

    // Operations

    /// Add an operation to endpoint `endpoint_id`. Returns its id.
    pub async fn add_operation(
        &self,
        endpoint_id: &str,
        init: &OperationInit,
    ) -> BridgeResult<String> {
        self.request_id(
            StoreCommand::AddOperation,
            vec![json!(endpoint_id), to_arg(init)?],
        )
        .await
    }

    pub async fn get_operation(&self, id: &str) -> BridgeResult<Value> {
        self.request(StoreCommand::GetOperation, vec![json!(id)]).await
    }

    pub async fn update_operation_property(
        &self,
        id: &str,
        property: OperationProperty,
    ) -> BridgeResult<Value> {
        let (name, value) = property.into_pair();
        self.request(
            StoreCommand::UpdateOperationProperty,
            vec![json!(id), json!(name), value],
        )
        .await
    }

    pub async fn delete_operation(&self, id: &str, endpoint_id: &str) -> BridgeResult<()> {
        self.request(
            StoreCommand::DeleteOperation,
            vec![json!(id), json!(endpoint_id)],
        )
        .await
        .map(drop)
    }

    // Documentation

    pub async fn add_documentation(&self, init: &DocumentationInit) -> BridgeResult<String> {
        self.request_id(StoreCommand::AddDocumentation, vec![to_arg(init)?])
            .await
    }

    pub async fn list_documentations(&self) -> BridgeResult<Vec<Value>> {
        self.request_as(StoreCommand::ListDocumentations, vec![])
            .await
    }

    pub async fn update_documentation_property(
        &self,
        id: &str,
        property: DocumentationProperty,
    ) -> BridgeResult<Value> {
        let (name, value) = property.into_pair();
        self.request(
            StoreCommand::UpdateDocumentationProperty,
            vec![json!(id), json!(name), value],
        )
        .await
    }

    pub async fn delete_documentation(&self, id: &str) -> BridgeResult<()> {
        self.request(StoreCommand::DeleteDocumentation, vec![json!(id)])
            .await
            .map(drop)
    }

    // Custom domain properties

    pub async fn add_custom_domain_property(
        &self,
        init: &CustomDomainPropertyInit,
    ) -> BridgeResult<String> {
        self.request_id(StoreCommand::AddCustomDomainProperty, vec![to_arg(init)?])
            .await
    }

    pub async fn update_custom_domain_property(
        &self,
        id: &str,
        field: CustomPropertyField,
    ) -> BridgeResult<Value> {
        let (name, value) = field.into_pair();
        self.request(
            StoreCommand::UpdateCustomDomainProperty,
            vec![json!(id), json!(name), value],
        )
        .await
    }

    pub async fn delete_custom_domain_property(&self, id: &str) -> BridgeResult<()> {
        self.request(StoreCommand::DeleteCustomDomainProperty, vec![json!(id)])
            .await
            .map(drop)
    }
}

fn to_arg<T: Serialize>(value: &T) -> BridgeResult<Value> {
    Ok(serde_json::to_value(value)?)
}
