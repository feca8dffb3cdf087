//! Typed arguments for the store facade.
//!
//! The engine owns the document schema; these types only shape what the
//! facade sends. Property enums name the fields an update may touch.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Initial values for a new web API document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiInit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
}

/// Initial values for an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndPointInit {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EndPointInit {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            description: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Initial values for an operation under an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationInit {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OperationInit {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            name: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationInit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomDomainPropertyInit {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CustomDomainPropertyInit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            description: None,
        }
    }
}

/// Updatable fields of the web API document.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiProperty {
    Name(String),
    Version(Option<String>),
    Description(Option<String>),
    Schemes(Vec<String>),
    Accepts(Vec<String>),
    ContentType(Vec<String>),
}

impl ApiProperty {
    /// Wire property name and value.
    pub fn into_pair(self) -> (&'static str, Value) {
        match self {
            ApiProperty::Name(v) => ("name", json!(v)),
            ApiProperty::Version(v) => ("version", json!(v)),
            ApiProperty::Description(v) => ("description", json!(v)),
            ApiProperty::Schemes(v) => ("schemes", json!(v)),
            ApiProperty::Accepts(v) => ("accepts", json!(v)),
            ApiProperty::ContentType(v) => ("contentType", json!(v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerProperty {
    Url(String),
    Description(Option<String>),
}

impl ServerProperty {
    pub fn into_pair(self) -> (&'static str, Value) {
        match self {
            ServerProperty::Url(v) => ("url", json!(v)),
            ServerProperty::Description(v) => ("description", json!(v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EndPointProperty {
    Path(String),
    Name(Option<String>),
    Description(Option<String>),
    Summary(Option<String>),
}

impl EndPointProperty {
    pub fn into_pair(self) -> (&'static str, Value) {
        match self {
            EndPointProperty::Path(v) => ("path", json!(v)),
            EndPointProperty::Name(v) => ("name", json!(v)),
            EndPointProperty::Description(v) => ("description", json!(v)),
            EndPointProperty::Summary(v) => ("summary", json!(v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationProperty {
    Method(String),
    Name(Option<String>),
    Description(Option<String>),
    Summary(Option<String>),
    Deprecated(bool),
}

impl OperationProperty {
    pub fn into_pair(self) -> (&'static str, Value) {
        match self {
            OperationProperty::Method(v) => ("method", json!(v)),
            OperationProperty::Name(v) => ("name", json!(v)),
            OperationProperty::Description(v) => ("description", json!(v)),
            OperationProperty::Summary(v) => ("summary", json!(v)),
            OperationProperty::Deprecated(v) => ("deprecated", json!(v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentationProperty {
    Title(String),
    Description(Option<String>),
    Url(Option<String>),
}

impl DocumentationProperty {
    pub fn into_pair(self) -> (&'static str, Value) {
        match self {
            DocumentationProperty::Title(v) => ("title", json!(v)),
            DocumentationProperty::Description(v) => ("description", json!(v)),
            DocumentationProperty::Url(v) => ("url", json!(v)),
        }
    }
}

/// Updatable fields of a custom domain property.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomPropertyField {
    Name(String),
    DisplayName(Option<String>),
    Description(Option<String>),
}

impl CustomPropertyField {
    pub fn into_pair(self) -> (&'static str, Value) {
        match self {
            CustomPropertyField::Name(v) => ("name", json!(v)),
            CustomPropertyField::DisplayName(v) => ("displayName", json!(v)),
            CustomPropertyField::Description(v) => ("description", json!(v)),
        }
    }
}
