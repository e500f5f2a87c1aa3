use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{DefinitionError, LookupError};
use crate::parameter::ParameterSet;
use crate::path::PathTemplate;

/// A response status: an explicit code or the `default` catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Code(u16),
    Default,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Code(code) => write!(f, "{code}"),
            StatusCode::Default => f.write_str("default"),
        }
    }
}

impl FromStr for StatusCode {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "default" {
            return Ok(StatusCode::Default);
        }
        s.parse().map(StatusCode::Code)
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode::Code(code)
    }
}

impl Serialize for StatusCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatusCode::Code(code) => serializer.serialize_u16(*code),
            StatusCode::Default => serializer.serialize_str("default"),
        }
    }
}

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StatusVisitor;

        impl Visitor<'_> for StatusVisitor {
            type Value = StatusCode;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an HTTP status code or \"default\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<StatusCode, E> {
                u16::try_from(v)
                    .map(StatusCode::Code)
                    .map_err(|_| E::custom(format!("status code {v} out of range")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<StatusCode, E> {
                v.parse()
                    .map_err(|_| E::custom(format!("invalid status code '{v}'")))
            }
        }

        deserializer.deserialize_any(StatusVisitor)
    }
}

/// Shared view over request and response definitions.
pub trait MessageDefinition {
    /// Accepted `Content-Type` values, matched verbatim.
    fn content_types(&self) -> &[String];

    fn body_schema(&self) -> Option<Value>;

    fn header_schema(&self) -> Option<Value>;

    fn has_body_schema(&self) -> bool {
        self.body_schema().is_some()
    }

    fn has_header_schema(&self) -> bool {
        self.header_schema().is_some()
    }
}

/// One declared response of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDefinition {
    pub status_code: StatusCode,
    pub content_types: Vec<String>,
    /// Only header and body parameters are meaningful here.
    pub parameters: ParameterSet,
}

impl ResponseDefinition {
    pub fn new(
        status_code: StatusCode,
        content_types: Vec<String>,
        parameters: ParameterSet,
    ) -> Self {
        Self {
            status_code,
            content_types,
            parameters,
        }
    }
}

impl MessageDefinition for ResponseDefinition {
    fn content_types(&self) -> &[String] {
        &self.content_types
    }

    fn body_schema(&self) -> Option<Value> {
        self.parameters.body_schema()
    }

    fn header_schema(&self) -> Option<Value> {
        self.parameters.header_schema()
    }
}

/// One compiled operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDefinition {
    method: String,
    operation_id: String,
    path_template: PathTemplate,
    parameters: ParameterSet,
    content_types: Vec<String>,
    responses: Vec<ResponseDefinition>,
}

impl RequestDefinition {
    pub fn new(
        method: &str,
        operation_id: impl Into<String>,
        path_template: &str,
        parameters: ParameterSet,
        content_types: Vec<String>,
        responses: Vec<ResponseDefinition>,
    ) -> Result<Self, DefinitionError> {
        Ok(Self {
            method: method.to_ascii_uppercase(),
            operation_id: operation_id.into(),
            path_template: PathTemplate::parse(path_template)?,
            parameters,
            content_types,
            responses,
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn path_template(&self) -> &PathTemplate {
        &self.path_template
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn responses(&self) -> &[ResponseDefinition] {
        &self.responses
    }

    pub fn path_schema(&self) -> Option<Value> {
        self.parameters.path_schema()
    }

    pub fn query_schema(&self) -> Option<Value> {
        self.parameters.query_schema()
    }

    /// Response definition for `status`, falling back to `default`.
    pub fn response_definition(
        &self,
        status: impl Into<StatusCode>,
    ) -> Result<&ResponseDefinition, LookupError> {
        let status = status.into();
        self.responses
            .iter()
            .find(|r| r.status_code == status)
            .or_else(|| {
                self.responses
                    .iter()
                    .find(|r| r.status_code == StatusCode::Default)
            })
            .ok_or_else(|| LookupError::UnknownResponse {
                method: self.method.clone(),
                path_template: self.path_template.to_string(),
                status,
            })
    }
}

impl MessageDefinition for RequestDefinition {
    fn content_types(&self) -> &[String] {
        &self.content_types
    }

    fn body_schema(&self) -> Option<Value> {
        self.parameters.body_schema()
    }

    fn header_schema(&self) -> Option<Value> {
        self.parameters.header_schema()
    }
}

/// All operations of a schema keyed by `operationId`, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RequestDefinition>", into = "Vec<RequestDefinition>")]
pub struct RequestDefinitions {
    definitions: IndexMap<String, RequestDefinition>,
}

impl RequestDefinitions {
    pub fn new(
        definitions: impl IntoIterator<Item = RequestDefinition>,
    ) -> Result<Self, DefinitionError> {
        let mut map = IndexMap::new();
        for definition in definitions {
            let id = definition.operation_id.clone();
            if map.insert(id.clone(), definition).is_some() {
                return Err(DefinitionError::DuplicateOperation(id));
            }
        }
        Ok(Self { definitions: map })
    }

    pub fn get(&self, operation_id: &str) -> Result<&RequestDefinition, LookupError> {
        self.definitions
            .get(operation_id)
            .ok_or_else(|| LookupError::UnknownOperation(operation_id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequestDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl<'a> IntoIterator for &'a RequestDefinitions {
    type Item = &'a RequestDefinition;
    type IntoIter = indexmap::map::Values<'a, String, RequestDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.values()
    }
}

impl TryFrom<Vec<RequestDefinition>> for RequestDefinitions {
    type Error = DefinitionError;

    fn try_from(definitions: Vec<RequestDefinition>) -> Result<Self, Self::Error> {
        Self::new(definitions)
    }
}

impl From<RequestDefinitions> for Vec<RequestDefinition> {
    fn from(definitions: RequestDefinitions) -> Self {
        definitions.definitions.into_values().collect()
    }
}
