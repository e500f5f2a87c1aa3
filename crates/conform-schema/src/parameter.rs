use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::DefinitionError;

/// Where a parameter lives in an HTTP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Location {
    #[serde(rename = "path")]
    Path,
    #[serde(rename = "query")]
    Query,
    #[serde(rename = "header")]
    Header,
    #[serde(rename = "body")]
    Body,
    #[serde(rename = "formData")]
    FormData,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Path => "path",
            Location::Query => "query",
            Location::Header => "header",
            Location::Body => "body",
            Location::FormData => "formData",
        }
    }

    /// Body and formData both describe the message payload.
    pub fn carries_body(&self) -> bool {
        matches!(self, Location::Body | Location::FormData)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path" => Ok(Location::Path),
            "query" => Ok(Location::Query),
            "header" => Ok(Location::Header),
            "body" => Ok(Location::Body),
            "formData" => Ok(Location::FormData),
            other => Err(DefinitionError::UnsupportedLocation(other.to_string())),
        }
    }
}

/// One declared operation input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub location: Location,
    pub name: String,
    pub required: bool,
    /// JSON Schema node for the value. `None` means "not structurally validated"
    /// (file uploads).
    pub schema: Option<Value>,
}

impl Parameter {
    pub fn new(
        location: Location,
        name: impl Into<String>,
        required: bool,
        schema: Option<Value>,
    ) -> Self {
        Self {
            location,
            name: name.into(),
            required,
            schema,
        }
    }

    pub fn has_schema(&self) -> bool {
        self.schema.is_some()
    }
}

/// The parameters of one operation (or one response), keyed by name.
///
/// A parameter re-declared under the same name replaces the earlier one but
/// keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Parameter>", into = "Vec<Parameter>")]
pub struct ParameterSet {
    parameters: IndexMap<String, Parameter>,
}

impl ParameterSet {
    pub fn new(parameters: impl IntoIterator<Item = Parameter>) -> Result<Self, DefinitionError> {
        let mut set = Self::default();
        for parameter in parameters {
            set.insert(parameter)?;
        }
        Ok(set)
    }

    fn insert(&mut self, parameter: Parameter) -> Result<(), DefinitionError> {
        if parameter.location == Location::Body {
            if let Some(existing) = self
                .by_location(Location::Body)
                .find(|p| p.name != parameter.name)
            {
                return Err(DefinitionError::MultipleBodyParameters {
                    first: existing.name.clone(),
                    second: parameter.name,
                });
            }
        }
        self.parameters.insert(parameter.name.clone(), parameter);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn by_location(&self, location: Location) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .values()
            .filter(move |p| p.location == location)
    }

    pub fn has_location(&self, location: Location) -> bool {
        self.by_location(location).next().is_some()
    }

    /// The single `in: body` parameter, if any.
    pub fn body(&self) -> Option<&Parameter> {
        self.by_location(Location::Body).next()
    }

    /// Which payload location this set uses, if any.
    pub fn body_location(&self) -> Option<Location> {
        if self.has_location(Location::Body) {
            Some(Location::Body)
        } else if self.has_location(Location::FormData) {
            Some(Location::FormData)
        } else {
            None
        }
    }

    /// Schema for the message payload.
    ///
    /// The body parameter's own schema, or an object schema derived from the
    /// formData fields.
    pub fn body_schema(&self) -> Option<Value> {
        match self.body() {
            Some(body) => body.schema.clone(),
            None => self.schema_for(Location::FormData),
        }
    }

    pub fn path_schema(&self) -> Option<Value> {
        self.schema_for(Location::Path)
    }

    pub fn query_schema(&self) -> Option<Value> {
        self.schema_for(Location::Query)
    }

    /// Header names are case-insensitive, so every declared name is lower-cased.
    pub fn header_schema(&self) -> Option<Value> {
        self.derive_schema(Location::Header, |name| name.to_ascii_lowercase())
    }

    /// Object schema over every parameter declared at `location`.
    pub fn schema_for(&self, location: Location) -> Option<Value> {
        self.derive_schema(location, str::to_string)
    }

    fn derive_schema(&self, location: Location, key: impl Fn(&str) -> String) -> Option<Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for parameter in self.by_location(location) {
            let name = key(&parameter.name);
            if parameter.required {
                required.push(Value::String(name.clone()));
            }
            properties.insert(name, parameter.schema.clone().unwrap_or_else(|| json!({})));
        }

        if properties.is_empty() {
            return None;
        }

        let mut schema = Map::new();
        schema.insert("type".into(), Value::String("object".into()));
        // Draft 4 forbids an empty `required` array.
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }
        schema.insert("properties".into(), Value::Object(properties));
        Some(Value::Object(schema))
    }
}

impl TryFrom<Vec<Parameter>> for ParameterSet {
    type Error = DefinitionError;

    fn try_from(parameters: Vec<Parameter>) -> Result<Self, Self::Error> {
        Self::new(parameters)
    }
}

impl From<ParameterSet> for Vec<Parameter> {
    fn from(set: ParameterSet) -> Self {
        set.parameters.into_values().collect()
    }
}
