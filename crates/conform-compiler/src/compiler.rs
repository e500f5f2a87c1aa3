//! Swagger 2.0 document compilation.

use serde_json::{Map, Value};

use conform_schema::{
    Location, Parameter, ParameterSet, RequestDefinition, RequestDefinitions, ResponseDefinition,
    Schema, StatusCode,
};

use crate::error::CompileError;
use crate::loader::{document_url, DocumentLoader, UriLoader};
use crate::resolver::Resolver;

/// HTTP methods recognized as operations in a Swagger path item.
const HTTP_METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch"];

/// Parameter keys describing where the value lives rather than its shape.
const ENVELOPE_KEYS: &[&str] = &["in", "name", "required", "schema"];

/// Anything able to produce a [`Schema`] from a document location.
pub trait SchemaFactory {
    fn create_schema(&self, location: &str) -> Result<Schema, CompileError>;
}

impl<F: SchemaFactory + ?Sized> SchemaFactory for &F {
    fn create_schema(&self, location: &str) -> Result<Schema, CompileError> {
        (**self).create_schema(location)
    }
}

/// Loads, resolves and compiles Swagger 2.0 documents.
#[derive(Debug, Clone, Default)]
pub struct SwaggerSchemaFactory<L = UriLoader> {
    loader: L,
}

impl SwaggerSchemaFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<L: DocumentLoader> SwaggerSchemaFactory<L> {
    pub fn with_loader(loader: L) -> Self {
        Self { loader }
    }
}

impl<L: DocumentLoader> SchemaFactory for SwaggerSchemaFactory<L> {
    fn create_schema(&self, location: &str) -> Result<Schema, CompileError> {
        let url = document_url(location)?;
        let mut resolver = Resolver::new(&self.loader);
        let document = resolver.resolve_document(&url)?;
        let schema = compile_document(&document)?;

        conform_telemetry::log_schema_compiled!(
            location = %url,
            operations = schema.request_definitions().len(),
            documents = resolver.document_count(),
            "schema compiled"
        );
        Ok(schema)
    }
}

/// Document-wide defaults every operation may inherit.
struct Defaults<'a> {
    base_path: &'a str,
    consumes: Vec<String>,
    produces: Vec<String>,
}

/// Compile an already resolved Swagger 2.0 document.
///
/// `$ref`s under `paths` must have been expanded beforehand.
pub fn compile_document(document: &Value) -> Result<Schema, CompileError> {
    let root = document
        .as_object()
        .ok_or_else(|| CompileError::InvalidDocument("document root must be an object".into()))?;

    let defaults = Defaults {
        base_path: root
            .get("basePath")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim_end_matches('/'),
        consumes: string_list(root.get("consumes")),
        produces: string_list(root.get("produces")),
    };

    let mut definitions = Vec::new();
    if let Some(paths) = root.get("paths") {
        let paths = paths
            .as_object()
            .ok_or_else(|| CompileError::InvalidDocument("'paths' must be an object".into()))?;

        for (template, item) in paths {
            let item = item.as_object().ok_or_else(|| {
                CompileError::InvalidDocument(format!(
                    "path item for '{template}' must be an object"
                ))
            })?;
            let shared = raw_parameters(item, template)?;

            for (method, operation) in item {
                if !HTTP_METHODS.contains(&method.as_str()) {
                    continue;
                }
                let operation = operation.as_object().ok_or_else(|| {
                    CompileError::InvalidDocument(format!(
                        "operation {} {template} must be an object",
                        method.to_uppercase()
                    ))
                })?;
                definitions.push(compile_operation(
                    method, template, operation, &shared, &defaults,
                )?);
            }
        }
    }

    let host = root
        .get("host")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Ok(Schema::new(
        RequestDefinitions::new(definitions)?,
        defaults.base_path,
        host,
        string_list(root.get("schemes")),
    ))
}

fn compile_operation(
    method: &str,
    template: &str,
    operation: &Map<String, Value>,
    shared: &[&Value],
    defaults: &Defaults<'_>,
) -> Result<RequestDefinition, CompileError> {
    let method = method.to_uppercase();

    let operation_id = operation
        .get("operationId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CompileError::MissingOperationId {
            method: method.clone(),
            path: template.to_string(),
        })?;

    // Operation-level parameters replace path-level ones of the same name.
    let own = raw_parameters(operation, template)?;
    let parameters = shared
        .iter()
        .chain(own.iter())
        .map(|raw| parse_parameter(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let parameters = ParameterSet::new(parameters)?;

    if parameters.has_location(Location::Body) && parameters.has_location(Location::FormData) {
        return Err(CompileError::AmbiguousBodyLocation {
            path: template.to_string(),
        });
    }

    let mut content_types = operation
        .get("consumes")
        .map(|v| string_list(Some(v)))
        .unwrap_or_else(|| defaults.consumes.clone());
    if content_types.is_empty() {
        match parameters.body_location() {
            Some(Location::Body) => content_types.push("application/json".to_string()),
            Some(Location::FormData) => {
                content_types.push("application/x-www-form-urlencoded".to_string())
            }
            _ => {}
        }
    }

    let produces = operation
        .get("produces")
        .map(|v| string_list(Some(v)))
        .unwrap_or_else(|| defaults.produces.clone());

    let raw_responses = operation
        .get("responses")
        .and_then(|v| v.as_object())
        .filter(|responses| !responses.is_empty())
        .ok_or_else(|| CompileError::MissingResponses {
            method: method.clone(),
            path: template.to_string(),
        })?;

    let mut responses = Vec::with_capacity(raw_responses.len());
    for (status, response) in raw_responses {
        let status_code: StatusCode = status.parse().map_err(|_| CompileError::InvalidStatusCode {
            method: method.clone(),
            path: template.to_string(),
            status: status.clone(),
        })?;
        responses.push(compile_response(status_code, response, &produces)?);
    }

    let path = format!("{}{}", defaults.base_path, template);
    tracing::debug!(
        operation_id,
        method = %method,
        path = %path,
        parameters = parameters.len(),
        responses = responses.len(),
        "compiled operation"
    );

    Ok(RequestDefinition::new(
        &method,
        operation_id,
        &path,
        parameters,
        content_types,
        responses,
    )?)
}

/// A response `schema` becomes a required body parameter and each declared
/// header a required header parameter.
fn compile_response(
    status_code: StatusCode,
    response: &Value,
    produces: &[String],
) -> Result<ResponseDefinition, CompileError> {
    let mut parameters = Vec::new();

    if let Some(schema) = response.get("schema") {
        parameters.push(Parameter::new(
            Location::Body,
            "body",
            true,
            Some(schema.clone()),
        ));
    }

    if let Some(headers) = response.get("headers").and_then(|v| v.as_object()) {
        for (name, header) in headers {
            parameters.push(Parameter::new(
                Location::Header,
                name.as_str(),
                true,
                Some(header.clone()),
            ));
        }
    }

    Ok(ResponseDefinition::new(
        status_code,
        produces.to_vec(),
        ParameterSet::new(parameters)?,
    ))
}

/// Convert one raw Swagger parameter into a [`Parameter`].
///
/// Keys outside of the envelope are folded into the schema as JSON Schema
/// keywords, overriding keys of the same name.
fn parse_parameter(raw: &Value) -> Result<Parameter, CompileError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| CompileError::InvalidDocument("parameter must be an object".into()))?;

    let name = obj
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CompileError::InvalidDocument("parameter without 'name'".into()))?;

    let location: Location = obj
        .get("in")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            CompileError::InvalidDocument(format!("parameter '{name}' without 'in'"))
        })?
        .parse()?;

    let required = obj
        .get("required")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let mut schema = match obj.get("schema") {
        Some(Value::Object(schema)) => schema.clone(),
        Some(_) => {
            return Err(CompileError::InvalidDocument(format!(
                "schema of parameter '{name}' must be an object"
            )))
        }
        None => Map::new(),
    };
    schema.extend(extra_keywords(obj));

    let is_file = |key: &str| schema.get(key).and_then(|v| v.as_str()) == Some("file");
    let schema = if is_file("format") || is_file("type") {
        None
    } else {
        Some(Value::Object(schema))
    };

    Ok(Parameter::new(location, name, required, schema))
}

fn extra_keywords(obj: &Map<String, Value>) -> impl Iterator<Item = (String, Value)> + '_ {
    obj.iter()
        .filter(|(key, _)| !ENVELOPE_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
}

fn raw_parameters<'a>(
    obj: &'a Map<String, Value>,
    template: &str,
) -> Result<Vec<&'a Value>, CompileError> {
    match obj.get("parameters") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.iter().collect()),
        Some(_) => Err(CompileError::InvalidDocument(format!(
            "parameters of '{template}' must be an array"
        ))),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}
