//! Validation of whole HTTP messages.

use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method};
use serde_json::{Map, Value};

use conform_schema::{Location, MessageDefinition, RequestDefinition, StatusCode};

use crate::checker::{Checker, JsonSchemaChecker, ValidatorOptions};
use crate::decoder::{extract_format, BodyDecoder, DecodeError, DefaultDecoder};
use crate::error::ValidationError;
use crate::normalizer::{normalize, parse_query};
use crate::violation::{ConstraintViolation, ConstraintViolations};

/// Validates requests and responses against their [`RequestDefinition`].
///
/// Holds no per-message state; one instance may serve many threads.
#[derive(Debug, Default)]
pub struct MessageValidator<D = DefaultDecoder, C = JsonSchemaChecker> {
    decoder: D,
    checker: C,
}

impl<D: BodyDecoder> MessageValidator<D, JsonSchemaChecker> {
    pub fn new(decoder: D) -> Self {
        Self::with_options(decoder, ValidatorOptions::default())
    }

    pub fn with_options(decoder: D, options: ValidatorOptions) -> Self {
        Self::with_checker(decoder, JsonSchemaChecker::new(options))
    }
}

impl<D: BodyDecoder, C: Checker> MessageValidator<D, C> {
    pub fn with_checker(decoder: D, checker: C) -> Self {
        Self { decoder, checker }
    }

    /// Validate a request against the operation it was resolved to.
    ///
    /// Violations are returned; `Err` is reserved for definitions that
    /// can't be checked at all.
    pub fn validate_request<B: AsRef<[u8]>>(
        &self,
        request: &http::Request<B>,
        definition: &RequestDefinition,
    ) -> Result<ConstraintViolations, ValidationError> {
        let mut violations = ConstraintViolations::new();
        let headers = request.headers();

        let content_type_ok = self.check_content_type(definition, headers, &mut violations);
        self.check_headers(definition, headers, &mut violations)?;
        self.check_path(definition, request.uri().path(), &mut violations)?;
        self.check_query(definition, request.uri().query().unwrap_or(""), &mut violations)?;

        if content_type_ok && carries_body(request.method()) {
            self.check_body(
                definition,
                definition.parameters().body_location(),
                headers,
                request.body().as_ref(),
                &mut violations,
            )?;
        }

        if violations.has_violations() {
            conform_telemetry::log_validation_failure!(
                operation_id = definition.operation_id(),
                method = %request.method(),
                path = %request.uri().path(),
                violations = violations.len(),
                "request does not conform"
            );
        }
        Ok(violations)
    }

    /// Validate a response produced by the given operation.
    pub fn validate_response<B: AsRef<[u8]>>(
        &self,
        response: &http::Response<B>,
        definition: &RequestDefinition,
    ) -> Result<ConstraintViolations, ValidationError> {
        let status = StatusCode::Code(response.status().as_u16());
        let response_definition = definition.response_definition(status)?;

        let mut violations = ConstraintViolations::new();
        let headers = response.headers();

        let content_type_ok =
            self.check_content_type(response_definition, headers, &mut violations);
        self.check_headers(response_definition, headers, &mut violations)?;

        if content_type_ok {
            self.check_body(
                response_definition,
                response_definition.parameters.body_location(),
                headers,
                response.body().as_ref(),
                &mut violations,
            )?;
        }

        if violations.has_violations() {
            conform_telemetry::log_validation_failure!(
                operation_id = definition.operation_id(),
                status = %status,
                violations = violations.len(),
                "response does not conform"
            );
        }
        Ok(violations)
    }

    /// Returns whether the body may be checked.
    fn check_content_type(
        &self,
        definition: &impl MessageDefinition,
        headers: &HeaderMap,
        violations: &mut ConstraintViolations,
    ) -> bool {
        if !definition.has_body_schema() {
            return true;
        }

        let content_type = header_value(headers, CONTENT_TYPE.as_str());
        let allowed = definition.content_types();
        if allowed.iter().any(|ct| *ct == content_type) {
            return true;
        }

        let violation = if content_type.is_empty() {
            ConstraintViolation::new(
                "Content-Type",
                "Content-Type should not be empty",
                "required",
                Location::Header,
            )
        } else {
            ConstraintViolation::new(
                "Content-Type",
                format!(
                    "{content_type} is not a supported content type, supported: {}",
                    allowed.join(", ")
                ),
                "enum",
                Location::Header,
            )
        };
        violations.push(violation);
        false
    }

    fn check_headers(
        &self,
        definition: &impl MessageDefinition,
        headers: &HeaderMap,
        violations: &mut ConstraintViolations,
    ) -> Result<(), ValidationError> {
        let Some(schema) = definition.header_schema() else {
            return Ok(());
        };

        // HeaderMap names are already lower-case. Values stay strings.
        let mut values = Map::new();
        for name in headers.keys() {
            values.insert(
                name.as_str().to_string(),
                Value::String(header_value(headers, name.as_str())),
            );
        }

        self.check(&Value::Object(values), &schema, Location::Header, violations)
    }

    fn check_path(
        &self,
        definition: &RequestDefinition,
        path: &str,
        violations: &mut ConstraintViolations,
    ) -> Result<(), ValidationError> {
        let Some(schema) = definition.path_schema() else {
            return Ok(());
        };

        // Extracted values are checked as raw strings.
        let values: Map<String, Value> = definition
            .path_template()
            .extract(path)
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();

        self.check(&Value::Object(values), &schema, Location::Path, violations)
    }

    fn check_query(
        &self,
        definition: &RequestDefinition,
        query: &str,
        violations: &mut ConstraintViolations,
    ) -> Result<(), ValidationError> {
        let Some(schema) = definition.query_schema() else {
            return Ok(());
        };

        let values = normalize(parse_query(query), &schema)?;
        self.check(&Value::Object(values), &schema, Location::Query, violations)
    }

    fn check_body(
        &self,
        definition: &impl MessageDefinition,
        body_location: Option<Location>,
        headers: &HeaderMap,
        raw: &[u8],
        violations: &mut ConstraintViolations,
    ) -> Result<(), ValidationError> {
        let Some(schema) = definition.body_schema() else {
            return Ok(());
        };
        if raw.is_empty() {
            return Ok(());
        }

        let location = body_location.unwrap_or(Location::Body);
        let format = extract_format(&header_value(headers, CONTENT_TYPE.as_str()));

        let body = match self.decoder.decode(raw, &format) {
            Ok(Value::Null) => return Ok(()),
            Ok(body) => body,
            Err(DecodeError::Unsupported(format)) => {
                return Err(ValidationError::UnsupportedBodyFormat(format))
            }
            Err(e @ DecodeError::Malformed { .. }) => {
                violations.push(ConstraintViolation::new(
                    "",
                    e.to_string(),
                    "format",
                    location,
                ));
                return Ok(());
            }
        };

        // Form fields arrive as strings, like query values.
        let body = match (location, body) {
            (Location::FormData, Value::Object(fields)) => {
                Value::Object(normalize(fields, &schema)?)
            }
            (_, body) => body,
        };

        self.check(&body, &schema, location, violations)
    }

    fn check(
        &self,
        value: &Value,
        schema: &Value,
        location: Location,
        violations: &mut ConstraintViolations,
    ) -> Result<(), ValidationError> {
        let errors = self.checker.check(value, schema)?;
        violations.extend(errors.into_iter().map(|error| {
            ConstraintViolation::new(error.property, error.message, error.constraint, location)
        }));
        Ok(())
    }
}

fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::PUT | Method::PATCH | Method::POST)
}

/// All values of a header joined with `", "`; empty when absent.
fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get_all(name)
        .iter()
        .map(|value| String::from_utf8_lossy(value.as_bytes()))
        .collect::<Vec<_>>()
        .join(", ")
}
