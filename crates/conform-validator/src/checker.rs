//! Structural checking of values against JSON Schema.

use std::collections::HashMap;
use std::sync::Arc;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, Validator};
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::ValidationError;

/// One structural error reported by a [`Checker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckError {
    pub property: String,
    pub message: String,
    pub constraint: String,
}

/// Checks a value against a schema.
pub trait Checker {
    fn check(&self, value: &Value, schema: &Value) -> Result<Vec<CheckError>, ValidationError>;
}

impl<C: Checker + ?Sized> Checker for &C {
    fn check(&self, value: &Value, schema: &Value) -> Result<Vec<CheckError>, ValidationError> {
        (**self).check(value, schema)
    }
}

/// Validator knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Assert `format` keywords (email, date-time, ...).
    pub validate_formats: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            validate_formats: true,
        }
    }
}

impl ValidatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format_validation(mut self, enabled: bool) -> Self {
        self.validate_formats = enabled;
        self
    }
}

/// [`Checker`] backed by the `jsonschema` crate, Draft 4.
///
/// Compiled validators are kept per distinct schema; every check still runs
/// independently.
#[derive(Default)]
pub struct JsonSchemaChecker {
    options: ValidatorOptions,
    compiled: RwLock<HashMap<String, Arc<Validator>>>,
}

impl JsonSchemaChecker {
    pub fn new(options: ValidatorOptions) -> Self {
        Self {
            options,
            compiled: RwLock::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    fn validator(&self, schema: &Value) -> Result<Arc<Validator>, ValidationError> {
        let key = schema.to_string();
        if let Some(validator) = self.compiled.read().get(&key) {
            return Ok(Arc::clone(validator));
        }

        let validator = Arc::new(
            jsonschema::options()
                .with_draft(Draft::Draft4)
                .should_validate_formats(self.options.validate_formats)
                .build(schema)
                .map_err(|e| ValidationError::InvalidSchema(e.to_string()))?,
        );
        self.compiled.write().insert(key, Arc::clone(&validator));
        Ok(validator)
    }
}

impl std::fmt::Debug for JsonSchemaChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaChecker")
            .field("options", &self.options)
            .field("compiled", &self.compiled.read().len())
            .finish()
    }
}

impl Checker for JsonSchemaChecker {
    fn check(&self, value: &Value, schema: &Value) -> Result<Vec<CheckError>, ValidationError> {
        let validator = self.validator(schema)?;

        let errors = validator
            .iter_errors(value)
            .map(|error| {
                let mut property = property_path(&error.instance_path.to_string());
                if let ValidationErrorKind::Required { property: missing } = &error.kind {
                    let missing = missing
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| missing.to_string());
                    if !property.is_empty() {
                        property.push('.');
                    }
                    property.push_str(&missing);
                }
                CheckError {
                    property,
                    message: error.to_string(),
                    constraint: constraint(&error.schema_path.to_string()),
                }
            })
            .collect();
        Ok(errors)
    }
}

/// `/address/city` -> `address.city`, `/tags/0` -> `tags[0]`.
fn property_path(pointer: &str) -> String {
    let mut property = String::new();
    for segment in pointer.split('/').skip(1) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            property.push('[');
            property.push_str(&segment);
            property.push(']');
        } else {
            if !property.is_empty() {
                property.push('.');
            }
            property.push_str(&segment);
        }
    }
    property
}

/// The failing keyword: last non-index segment of the schema path.
fn constraint(schema_path: &str) -> String {
    schema_path
        .rsplit('/')
        .find(|segment| !segment.is_empty() && !segment.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or("schema")
        .to_string()
}
