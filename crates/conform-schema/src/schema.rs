use serde::{Deserialize, Serialize};

use crate::definition::{RequestDefinition, RequestDefinitions};
use crate::error::LookupError;

fn default_schemes() -> Vec<String> {
    vec!["http".to_string()]
}

/// A compiled API description.
///
/// Immutable once built; safe to share between threads validating
/// different messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    request_definitions: RequestDefinitions,
    host: Option<String>,
    #[serde(default)]
    base_path: String,
    #[serde(default = "default_schemes")]
    schemes: Vec<String>,
}

impl Schema {
    pub fn new(
        request_definitions: RequestDefinitions,
        base_path: impl Into<String>,
        host: Option<String>,
        schemes: Vec<String>,
    ) -> Self {
        Self {
            request_definitions,
            host,
            base_path: base_path.into(),
            schemes: if schemes.is_empty() {
                default_schemes()
            } else {
                schemes
            },
        }
    }

    /// Resolve `(method, path)` to an `operationId`.
    ///
    /// Operations are tried in declaration order and the first template that
    /// fits wins, even when a later template would match more specifically.
    /// `method` is compared verbatim against the upper-case compiled method.
    pub fn find_operation(&self, method: &str, path: &str) -> Result<&str, LookupError> {
        self.request_definitions
            .iter()
            .filter(|def| def.method() == method)
            .find(|def| def.path_template().matches(path))
            .map(|def| def.operation_id())
            .ok_or_else(|| LookupError::OperationNotFound {
                method: method.to_string(),
                path: path.to_string(),
            })
    }

    pub fn get_operation(&self, operation_id: &str) -> Result<&RequestDefinition, LookupError> {
        self.request_definitions.get(operation_id)
    }

    /// Shorthand for `find_operation` followed by `get_operation`.
    pub fn resolve(&self, method: &str, path: &str) -> Result<&RequestDefinition, LookupError> {
        let operation_id = self.find_operation(method, path)?;
        self.get_operation(operation_id)
    }

    pub fn request_definitions(&self) -> &RequestDefinitions {
        &self.request_definitions
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }
}
