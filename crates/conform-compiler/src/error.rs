use thiserror::Error;

use conform_schema::DefinitionError;

/// Errors produced during compilation (E2001–E2011).
#[derive(Debug, Error)]
pub enum CompileError {
    /// E2001: Operation without an `operationId`.
    #[error("E2001: missing operationId for {method} {path}")]
    MissingOperationId { method: String, path: String },

    /// E2002: Operation without any declared response.
    #[error("E2002: no responses declared for {method} {path}")]
    MissingResponses { method: String, path: String },

    /// E2003: Operation declares both `body` and `formData` parameters.
    #[error("E2003: parameters in both body and formData locations are declared for {path}, only one is allowed")]
    AmbiguousBodyLocation { path: String },

    /// E2004: `$ref` target could not be found or the pointer is malformed.
    #[error("E2004: unresolved $ref: {0}")]
    UnresolvedRef(String),

    /// E2005: `$ref` chain leads back to a reference still being expanded.
    #[error("E2005: circular $ref detected: {0}")]
    CircularRef(String),

    /// E2006: Document location with an unknown extension.
    #[error("E2006: unsupported document extension for '{0}', supported: json, yaml, yml")]
    UnsupportedExtension(String),

    /// E2007: Response key that is neither a status code nor `default`.
    #[error("E2007: invalid response status '{status}' for {method} {path}")]
    InvalidStatusCode {
        method: String,
        path: String,
        status: String,
    },

    /// E2008: Structurally invalid document (wrong node kinds).
    #[error("E2008: invalid document: {0}")]
    InvalidDocument(String),

    /// E2009: JSON/YAML parse error.
    #[error("E2009: parse error in '{location}': {message}")]
    Parse { location: String, message: String },

    /// E2010: Remote document could not be fetched.
    #[error("E2010: unable to fetch '{location}': {message}")]
    Fetch { location: String, message: String },

    /// E2011: Schema cache could not be read or written.
    #[error("E2011: schema cache error: {0}")]
    Cache(String),

    /// Model construction error.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
