use thiserror::Error;

use crate::definition::StatusCode;

/// Errors raised while assembling the definition model (E2101–E2104).
///
/// These describe a schema author's mistake, never a message author's.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// E2101: Two operations share an `operationId`.
    #[error("E2101: duplicate operationId '{0}'")]
    DuplicateOperation(String),

    /// E2102: More than one `in: body` parameter on one operation.
    #[error(
        "E2102: cannot process the '{second}' body parameter, a '{first}' body parameter is already declared"
    )]
    MultipleBodyParameters { first: String, second: String },

    /// E2103: Parameter location outside of the supported set.
    #[error("E2103: {0} is not a supported parameter location, supported: path, query, header, body, formData")]
    UnsupportedLocation(String),

    /// E2104: Path template with an unbalanced or empty `{}` placeholder.
    #[error("E2104: invalid path template '{0}'")]
    InvalidPathTemplate(String),
}

/// Errors raised when querying a compiled schema (E2201–E2203).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// E2201: No operation matches the method and path.
    #[error("E2201: unable to resolve the operationId for {method} {path}")]
    OperationNotFound { method: String, path: String },

    /// E2202: No operation carries the given id.
    #[error("E2202: unable to find request definition for operationId '{0}'")]
    UnknownOperation(String),

    /// E2203: Neither the status code nor `default` is declared.
    #[error(
        "E2203: no response definition for {method} {path_template} is available for status code {status}"
    )]
    UnknownResponse {
        method: String,
        path_template: String,
        status: StatusCode,
    },
}
