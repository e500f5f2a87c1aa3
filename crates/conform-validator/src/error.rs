use thiserror::Error;

use conform_schema::LookupError;

/// Fatal errors raised while validating a message (E2301–E2303).
///
/// These mean the schema or the validator setup can't judge the message at
/// all; nonconforming messages produce violations instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// E2301: Parameter declares a `collectionFormat` outside of the supported set.
    #[error("E2301: unsupported collectionFormat '{format}' for parameter '{name}', supported: csv, ssv, tsv, pipes, multi")]
    UnsupportedCollectionFormat { name: String, format: String },

    /// E2302: No decoder for the body format.
    #[error("E2302: no decoder available for body format '{0}'")]
    UnsupportedBodyFormat(String),

    /// E2303: Derived schema rejected by the JSON Schema engine.
    #[error("E2303: invalid schema: {0}")]
    InvalidSchema(String),

    /// Operation or response lookup failed.
    #[error(transparent)]
    Lookup(#[from] LookupError),
}
