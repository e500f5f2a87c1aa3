//! HTTP message validation against compiled conform schemas.
//!
//! Validates requests and responses part by part (content type, headers,
//! path, query, body). Raw string values are normalized to their declared
//! types, then checked with JSON Schema (Draft 4). Every nonconformance is
//! reported as a [`ConstraintViolation`].
//!
//! ```ignore
//! let schema = conform_compiler::compile("petstore.yaml")?;
//! let definition = schema.resolve(request.method().as_str(), request.uri().path())?;
//!
//! let validator = MessageValidator::new(DefaultDecoder);
//! validator.validate_request(&request, definition)?.into_result()?;
//! ```

pub mod checker;
pub mod decoder;
pub mod error;
pub mod normalizer;
pub mod validator;
pub mod violation;

pub use checker::{CheckError, Checker, JsonSchemaChecker, ValidatorOptions};
pub use decoder::{extract_format, BodyDecoder, DecodeError, DefaultDecoder};
pub use error::ValidationError;
pub use validator::MessageValidator;
pub use violation::{ConstraintViolation, ConstraintViolations, ViolationsError};
