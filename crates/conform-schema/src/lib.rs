//! Compiled Swagger 2.0 schema model.
//!
//! Holds the normalized operations produced by `conform-compiler` and answers
//! the two questions a validator asks: which operation does `(method, path)`
//! belong to, and what JSON Schema applies to each part of its messages.

pub mod definition;
pub mod error;
pub mod parameter;
pub mod path;
pub mod schema;

pub use definition::{
    MessageDefinition, RequestDefinition, RequestDefinitions, ResponseDefinition, StatusCode,
};
pub use error::{DefinitionError, LookupError};
pub use parameter::{Location, Parameter, ParameterSet};
pub use path::PathTemplate;
pub use schema::Schema;
