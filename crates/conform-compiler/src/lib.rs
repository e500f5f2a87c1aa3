//! Compiles Swagger 2.0 documents into [`conform_schema::Schema`] values.
//!
//! Compilation has three stages:
//! 1. Fetch the document (file or HTTP, JSON or YAML)
//! 2. Expand `$ref`s reachable from `paths`, across documents
//! 3. Build the request definitions

pub mod cache;
pub mod compiler;
pub mod error;
pub mod loader;
pub mod resolver;

pub use cache::{cache_key, CachedCompiler, DirectoryCache, MemoryCache, SchemaCache};
pub use compiler::{compile_document, SchemaFactory, SwaggerSchemaFactory};
pub use error::CompileError;
pub use loader::{document_url, parse_document, DocumentFormat, DocumentLoader, UriLoader};
pub use resolver::Resolver;

/// Compile the document at `location` with the default loader.
pub fn compile(location: &str) -> Result<conform_schema::Schema, CompileError> {
    SwaggerSchemaFactory::new().create_schema(location)
}
