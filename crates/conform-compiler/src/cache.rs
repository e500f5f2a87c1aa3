//! Caching of compiled schemas.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use conform_schema::Schema;

use crate::compiler::SchemaFactory;
use crate::error::CompileError;

/// Storage for compiled schemas keyed by an opaque string.
pub trait SchemaCache {
    /// A missing or unreadable entry is a miss.
    fn get(&self, key: &str) -> Option<Schema>;

    fn put(&self, key: &str, schema: &Schema) -> Result<(), CompileError>;
}

/// Cache key for a document location: the SHA-256 of the location, hex encoded.
pub fn cache_key(location: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(location.as_bytes());
    hex::encode(hasher.finalize())
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Schema>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SchemaCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Schema> {
        self.entries.read().get(key).cloned()
    }

    fn put(&self, key: &str, schema: &Schema) -> Result<(), CompileError> {
        self.entries.write().insert(key.to_string(), schema.clone());
        Ok(())
    }
}

/// Persists each schema as `<key>.json` under a directory.
#[derive(Debug, Clone)]
pub struct DirectoryCache {
    dir: PathBuf,
}

impl DirectoryCache {
    /// Create the cache, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CompileError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SchemaCache for DirectoryCache {
    fn get(&self, key: &str) -> Option<Schema> {
        let path = self.entry_path(key);
        let content = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&content) {
            Ok(schema) => Some(schema),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "ignoring unreadable cache entry"
                );
                None
            }
        }
    }

    fn put(&self, key: &str, schema: &Schema) -> Result<(), CompileError> {
        let content =
            serde_json::to_vec(schema).map_err(|e| CompileError::Cache(e.to_string()))?;
        std::fs::write(self.entry_path(key), content)?;
        Ok(())
    }
}

/// Wraps a [`SchemaFactory`], consulting a [`SchemaCache`] first.
pub struct CachedCompiler<F, C> {
    factory: F,
    cache: C,
}

impl<F: SchemaFactory, C: SchemaCache> CachedCompiler<F, C> {
    pub fn new(factory: F, cache: C) -> Self {
        Self { factory, cache }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<F: SchemaFactory, C: SchemaCache> SchemaFactory for CachedCompiler<F, C> {
    fn create_schema(&self, location: &str) -> Result<Schema, CompileError> {
        let key = cache_key(location);
        if let Some(schema) = self.cache.get(&key) {
            conform_telemetry::log_schema_cache_hit!(location, key = %key, "schema cache hit");
            return Ok(schema);
        }

        conform_telemetry::log_schema_cache_miss!(location, key = %key, "schema cache miss");
        let schema = self.factory.create_schema(location)?;
        self.cache.put(&key, &schema)?;
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conform_schema::{
        ParameterSet, RequestDefinition, RequestDefinitions, ResponseDefinition, StatusCode,
    };
    use std::cell::Cell;

    fn sample_schema() -> Schema {
        let definition = RequestDefinition::new(
            "GET",
            "listPets",
            "/api/pets",
            ParameterSet::default(),
            vec![],
            vec![ResponseDefinition::new(
                StatusCode::Code(200),
                vec!["application/json".into()],
                ParameterSet::default(),
            )],
        )
        .unwrap();
        Schema::new(
            RequestDefinitions::new(vec![definition]).unwrap(),
            "/api",
            Some("petstore.swagger.io".into()),
            vec![],
        )
    }

    struct CountingFactory {
        calls: Cell<usize>,
    }

    impl SchemaFactory for CountingFactory {
        fn create_schema(&self, _location: &str) -> Result<Schema, CompileError> {
            self.calls.set(self.calls.get() + 1);
            Ok(sample_schema())
        }
    }

    struct FailingFactory;

    impl SchemaFactory for FailingFactory {
        fn create_schema(&self, location: &str) -> Result<Schema, CompileError> {
            Err(CompileError::UnsupportedExtension(location.to_string()))
        }
    }

    #[test]
    fn cache_key_is_sha256_hex() {
        assert_eq!(
            cache_key(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(cache_key("a.json").len(), 64);
        assert_ne!(cache_key("a.json"), cache_key("b.json"));
    }

    #[test]
    fn memory_cache_stores_schemas() {
        let cache = MemoryCache::new();
        assert!(cache.is_empty());
        assert!(cache.get("k").is_none());

        cache.put("k", &sample_schema()).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), Some(sample_schema()));
    }

    #[test]
    fn directory_cache_persists_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DirectoryCache::new(dir.path().join("schemas")).unwrap();

        cache.put("abc", &sample_schema()).unwrap();
        assert!(cache.dir().join("abc.json").is_file());

        let reopened = DirectoryCache::new(cache.dir()).unwrap();
        let schema = reopened.get("abc").unwrap();
        assert_eq!(schema, sample_schema());
        assert_eq!(schema.find_operation("GET", "/api/pets").unwrap(), "listPets");
    }

    #[test]
    fn directory_cache_treats_corrupt_entries_as_misses() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DirectoryCache::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ nope").unwrap();

        assert!(cache.get("bad").is_none());
        assert!(cache.get("absent").is_none());
    }

    #[test]
    fn cached_compiler_compiles_once_per_location() {
        let compiler = CachedCompiler::new(
            CountingFactory {
                calls: Cell::new(0),
            },
            MemoryCache::new(),
        );

        compiler.create_schema("petstore.json").unwrap();
        compiler.create_schema("petstore.json").unwrap();
        assert_eq!(compiler.factory.calls.get(), 1);

        compiler.create_schema("other.json").unwrap();
        assert_eq!(compiler.factory.calls.get(), 2);
        assert_eq!(compiler.cache().len(), 2);
        assert!(compiler.cache().get(&cache_key("petstore.json")).is_some());
    }

    #[test]
    fn cached_compiler_does_not_cache_failures() {
        let compiler = CachedCompiler::new(FailingFactory, MemoryCache::new());
        assert!(compiler.create_schema("swagger.txt").is_err());
        assert!(compiler.cache().is_empty());
    }
}
