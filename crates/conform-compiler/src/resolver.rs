//! `$ref` expansion across one or more documents.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use url::Url;

use crate::error::CompileError;
use crate::loader::DocumentLoader;

/// How the resolver sees a JSON node.
enum Node<'a> {
    Ref(&'a str),
    Object(&'a Map<String, Value>),
    Array(&'a [Value]),
    Scalar(&'a Value),
}

impl<'a> Node<'a> {
    fn of(value: &'a Value) -> Self {
        match value {
            Value::Object(obj) => match obj.get("$ref").and_then(|v| v.as_str()) {
                Some(reference) => Node::Ref(reference),
                None => Node::Object(obj),
            },
            Value::Array(items) => Node::Array(items),
            other => Node::Scalar(other),
        }
    }
}

/// Expands references relative to the document that contains them.
///
/// Every document is fetched at most once per resolver.
pub struct Resolver<L: DocumentLoader> {
    loader: L,
    documents: HashMap<Url, Arc<Value>>,
    active: HashSet<String>,
}

impl<L: DocumentLoader> Resolver<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            documents: HashMap::new(),
            active: HashSet::new(),
        }
    }

    /// Load the document at `url` and expand every reference under `paths`.
    ///
    /// Other top-level sections are returned untouched; definitions are only
    /// expanded as far as an operation uses them.
    pub fn resolve_document(&mut self, url: &Url) -> Result<Value, CompileError> {
        let url = without_fragment(url);
        let root = self.document(&url)?;

        let mut resolved = match &*root {
            Value::Object(obj) => obj.clone(),
            _ => {
                return Err(CompileError::InvalidDocument(format!(
                    "document root of '{url}' must be an object"
                )))
            }
        };

        if let Some(paths) = root.get("paths") {
            let paths = self.resolve(paths, &root, &url)?;
            resolved.insert("paths".to_string(), paths);
        }
        Ok(Value::Object(resolved))
    }

    /// Number of distinct documents fetched so far.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    fn document(&mut self, url: &Url) -> Result<Arc<Value>, CompileError> {
        if let Some(document) = self.documents.get(url) {
            return Ok(Arc::clone(document));
        }
        let document = Arc::new(self.loader.load(url)?);
        self.documents.insert(url.clone(), Arc::clone(&document));
        Ok(document)
    }

    fn resolve(
        &mut self,
        value: &Value,
        document: &Arc<Value>,
        document_url: &Url,
    ) -> Result<Value, CompileError> {
        match Node::of(value) {
            Node::Ref(reference) => self.expand(reference, document, document_url),
            Node::Object(obj) => {
                let mut resolved = Map::with_capacity(obj.len());
                for (key, val) in obj {
                    resolved.insert(key.clone(), self.resolve(val, document, document_url)?);
                }
                Ok(Value::Object(resolved))
            }
            Node::Array(items) => items
                .iter()
                .map(|item| self.resolve(item, document, document_url))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Node::Scalar(scalar) => Ok(scalar.clone()),
        }
    }

    fn expand(
        &mut self,
        reference: &str,
        document: &Arc<Value>,
        document_url: &Url,
    ) -> Result<Value, CompileError> {
        let unresolved = || CompileError::UnresolvedRef(reference.to_string());

        let target = document_url.join(reference).map_err(|_| unresolved())?;
        let pointer = percent_decode_str(target.fragment().unwrap_or(""))
            .decode_utf8()
            .map_err(|_| unresolved())?
            .into_owned();
        if !pointer.is_empty() && !pointer.starts_with('/') {
            return Err(unresolved());
        }

        let key = target.to_string();
        if !self.active.insert(key.clone()) {
            return Err(CompileError::CircularRef(reference.to_string()));
        }

        let target_url = without_fragment(&target);
        let target_document = if &target_url == document_url {
            Arc::clone(document)
        } else {
            self.document(&target_url)?
        };

        let node = target_document.pointer(&pointer).ok_or_else(unresolved)?;
        let resolved = self.resolve(node, &target_document, &target_url)?;

        self.active.remove(&key);
        Ok(resolved)
    }
}

fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    /// In-memory documents keyed by URL, counting fetches.
    struct MapLoader {
        documents: HashMap<String, Value>,
        fetches: RefCell<Vec<String>>,
    }

    impl MapLoader {
        fn new(documents: Vec<(&str, Value)>) -> Self {
            Self {
                documents: documents
                    .into_iter()
                    .map(|(url, doc)| (url.to_string(), doc))
                    .collect(),
                fetches: RefCell::new(Vec::new()),
            }
        }
    }

    impl DocumentLoader for MapLoader {
        fn load(&self, url: &Url) -> Result<Value, CompileError> {
            self.fetches.borrow_mut().push(url.to_string());
            self.documents
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| CompileError::Fetch {
                    location: url.to_string(),
                    message: "not found".into(),
                })
        }
    }

    const ROOT: &str = "file:///specs/api.json";

    fn resolve(loader: &MapLoader) -> Result<Value, CompileError> {
        Resolver::new(loader).resolve_document(&Url::parse(ROOT).unwrap())
    }

    #[test]
    fn same_document_refs_are_inlined() {
        let loader = MapLoader::new(vec![(
            ROOT,
            json!({
                "paths": {"/pets": {"get": {"responses": {"200": {"schema": {"$ref": "#/definitions/Pets"}}}}}},
                "definitions": {
                    "Pets": {"type": "array", "items": {"$ref": "#/definitions/Pet"}},
                    "Pet": {"type": "object", "required": ["id"]}
                }
            }),
        )]);

        let resolved = resolve(&loader).unwrap();
        assert_eq!(
            resolved["paths"]["/pets"]["get"]["responses"]["200"]["schema"],
            json!({"type": "array", "items": {"type": "object", "required": ["id"]}})
        );
        // Untouched outside of paths.
        assert_eq!(
            resolved["definitions"]["Pets"]["items"],
            json!({"$ref": "#/definitions/Pet"})
        );
    }

    #[test]
    fn escaped_pointer_segments_are_decoded() {
        let loader = MapLoader::new(vec![(
            ROOT,
            json!({
                "paths": {
                    "/a": {"parameters": [{"$ref": "#/x-shared/a~1b"}]},
                    "/b": {"parameters": [{"$ref": "#/x-shared/with%20space"}]}
                },
                "x-shared": {"a/b": {"name": "slash"}, "with space": {"name": "space"}}
            }),
        )]);

        let resolved = resolve(&loader).unwrap();
        assert_eq!(resolved["paths"]["/a"]["parameters"][0]["name"], "slash");
        assert_eq!(resolved["paths"]["/b"]["parameters"][0]["name"], "space");
    }

    #[test]
    fn cross_document_refs_resolve_relative_to_their_document() {
        let loader = MapLoader::new(vec![
            (
                ROOT,
                json!({"paths": {"/pets": {"post": {"parameters": [{"$ref": "common/params.json#/body"}]}}}}),
            ),
            (
                "file:///specs/common/params.json",
                json!({"body": {"in": "body", "name": "pet", "schema": {"$ref": "models.json#/Pet"}}}),
            ),
            (
                "file:///specs/common/models.json",
                json!({"Pet": {"type": "object", "properties": {"tag": {"$ref": "#/Tag"}}}, "Tag": {"type": "string"}}),
            ),
        ]);

        let resolved = resolve(&loader).unwrap();
        assert_eq!(
            resolved["paths"]["/pets"]["post"]["parameters"][0],
            json!({
                "in": "body",
                "name": "pet",
                "schema": {"type": "object", "properties": {"tag": {"type": "string"}}}
            })
        );
    }

    #[test]
    fn documents_are_fetched_once() {
        let loader = MapLoader::new(vec![
            (
                ROOT,
                json!({"paths": {
                    "/a": {"$ref": "shared.json#/item"},
                    "/b": {"$ref": "shared.json#/item"}
                }}),
            ),
            ("file:///specs/shared.json", json!({"item": {"get": {}}})),
        ]);

        let mut resolver = Resolver::new(&loader);
        resolver
            .resolve_document(&Url::parse(ROOT).unwrap())
            .unwrap();
        assert_eq!(resolver.document_count(), 2);
        assert_eq!(loader.fetches.borrow().len(), 2);
    }

    #[test]
    fn whole_document_refs() {
        let loader = MapLoader::new(vec![
            (ROOT, json!({"paths": {"/pets": {"$ref": "pets.json"}}})),
            ("file:///specs/pets.json", json!({"get": {"operationId": "listPets"}})),
        ]);
        let resolved = resolve(&loader).unwrap();
        assert_eq!(resolved["paths"]["/pets"]["get"]["operationId"], "listPets");
    }

    #[test]
    fn repeated_non_nested_refs_are_not_cycles() {
        let loader = MapLoader::new(vec![(
            ROOT,
            json!({
                "paths": {"/pair": {"x-pair": [{"$ref": "#/definitions/Id"}, {"$ref": "#/definitions/Id"}]}},
                "definitions": {"Id": {"type": "integer"}}
            }),
        )]);
        let resolved = resolve(&loader).unwrap();
        assert_eq!(
            resolved["paths"]["/pair"]["x-pair"],
            json!([{"type": "integer"}, {"type": "integer"}])
        );
    }

    #[test]
    fn cycles_are_fatal() {
        let loader = MapLoader::new(vec![(
            ROOT,
            json!({
                "paths": {"/nodes": {"get": {"responses": {"200": {"schema": {"$ref": "#/definitions/Node"}}}}}},
                "definitions": {
                    "Node": {"type": "object", "properties": {"next": {"$ref": "#/definitions/Node"}}}
                }
            }),
        )]);

        let err = resolve(&loader).unwrap_err();
        assert!(matches!(err, CompileError::CircularRef(ref s) if s == "#/definitions/Node"));
    }

    #[test]
    fn unused_cyclic_definitions_are_ignored() {
        let loader = MapLoader::new(vec![(
            ROOT,
            json!({
                "paths": {},
                "definitions": {"Node": {"properties": {"next": {"$ref": "#/definitions/Node"}}}}
            }),
        )]);
        assert!(resolve(&loader).is_ok());
    }

    #[test]
    fn missing_targets_are_fatal() {
        let loader = MapLoader::new(vec![(
            ROOT,
            json!({"paths": {"/pets": {"get": {"parameters": [{"$ref": "#/parameters/missing"}]}}}}),
        )]);
        let err = resolve(&loader).unwrap_err();
        assert!(matches!(err, CompileError::UnresolvedRef(ref s) if s == "#/parameters/missing"));

        let loader = MapLoader::new(vec![(
            ROOT,
            json!({"paths": {"/pets": {"$ref": "#definitions"}}}),
        )]);
        assert!(matches!(
            resolve(&loader).unwrap_err(),
            CompileError::UnresolvedRef(_)
        ));
    }

    #[test]
    fn missing_documents_propagate_loader_errors() {
        let loader = MapLoader::new(vec![(
            ROOT,
            json!({"paths": {"/pets": {"$ref": "gone.json#/pets"}}}),
        )]);
        assert!(matches!(
            resolve(&loader).unwrap_err(),
            CompileError::Fetch { ref location, .. } if location == "file:///specs/gone.json"
        ));
    }
}
