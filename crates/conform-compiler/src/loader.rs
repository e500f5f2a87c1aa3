//! Fetching and parsing source documents.

use std::path::Path;

use serde_json::{Map, Number, Value};
use url::Url;

use crate::error::CompileError;

/// Schemes a location may carry explicitly. Anything else is a file path.
const URL_SCHEMES: &[&str] = &["file", "http", "https"];

/// On-disk/over-the-wire encoding of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Detect the format from the extension of the URL path.
    pub fn from_url(url: &Url) -> Result<Self, CompileError> {
        let extension = Path::new(url.path())
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => Ok(DocumentFormat::Json),
            Some("yaml") | Some("yml") => Ok(DocumentFormat::Yaml),
            _ => Err(CompileError::UnsupportedExtension(url.to_string())),
        }
    }
}

/// Fetches documents by absolute URL.
///
/// Implementations return the parsed document; the reference resolver keeps
/// its own per-compile cache, so loaders need not cache.
pub trait DocumentLoader {
    fn load(&self, url: &Url) -> Result<Value, CompileError>;
}

impl<L: DocumentLoader + ?Sized> DocumentLoader for &L {
    fn load(&self, url: &Url) -> Result<Value, CompileError> {
        (**self).load(url)
    }
}

/// Default loader: `file://` from disk, `http(s)://` with a blocking client.
#[derive(Debug, Clone, Default)]
pub struct UriLoader;

impl UriLoader {
    pub fn new() -> Self {
        Self
    }

    fn read(&self, url: &Url) -> Result<String, CompileError> {
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| CompileError::InvalidDocument(format!("not a file URL: {url}")))?;
                Ok(std::fs::read_to_string(path)?)
            }
            "http" | "https" => fetch(url),
            other => Err(CompileError::Fetch {
                location: url.to_string(),
                message: format!("unsupported scheme '{other}'"),
            }),
        }
    }
}

impl DocumentLoader for UriLoader {
    fn load(&self, url: &Url) -> Result<Value, CompileError> {
        let format = DocumentFormat::from_url(url)?;
        let content = self.read(url)?;
        let document = parse_document(&content, format, url.as_str())?;
        conform_telemetry::log_document_loaded!(location = %url, "document loaded");
        Ok(document)
    }
}

fn fetch(url: &Url) -> Result<String, CompileError> {
    let fetch_error = |e: reqwest::Error| CompileError::Fetch {
        location: url.to_string(),
        message: e.to_string(),
    };

    reqwest::blocking::get(url.as_str())
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(fetch_error)
}

/// Turn a user supplied location into an absolute URL.
///
/// `file://`, `http://` and `https://` locations are taken as-is; anything
/// else is a filesystem path, made absolute against the working directory.
pub fn document_url(location: &str) -> Result<Url, CompileError> {
    if let Ok(url) = Url::parse(location) {
        if URL_SCHEMES.contains(&url.scheme()) {
            return Ok(url);
        }
    }

    let path = Path::new(location);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    Url::from_file_path(&absolute).map_err(|_| {
        CompileError::InvalidDocument(format!("cannot build a URL for '{}'", absolute.display()))
    })
}

/// Parse document text in the given format into a JSON value.
pub fn parse_document(
    content: &str,
    format: DocumentFormat,
    location: &str,
) -> Result<Value, CompileError> {
    let parse_error = |message: String| CompileError::Parse {
        location: location.to_string(),
        message,
    };

    match format {
        DocumentFormat::Json => {
            serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))
        }
        DocumentFormat::Yaml => {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
            yaml_to_json(yaml).map_err(parse_error)
        }
    }
}

/// YAML allows non-string keys (`200:` under `responses`), JSON does not.
/// Scalar keys are stringified.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, String> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("non-finite number {n}"))?
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut object = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                object.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_key(key: serde_yaml::Value) -> Result<String, String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        other => Err(format!("unsupported mapping key {other:?}")),
    }
}
