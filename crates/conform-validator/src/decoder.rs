//! Message body decoding.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::normalizer::parse_query;

/// Why a body could not be turned into a JSON value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The decoder has no support for this format at all.
    #[error("unsupported body format '{0}'")]
    Unsupported(String),

    /// The body is not valid in the given format.
    #[error("unable to decode {format} body: {message}")]
    Malformed { format: String, message: String },
}

/// Turns raw body bytes into a JSON value.
pub trait BodyDecoder {
    /// `format` is the short name returned by [`extract_format`].
    fn decode(&self, raw: &[u8], format: &str) -> Result<Value, DecodeError>;
}

impl<D: BodyDecoder + ?Sized> BodyDecoder for &D {
    fn decode(&self, raw: &[u8], format: &str) -> Result<Value, DecodeError> {
        (**self).decode(raw, format)
    }
}

/// Decodes `json`, `xml`, `yaml`/`x-yaml` and `x-www-form-urlencoded` bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDecoder;

impl BodyDecoder for DefaultDecoder {
    fn decode(&self, raw: &[u8], format: &str) -> Result<Value, DecodeError> {
        let malformed = |message: String| DecodeError::Malformed {
            format: format.to_string(),
            message,
        };

        match format {
            "json" => serde_json::from_slice(raw).map_err(|e| malformed(e.to_string())),
            "xml" => decode_xml(raw).map_err(malformed),
            "yaml" | "x-yaml" => {
                serde_yaml::from_slice(raw).map_err(|e| malformed(e.to_string()))
            }
            "x-www-form-urlencoded" => {
                let text = std::str::from_utf8(raw).map_err(|e| malformed(e.to_string()))?;
                Ok(Value::Object(parse_query(text)))
            }
            other => Err(DecodeError::Unsupported(other.to_string())),
        }
    }
}

/// Element tree of an XML document.
///
/// The root element itself is dropped. Attributes become `@name` keys (numeric
/// values as numbers), text beside attributes or children becomes `#`,
/// repeated children become arrays, and a node holding only `item` children
/// is the list of those items.
fn decode_xml(raw: &[u8]) -> Result<Value, String> {
    let text = std::str::from_utf8(raw).map_err(|e| e.to_string())?;
    let mut reader = Reader::from_str(text);
    let mut open: Vec<XmlNode> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(start) => open.push(XmlNode::new(&start)?),
            Event::Empty(start) => {
                let node = XmlNode::new(&start)?;
                close_node(node, &mut open, &mut root)?;
            }
            Event::End(_) => {
                let node = open.pop().ok_or("unexpected closing tag")?;
                close_node(node, &mut open, &mut root)?;
            }
            Event::Text(text) => {
                if let Some(node) = open.last_mut() {
                    node.text.push_str(&text.unescape().map_err(|e| e.to_string())?);
                }
            }
            Event::CData(data) => {
                if let Some(node) = open.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(node) = open.last() {
        return Err(format!("element '{}' is not closed", node.name));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn close_node(
    node: XmlNode,
    open: &mut [XmlNode],
    root: &mut Option<Value>,
) -> Result<(), String> {
    let (name, value) = node.finish();
    match open.last_mut() {
        Some(parent) => parent.push_child(name, value),
        None if root.is_some() => return Err("more than one root element".to_string()),
        None => *root = Some(value),
    }
    Ok(())
}

struct XmlNode {
    name: String,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl XmlNode {
    fn new(start: &BytesStart<'_>) -> Result<Self, String> {
        let mut attributes = Map::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| e.to_string())?;
            let value = attribute.unescape_value().map_err(|e| e.to_string())?;
            attributes.insert(
                format!("@{}", String::from_utf8_lossy(attribute.key.as_ref())),
                attribute_value(&value),
            );
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            children: Map::new(),
            text: String::new(),
        })
    }

    fn push_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }

    fn finish(self) -> (String, Value) {
        let text = self.text.trim();
        if self.attributes.is_empty() && self.children.is_empty() {
            return (self.name, Value::String(text.to_string()));
        }

        if self.attributes.is_empty() && text.is_empty() && self.children.len() == 1 {
            if let Some(items) = self.children.get("item") {
                let items = match items {
                    Value::Array(items) => items.clone(),
                    item => vec![item.clone()],
                };
                return (self.name, Value::Array(items));
            }
        }

        let mut fields = self.attributes;
        fields.extend(self.children);
        if !text.is_empty() {
            fields.insert("#".to_string(), Value::String(text.to_string()));
        }
        (self.name, Value::Object(fields))
    }
}

fn attribute_value(raw: &str) -> Value {
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

/// Short body format of a MIME type.
///
/// The subtype after the last `/`, after any `+` suffix, without parameters:
/// `application/vnd.api+json; charset=utf-8` gives `json`.
pub fn extract_format(content_type: &str) -> String {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    let subtype = essence.rsplit('/').next().unwrap_or(essence);
    let format = subtype.rsplit('+').next().unwrap_or(subtype);
    format.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_extraction() {
        assert_eq!(extract_format("application/json"), "json");
        assert_eq!(extract_format("application/vnd.foo+json"), "json");
        assert_eq!(extract_format("application/json; charset=utf-8"), "json");
        assert_eq!(extract_format("application/x-yaml"), "x-yaml");
        assert_eq!(extract_format("text/YAML"), "yaml");
        assert_eq!(extract_format("application/x-www-form-urlencoded"), "x-www-form-urlencoded");
        assert_eq!(extract_format("json"), "json");
        assert_eq!(extract_format(""), "");
    }

    #[test]
    fn decodes_supported_formats() {
        let decoder = DefaultDecoder;
        assert_eq!(
            decoder.decode(br#"{"id": 1}"#, "json").unwrap(),
            json!({"id": 1})
        );
        assert_eq!(
            decoder.decode(b"id: 1\nname: Doggy\n", "yaml").unwrap(),
            json!({"id": 1, "name": "Doggy"})
        );
        assert_eq!(
            decoder.decode(b"caption=hello+world&width=3", "x-www-form-urlencoded").unwrap(),
            json!({"caption": "hello world", "width": "3"})
        );
    }

    #[test]
    fn malformed_and_unsupported_bodies() {
        let decoder = DefaultDecoder;
        assert!(matches!(
            decoder.decode(b"{ nope", "json"),
            Err(DecodeError::Malformed { ref format, .. }) if format == "json"
        ));
        assert!(matches!(
            decoder.decode(b"<pet><name>Rex</pet>", "xml"),
            Err(DecodeError::Malformed { ref format, .. }) if format == "xml"
        ));
        assert!(matches!(
            decoder.decode(b"<pet><name>Rex</name>", "xml"),
            Err(DecodeError::Malformed { .. })
        ));
        assert_eq!(
            decoder.decode(b"\x81", "msgpack").unwrap_err(),
            DecodeError::Unsupported("msgpack".into())
        );
    }

    #[test]
    fn xml_elements_become_objects() {
        let decoder = DefaultDecoder;
        let body = br#"<?xml version="1.0"?>
<pet id="7">
  <name lang="en">Rex &amp; co</name>
  <tag>good</tag>
  <tag>boy</tag>
  <notes><![CDATA[<fluffy>]]></notes>
  <owner/>
</pet>"#;
        assert_eq!(
            decoder.decode(body, "xml").unwrap(),
            json!({
                "@id": 7,
                "name": {"@lang": "en", "#": "Rex & co"},
                "tag": ["good", "boy"],
                "notes": "<fluffy>",
                "owner": ""
            })
        );
    }

    #[test]
    fn xml_item_children_become_a_list() {
        let body = br#"<response><item key="0"><foo>foo1</foo></item><item key="1"><foo>foo2</foo></item></response>"#;
        assert_eq!(
            DefaultDecoder.decode(body, "xml").unwrap(),
            json!([{"@key": 0, "foo": "foo1"}, {"@key": 1, "foo": "foo2"}])
        );
        assert_eq!(
            DefaultDecoder.decode(b"<pets><item>Rex</item></pets>", "xml").unwrap(),
            json!(["Rex"])
        );
    }
}
