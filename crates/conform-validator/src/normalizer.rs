//! Coercion of raw string values into the types their schema declares.
//!
//! Query strings, path variables, headers and form bodies only carry strings;
//! each value is converted according to the `type` (and for arrays the
//! `collectionFormat` and `items.type`) of its property schema before the
//! structural check runs. Values that don't convert are left untouched so the
//! checker reports them.

use serde_json::{Map, Number, Value};

use crate::error::ValidationError;

/// Parse an `application/x-www-form-urlencoded` string into an object.
///
/// Repeated keys and keys suffixed with `[]` collect into arrays.
pub fn parse_query(query: &str) -> Map<String, Value> {
    let mut values = Map::new();

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let (key, is_list) = match key.strip_suffix("[]") {
            Some(stripped) => (stripped.to_string(), true),
            None => (key.into_owned(), false),
        };
        let value = Value::String(value.into_owned());

        match values.get_mut(&key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None if is_list => {
                values.insert(key, Value::Array(vec![value]));
            }
            None => {
                values.insert(key, value);
            }
        }
    }

    values
}

/// Coerce each value of `values` using the matching property of `schema`.
pub fn normalize(
    mut values: Map<String, Value>,
    schema: &Value,
) -> Result<Map<String, Value>, ValidationError> {
    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        return Ok(values);
    };

    for (name, value) in values.iter_mut() {
        if let Some(property) = properties.get(name) {
            *value = normalize_value(name, value.take(), property)?;
        }
    }
    Ok(values)
}

fn normalize_value(name: &str, value: Value, schema: &Value) -> Result<Value, ValidationError> {
    let declared = schema.get("type").and_then(|t| t.as_str());
    let collection_format = schema.get("collectionFormat").and_then(|f| f.as_str());

    if declared == Some("array") || collection_format.is_some() {
        let items = split_collection(name, value, collection_format.unwrap_or("csv"))?;
        let item_type = schema
            .get("items")
            .and_then(|i| i.get("type"))
            .and_then(|t| t.as_str());
        return Ok(match (items, item_type) {
            (Value::Array(items), Some(item_type)) => Value::Array(
                items
                    .into_iter()
                    .map(|item| coerce_scalar(item, item_type))
                    .collect(),
            ),
            (other, _) => other,
        });
    }

    Ok(match declared {
        Some(declared) => coerce_scalar(value, declared),
        None => value,
    })
}

fn split_collection(name: &str, value: Value, format: &str) -> Result<Value, ValidationError> {
    let separator = match format {
        "csv" => ',',
        "ssv" => ' ',
        "tsv" => '\t',
        "pipes" => '|',
        "multi" => {
            return Ok(match value {
                Value::String(_) => Value::Array(vec![value]),
                other => other,
            })
        }
        other => {
            return Err(ValidationError::UnsupportedCollectionFormat {
                name: name.to_string(),
                format: other.to_string(),
            })
        }
    };

    let split = |s: &str| -> Vec<Value> {
        s.split(separator)
            .map(|part| Value::String(part.to_string()))
            .collect()
    };

    Ok(match value {
        Value::String(s) => Value::Array(split(&s)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .flat_map(|item| match item {
                    Value::String(s) => split(&s),
                    other => vec![other],
                })
                .collect(),
        ),
        other => other,
    })
}

/// Convert a string to `declared` when it parses cleanly.
pub fn coerce_scalar(value: Value, declared: &str) -> Value {
    let Value::String(raw) = &value else {
        return value;
    };

    let coerced = match declared {
        "boolean" => match raw.as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        "integer" => parse_integer(raw).map(|i| Value::Number(i.into())),
        "number" => parse_finite(raw).and_then(Number::from_f64).map(Value::Number),
        _ => None,
    };
    coerced.unwrap_or(value)
}

fn parse_integer(raw: &str) -> Option<i64> {
    if let Ok(i) = raw.parse::<i64>() {
        return Some(i);
    }
    // Fractional numerics truncate toward zero.
    let f = parse_finite(raw)?.trunc();
    if f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalized(values: Value, schema: Value) -> Value {
        let Value::Object(values) = values else {
            panic!("values must be an object");
        };
        Value::Object(normalize(values, &schema).unwrap())
    }

    fn properties(props: Value) -> Value {
        json!({"type": "object", "properties": props})
    }

    #[test]
    fn parse_query_collects_repeated_keys() {
        let parsed = parse_query("a=1&b=x%20y&a=2&c[]=only&d=&e+f=g+h");
        assert_eq!(
            Value::Object(parsed),
            json!({
                "a": ["1", "2"],
                "b": "x y",
                "c": ["only"],
                "d": "",
                "e f": "g h"
            })
        );
        assert!(parse_query("").is_empty());
    }

    #[test]
    fn integers_and_numbers() {
        let schema = properties(json!({
            "n": {"type": "integer"},
            "f": {"type": "integer"},
            "x": {"type": "number"},
            "bad": {"type": "integer"},
            "inf": {"type": "number"}
        }));
        assert_eq!(
            normalized(
                json!({"n": "42", "f": "-3.9", "x": "2.5", "bad": "4a", "inf": "inf"}),
                schema
            ),
            json!({"n": 42, "f": -3, "x": 2.5, "bad": "4a", "inf": "inf"})
        );
    }

    #[test]
    fn booleans() {
        let schema = properties(json!({"b": {"type": "boolean"}}));
        assert_eq!(normalized(json!({"b": "false"}), schema.clone()), json!({"b": false}));
        assert_eq!(normalized(json!({"b": "1"}), schema.clone()), json!({"b": true}));
        assert_eq!(normalized(json!({"b": "0"}), schema.clone()), json!({"b": false}));
        assert_eq!(normalized(json!({"b": "yes"}), schema), json!({"b": "yes"}));
    }

    #[test]
    fn collection_formats_split() {
        let schema = properties(json!({
            "t": {"type": "array", "collectionFormat": "csv", "items": {"type": "string"}},
            "s": {"type": "array", "collectionFormat": "ssv"},
            "p": {"type": "array", "collectionFormat": "pipes", "items": {"type": "integer"}},
            "tab": {"type": "array", "collectionFormat": "tsv"},
            "m": {"type": "array", "collectionFormat": "multi", "items": {"type": "boolean"}},
            "d": {"type": "array"}
        }));
        assert_eq!(
            normalized(
                json!({
                    "t": "a,b,c",
                    "s": "a b",
                    "p": "1|2|x",
                    "tab": "a\tb",
                    "m": "true",
                    "d": ["x,y", "z"]
                }),
                schema
            ),
            json!({
                "t": ["a", "b", "c"],
                "s": ["a", "b"],
                "p": [1, 2, "x"],
                "tab": ["a", "b"],
                "m": [true],
                "d": ["x", "y", "z"]
            })
        );
    }

    #[test]
    fn unknown_collection_format_is_fatal() {
        let schema = properties(json!({"t": {"type": "array", "collectionFormat": "semicolon"}}));
        let Value::Object(values) = json!({"t": "a;b"}) else {
            unreachable!()
        };
        assert_eq!(
            normalize(values, &schema).unwrap_err(),
            ValidationError::UnsupportedCollectionFormat {
                name: "t".into(),
                format: "semicolon".into()
            }
        );
    }

    #[test]
    fn undeclared_values_are_left_alone() {
        let schema = properties(json!({"n": {"type": "integer"}}));
        assert_eq!(
            normalized(json!({"n": "1", "other": "2"}), schema),
            json!({"n": 1, "other": "2"})
        );
        assert_eq!(
            normalized(json!({"n": "1"}), json!({"type": "object"})),
            json!({"n": "1"})
        );
    }
}
