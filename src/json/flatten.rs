//! Path Flattener
//!
//! Walks a parsed JSON document and produces one [`FlattenedField`] per leaf.
//! Objects are recursed into with the path extended by `.<key>`; arrays and
//! scalars are leaves. Traversal follows the document's key order.
//!
//! A top-level scalar yields no leaves. That includes strings: a string
//! document is not split into one leaf per character.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Type tag attached to a flattened leaf
///
/// Mirrors the tags a dynamic runtime would report: `null` is tagged
/// `object`, and `undefined` only appears for fields selected against a
/// document where they no longer resolve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Undefined,
}

impl FieldType {
    /// Type tag of a JSON value
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null | Value::Object(_) => FieldType::Object,
            Value::Bool(_) => FieldType::Boolean,
            Value::Number(_) => FieldType::Number,
            Value::String(_) => FieldType::String,
            Value::Array(_) => FieldType::Array,
        }
    }

    /// Tag name as stored in a [`crate::widget::SelectedField`]
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Undefined => "undefined",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single addressable leaf of a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlattenedField {
    /// Dotted path, unique within one flattening
    pub path: String,
    /// The leaf value (scalar, array, or null)
    pub value: Value,
    /// Type tag of `value`
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Flatten a document into its leaves
///
/// A top-level object yields its keys; a top-level array yields its elements
/// addressed by index (`0`, `1.price`, ...) with nested arrays kept as
/// leaves; a top-level scalar (string included) has no addressable leaves.
pub fn flatten(document: &Value) -> Vec<FlattenedField> {
    let mut result = Vec::new();

    match document {
        Value::Object(map) => flatten_object(map, "", &mut result),
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                visit(&idx.to_string(), item, &mut result);
            }
        }
        _ => {}
    }

    result
}

fn flatten_object(map: &Map<String, Value>, prefix: &str, result: &mut Vec<FlattenedField>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        visit(&path, value, result);
    }
}

fn visit(path: &str, value: &Value, result: &mut Vec<FlattenedField>) {
    match value {
        Value::Object(map) => flatten_object(map, path, result),
        leaf => result.push(FlattenedField {
            path: path.to_string(),
            value: leaf.clone(),
            field_type: FieldType::of(leaf),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::resolve;
    use serde_json::json;

    #[test]
    fn test_flat_scalars() {
        let doc = json!({"price": 42.5, "symbol": "BTC", "open": true});
        let fields = flatten(&doc);

        assert_eq!(fields.len(), 3);
        let paths: Vec<&str> = fields.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["price", "symbol", "open"]);
        assert_eq!(fields[0].field_type, FieldType::Number);
        assert_eq!(fields[1].field_type, FieldType::String);
        assert_eq!(fields[2].field_type, FieldType::Boolean);
    }

    #[test]
    fn test_nested_object() {
        let fields = flatten(&json!({"a": {"b": 1}}));

        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].path, "a.b");
        assert_eq!(fields[0].value, json!(1));
        assert_eq!(fields[0].field_type, FieldType::Number);
    }

    #[test]
    fn test_arrays_are_leaves() {
        let fields = flatten(&json!({"data": {"items": [{"x": 1}, {"x": 2}]}}));

        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].path, "data.items");
        assert_eq!(fields[0].field_type, FieldType::Array);
        assert_eq!(fields[0].value, json!([{"x": 1}, {"x": 2}]));
    }

    #[test]
    fn test_null_is_object_leaf() {
        let fields = flatten(&json!({"missing": null, "empty": {}}));

        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].path, "missing");
        assert_eq!(fields[0].field_type, FieldType::Object);
    }

    #[test]
    fn test_top_level_array() {
        let fields = flatten(&json!([{"price": 1}, [1, 2], "x"]));
        let paths: Vec<&str> = fields.iter().map(|f| f.path.as_str()).collect();

        assert_eq!(paths, vec!["0.price", "1", "2"]);
        assert_eq!(fields[1].field_type, FieldType::Array);
    }

    #[test]
    fn test_top_level_scalar() {
        assert!(flatten(&json!(12)).is_empty());
        assert!(flatten(&json!("text")).is_empty());
        assert!(flatten(&Value::Null).is_empty());
    }

    #[test]
    fn test_top_level_string_is_not_split() {
        assert!(flatten(&json!("BTC")).is_empty());
        assert!(resolve(&json!("BTC"), "0").is_none());
    }

    #[test]
    fn test_type_tag_serialization() {
        let field = FlattenedField {
            path: "a".to_string(),
            value: json!([1]),
            field_type: FieldType::Array,
        };
        let encoded = serde_json::to_value(&field).unwrap();
        assert_eq!(encoded, json!({"path": "a", "value": [1], "type": "array"}));
    }
}
