//! Generic document values
//!
//! Provides [`Value`], the closed set of shapes a stored record can take,
//! and [`Document`], the string-keyed mapping at the root of every record.
//! Conversions to and from [`serde_json::Value`] are lossless except for
//! non-finite floats, which JSON cannot carry and which become `null`.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

/// A single value inside a document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    /// Explicit null
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer or floating point number
    Number(Number),
    /// UTF-8 string
    String(String),
    /// Nested document
    Document(Document),
    /// Ordered list of values
    List(Vec<Value>),
}

/// Numeric payload
///
/// Integers are kept apart from floats so that identifiers and counters
/// survive a round trip through the target store unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Signed integer
    Int(i64),
    /// Unsigned integer beyond `i64::MAX`
    UInt(u64),
    /// Floating point
    Float(f64),
}

impl Value {
    /// Check for null
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow as string, if this is a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as document, if this is a document
    #[inline]
    #[must_use]
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Borrow as list, if this is a list
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Document(_) => "document",
            Self::List(_) => "list",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(Number::Int(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(Number::Float(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Self::Document(doc)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Number(Number::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Self::Number(Number::UInt(u))
                } else {
                    n.as_f64()
                        .map_or(Self::Null, |f| Self::Number(Number::Float(f)))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Document(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(Number::Int(i)) => Self::from(i),
            Value::Number(Number::UInt(u)) => Self::from(u),
            Value::Number(Number::Float(f)) => {
                serde_json::Number::from_f64(f).map_or(Self::Null, Self::Number)
            }
            Value::String(s) => Self::String(s),
            Value::Document(doc) => doc.into(),
            Value::List(items) => Self::Array(items.into_iter().map(Self::from).collect()),
        }
    }
}

/// String-keyed mapping of values
///
/// Key order carries no meaning; entries are held sorted so that iteration,
/// serialization and collision resolution are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(BTreeMap<String, Value>);

impl Document {
    /// Create empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON value; `None` unless it is an object
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Option<Self> {
        match Value::from(json) {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Convert to a JSON object
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        self.clone().into()
    }

    /// Look up a field
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a string field
    #[inline]
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Look up a nested document field
    #[inline]
    #[must_use]
    pub fn get_document(&self, key: &str) -> Option<&Document> {
        self.get(key).and_then(Value::as_document)
    }

    /// Insert a field, returning the previous value
    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a field
    #[inline]
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Check whether a field is present
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no fields
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate fields in key order
    #[inline]
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Iterate keys in order
    #[inline]
    pub fn keys(&self) -> btree_map::Keys<'_, String, Value> {
        self.0.keys()
    }
}

impl From<Document> for serde_json::Value {
    fn from(doc: Document) -> Self {
        Self::Object(
            doc.0
                .into_iter()
                .map(|(key, value)| (key, Self::from(value)))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_numbers_keep_integer_precision() {
        let json = serde_json::json!({"id": 10, "big": u64::MAX, "ratio": 0.5});
        let doc = Document::from_json(json).unwrap();

        assert_eq!(doc.get("id"), Some(&Value::Number(Number::Int(10))));
        assert_eq!(doc.get("big"), Some(&Value::Number(Number::UInt(u64::MAX))));
        assert_eq!(doc.get("ratio"), Some(&Value::Number(Number::Float(0.5))));
    }

    #[test]
    fn non_finite_float_becomes_null_in_json() {
        let json: serde_json::Value = Value::from(f64::NAN).into();
        assert!(json.is_null());
    }

    #[test]
    fn from_json_rejects_non_objects() {
        assert!(Document::from_json(serde_json::json!([1, 2])).is_none());
        assert!(Document::from_json(serde_json::json!("text")).is_none());
    }

    #[test]
    fn serde_uses_plain_json_shape() {
        let mut doc = Document::new();
        doc.insert("name", "SFO");
        doc.insert("tags", vec![Value::from("a"), Value::Null]);

        let text = serde_json::to_string(&doc).unwrap();
        assert_eq!(text, r#"{"name":"SFO","tags":["a",null]}"#);

        let back: Document = serde_json::from_str(&text).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn accessors() {
        let mut inner = Document::new();
        inner.insert("scope", "inventory");
        let mut doc = Document::new();
        doc.insert("keyspaces", inner);

        assert_eq!(
            doc.get_document("keyspaces").and_then(|k| k.get_str("scope")),
            Some("inventory")
        );
        assert_eq!(doc.get("keyspaces").map(Value::kind), Some("document"));
        assert!(doc.get_str("keyspaces").is_none());
    }
}
