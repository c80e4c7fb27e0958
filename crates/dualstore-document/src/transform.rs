//! Document transformation
//!
//! Structural recursion over [`Value`] that rewrites every mapping key with
//! [`normalize_key`]. Lists keep their length and order; scalars are cloned
//! as-is. The input is never mutated.
//!
//! Input must be acyclic. Owned [`Value`] trees cannot form cycles, so this
//! only matters for callers assembling values from shared references; such
//! input is outside the contract and is not detected.
//!
//! When two keys normalize to the same name ("Flight Name" and
//! "flight_name"), the entry whose original key sorts last wins.

use crate::normalize::normalize_key;
use crate::value::{Document, Value};

/// Normalize every key of a document, recursively
#[must_use]
pub fn transform(doc: &Document) -> Document {
    doc.iter()
        .map(|(key, value)| (normalize_key(key), transform_value(value)))
        .collect()
}

/// Normalize every key reachable from a value
#[must_use]
pub fn transform_value(value: &Value) -> Value {
    match value {
        Value::Document(doc) => Value::Document(transform(doc)),
        Value::List(items) => Value::List(items.iter().map(transform_value).collect()),
        scalar => scalar.clone(),
    }
}
