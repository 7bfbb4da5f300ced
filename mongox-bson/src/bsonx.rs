//! Shorthands for building BSON documents, elements, and arrays.
//!
//! ```rust
//! use mongox_bson::bsonx;
//!
//! let filter = bsonx::d([bsonx::e("name", "Alice"), bsonx::e("age", 30)]);
//! assert_eq!(filter.keys().collect::<Vec<_>>(), ["name", "age"]);
//! ```

use std::collections::HashMap;

use bson::{Bson, Document, oid::ObjectId};

/// Build a single key/value element.
pub fn e(key: impl Into<String>, value: impl Into<Bson>) -> (String, Bson) {
    (key.into(), value.into())
}

/// Build an ordered document from elements.
pub fn d<K, V>(elements: impl IntoIterator<Item = (K, V)>) -> Document
where
    K: Into<String>,
    V: Into<Bson>,
{
    elements
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Build a single-entry document.
pub fn m(key: impl Into<String>, value: impl Into<Bson>) -> Document {
    let mut doc = Document::new();
    doc.insert(key.into(), value.into());
    doc
}

/// Build a BSON array.
pub fn a<V: Into<Bson>>(values: impl IntoIterator<Item = V>) -> Bson {
    Bson::Array(values.into_iter().map(Into::into).collect())
}

/// Build an `{ "_id": value }` document.
pub fn id(value: impl Into<Bson>) -> Document {
    m("_id", value)
}

/// Build an `{ "_id": ObjectId }` document from a hex string.
pub fn object_id_from_hex(hex: &str) -> Result<Document, bson::oid::Error> {
    Ok(id(ObjectId::parse_str(hex)?))
}

/// Build a document from a map with keys in lexical order.
///
/// Maps have no stable iteration order; sorting makes the output
/// deterministic for command documents and tests.
pub fn string_sorted_keys<V: Into<Bson>>(map: HashMap<String, V>) -> Document {
    let mut entries: Vec<(String, V)> = map.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    d(entries)
}
