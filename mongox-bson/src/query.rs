//! Query (filter) document building.

use bson::{Bson, Document, doc, oid::ObjectId};

/// Builder for MongoDB filter documents.
///
/// Conditions on different fields accumulate in the same document. Operator
/// conditions on the same field merge into one operator document, so
/// `gte("age", 18).lt("age", 65)` yields `{ "age": { "$gte": 18, "$lt": 65 } }`.
///
/// # Example
///
/// ```rust
/// use mongox_bson::QueryBuilder;
///
/// let filter = QueryBuilder::new()
///     .eq("status", "active")
///     .gte("age", 18)
///     .regex("email", r"@example\.com$")
///     .build();
///
/// assert_eq!(filter.get_str("status").unwrap(), "active");
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    doc: Document,
}

impl QueryBuilder {
    /// Create a new empty query builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a query builder from an existing document.
    pub fn from_doc(doc: Document) -> Self {
        Self { doc }
    }

    fn operator(mut self, field: &str, op: &str, value: impl Into<Bson>) -> Self {
        match self.doc.get_mut(field) {
            Some(Bson::Document(existing)) if existing.keys().all(|k| k.starts_with('$')) => {
                existing.insert(op, value.into());
            }
            _ => {
                let mut condition = Document::new();
                condition.insert(op, value.into());
                self.doc.insert(field, condition);
            }
        }
        self
    }

    /// Add an equality condition.
    pub fn eq(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.doc.insert(field, value.into());
        self
    }

    /// Add a not-equal condition.
    pub fn ne(self, field: &str, value: impl Into<Bson>) -> Self {
        self.operator(field, "$ne", value)
    }

    /// Add a greater-than condition.
    pub fn gt(self, field: &str, value: impl Into<Bson>) -> Self {
        self.operator(field, "$gt", value)
    }

    /// Add a greater-than-or-equal condition.
    pub fn gte(self, field: &str, value: impl Into<Bson>) -> Self {
        self.operator(field, "$gte", value)
    }

    /// Add a less-than condition.
    pub fn lt(self, field: &str, value: impl Into<Bson>) -> Self {
        self.operator(field, "$lt", value)
    }

    /// Add a less-than-or-equal condition.
    pub fn lte(self, field: &str, value: impl Into<Bson>) -> Self {
        self.operator(field, "$lte", value)
    }

    /// Add an "in" condition (value in array).
    pub fn in_array<V: Into<Bson>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.operator(field, "$in", values)
    }

    /// Add a "not in" condition.
    pub fn not_in<V: Into<Bson>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.operator(field, "$nin", values)
    }

    /// Add a regex condition.
    pub fn regex(self, field: &str, pattern: &str) -> Self {
        self.operator(field, "$regex", pattern)
    }

    /// Add a regex condition with options.
    pub fn regex_with_options(self, field: &str, pattern: &str, options: &str) -> Self {
        self.operator(field, "$regex", pattern)
            .operator(field, "$options", options)
    }

    /// Add an exists condition.
    pub fn exists(self, field: &str, exists: bool) -> Self {
        self.operator(field, "$exists", exists)
    }

    /// Add a type check condition.
    pub fn type_is(self, field: &str, bson_type: &str) -> Self {
        self.operator(field, "$type", bson_type)
    }

    /// Add an array size condition.
    pub fn size(self, field: &str, size: i32) -> Self {
        self.operator(field, "$size", size)
    }

    /// Add an array "all" condition (array contains all values).
    pub fn all<V: Into<Bson>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.operator(field, "$all", values)
    }

    /// Add an elemMatch condition for array elements.
    pub fn elem_match(self, field: &str, query: Document) -> Self {
        self.operator(field, "$elemMatch", query)
    }

    /// Add a NOT condition.
    pub fn not(self, field: &str, condition: Document) -> Self {
        self.operator(field, "$not", condition)
    }

    /// Add a text search condition.
    pub fn text_search(mut self, search: &str) -> Self {
        self.doc.insert("$text", doc! { "$search": search });
        self
    }

    /// Add an `_id` equality condition.
    pub fn id(mut self, id: impl Into<Bson>) -> Self {
        self.doc.insert("_id", id.into());
        self
    }

    /// Add an `_id` condition from a hex ObjectId string.
    pub fn id_hex(self, id: &str) -> Result<Self, bson::oid::Error> {
        let oid = ObjectId::parse_str(id)?;
        Ok(self.id(oid))
    }

    /// Combine with AND ($and).
    pub fn and(mut self, conditions: Vec<Document>) -> Self {
        self.doc.insert("$and", conditions);
        self
    }

    /// Combine with OR ($or).
    pub fn or(mut self, conditions: Vec<Document>) -> Self {
        self.doc.insert("$or", conditions);
        self
    }

    /// Combine with NOR ($nor).
    pub fn nor(mut self, conditions: Vec<Document>) -> Self {
        self.doc.insert("$nor", conditions);
        self
    }

    /// Merge another filter into this one. Keys in `other` win.
    pub fn merge(mut self, other: Document) -> Self {
        for (k, v) in other {
            self.doc.insert(k, v);
        }
        self
    }

    /// Build the filter document.
    pub fn build(self) -> Document {
        self.doc
    }

    /// Check if the filter is empty.
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }
}

impl From<QueryBuilder> for Document {
    fn from(builder: QueryBuilder) -> Self {
        builder.build()
    }
}

/// Create an empty filter (matches all documents).
pub fn all() -> Document {
    doc! {}
}

/// Create an equality filter on one field.
pub fn eq(field: &str, value: impl Into<Bson>) -> Document {
    QueryBuilder::new().eq(field, value).build()
}

/// Create an `_id` filter.
pub fn id(id: impl Into<Bson>) -> Document {
    QueryBuilder::new().id(id).build()
}

/// Create an "in" filter on one field.
pub fn in_array<V: Into<Bson>>(field: &str, values: impl IntoIterator<Item = V>) -> Document {
    QueryBuilder::new().in_array(field, values).build()
}
