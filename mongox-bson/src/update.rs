//! Update document building.

use bson::{Bson, Document, doc};

/// Builder for MongoDB update documents.
///
/// Each call adds a field to the matching operator document. Repeated calls
/// for the same operator merge into a single `$op` entry.
///
/// # Example
///
/// ```rust
/// use mongox_bson::{UpdateBuilder, doc};
///
/// let update = UpdateBuilder::new()
///     .set("name", "Alice")
///     .set("age", 31)
///     .inc("logins", 1)
///     .build();
///
/// assert_eq!(update, doc! { "$set": { "name": "Alice", "age": 31 }, "$inc": { "logins": 1 } });
/// ```
#[derive(Debug, Clone, Default)]
pub struct UpdateBuilder {
    doc: Document,
}

impl UpdateBuilder {
    /// Create a new empty update builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an update builder from an existing update document.
    pub fn from_doc(doc: Document) -> Self {
        Self { doc }
    }

    fn push_op(mut self, op: &str, field: &str, value: impl Into<Bson>) -> Self {
        match self.doc.get_mut(op) {
            Some(Bson::Document(fields)) => {
                fields.insert(field, value.into());
            }
            _ => {
                let mut fields = Document::new();
                fields.insert(field, value.into());
                self.doc.insert(op, fields);
            }
        }
        self
    }

    /// Set a field (`$set`).
    pub fn set(self, field: &str, value: impl Into<Bson>) -> Self {
        self.push_op("$set", field, value)
    }

    /// Set every field of a document (`$set`).
    pub fn set_fields(self, fields: Document) -> Self {
        fields
            .into_iter()
            .fold(self, |builder, (k, v)| builder.push_op("$set", &k, v))
    }

    /// Remove a field (`$unset`).
    pub fn unset(self, field: &str) -> Self {
        self.push_op("$unset", field, "")
    }

    /// Increment a numeric field (`$inc`).
    pub fn inc(self, field: &str, amount: impl Into<Bson>) -> Self {
        self.push_op("$inc", field, amount)
    }

    /// Multiply a numeric field (`$mul`).
    pub fn mul(self, field: &str, factor: impl Into<Bson>) -> Self {
        self.push_op("$mul", field, factor)
    }

    /// Keep the smaller of the current and given value (`$min`).
    pub fn min(self, field: &str, value: impl Into<Bson>) -> Self {
        self.push_op("$min", field, value)
    }

    /// Keep the larger of the current and given value (`$max`).
    pub fn max(self, field: &str, value: impl Into<Bson>) -> Self {
        self.push_op("$max", field, value)
    }

    /// Rename a field (`$rename`).
    pub fn rename(self, field: &str, new_name: &str) -> Self {
        self.push_op("$rename", field, new_name)
    }

    /// Set a field to the current date (`$currentDate`).
    pub fn current_date(self, field: &str) -> Self {
        self.push_op("$currentDate", field, true)
    }

    /// Set a field only when an upsert inserts (`$setOnInsert`).
    pub fn set_on_insert(self, field: &str, value: impl Into<Bson>) -> Self {
        self.push_op("$setOnInsert", field, value)
    }

    /// Append a value to an array (`$push`).
    pub fn push(self, field: &str, value: impl Into<Bson>) -> Self {
        self.push_op("$push", field, value)
    }

    /// Append several values to an array (`$push` with `$each`).
    pub fn push_each<V: Into<Bson>>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.push_op("$push", field, doc! { "$each": values })
    }

    /// Add a value to an array unless present (`$addToSet`).
    pub fn add_to_set(self, field: &str, value: impl Into<Bson>) -> Self {
        self.push_op("$addToSet", field, value)
    }

    /// Add several values to an array unless present (`$addToSet` with `$each`).
    pub fn add_to_set_each<V: Into<Bson>>(
        self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.push_op("$addToSet", field, doc! { "$each": values })
    }

    /// Remove matching values from an array (`$pull`).
    pub fn pull(self, field: &str, condition: impl Into<Bson>) -> Self {
        self.push_op("$pull", field, condition)
    }

    /// Remove the first (`-1`) or last (`1`) array element (`$pop`).
    pub fn pop(self, field: &str, end: i32) -> Self {
        self.push_op("$pop", field, end)
    }

    /// Build the update document.
    pub fn build(self) -> Document {
        self.doc
    }

    /// Check if no operators have been added.
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }
}

impl From<UpdateBuilder> for Document {
    fn from(builder: UpdateBuilder) -> Self {
        builder.build()
    }
}

/// Create a `$set` update for a single field.
pub fn set(field: &str, value: impl Into<Bson>) -> Document {
    UpdateBuilder::new().set(field, value).build()
}

/// Create a `$set` update from a document of fields.
pub fn set_fields(fields: Document) -> Document {
    doc! { "$set": fields }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_merges() {
        let update = UpdateBuilder::new().set("a", 1).set("b", "two").build();
        assert_eq!(update, doc! { "$set": { "a": 1, "b": "two" } });
    }

    #[test]
    fn test_set_fields() {
        let update = UpdateBuilder::new()
            .set("a", 1)
            .set_fields(doc! { "b": 2, "c": 3 })
            .build();
        assert_eq!(update, doc! { "$set": { "a": 1, "b": 2, "c": 3 } });
    }

    #[test]
    fn test_mixed_operators() {
        let update = UpdateBuilder::new()
            .unset("legacy")
            .inc("count", 2)
            .set_on_insert("created", true)
            .build();

        assert_eq!(
            update,
            doc! {
                "$unset": { "legacy": "" },
                "$inc": { "count": 2 },
                "$setOnInsert": { "created": true },
            }
        );
    }

    #[test]
    fn test_array_operators() {
        let update = UpdateBuilder::new()
            .push_each("tags", ["a", "b"])
            .add_to_set("roles", "admin")
            .pop("queue", -1)
            .build();

        assert_eq!(
            update.get_document("$push").unwrap(),
            &doc! { "tags": { "$each": ["a", "b"] } }
        );
        assert_eq!(
            update.get_document("$addToSet").unwrap(),
            &doc! { "roles": "admin" }
        );
        assert_eq!(update.get_document("$pop").unwrap(), &doc! { "queue": -1 });
    }

    #[test]
    fn test_from_doc_extends_existing_operator() {
        let update = UpdateBuilder::from_doc(doc! { "$set": { "a": 1 } })
            .set("b", 2)
            .build();
        assert_eq!(update, doc! { "$set": { "a": 1, "b": 2 } });
    }

    #[test]
    fn test_free_helpers() {
        assert_eq!(set("x", 1), doc! { "$set": { "x": 1 } });
        assert_eq!(set_fields(doc! { "y": 2 }), doc! { "$set": { "y": 2 } });
    }
}
