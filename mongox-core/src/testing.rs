//! In-memory driver for tests.
//!
//! [`MemoryCollection`] keeps documents in a vector, counts every driver call,
//! and can be told to fail the next call. Filters match on top-level field
//! equality only; updates understand `$set`, `$setOnInsert`, `$unset`, and
//! `$inc`; aggregation understands `$match`, `$skip`, and `$limit`.
//!
//! ```rust,ignore
//! use mongox_core::testing::{DriverOp, MemoryDatabase};
//! use mongox_core::driver::DatabaseDriver;
//!
//! let db = MemoryDatabase::new("test");
//! let users = db.memory_collection("users");
//! assert_eq!(users.calls(DriverOp::InsertOne), 0);
//! assert_eq!(db.collection("users").name(), "users");
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use mongodb::options::{
    AggregateOptions, CountOptions, DeleteOptions, DistinctOptions, FindOneAndUpdateOptions,
    FindOneOptions, FindOptions, InsertManyOptions, InsertOneOptions, ReplaceOptions,
    ReturnDocument, UpdateOptions,
};
use parking_lot::Mutex;

use crate::driver::{
    CollectionDriver, DatabaseDriver, DeleteResult, InsertManyResult, InsertOneResult,
    UpdateResult,
};
use crate::error::{MongoxError, MongoxResult};

/// Driver calls counted by [`MemoryCollection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverOp {
    InsertOne,
    InsertMany,
    UpdateOne,
    UpdateMany,
    ReplaceOne,
    DeleteOne,
    DeleteMany,
    FindOne,
    Find,
    FindOneAndUpdate,
    CountDocuments,
    Distinct,
    Aggregate,
}

/// An in-memory collection.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    name: String,
    docs: Mutex<Vec<Document>>,
    calls: Mutex<HashMap<DriverOp, usize>>,
    last_update: Mutex<Option<Document>>,
    fail_next: Mutex<Option<String>>,
}

impl MemoryCollection {
    /// Create an empty collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a collection pre-filled with documents.
    pub fn with_documents(name: impl Into<String>, docs: Vec<Document>) -> Self {
        let collection = Self::new(name);
        *collection.docs.lock() = docs;
        collection
    }

    /// Snapshot of the stored documents.
    pub fn documents(&self) -> Vec<Document> {
        self.docs.lock().clone()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.lock().len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.docs.lock().is_empty()
    }

    /// How many times `op` was called.
    pub fn calls(&self, op: DriverOp) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    /// Total driver calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// The last update document received by an update, upsert, or
    /// find-and-update call.
    pub fn last_update(&self) -> Option<Document> {
        self.last_update.lock().clone()
    }

    /// Make the next driver call fail with a query error.
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.fail_next.lock() = Some(message.into());
    }

    fn record(&self, op: DriverOp) -> MongoxResult<()> {
        *self.calls.lock().entry(op).or_insert(0) += 1;
        match self.fail_next.lock().take() {
            Some(message) => Err(MongoxError::query(message)),
            None => Ok(()),
        }
    }

    fn update(
        &self,
        filter: &Document,
        update: &Document,
        upsert: bool,
        many: bool,
    ) -> MongoxResult<UpdateResult> {
        *self.last_update.lock() = Some(update.clone());
        let mut docs = self.docs.lock();
        let mut result = UpdateResult::default();

        for doc in docs.iter_mut().filter(|doc| matches(doc, filter)) {
            let before = doc.clone();
            apply_update(doc, update, false)?;
            result.matched_count += 1;
            if *doc != before {
                result.modified_count += 1;
            }
            if !many {
                break;
            }
        }

        if result.matched_count == 0 && upsert {
            let mut doc = equality_fields(filter);
            apply_update(&mut doc, update, true)?;
            let id = ensure_id(&mut doc);
            docs.push(doc);
            result.upserted_id = Some(id);
        }

        Ok(result)
    }
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| doc.get(key) == Some(expected))
}

fn equality_fields(filter: &Document) -> Document {
    filter
        .iter()
        .filter(|(key, value)| !key.starts_with('$') && !is_operator_doc(value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn is_operator_doc(value: &Bson) -> bool {
    value
        .as_document()
        .and_then(|doc| doc.keys().next())
        .is_some_and(|key| key.starts_with('$'))
}

fn ensure_id(doc: &mut Document) -> Bson {
    if let Some(id) = doc.get("_id") {
        return id.clone();
    }
    let id = Bson::ObjectId(ObjectId::new());
    doc.insert("_id", id.clone());
    id
}

fn apply_update(doc: &mut Document, update: &Document, inserting: bool) -> MongoxResult<()> {
    for (operator, fields) in update {
        let fields = fields
            .as_document()
            .ok_or_else(|| MongoxError::query(format!("{} expects a document", operator)))?;
        match operator.as_str() {
            "$set" => doc.extend(fields.clone()),
            "$setOnInsert" if inserting => doc.extend(fields.clone()),
            "$setOnInsert" => {}
            "$unset" => {
                for key in fields.keys() {
                    doc.remove(key);
                }
            }
            "$inc" => {
                for (key, delta) in fields {
                    let current = doc.get(key).cloned().unwrap_or(Bson::Int32(0));
                    doc.insert(key.clone(), add(&current, delta)?);
                }
            }
            other => {
                return Err(MongoxError::query(format!(
                    "unsupported update operator: {}",
                    other
                )));
            }
        }
    }
    Ok(())
}

fn add(current: &Bson, delta: &Bson) -> MongoxResult<Bson> {
    match (current, delta) {
        (Bson::Int32(a), Bson::Int32(b)) => Ok(Bson::Int32(a + b)),
        (Bson::Int64(a), Bson::Int64(b)) => Ok(Bson::Int64(a + b)),
        (Bson::Int32(a), Bson::Int64(b)) => Ok(Bson::Int64(i64::from(*a) + b)),
        (Bson::Int64(a), Bson::Int32(b)) => Ok(Bson::Int64(a + i64::from(*b))),
        (Bson::Double(a), Bson::Double(b)) => Ok(Bson::Double(a + b)),
        _ => Err(MongoxError::query("$inc requires numeric values")),
    }
}

#[async_trait]
impl CollectionDriver for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(
        &self,
        mut doc: Document,
        _options: Option<InsertOneOptions>,
    ) -> MongoxResult<InsertOneResult> {
        self.record(DriverOp::InsertOne)?;
        let inserted_id = ensure_id(&mut doc);
        self.docs.lock().push(doc);
        Ok(InsertOneResult { inserted_id })
    }

    async fn insert_many(
        &self,
        docs: Vec<Document>,
        _options: Option<InsertManyOptions>,
    ) -> MongoxResult<InsertManyResult> {
        self.record(DriverOp::InsertMany)?;
        let mut stored = self.docs.lock();
        let mut result = InsertManyResult::default();
        for (index, mut doc) in docs.into_iter().enumerate() {
            result.inserted_ids.insert(index, ensure_id(&mut doc));
            stored.push(doc);
        }
        Ok(result)
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> MongoxResult<UpdateResult> {
        self.record(DriverOp::UpdateOne)?;
        let upsert = options.and_then(|o| o.upsert).unwrap_or(false);
        self.update(&filter, &update, upsert, false)
    }

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> MongoxResult<UpdateResult> {
        self.record(DriverOp::UpdateMany)?;
        let upsert = options.and_then(|o| o.upsert).unwrap_or(false);
        self.update(&filter, &update, upsert, true)
    }

    async fn replace_one(
        &self,
        filter: Document,
        mut replacement: Document,
        options: Option<ReplaceOptions>,
    ) -> MongoxResult<UpdateResult> {
        self.record(DriverOp::ReplaceOne)?;
        let upsert = options.and_then(|o| o.upsert).unwrap_or(false);
        let mut docs = self.docs.lock();
        let mut result = UpdateResult::default();

        if let Some(doc) = docs.iter_mut().find(|doc| matches(doc, &filter)) {
            if let Some(id) = doc.get("_id").cloned() {
                replacement.insert("_id", id);
            }
            result.matched_count = 1;
            if *doc != replacement {
                result.modified_count = 1;
            }
            *doc = replacement;
        } else if upsert {
            let id = ensure_id(&mut replacement);
            docs.push(replacement);
            result.upserted_id = Some(id);
        }

        Ok(result)
    }

    async fn delete_one(
        &self,
        filter: Document,
        _options: Option<DeleteOptions>,
    ) -> MongoxResult<DeleteResult> {
        self.record(DriverOp::DeleteOne)?;
        let mut docs = self.docs.lock();
        let deleted_count = match docs.iter().position(|doc| matches(doc, &filter)) {
            Some(index) => {
                docs.remove(index);
                1
            }
            None => 0,
        };
        Ok(DeleteResult { deleted_count })
    }

    async fn delete_many(
        &self,
        filter: Document,
        _options: Option<DeleteOptions>,
    ) -> MongoxResult<DeleteResult> {
        self.record(DriverOp::DeleteMany)?;
        let mut docs = self.docs.lock();
        let before = docs.len();
        docs.retain(|doc| !matches(doc, &filter));
        Ok(DeleteResult {
            deleted_count: (before - docs.len()) as u64,
        })
    }

    async fn find_one(
        &self,
        filter: Document,
        _options: Option<FindOneOptions>,
    ) -> MongoxResult<Option<Document>> {
        self.record(DriverOp::FindOne)?;
        Ok(self
            .docs
            .lock()
            .iter()
            .find(|doc| matches(doc, &filter))
            .cloned())
    }

    async fn find(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> MongoxResult<Vec<Document>> {
        self.record(DriverOp::Find)?;
        let (skip, limit) = options
            .map(|o| (o.skip.unwrap_or(0), o.limit.unwrap_or(0)))
            .unwrap_or((0, 0));
        let found = self
            .docs
            .lock()
            .iter()
            .filter(|doc| matches(doc, &filter))
            .skip(skip as usize)
            .take(if limit > 0 { limit as usize } else { usize::MAX })
            .cloned()
            .collect();
        Ok(found)
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: Option<FindOneAndUpdateOptions>,
    ) -> MongoxResult<Option<Document>> {
        self.record(DriverOp::FindOneAndUpdate)?;
        *self.last_update.lock() = Some(update.clone());
        let return_after = options
            .as_ref()
            .is_some_and(|o| matches!(o.return_document, Some(ReturnDocument::After)));

        let mut docs = self.docs.lock();
        let Some(doc) = docs.iter_mut().find(|doc| matches(doc, &filter)) else {
            return Ok(None);
        };
        let before = doc.clone();
        apply_update(doc, &update, false)?;
        Ok(Some(if return_after { doc.clone() } else { before }))
    }

    async fn count_documents(
        &self,
        filter: Document,
        _options: Option<CountOptions>,
    ) -> MongoxResult<u64> {
        self.record(DriverOp::CountDocuments)?;
        Ok(self
            .docs
            .lock()
            .iter()
            .filter(|doc| matches(doc, &filter))
            .count() as u64)
    }

    async fn distinct(
        &self,
        field: &str,
        filter: Document,
        _options: Option<DistinctOptions>,
    ) -> MongoxResult<Vec<Bson>> {
        self.record(DriverOp::Distinct)?;
        let mut values: Vec<Bson> = Vec::new();
        for doc in self.docs.lock().iter().filter(|doc| matches(doc, &filter)) {
            if let Some(value) = doc.get(field) {
                if !values.contains(value) {
                    values.push(value.clone());
                }
            }
        }
        Ok(values)
    }

    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        _options: Option<AggregateOptions>,
    ) -> MongoxResult<Vec<Document>> {
        self.record(DriverOp::Aggregate)?;
        let mut docs = self.docs.lock().clone();
        for stage in &pipeline {
            if let Ok(filter) = stage.get_document("$match") {
                docs.retain(|doc| matches(doc, filter));
            } else if let Some(n) = stage.get("$skip").and_then(as_count) {
                docs = docs.into_iter().skip(n).collect();
            } else if let Some(n) = stage.get("$limit").and_then(as_count) {
                docs.truncate(n);
            } else {
                return Err(MongoxError::query(format!(
                    "unsupported pipeline stage: {}",
                    stage
                )));
            }
        }
        Ok(docs)
    }
}

fn as_count(value: &Bson) -> Option<usize> {
    match value {
        Bson::Int32(n) => usize::try_from(*n).ok(),
        Bson::Int64(n) => usize::try_from(*n).ok(),
        _ => None,
    }
}

/// An in-memory database handing out [`MemoryCollection`]s.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    name: String,
    collections: Mutex<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryDatabase {
    /// Create an empty database.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create a collection, typed for inspection in tests.
    pub fn memory_collection(&self, name: &str) -> Arc<MemoryCollection> {
        Arc::clone(
            self.collections
                .lock()
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(MemoryCollection::new(name))),
        )
    }
}

impl DatabaseDriver for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self, name: &str) -> Arc<dyn CollectionDriver> {
        self.memory_collection(name)
    }
}
