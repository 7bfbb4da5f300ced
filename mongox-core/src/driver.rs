//! The seam between the façades and the MongoDB driver.
//!
//! Façades only talk to [`CollectionDriver`]. The implementation for
//! `mongodb::Collection<Document>` forwards every call to the official
//! driver unchanged; tests swap in the in-memory driver from
//! [`crate::testing`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::TryStreamExt;
use mongodb::options::{
    AggregateOptions, CountOptions, DeleteOptions, DistinctOptions, FindOneAndUpdateOptions,
    FindOneOptions, FindOptions, InsertManyOptions, InsertOneOptions, ReplaceOptions,
    UpdateOptions,
};

use crate::error::MongoxResult;

/// Result of a single insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneResult {
    /// `_id` of the inserted document.
    pub inserted_id: Bson,
}

/// Result of a bulk insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertManyResult {
    /// `_id` of each inserted document, keyed by its input position.
    pub inserted_ids: HashMap<usize, Bson>,
}

/// Result of an update, replace, or upsert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
    /// `_id` of the document an upsert created.
    pub upserted_id: Option<Bson>,
}

/// Result of a delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

impl From<mongodb::results::InsertOneResult> for InsertOneResult {
    fn from(result: mongodb::results::InsertOneResult) -> Self {
        Self {
            inserted_id: result.inserted_id,
        }
    }
}

impl From<mongodb::results::InsertManyResult> for InsertManyResult {
    fn from(result: mongodb::results::InsertManyResult) -> Self {
        Self {
            inserted_ids: result.inserted_ids,
        }
    }
}

impl From<mongodb::results::UpdateResult> for UpdateResult {
    fn from(result: mongodb::results::UpdateResult) -> Self {
        Self {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        }
    }
}

impl From<mongodb::results::DeleteResult> for DeleteResult {
    fn from(result: mongodb::results::DeleteResult) -> Self {
        Self {
            deleted_count: result.deleted_count,
        }
    }
}

/// Document-level operations on one collection.
#[async_trait]
pub trait CollectionDriver: Send + Sync {
    /// Collection name.
    fn name(&self) -> &str;

    async fn insert_one(
        &self,
        doc: Document,
        options: Option<InsertOneOptions>,
    ) -> MongoxResult<InsertOneResult>;

    async fn insert_many(
        &self,
        docs: Vec<Document>,
        options: Option<InsertManyOptions>,
    ) -> MongoxResult<InsertManyResult>;

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> MongoxResult<UpdateResult>;

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> MongoxResult<UpdateResult>;

    async fn replace_one(
        &self,
        filter: Document,
        replacement: Document,
        options: Option<ReplaceOptions>,
    ) -> MongoxResult<UpdateResult>;

    async fn delete_one(
        &self,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> MongoxResult<DeleteResult>;

    async fn delete_many(
        &self,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> MongoxResult<DeleteResult>;

    async fn find_one(
        &self,
        filter: Document,
        options: Option<FindOneOptions>,
    ) -> MongoxResult<Option<Document>>;

    async fn find(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> MongoxResult<Vec<Document>>;

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: Option<FindOneAndUpdateOptions>,
    ) -> MongoxResult<Option<Document>>;

    async fn count_documents(
        &self,
        filter: Document,
        options: Option<CountOptions>,
    ) -> MongoxResult<u64>;

    async fn distinct(
        &self,
        field: &str,
        filter: Document,
        options: Option<DistinctOptions>,
    ) -> MongoxResult<Vec<Bson>>;

    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        options: Option<AggregateOptions>,
    ) -> MongoxResult<Vec<Document>>;
}

/// A database: a name and a way to open collections.
pub trait DatabaseDriver: Send + Sync {
    /// Database name.
    fn name(&self) -> &str;

    /// Open a collection by name.
    fn collection(&self, name: &str) -> Arc<dyn CollectionDriver>;
}

#[async_trait]
impl CollectionDriver for mongodb::Collection<Document> {
    fn name(&self) -> &str {
        mongodb::Collection::name(self)
    }

    async fn insert_one(
        &self,
        doc: Document,
        options: Option<InsertOneOptions>,
    ) -> MongoxResult<InsertOneResult> {
        Ok(mongodb::Collection::insert_one(self, doc, options).await?.into())
    }

    async fn insert_many(
        &self,
        docs: Vec<Document>,
        options: Option<InsertManyOptions>,
    ) -> MongoxResult<InsertManyResult> {
        Ok(mongodb::Collection::insert_many(self, docs, options).await?.into())
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> MongoxResult<UpdateResult> {
        Ok(mongodb::Collection::update_one(self, filter, update, options)
            .await?
            .into())
    }

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> MongoxResult<UpdateResult> {
        Ok(mongodb::Collection::update_many(self, filter, update, options)
            .await?
            .into())
    }

    async fn replace_one(
        &self,
        filter: Document,
        replacement: Document,
        options: Option<ReplaceOptions>,
    ) -> MongoxResult<UpdateResult> {
        Ok(mongodb::Collection::replace_one(self, filter, replacement, options)
            .await?
            .into())
    }

    async fn delete_one(
        &self,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> MongoxResult<DeleteResult> {
        Ok(mongodb::Collection::delete_one(self, filter, options).await?.into())
    }

    async fn delete_many(
        &self,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> MongoxResult<DeleteResult> {
        Ok(mongodb::Collection::delete_many(self, filter, options).await?.into())
    }

    async fn find_one(
        &self,
        filter: Document,
        options: Option<FindOneOptions>,
    ) -> MongoxResult<Option<Document>> {
        Ok(mongodb::Collection::find_one(self, filter, options).await?)
    }

    async fn find(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> MongoxResult<Vec<Document>> {
        let cursor = mongodb::Collection::find(self, filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: Option<FindOneAndUpdateOptions>,
    ) -> MongoxResult<Option<Document>> {
        Ok(mongodb::Collection::find_one_and_update(self, filter, update, options).await?)
    }

    async fn count_documents(
        &self,
        filter: Document,
        options: Option<CountOptions>,
    ) -> MongoxResult<u64> {
        Ok(mongodb::Collection::count_documents(self, filter, options).await?)
    }

    async fn distinct(
        &self,
        field: &str,
        filter: Document,
        options: Option<DistinctOptions>,
    ) -> MongoxResult<Vec<Bson>> {
        Ok(mongodb::Collection::distinct(self, field, filter, options).await?)
    }

    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        options: Option<AggregateOptions>,
    ) -> MongoxResult<Vec<Document>> {
        let cursor = mongodb::Collection::aggregate(self, pipeline, options).await?;
        Ok(cursor.try_collect().await?)
    }
}

impl DatabaseDriver for mongodb::Database {
    fn name(&self) -> &str {
        mongodb::Database::name(self)
    }

    fn collection(&self, name: &str) -> Arc<dyn CollectionDriver> {
        Arc::new(mongodb::Database::collection::<Document>(self, name))
    }
}
