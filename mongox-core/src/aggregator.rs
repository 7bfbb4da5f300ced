//! Aggregation façade. Aggregations run no callbacks or hooks.

use std::marker::PhantomData;
use std::sync::Arc;

use bson::Document;
use mongodb::options::AggregateOptions;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::driver::CollectionDriver;
use crate::error::MongoxResult;

/// Runs aggregation pipelines over a collection of `T`.
pub struct Aggregator<T> {
    driver: Arc<dyn CollectionDriver>,
    pipeline: Vec<Document>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Aggregator<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Create an aggregator with an empty pipeline.
    pub fn new(driver: Arc<dyn CollectionDriver>) -> Self {
        Self {
            driver,
            pipeline: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Set the pipeline; accepts a `Vec<Document>` or a `PipelineBuilder`.
    pub fn pipeline(mut self, pipeline: impl Into<Vec<Document>>) -> Self {
        self.pipeline = pipeline.into();
        self
    }

    /// Run the pipeline and decode each output document as `T`.
    pub async fn aggregate(
        self,
        options: impl Into<Option<AggregateOptions>>,
    ) -> MongoxResult<Vec<T>> {
        self.aggregate_with_parse(options).await
    }

    /// Run the pipeline and decode each output document as `R`, for stages
    /// that reshape documents.
    pub async fn aggregate_with_parse<R: DeserializeOwned>(
        self,
        options: impl Into<Option<AggregateOptions>>,
    ) -> MongoxResult<Vec<R>> {
        debug!(
            collection = self.driver.name(),
            stages = self.pipeline.len(),
            "aggregate"
        );
        let docs = self.driver.aggregate(self.pipeline, options.into()).await?;
        Ok(mongox_bson::from_documents(docs)?)
    }
}
