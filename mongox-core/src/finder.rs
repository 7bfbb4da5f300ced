//! Query façade.
//!
//! `find_one`, `find`, and `find_one_and_update` run the `beforeFind` and
//! `afterFind` stages. The after stage only runs when something was found by
//! `find_one`/`find_one_and_update`; for `find` it always runs with the whole
//! decoded result. `count` and `distinct` bypass the hooks.

use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document};
use mongodb::options::{
    CountOptions, DistinctOptions, FindOneAndUpdateOptions, FindOneOptions, FindOptions,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::callback::Callbacks;
use crate::driver::CollectionDriver;
use crate::error::{MongoxError, MongoxResult};
use crate::model::{Entity, ModelHooks, model_hook_mut};
use crate::operation::{self, CallState, MongoOptions, OpResult, OperationType, Payload};

/// Typed context handed to [`FinderHook`]s.
pub struct OpContext<'a, T> {
    /// Target collection.
    pub collection: &'a dyn CollectionDriver,
    /// Query filter.
    pub filter: Option<Document>,
    /// Update document (`find_one_and_update` only).
    pub updates: Option<Document>,
    /// Driver options for the call.
    pub mongo_options: Option<MongoOptions>,
    /// Caller-supplied lifecycle hook object.
    pub model_hook: Option<&'a mut dyn ModelHooks>,
    /// Found document, after a single-document find.
    pub doc: Option<&'a mut T>,
    /// Found documents, after `find`.
    pub docs: Option<&'a mut [T]>,
    /// Driver outcome, set for after hooks.
    pub result: Option<OpResult>,
}

impl<'a, T> OpContext<'a, T> {
    fn from_state(
        collection: &'a dyn CollectionDriver,
        model_hook: Option<&'a mut dyn ModelHooks>,
        state: &mut CallState,
    ) -> Self {
        Self {
            collection,
            filter: state.filter.take(),
            updates: state.updates.take(),
            mongo_options: state.options.take(),
            model_hook,
            doc: None,
            docs: None,
            result: state.result.take(),
        }
    }

    fn save_state(self, state: &mut CallState) {
        state.filter = self.filter;
        state.updates = self.updates;
        state.options = self.mongo_options;
        state.result = self.result;
    }
}

/// A hook local to one [`Finder`].
#[async_trait]
pub trait FinderHook<T>: Send + Sync {
    /// Run the hook; an error stops the call.
    async fn call(&self, op: &mut OpContext<'_, T>) -> MongoxResult<()>;
}

#[async_trait]
impl<T, F> FinderHook<T> for F
where
    T: Send + Sync + 'static,
    F: Fn(&mut OpContext<'_, T>) -> MongoxResult<()> + Send + Sync,
{
    async fn call(&self, op: &mut OpContext<'_, T>) -> MongoxResult<()> {
        self(op)
    }
}

/// A shared finder hook.
pub type SharedFinderHook<T> = Arc<dyn FinderHook<T>>;

/// Reads documents of type `T`.
pub struct Finder<T> {
    driver: Arc<dyn CollectionDriver>,
    callbacks: Arc<Callbacks>,
    filter: Option<Document>,
    updates: Option<Document>,
    skip: Option<u64>,
    limit: Option<i64>,
    sort: Option<Document>,
    model_hook: Option<Box<dyn ModelHooks>>,
    before_hooks: Vec<SharedFinderHook<T>>,
    after_hooks: Vec<SharedFinderHook<T>>,
}

impl<T> Finder<T>
where
    T: Entity + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a finder over a collection and its database's registry.
    pub fn new(driver: Arc<dyn CollectionDriver>, callbacks: Arc<Callbacks>) -> Self {
        Self {
            driver,
            callbacks,
            filter: None,
            updates: None,
            skip: None,
            limit: None,
            sort: None,
            model_hook: None,
            before_hooks: Vec::new(),
            after_hooks: Vec::new(),
        }
    }

    /// Set the query filter. Without one every document matches.
    pub fn filter(mut self, filter: Document) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the update document for `find_one_and_update`.
    pub fn updates(mut self, updates: Document) -> Self {
        self.updates = Some(updates);
        self
    }

    /// Skip the first `n` matches, unless the call options set a skip.
    pub fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    /// Return at most `n` documents from `find`, unless the call options set
    /// a limit.
    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Sort order, unless the call options set one.
    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Attach a lifecycle hook object for the model plugin.
    pub fn model_hook(mut self, hook: impl ModelHooks + 'static) -> Self {
        self.model_hook = Some(Box::new(hook));
        self
    }

    /// Append a hook run before the driver call.
    pub fn register_before_hook(mut self, hook: impl FinderHook<T> + 'static) -> Self {
        self.before_hooks.push(Arc::new(hook));
        self
    }

    /// Append hooks run before the driver call.
    pub fn register_before_hooks(
        mut self,
        hooks: impl IntoIterator<Item = SharedFinderHook<T>>,
    ) -> Self {
        self.before_hooks.extend(hooks);
        self
    }

    /// Append a hook run after the driver call.
    pub fn register_after_hook(mut self, hook: impl FinderHook<T> + 'static) -> Self {
        self.after_hooks.push(Arc::new(hook));
        self
    }

    /// Append hooks run after the driver call.
    pub fn register_after_hooks(
        mut self,
        hooks: impl IntoIterator<Item = SharedFinderHook<T>>,
    ) -> Self {
        self.after_hooks.extend(hooks);
        self
    }

    fn state(&mut self, options: Option<MongoOptions>) -> CallState {
        CallState {
            filter: self.filter.take(),
            updates: self.updates.take(),
            options,
            ..CallState::default()
        }
    }

    /// Find the first matching document.
    pub async fn find_one(
        mut self,
        options: impl Into<Option<FindOneOptions>>,
    ) -> MongoxResult<Option<T>> {
        let mut state = self.state(options.into().map(MongoOptions::from));
        self.before_phase(&mut state).await?;

        let mut options: FindOneOptions =
            MongoOptions::extract(state.options.clone()).unwrap_or_default();
        options.skip = options.skip.or(self.skip);
        options.sort = options.sort.or_else(|| self.sort.clone());
        let filter = state.filter.clone().unwrap_or_default();

        let driver = self.driver.as_ref();
        debug!(collection = driver.name(), filter = %filter, "find_one");
        let Some(found) = driver.find_one(filter, Some(options)).await? else {
            return Ok(None);
        };

        let mut doc: T = mongox_bson::from_document(found)?;
        state.result = Some(OpResult::Found(1));
        self.after_phase(&mut state, std::slice::from_mut(&mut doc), true)
            .await?;
        Ok(Some(doc))
    }

    /// Find every matching document.
    pub async fn find(mut self, options: impl Into<Option<FindOptions>>) -> MongoxResult<Vec<T>> {
        let mut state = self.state(options.into().map(MongoOptions::from));
        self.before_phase(&mut state).await?;

        let mut options: FindOptions =
            MongoOptions::extract(state.options.clone()).unwrap_or_default();
        options.skip = options.skip.or(self.skip);
        options.limit = options.limit.or(self.limit);
        options.sort = options.sort.or_else(|| self.sort.clone());
        let filter = state.filter.clone().unwrap_or_default();

        let driver = self.driver.as_ref();
        debug!(collection = driver.name(), filter = %filter, "find");
        let found = driver.find(filter, Some(options)).await?;

        let mut docs: Vec<T> = mongox_bson::from_documents(found)?;
        state.result = Some(OpResult::Found(docs.len()));
        self.after_phase(&mut state, &mut docs, false).await?;
        Ok(docs)
    }

    /// Atomically update the first matching document and return it.
    ///
    /// Returns the document as it was before the update unless the options
    /// ask for the updated one.
    pub async fn find_one_and_update(
        mut self,
        options: impl Into<Option<FindOneAndUpdateOptions>>,
    ) -> MongoxResult<Option<T>> {
        let mut state = self.state(options.into().map(MongoOptions::from));
        self.before_phase(&mut state).await?;

        let updates = state
            .updates
            .clone()
            .ok_or_else(|| MongoxError::invalid_argument("update document is required"))?;
        let mut options: FindOneAndUpdateOptions =
            MongoOptions::extract(state.options.clone()).unwrap_or_default();
        options.sort = options.sort.or_else(|| self.sort.clone());
        let filter = state.filter.clone().unwrap_or_default();

        let driver = self.driver.as_ref();
        debug!(collection = driver.name(), filter = %filter, "find_one_and_update");
        let Some(found) = driver
            .find_one_and_update(filter, updates, Some(options))
            .await?
        else {
            return Ok(None);
        };

        let mut doc: T = mongox_bson::from_document(found)?;
        state.result = Some(OpResult::Found(1));
        self.after_phase(&mut state, std::slice::from_mut(&mut doc), true)
            .await?;
        Ok(Some(doc))
    }

    /// Count matching documents. No hooks run.
    pub async fn count(self, options: impl Into<Option<CountOptions>>) -> MongoxResult<u64> {
        let filter = self.filter.unwrap_or_default();
        self.driver.count_documents(filter, options.into()).await
    }

    /// Distinct values of `field` among matching documents. No hooks run.
    pub async fn distinct(
        self,
        field: &str,
        options: impl Into<Option<DistinctOptions>>,
    ) -> MongoxResult<Vec<Bson>> {
        let filter = self.filter.unwrap_or_default();
        self.driver.distinct(field, filter, options.into()).await
    }

    async fn before_phase(&mut self, state: &mut CallState) -> MongoxResult<()> {
        let driver = self.driver.as_ref();

        let mut op = operation::OpContext::new(driver).with_state(state);
        op.model_hook = model_hook_mut(&mut self.model_hook);
        self.callbacks
            .execute(&mut op, OperationType::BeforeFind)
            .await?;
        op.save_state(state);

        let mut typed = OpContext::from_state(driver, model_hook_mut(&mut self.model_hook), state);
        run_hooks(&self.before_hooks, &mut typed).await?;
        typed.save_state(state);
        Ok(())
    }

    async fn after_phase(
        &mut self,
        state: &mut CallState,
        docs: &mut [T],
        single: bool,
    ) -> MongoxResult<()> {
        let driver = self.driver.as_ref();

        let mut op = operation::OpContext::new(driver).with_state(state);
        op.model_hook = model_hook_mut(&mut self.model_hook);
        op.payload = if single {
            docs.first_mut()
                .map_or(Payload::None, |doc| Payload::Single(doc))
        } else {
            Payload::from_slice(&mut *docs)
        };
        self.callbacks
            .execute(&mut op, OperationType::AfterFind)
            .await?;
        op.save_state(state);

        let mut typed = OpContext::from_state(driver, model_hook_mut(&mut self.model_hook), state);
        let (doc, many) = if single {
            (docs.first_mut(), None)
        } else {
            (None, Some(docs))
        };
        typed.doc = doc;
        typed.docs = many;
        run_hooks(&self.after_hooks, &mut typed).await?;
        Ok(())
    }
}

async fn run_hooks<T>(
    hooks: &[SharedFinderHook<T>],
    op: &mut OpContext<'_, T>,
) -> MongoxResult<()> {
    for hook in hooks {
        hook.call(op).await?;
    }
    Ok(())
}
