//! Delete façade.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use mongodb::options::DeleteOptions;
use tracing::debug;

use crate::callback::Callbacks;
use crate::driver::{CollectionDriver, DeleteResult};
use crate::error::{MongoxError, MongoxResult};
use crate::model::{ModelHooks, model_hook_mut};
use crate::operation::{self, CallState, MongoOptions, OpResult, OperationType};

/// Typed context handed to [`DeleterHook`]s.
pub struct OpContext<'a, T> {
    /// Target collection.
    pub collection: &'a dyn CollectionDriver,
    /// Query filter.
    pub filter: Option<Document>,
    /// Driver options for the call.
    pub mongo_options: Option<MongoOptions>,
    /// Caller-supplied lifecycle hook object.
    pub model_hook: Option<&'a mut dyn ModelHooks>,
    /// Driver outcome, set for after hooks.
    pub result: Option<OpResult>,
    _marker: PhantomData<fn() -> T>,
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
            mongo_options: state.options.take(),
            model_hook,
            result: state.result.take(),
            _marker: PhantomData,
        }
    }

    fn save_state(self, state: &mut CallState) {
        state.filter = self.filter;
        state.options = self.mongo_options;
        state.result = self.result;
    }
}

/// A hook local to one [`Deleter`].
#[async_trait]
pub trait DeleterHook<T>: Send + Sync {
    /// Run the hook; an error stops the call.
    async fn call(&self, op: &mut OpContext<'_, T>) -> MongoxResult<()>;
}

#[async_trait]
impl<T, F> DeleterHook<T> for F
where
    T: Send + Sync + 'static,
    F: Fn(&mut OpContext<'_, T>) -> MongoxResult<()> + Send + Sync,
{
    async fn call(&self, op: &mut OpContext<'_, T>) -> MongoxResult<()> {
        self(op)
    }
}

/// A shared deleter hook.
pub type SharedDeleterHook<T> = Arc<dyn DeleterHook<T>>;

/// Deletes documents of type `T`.
pub struct Deleter<T> {
    driver: Arc<dyn CollectionDriver>,
    callbacks: Arc<Callbacks>,
    filter: Option<Document>,
    model_hook: Option<Box<dyn ModelHooks>>,
    before_hooks: Vec<SharedDeleterHook<T>>,
    after_hooks: Vec<SharedDeleterHook<T>>,
}

impl<T> Deleter<T>
where
    T: Send + Sync + 'static,
{
    /// Create a deleter over a collection and its database's registry.
    pub fn new(driver: Arc<dyn CollectionDriver>, callbacks: Arc<Callbacks>) -> Self {
        Self {
            driver,
            callbacks,
            filter: None,
            model_hook: None,
            before_hooks: Vec::new(),
            after_hooks: Vec::new(),
        }
    }

    /// Set the query filter.
    pub fn filter(mut self, filter: Document) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Attach a lifecycle hook object for the model plugin.
    pub fn model_hook(mut self, hook: impl ModelHooks + 'static) -> Self {
        self.model_hook = Some(Box::new(hook));
        self
    }

    /// Append a hook run before the driver call.
    pub fn register_before_hook(mut self, hook: impl DeleterHook<T> + 'static) -> Self {
        self.before_hooks.push(Arc::new(hook));
        self
    }

    /// Append hooks run before the driver call.
    pub fn register_before_hooks(
        mut self,
        hooks: impl IntoIterator<Item = SharedDeleterHook<T>>,
    ) -> Self {
        self.before_hooks.extend(hooks);
        self
    }

    /// Append a hook run after the driver call.
    pub fn register_after_hook(mut self, hook: impl DeleterHook<T> + 'static) -> Self {
        self.after_hooks.push(Arc::new(hook));
        self
    }

    /// Append hooks run after the driver call.
    pub fn register_after_hooks(
        mut self,
        hooks: impl IntoIterator<Item = SharedDeleterHook<T>>,
    ) -> Self {
        self.after_hooks.extend(hooks);
        self
    }

    /// Delete the first matching document.
    pub async fn delete_one(
        self,
        options: impl Into<Option<DeleteOptions>>,
    ) -> MongoxResult<DeleteResult> {
        self.run(false, options.into()).await
    }

    /// Delete every matching document.
    pub async fn delete_many(
        self,
        options: impl Into<Option<DeleteOptions>>,
    ) -> MongoxResult<DeleteResult> {
        self.run(true, options.into()).await
    }

    async fn run(self, many: bool, options: Option<DeleteOptions>) -> MongoxResult<DeleteResult> {
        let Deleter {
            driver,
            callbacks,
            filter,
            mut model_hook,
            before_hooks,
            after_hooks,
        } = self;
        let driver = driver.as_ref();
        let mut state = CallState {
            filter,
            options: options.map(MongoOptions::from),
            ..CallState::default()
        };

        let mut op = operation::OpContext::new(driver).with_state(&mut state);
        op.model_hook = model_hook_mut(&mut model_hook);
        callbacks.execute(&mut op, OperationType::BeforeDelete).await?;
        op.save_state(&mut state);

        let mut typed = OpContext::from_state(driver, model_hook_mut(&mut model_hook), &mut state);
        run_hooks(&before_hooks, &mut typed).await?;
        typed.save_state(&mut state);

        let filter = state
            .filter
            .clone()
            .ok_or_else(|| MongoxError::invalid_argument("filter is required"))?;
        let options = MongoOptions::extract(state.options.clone());
        debug!(collection = driver.name(), many, filter = %filter, "delete");
        let result = if many {
            driver.delete_many(filter, options).await?
        } else {
            driver.delete_one(filter, options).await?
        };

        state.result = Some(OpResult::Delete(result.clone()));
        let mut op = operation::OpContext::new(driver).with_state(&mut state);
        op.model_hook = model_hook_mut(&mut model_hook);
        callbacks.execute(&mut op, OperationType::AfterDelete).await?;
        op.save_state(&mut state);

        let mut typed = OpContext::from_state(driver, model_hook_mut(&mut model_hook), &mut state);
        run_hooks(&after_hooks, &mut typed).await?;

        Ok(result)
    }
}

async fn run_hooks<T>(
    hooks: &[SharedDeleterHook<T>],
    op: &mut OpContext<'_, T>,
) -> MongoxResult<()> {
    for hook in hooks {
        hook.call(op).await?;
    }
    Ok(())
}
