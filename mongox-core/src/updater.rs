//! Update and upsert façade.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use mongodb::options::{ReplaceOptions, UpdateOptions};
use serde::Serialize;
use tracing::debug;

use crate::callback::Callbacks;
use crate::driver::{CollectionDriver, UpdateResult};
use crate::error::{MongoxError, MongoxResult};
use crate::model::{Entity, ModelHooks, model_hook_mut};
use crate::operation::{self, CallState, MongoOptions, OpResult, OperationType, Payload};

/// Typed context handed to [`UpdaterHook`]s.
pub struct OpContext<'a, T> {
    /// Target collection.
    pub collection: &'a dyn CollectionDriver,
    /// Typed document attached with [`Updater::document`].
    pub doc: Option<&'a mut T>,
    /// Query filter.
    pub filter: Option<Document>,
    /// Update document.
    pub updates: Option<Document>,
    /// Replacement document (upsert only).
    pub replacement: Option<Document>,
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
        doc: Option<&'a mut T>,
        model_hook: Option<&'a mut dyn ModelHooks>,
        state: &mut CallState,
    ) -> Self {
        Self {
            collection,
            doc,
            filter: state.filter.take(),
            updates: state.updates.take(),
            replacement: state.replacement.take(),
            mongo_options: state.options.take(),
            model_hook,
            result: state.result.take(),
            _marker: PhantomData,
        }
    }

    fn save_state(self, state: &mut CallState) {
        state.filter = self.filter;
        state.updates = self.updates;
        state.replacement = self.replacement;
        state.options = self.mongo_options;
        state.result = self.result;
    }
}

/// A hook local to one [`Updater`].
#[async_trait]
pub trait UpdaterHook<T>: Send + Sync {
    /// Run the hook; an error stops the call.
    async fn call(&self, op: &mut OpContext<'_, T>) -> MongoxResult<()>;
}

#[async_trait]
impl<T, F> UpdaterHook<T> for F
where
    T: Send + Sync + 'static,
    F: Fn(&mut OpContext<'_, T>) -> MongoxResult<()> + Send + Sync,
{
    async fn call(&self, op: &mut OpContext<'_, T>) -> MongoxResult<()> {
        self(op)
    }
}

/// A shared updater hook.
pub type SharedUpdaterHook<T> = Arc<dyn UpdaterHook<T>>;

#[derive(Debug, Clone, Copy)]
enum UpdateKind {
    One,
    Many,
    Upsert,
}

impl UpdateKind {
    fn stages(self) -> (OperationType, OperationType) {
        match self {
            UpdateKind::One | UpdateKind::Many => {
                (OperationType::BeforeUpdate, OperationType::AfterUpdate)
            }
            UpdateKind::Upsert => (OperationType::BeforeUpsert, OperationType::AfterUpsert),
        }
    }
}

/// Updates documents of type `T`.
pub struct Updater<'d, T> {
    driver: Arc<dyn CollectionDriver>,
    callbacks: Arc<Callbacks>,
    doc: Option<&'d mut T>,
    filter: Option<Document>,
    updates: Option<Document>,
    replacement: Option<Document>,
    model_hook: Option<Box<dyn ModelHooks>>,
    before_hooks: Vec<SharedUpdaterHook<T>>,
    after_hooks: Vec<SharedUpdaterHook<T>>,
}

impl<'d, T> Updater<'d, T>
where
    T: Entity + Serialize + Send + Sync + 'static,
{
    /// Create an updater over a collection and its database's registry.
    pub fn new(driver: Arc<dyn CollectionDriver>, callbacks: Arc<Callbacks>) -> Self {
        Self {
            driver,
            callbacks,
            doc: None,
            filter: None,
            updates: None,
            replacement: None,
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

    /// Set the update document.
    pub fn updates(mut self, updates: Document) -> Self {
        self.updates = Some(updates);
        self
    }

    /// Set a full replacement document; `upsert` then replaces instead of
    /// updating.
    pub fn replacement(mut self, replacement: Document) -> Self {
        self.replacement = Some(replacement);
        self
    }

    /// Attach a typed document.
    ///
    /// Callbacks see it as the payload of both phases, so the default-field,
    /// model, and validation plugins act on it. On `upsert` it is serialized
    /// after the before phase and sent as the replacement, unless a
    /// replacement document was set explicitly.
    pub fn document(mut self, doc: &'d mut T) -> Self {
        self.doc = Some(doc);
        self
    }

    /// Attach a lifecycle hook object for the model plugin.
    pub fn model_hook(mut self, hook: impl ModelHooks + 'static) -> Self {
        self.model_hook = Some(Box::new(hook));
        self
    }

    /// Append a hook run before the driver call.
    pub fn register_before_hook(mut self, hook: impl UpdaterHook<T> + 'static) -> Self {
        self.before_hooks.push(Arc::new(hook));
        self
    }

    /// Append hooks run before the driver call.
    pub fn register_before_hooks(
        mut self,
        hooks: impl IntoIterator<Item = SharedUpdaterHook<T>>,
    ) -> Self {
        self.before_hooks.extend(hooks);
        self
    }

    /// Append a hook run after the driver call.
    pub fn register_after_hook(mut self, hook: impl UpdaterHook<T> + 'static) -> Self {
        self.after_hooks.push(Arc::new(hook));
        self
    }

    /// Append hooks run after the driver call.
    pub fn register_after_hooks(
        mut self,
        hooks: impl IntoIterator<Item = SharedUpdaterHook<T>>,
    ) -> Self {
        self.after_hooks.extend(hooks);
        self
    }

    /// Update the first matching document.
    pub async fn update_one(
        self,
        options: impl Into<Option<UpdateOptions>>,
    ) -> MongoxResult<UpdateResult> {
        self.run(UpdateKind::One, options.into()).await
    }

    /// Update every matching document.
    pub async fn update_many(
        self,
        options: impl Into<Option<UpdateOptions>>,
    ) -> MongoxResult<UpdateResult> {
        self.run(UpdateKind::Many, options.into()).await
    }

    /// Update or insert.
    ///
    /// With a replacement document this issues `replace_one`, otherwise
    /// `update_one`, both with `upsert` forced on.
    pub async fn upsert(
        self,
        options: impl Into<Option<UpdateOptions>>,
    ) -> MongoxResult<UpdateResult> {
        self.run(UpdateKind::Upsert, options.into()).await
    }

    async fn run(
        self,
        kind: UpdateKind,
        options: Option<UpdateOptions>,
    ) -> MongoxResult<UpdateResult> {
        let Updater {
            driver,
            callbacks,
            mut doc,
            filter,
            updates,
            replacement,
            mut model_hook,
            before_hooks,
            after_hooks,
        } = self;
        let driver = driver.as_ref();
        let (before, after) = kind.stages();
        let mut state = CallState {
            filter,
            updates,
            replacement,
            options: options.map(MongoOptions::from),
            result: None,
        };

        let mut op = operation::OpContext::new(driver).with_state(&mut state);
        op.payload = payload(doc.as_deref_mut());
        op.model_hook = model_hook_mut(&mut model_hook);
        callbacks.execute(&mut op, before).await?;
        op.save_state(&mut state);

        let mut typed = OpContext::from_state(
            driver,
            doc.as_deref_mut(),
            model_hook_mut(&mut model_hook),
            &mut state,
        );
        run_hooks(&before_hooks, &mut typed).await?;
        typed.save_state(&mut state);

        if matches!(kind, UpdateKind::Upsert) && state.replacement.is_none() {
            if let Some(doc) = doc.as_deref() {
                state.replacement = Some(mongox_bson::to_document(doc)?);
            }
        }

        let filter = state
            .filter
            .clone()
            .ok_or_else(|| MongoxError::invalid_argument("filter is required"))?;
        debug!(collection = driver.name(), kind = ?kind, filter = %filter, "update");
        let result = match (kind, state.replacement.clone()) {
            (UpdateKind::Upsert, Some(replacement)) => {
                let options = replace_options(state.options.clone());
                driver.replace_one(filter, replacement, Some(options)).await?
            }
            (kind, _) => {
                let updates = state
                    .updates
                    .clone()
                    .ok_or_else(|| MongoxError::invalid_argument("update document is required"))?;
                let mut options: Option<UpdateOptions> =
                    MongoOptions::extract(state.options.clone());
                match kind {
                    UpdateKind::One => driver.update_one(filter, updates, options).await?,
                    UpdateKind::Many => driver.update_many(filter, updates, options).await?,
                    UpdateKind::Upsert => {
                        options.get_or_insert_with(UpdateOptions::default).upsert = Some(true);
                        driver.update_one(filter, updates, options).await?
                    }
                }
            }
        };

        state.result = Some(OpResult::Update(result.clone()));
        let mut op = operation::OpContext::new(driver).with_state(&mut state);
        op.payload = payload(doc.as_deref_mut());
        op.model_hook = model_hook_mut(&mut model_hook);
        callbacks.execute(&mut op, after).await?;
        op.save_state(&mut state);

        let mut typed = OpContext::from_state(
            driver,
            doc.as_deref_mut(),
            model_hook_mut(&mut model_hook),
            &mut state,
        );
        run_hooks(&after_hooks, &mut typed).await?;

        Ok(result)
    }
}

fn payload<T: Entity>(doc: Option<&mut T>) -> Payload<'_> {
    match doc {
        Some(doc) => Payload::Single(doc),
        None => Payload::None,
    }
}

/// Replace options for an upsert, carrying over what the update options set.
fn replace_options(options: Option<MongoOptions>) -> ReplaceOptions {
    let mut replace = match options {
        Some(MongoOptions::Replace(options)) => options,
        Some(MongoOptions::Update(options)) => {
            let mut replace = ReplaceOptions::default();
            replace.bypass_document_validation = options.bypass_document_validation;
            replace.collation = options.collation;
            replace.hint = options.hint;
            replace.write_concern = options.write_concern;
            replace
        }
        _ => ReplaceOptions::default(),
    };
    replace.upsert = Some(true);
    replace
}

async fn run_hooks<T>(
    hooks: &[SharedUpdaterHook<T>],
    op: &mut OpContext<'_, T>,
) -> MongoxResult<()> {
    for hook in hooks {
        hook.call(op).await?;
    }
    Ok(())
}
