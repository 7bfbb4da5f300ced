//! Insert façade.
//!
//! A [`Creator`] runs `beforeInsert` registry callbacks, then its own before
//! hooks, calls the driver, stores the result, and runs `afterInsert`
//! callbacks followed by its own after hooks. The first error anywhere is
//! returned and nothing after it runs.

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::options::{InsertManyOptions, InsertOneOptions};
use serde::Serialize;
use tracing::debug;

use crate::callback::Callbacks;
use crate::driver::{CollectionDriver, InsertManyResult, InsertOneResult};
use crate::error::MongoxResult;
use crate::model::Entity;
use crate::operation::{self, CallState, MongoOptions, OpResult, OperationType, Payload};

/// Typed context handed to [`CreatorHook`]s.
pub struct OpContext<'a, T> {
    /// Target collection.
    pub collection: &'a dyn CollectionDriver,
    /// Document of `insert_one`.
    pub doc: Option<&'a mut T>,
    /// Documents of `insert_many`.
    pub docs: Option<&'a mut [T]>,
    /// Driver options for the call.
    pub mongo_options: Option<MongoOptions>,
    /// Driver outcome, set for after hooks.
    pub result: Option<OpResult>,
}

/// A hook local to one [`Creator`].
#[async_trait]
pub trait CreatorHook<T>: Send + Sync {
    /// Run the hook; an error stops the call.
    async fn call(&self, op: &mut OpContext<'_, T>) -> MongoxResult<()>;
}

#[async_trait]
impl<T, F> CreatorHook<T> for F
where
    T: Send + Sync + 'static,
    F: Fn(&mut OpContext<'_, T>) -> MongoxResult<()> + Send + Sync,
{
    async fn call(&self, op: &mut OpContext<'_, T>) -> MongoxResult<()> {
        self(op)
    }
}

/// A shared creator hook.
pub type SharedCreatorHook<T> = Arc<dyn CreatorHook<T>>;

/// Inserts documents of type `T`.
pub struct Creator<T> {
    driver: Arc<dyn CollectionDriver>,
    callbacks: Arc<Callbacks>,
    before_hooks: Vec<SharedCreatorHook<T>>,
    after_hooks: Vec<SharedCreatorHook<T>>,
}

impl<T> Creator<T>
where
    T: Entity + Serialize + Send + Sync + 'static,
{
    /// Create a creator over a collection and its database's registry.
    pub fn new(driver: Arc<dyn CollectionDriver>, callbacks: Arc<Callbacks>) -> Self {
        Self {
            driver,
            callbacks,
            before_hooks: Vec::new(),
            after_hooks: Vec::new(),
        }
    }

    /// Append a hook run before the driver call.
    pub fn register_before_hook(mut self, hook: impl CreatorHook<T> + 'static) -> Self {
        self.before_hooks.push(Arc::new(hook));
        self
    }

    /// Append hooks run before the driver call.
    pub fn register_before_hooks(
        mut self,
        hooks: impl IntoIterator<Item = SharedCreatorHook<T>>,
    ) -> Self {
        self.before_hooks.extend(hooks);
        self
    }

    /// Append a hook run after the driver call.
    pub fn register_after_hook(mut self, hook: impl CreatorHook<T> + 'static) -> Self {
        self.after_hooks.push(Arc::new(hook));
        self
    }

    /// Append hooks run after the driver call.
    pub fn register_after_hooks(
        mut self,
        hooks: impl IntoIterator<Item = SharedCreatorHook<T>>,
    ) -> Self {
        self.after_hooks.extend(hooks);
        self
    }

    /// Insert one document.
    ///
    /// Mutations made by hooks to `doc` before the driver call are what gets
    /// stored.
    pub async fn insert_one(
        self,
        doc: &mut T,
        options: impl Into<Option<InsertOneOptions>>,
    ) -> MongoxResult<InsertOneResult> {
        let driver = self.driver.as_ref();
        let mut state = CallState {
            options: options.into().map(MongoOptions::from),
            ..CallState::default()
        };

        let mut op = operation::OpContext::new(driver)
            .doc(&mut *doc)
            .with_state(&mut state);
        self.callbacks
            .execute(&mut op, OperationType::BeforeInsert)
            .await?;
        op.save_state(&mut state);

        let mut typed = OpContext {
            collection: driver,
            doc: Some(&mut *doc),
            docs: None,
            mongo_options: state.options.take(),
            result: None,
        };
        run_hooks(&self.before_hooks, &mut typed).await?;
        state.options = typed.mongo_options.take();

        debug!(collection = driver.name(), "insert_one");
        let document = mongox_bson::to_document(&*doc)?;
        let result = driver
            .insert_one(document, MongoOptions::extract(state.options.clone()))
            .await?;

        state.result = Some(OpResult::InsertOne(result.clone()));
        let mut op = operation::OpContext::new(driver)
            .doc(&mut *doc)
            .with_state(&mut state);
        self.callbacks
            .execute(&mut op, OperationType::AfterInsert)
            .await?;
        op.save_state(&mut state);

        let mut typed = OpContext {
            collection: driver,
            doc: Some(doc),
            docs: None,
            mongo_options: state.options.take(),
            result: state.result.take(),
        };
        run_hooks(&self.after_hooks, &mut typed).await?;

        Ok(result)
    }

    /// Insert several documents in one driver call.
    ///
    /// Callbacks and hooks receive the whole slice once per phase.
    pub async fn insert_many(
        self,
        docs: &mut [T],
        options: impl Into<Option<InsertManyOptions>>,
    ) -> MongoxResult<InsertManyResult> {
        let driver = self.driver.as_ref();
        let mut state = CallState {
            options: options.into().map(MongoOptions::from),
            ..CallState::default()
        };

        let mut op = operation::OpContext::new(driver).with_state(&mut state);
        op.payload = Payload::from_slice(&mut *docs);
        self.callbacks
            .execute(&mut op, OperationType::BeforeInsert)
            .await?;
        op.save_state(&mut state);

        let mut typed = OpContext {
            collection: driver,
            doc: None,
            docs: Some(&mut *docs),
            mongo_options: state.options.take(),
            result: None,
        };
        run_hooks(&self.before_hooks, &mut typed).await?;
        state.options = typed.mongo_options.take();

        debug!(collection = driver.name(), count = docs.len(), "insert_many");
        let documents = mongox_bson::to_documents(docs)?;
        let result = driver
            .insert_many(documents, MongoOptions::extract(state.options.clone()))
            .await?;

        state.result = Some(OpResult::InsertMany(result.clone()));
        let mut op = operation::OpContext::new(driver).with_state(&mut state);
        op.payload = Payload::from_slice(&mut *docs);
        self.callbacks
            .execute(&mut op, OperationType::AfterInsert)
            .await?;
        op.save_state(&mut state);

        let mut typed = OpContext {
            collection: driver,
            doc: None,
            docs: Some(docs),
            mongo_options: state.options.take(),
            result: state.result.take(),
        };
        run_hooks(&self.after_hooks, &mut typed).await?;

        Ok(result)
    }
}

async fn run_hooks<T>(
    hooks: &[SharedCreatorHook<T>],
    op: &mut OpContext<'_, T>,
) -> MongoxResult<()> {
    for hook in hooks {
        hook.call(op).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MongoxError;
    use crate::model::{DefaultModel, Model};
    use crate::testing::{DriverOp, MemoryCollection};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default, Serialize)]
    struct User {
        #[serde(flatten)]
        model: Model,
        name: String,
    }

    impl Entity for User {
        fn as_default_model(&mut self) -> Option<&mut dyn DefaultModel> {
            Some(&mut self.model)
        }
    }

    fn user(name: &str) -> User {
        User {
            name: name.to_string(),
            ..User::default()
        }
    }

    fn setup() -> (Arc<MemoryCollection>, Arc<Callbacks>) {
        (
            Arc::new(MemoryCollection::new("users")),
            Arc::new(Callbacks::new()),
        )
    }

    #[tokio::test]
    async fn test_failing_before_hook_skips_driver() {
        let (collection, callbacks) = setup();

        let err = Creator::<User>::new(collection.clone(), callbacks)
            .register_before_hook(|_op: &mut OpContext<'_, User>| -> MongoxResult<()> {
                Err(MongoxError::hook("name is reserved"))
            })
            .insert_one(&mut user("root"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, MongoxError::Hook(ref msg) if msg == "name is reserved"));
        assert_eq!(collection.calls(DriverOp::InsertOne), 0);
        assert!(collection.is_empty());
    }

    #[tokio::test]
    async fn test_phase_order() {
        let (collection, callbacks) = setup();
        let log = Arc::new(Mutex::new(Vec::new()));

        for (op_type, entry) in [
            (OperationType::BeforeInsert, "registry-before"),
            (OperationType::AfterInsert, "registry-after"),
        ] {
            let log = Arc::clone(&log);
            callbacks.register(op_type, entry, move |op: &mut operation::OpContext<'_>| {
                log.lock().push(format!("{}:{}", entry, op.result.is_some()));
                Ok(())
            });
        }

        let before = Arc::clone(&log);
        let after = Arc::clone(&log);
        Creator::<User>::new(collection.clone(), callbacks)
            .register_before_hook(move |op: &mut OpContext<'_, User>| {
                before.lock().push(format!("local-before:{}", op.result.is_some()));
                Ok(())
            })
            .register_after_hook(move |op: &mut OpContext<'_, User>| {
                after.lock().push(format!("local-after:{}", op.result.is_some()));
                Ok(())
            })
            .insert_one(&mut user("alice"), None)
            .await
            .unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "registry-before:false",
                "local-before:false",
                "registry-after:true",
                "local-after:true",
            ]
        );
    }

    #[tokio::test]
    async fn test_hook_mutations_reach_driver() {
        let (collection, callbacks) = setup();
        callbacks.register(
            OperationType::BeforeInsert,
            "ids",
            |op: &mut operation::OpContext<'_>| {
                for entity in op.payload.iter_mut() {
                    if let Some(model) = entity.as_default_model() {
                        model.default_id();
                    }
                }
                Ok(())
            },
        );

        let mut doc = user("bob");
        let result = Creator::<User>::new(collection.clone(), callbacks)
            .register_before_hook(|op: &mut OpContext<'_, User>| {
                if let Some(doc) = op.doc.as_deref_mut() {
                    doc.name = doc.name.to_uppercase();
                }
                Ok(())
            })
            .insert_one(&mut doc, None)
            .await
            .unwrap();

        let id = doc.model.id.unwrap();
        assert_eq!(result.inserted_id, bson::Bson::ObjectId(id));
        let stored = collection.documents();
        assert_eq!(stored[0].get_str("name").unwrap(), "BOB");
        assert_eq!(stored[0].get_object_id("_id").unwrap(), id);
    }

    #[tokio::test]
    async fn test_registry_error_skips_local_hooks() {
        let (collection, callbacks) = setup();
        callbacks.register(
            OperationType::BeforeInsert,
            "deny",
            |_op: &mut operation::OpContext<'_>| -> MongoxResult<()> {
                Err(MongoxError::hook("denied"))
            },
        );
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);

        let result = Creator::<User>::new(collection.clone(), callbacks)
            .register_before_hook(move |_op: &mut OpContext<'_, User>| {
                *flag.lock() = true;
                Ok(())
            })
            .insert_one(&mut user("carol"), None)
            .await;

        assert!(result.is_err());
        assert!(!*ran.lock());
        assert_eq!(collection.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_driver_error_skips_after_phase() {
        let (collection, callbacks) = setup();
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        callbacks.register(
            OperationType::AfterInsert,
            "after",
            move |_op: &mut operation::OpContext<'_>| {
                *flag.lock() = true;
                Ok(())
            },
        );
        collection.fail_next("duplicate key");

        let err = Creator::<User>::new(collection.clone(), callbacks)
            .insert_one(&mut user("dave"), None)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "query error: duplicate key");
        assert!(!*ran.lock());
    }

    #[tokio::test]
    async fn test_insert_many_passes_whole_slice() {
        let (collection, callbacks) = setup();
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&sizes);
        callbacks.register(
            OperationType::BeforeInsert,
            "count",
            move |op: &mut operation::OpContext<'_>| {
                seen.lock().push(op.payload.len());
                Ok(())
            },
        );

        let mut docs = vec![user("a"), user("b"), user("c")];
        let result = Creator::<User>::new(collection.clone(), callbacks)
            .register_after_hook(|op: &mut OpContext<'_, User>| {
                assert_eq!(op.docs.as_ref().map(|docs| docs.len()), Some(3));
                assert!(matches!(op.result, Some(OpResult::InsertMany(_))));
                Ok(())
            })
            .insert_many(&mut docs, None)
            .await
            .unwrap();

        assert_eq!(*sizes.lock(), vec![3]);
        assert_eq!(result.inserted_ids.len(), 3);
        assert_eq!(collection.calls(DriverOp::InsertMany), 1);
    }
}
