//! The type-erased per-call carrier handed to registry callbacks.

use bson::Document;
use mongodb::options::{
    DeleteOptions, FindOneAndUpdateOptions, FindOneOptions, FindOptions, InsertManyOptions,
    InsertOneOptions, ReplaceOptions, UpdateOptions,
};

use crate::driver::{CollectionDriver, DeleteResult, InsertManyResult, InsertOneResult, UpdateResult};
use crate::model::{Entity, ModelHooks};

use super::OperationType;

/// Document payload of an operation.
///
/// Bulk operations carry the whole slice; callbacks that act per document
/// iterate it themselves.
#[derive(Default)]
pub enum Payload<'a> {
    /// No document (update, delete, and most finds before the driver call).
    #[default]
    None,
    /// One document.
    Single(&'a mut dyn Entity),
    /// Every document of a bulk call.
    Many(Vec<&'a mut dyn Entity>),
}

impl<'a> Payload<'a> {
    /// Attach every document of a slice.
    pub fn from_slice<T: Entity>(docs: &'a mut [T]) -> Self {
        Payload::Many(docs.iter_mut().map(|doc| doc as &mut dyn Entity).collect())
    }

    /// Check if no document is attached.
    pub fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }

    /// Number of attached documents.
    pub fn len(&self) -> usize {
        match self {
            Payload::None => 0,
            Payload::Single(_) => 1,
            Payload::Many(entities) => entities.len(),
        }
    }

    /// Check if no document is attached (an empty slice counts).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the attached documents mutably, single or many alike.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn Entity + 'a)> + '_ {
        let entities: Vec<&mut (dyn Entity + 'a)> = match self {
            Payload::None => Vec::new(),
            Payload::Single(entity) => vec![&mut **entity],
            Payload::Many(entities) => entities.iter_mut().map(|e| &mut **e).collect(),
        };
        entities.into_iter()
    }
}

impl std::fmt::Debug for Payload<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::None => f.write_str("None"),
            Payload::Single(_) => f.write_str("Single(..)"),
            Payload::Many(entities) => write!(f, "Many({})", entities.len()),
        }
    }
}

macro_rules! mongo_options {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// Driver options of the call, one variant per driver operation.
        #[derive(Debug, Clone)]
        pub enum MongoOptions {
            $(
                #[allow(missing_docs)]
                $variant($ty),
            )*
        }

        $(
            impl From<$ty> for MongoOptions {
                fn from(options: $ty) -> Self {
                    MongoOptions::$variant(options)
                }
            }

            impl TryFrom<MongoOptions> for $ty {
                type Error = MongoOptions;

                fn try_from(options: MongoOptions) -> Result<Self, Self::Error> {
                    match options {
                        MongoOptions::$variant(inner) => Ok(inner),
                        #[allow(unreachable_patterns)]
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

mongo_options! {
    InsertOne(InsertOneOptions),
    InsertMany(InsertManyOptions),
    Update(UpdateOptions),
    Replace(ReplaceOptions),
    Delete(DeleteOptions),
    FindOne(FindOneOptions),
    Find(FindOptions),
    FindOneAndUpdate(FindOneAndUpdateOptions),
}

impl MongoOptions {
    /// Extract the options of a specific driver call, dropping a mismatch.
    pub fn extract<O: TryFrom<MongoOptions>>(options: Option<MongoOptions>) -> Option<O> {
        options.and_then(|o| O::try_from(o).ok())
    }
}

/// Outcome of the driver call, stored before the after phase runs.
#[derive(Debug, Clone, PartialEq)]
pub enum OpResult {
    InsertOne(InsertOneResult),
    InsertMany(InsertManyResult),
    Update(UpdateResult),
    Delete(DeleteResult),
    /// Number of documents a find returned.
    Found(usize),
}

/// Mutable carrier passed to every registry callback.
///
/// Built fresh for each dispatch. Absent fields stay `None`; callbacks check
/// before use.
pub struct OpContext<'a> {
    /// Target collection.
    pub collection: &'a dyn CollectionDriver,
    /// Document payload.
    pub payload: Payload<'a>,
    /// Query filter.
    pub filter: Option<Document>,
    /// Update document (`$set`, `$setOnInsert`, ...).
    pub updates: Option<Document>,
    /// Full replacement document.
    pub replacement: Option<Document>,
    /// Driver options for the call.
    pub mongo_options: Option<MongoOptions>,
    /// Caller-supplied lifecycle hook object.
    pub model_hook: Option<&'a mut dyn ModelHooks>,
    /// Driver outcome, set for the after phase.
    pub result: Option<OpResult>,
    op_type: Option<OperationType>,
}

impl<'a> OpContext<'a> {
    /// Create an empty context for a collection.
    pub fn new(collection: &'a dyn CollectionDriver) -> Self {
        Self {
            collection,
            payload: Payload::None,
            filter: None,
            updates: None,
            replacement: None,
            mongo_options: None,
            model_hook: None,
            result: None,
            op_type: None,
        }
    }

    /// Attach a single document.
    pub fn doc(mut self, doc: &'a mut dyn Entity) -> Self {
        self.payload = Payload::Single(doc);
        self
    }

    /// Attach the documents of a bulk call.
    pub fn docs(mut self, docs: Vec<&'a mut dyn Entity>) -> Self {
        self.payload = Payload::Many(docs);
        self
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

    /// Set the replacement document.
    pub fn replacement(mut self, replacement: Document) -> Self {
        self.replacement = Some(replacement);
        self
    }

    /// Set the driver options.
    pub fn mongo_options(mut self, options: impl Into<MongoOptions>) -> Self {
        self.mongo_options = Some(options.into());
        self
    }

    /// Attach a lifecycle hook object.
    pub fn model_hook(mut self, hook: &'a mut dyn ModelHooks) -> Self {
        self.model_hook = Some(hook);
        self
    }

    /// The stage currently being dispatched, if any.
    pub fn op_type(&self) -> Option<OperationType> {
        self.op_type
    }

    pub(crate) fn set_op_type(&mut self, op_type: OperationType) {
        self.op_type = Some(op_type);
    }

    /// Name of the target collection.
    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    /// Load owned per-call values into this context.
    pub(crate) fn with_state(mut self, state: &mut CallState) -> Self {
        self.filter = state.filter.take();
        self.updates = state.updates.take();
        self.replacement = state.replacement.take();
        self.mongo_options = state.options.take();
        self.result = state.result.take();
        self
    }

    /// Move owned per-call values back out, including any callback edits.
    pub(crate) fn save_state(self, state: &mut CallState) {
        state.filter = self.filter;
        state.updates = self.updates;
        state.replacement = self.replacement;
        state.options = self.mongo_options;
        state.result = self.result;
    }
}

impl std::fmt::Debug for OpContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpContext")
            .field("collection", &self.collection.name())
            .field("payload", &self.payload)
            .field("filter", &self.filter)
            .field("updates", &self.updates)
            .field("replacement", &self.replacement)
            .field("mongo_options", &self.mongo_options)
            .field("model_hook", &self.model_hook.is_some())
            .field("result", &self.result)
            .field("op_type", &self.op_type)
            .finish()
    }
}

/// Owned values a façade threads through the registry context, its typed
/// context, and the driver call.
#[derive(Debug, Default)]
pub(crate) struct CallState {
    pub(crate) filter: Option<Document>,
    pub(crate) updates: Option<Document>,
    pub(crate) replacement: Option<Document>,
    pub(crate) options: Option<MongoOptions>,
    pub(crate) result: Option<OpResult>,
}
