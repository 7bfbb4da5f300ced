//! # mongox-core
//!
//! Callback pipeline, typed collections, and CRUD façades for the mongox ODM.
//!
//! This crate provides:
//! - A per-database registry of named callbacks keyed by operation stage
//!   (`beforeInsert`, `afterUpdate`, ...), including `before*`/`after*`
//!   wildcard buckets
//! - Creator/Updater/Deleter/Finder façades that run registry callbacks and
//!   their own typed hooks around each driver call
//! - Built-in plugins for default ids and timestamps, model lifecycle hooks,
//!   and validation
//! - A driver seam implemented for the official MongoDB driver and, with the
//!   `testing` feature, an in-memory driver
//!
//! ## Call sequence
//!
//! Every write and find runs the same phases, strictly in order:
//!
//! 1. registry callbacks for the `before…` stage (concrete, then wildcard)
//! 2. the façade's local before hooks
//! 3. the driver call
//! 4. registry callbacks for the `after…` stage
//! 5. the façade's local after hooks
//!
//! The first error stops the call and is returned unchanged. A driver error
//! skips the after phases.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mongox_core::prelude::*;
//!
//! let db = Database::connect(&MongoConfig::from_uri("mongodb://localhost", "app")).await?;
//! db.init_plugins(&PluginConfig::default());
//!
//! db.register_plugin(
//!     "audit",
//!     |op: &mut OpContext<'_>| {
//!         tracing::info!(collection = op.collection_name(), "insert");
//!         Ok(())
//!     },
//!     OperationType::BeforeInsert,
//! );
//!
//! let users = db.collection::<User>("users");
//! users.creator().insert_one(&mut user, None).await?;
//! ```

pub mod aggregator;
pub mod callback;
pub mod collection;
pub mod config;
pub mod creator;
pub mod database;
pub mod deleter;
pub mod driver;
pub mod error;
pub mod finder;
pub mod logging;
pub mod model;
pub mod operation;
pub mod plugin;
pub mod updater;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use aggregator::Aggregator;
pub use callback::{Callback, Callbacks, SharedCallback};
pub use collection::Collection;
pub use config::{MongoConfig, MongoConfigBuilder, PluginConfig};
pub use creator::{Creator, CreatorHook};
pub use database::Database;
pub use deleter::{Deleter, DeleterHook};
pub use driver::{
    CollectionDriver, DatabaseDriver, DeleteResult, InsertManyResult, InsertOneResult,
    UpdateResult,
};
pub use error::{MongoxError, MongoxResult};
pub use finder::{Finder, FinderHook};
pub use model::{
    CustomModel, DefaultModel, Entity, FieldViolation, Model, ModelHooks, Validate,
    ValidationError,
};
pub use operation::{MongoOptions, OpContext, OpResult, OperationType, Payload};
pub use updater::{Updater, UpdaterHook};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::callback::{Callback, Callbacks};
    pub use crate::collection::Collection;
    pub use crate::config::{MongoConfig, PluginConfig};
    pub use crate::database::Database;
    pub use crate::error::{MongoxError, MongoxResult};
    pub use crate::model::{
        CustomModel, DefaultModel, Entity, Model, ModelHooks, Validate, ValidationError,
    };
    pub use crate::operation::{OpContext, OpResult, OperationType, Payload};
}
