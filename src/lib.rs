//! # Mongox
//!
//! A thin, generic object-document mapper for MongoDB.
//!
//! Mongox provides:
//! - Typed collections over the official MongoDB driver
//! - A per-database registry of named before/after callbacks, with
//!   `before*`/`after*` wildcards
//! - Per-call typed hooks on the Creator/Updater/Deleter/Finder façades
//! - Built-in plugins for default ids and timestamps, model hooks, and
//!   validation
//! - BSON query, update, and aggregation builders
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mongox::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct User {
//!     #[serde(flatten)]
//!     model: Model,
//!     name: String,
//! }
//!
//! impl Entity for User {
//!     fn as_default_model(&mut self) -> Option<&mut dyn DefaultModel> {
//!         Some(&mut self.model)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), MongoxError> {
//!     let config = MongoConfig::from_uri("mongodb://localhost:27017", "app");
//!     let db = Database::connect(&config).await?;
//!     db.init_plugins(&PluginConfig::default());
//!
//!     let users = db.collection::<User>("users");
//!     let mut user = User { name: "Alice".into(), ..User::default() };
//!     users.creator().insert_one(&mut user, None).await?;
//!
//!     let found = users
//!         .finder()
//!         .filter(QueryBuilder::new().eq("name", "Alice").build())
//!         .find_one(None)
//!         .await?;
//!     assert!(found.is_some());
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// BSON builders and conversions.
pub mod bson {
    pub use mongox_bson::*;
}

pub use mongox_core::{
    Aggregator, Callback, Callbacks, Collection, Creator, Database, Deleter, Entity, Finder,
    MongoConfig, MongoxError, MongoxResult, OpContext, OperationType, PluginConfig, Updater,
    aggregator, callback, collection, config, creator, database, deleter, driver, error, finder,
    logging, model, operation, plugin, updater,
};

#[cfg(feature = "testing")]
pub use mongox_core::testing;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use mongox_bson::prelude::*;
    pub use mongox_core::prelude::*;
}
