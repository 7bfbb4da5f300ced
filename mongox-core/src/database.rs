//! Database handle owning the callback registry.

use std::fmt;
use std::sync::Arc;

use mongodb::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::callback::{Callback, Callbacks};
use crate::collection::Collection;
use crate::config::{MongoConfig, PluginConfig};
use crate::driver::DatabaseDriver;
use crate::error::MongoxResult;
use crate::model::Entity;
use crate::operation::OperationType;
use crate::plugin;

/// A logical database.
///
/// Each `Database` owns one callback registry, shared by every collection
/// and façade built from it. Two independently opened databases never share
/// callbacks. Clones share the registry.
#[derive(Clone)]
pub struct Database {
    driver: Arc<dyn DatabaseDriver>,
    callbacks: Arc<Callbacks>,
}

impl Database {
    /// Wrap a database driver with a fresh, empty registry.
    pub fn new(driver: impl DatabaseDriver + 'static) -> Self {
        Self::from_shared(Arc::new(driver))
    }

    /// Wrap an already shared driver with a fresh, empty registry.
    pub fn from_shared(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self {
            driver,
            callbacks: Arc::new(Callbacks::new()),
        }
    }

    /// Wrap a `mongodb` database handle.
    pub fn from_mongodb(database: mongodb::Database) -> Self {
        Self::new(database)
    }

    /// Connect using `config`.
    ///
    /// Plugins are not registered; call [`Database::init_plugins`].
    pub async fn connect(config: &MongoConfig) -> MongoxResult<Self> {
        let options = config.to_client_options().await?;
        let client = Client::with_options(options)?;
        info!(database = %config.database, "connected to MongoDB");
        Ok(Self::from_mongodb(client.database(&config.database)))
    }

    /// Database name.
    pub fn name(&self) -> &str {
        self.driver.name()
    }

    /// The registry shared by this database's collections.
    pub fn callbacks(&self) -> &Arc<Callbacks> {
        &self.callbacks
    }

    /// Open a typed collection.
    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Entity + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        Collection::new(self.driver.collection(name), Arc::clone(&self.callbacks))
    }

    /// Register a named callback for one stage.
    pub fn register_plugin(
        &self,
        name: impl Into<String>,
        callback: impl Callback + 'static,
        op_type: OperationType,
    ) {
        self.callbacks.register(op_type, name, callback);
    }

    /// Remove a named callback from one stage.
    pub fn remove_plugin(&self, name: &str, op_type: OperationType) -> bool {
        self.callbacks.remove(op_type, name)
    }

    /// Register the built-in plugins `config` enables.
    pub fn init_plugins(&self, config: &PluginConfig) {
        plugin::register_plugins(&self.callbacks, config);
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.driver.name())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OpContext;
    use crate::testing::MemoryDatabase;
    use bson::{Document, doc};
    use parking_lot::Mutex;

    #[test]
    fn test_databases_have_independent_registries() {
        let first = Database::new(MemoryDatabase::new("one"));
        let second = Database::new(MemoryDatabase::new("two"));

        first.register_plugin("audit", |_: &mut OpContext<'_>| Ok(()), OperationType::BeforeInsert);

        assert!(first.callbacks().contains(OperationType::BeforeInsert, "audit"));
        assert!(second.callbacks().is_empty());
        assert_eq!(first.name(), "one");

        let clone = first.clone();
        assert!(clone.remove_plugin("audit", OperationType::BeforeInsert));
        assert!(first.callbacks().is_empty());
    }

    #[tokio::test]
    async fn test_plugin_runs_for_collections_of_the_database() {
        let db = Database::new(MemoryDatabase::new("app"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        db.register_plugin(
            "names",
            move |op: &mut OpContext<'_>| {
                sink.lock().push(op.collection_name().to_string());
                Ok(())
            },
            OperationType::BeforeInsert,
        );

        db.collection::<Document>("users")
            .creator()
            .insert_one(&mut doc! { "name": "a" }, None)
            .await
            .unwrap();
        db.collection::<Document>("teams")
            .creator()
            .insert_one(&mut doc! { "name": "b" }, None)
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec!["users", "teams"]);
    }

    #[test]
    fn test_init_plugins() {
        let db = Database::new(MemoryDatabase::new("app"));
        db.init_plugins(&PluginConfig::default());

        assert!(db.callbacks().contains(OperationType::BeforeUpsert, plugin::DEFAULT_FIELD_PLUGIN));
        assert!(db.callbacks().contains(OperationType::AfterFind, plugin::MODEL_PLUGIN));
        assert!(db.callbacks().contains(OperationType::BeforeInsert, plugin::VALIDATION_PLUGIN));
    }
}
