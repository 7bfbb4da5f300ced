//! Typed collection handle.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::aggregator::Aggregator;
use crate::callback::Callbacks;
use crate::creator::Creator;
use crate::deleter::Deleter;
use crate::driver::CollectionDriver;
use crate::finder::Finder;
use crate::model::Entity;
use crate::updater::Updater;

/// A collection of documents of type `T`.
///
/// Cheap to clone. Every façade it hands out shares the database's callback
/// registry; build a new façade per query rather than caching one.
pub struct Collection<T> {
    driver: Arc<dyn CollectionDriver>,
    callbacks: Arc<Callbacks>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            callbacks: Arc::clone(&self.callbacks),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.driver.name())
            .finish()
    }
}

impl<T> Collection<T>
where
    T: Entity + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Wrap a collection driver and a registry.
    pub fn new(driver: Arc<dyn CollectionDriver>, callbacks: Arc<Callbacks>) -> Self {
        Self {
            driver,
            callbacks,
            _marker: PhantomData,
        }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        self.driver.name()
    }

    /// The underlying driver.
    pub fn driver(&self) -> &Arc<dyn CollectionDriver> {
        &self.driver
    }

    /// The shared callback registry.
    pub fn callbacks(&self) -> &Arc<Callbacks> {
        &self.callbacks
    }

    /// Start an insert.
    pub fn creator(&self) -> Creator<T> {
        Creator::new(Arc::clone(&self.driver), Arc::clone(&self.callbacks))
    }

    /// Start an update or upsert.
    pub fn updater<'d>(&self) -> Updater<'d, T> {
        Updater::new(Arc::clone(&self.driver), Arc::clone(&self.callbacks))
    }

    /// Start a delete.
    pub fn deleter(&self) -> Deleter<T> {
        Deleter::new(Arc::clone(&self.driver), Arc::clone(&self.callbacks))
    }

    /// Start a query.
    pub fn finder(&self) -> Finder<T> {
        Finder::new(Arc::clone(&self.driver), Arc::clone(&self.callbacks))
    }

    /// Start an aggregation.
    pub fn aggregator(&self) -> Aggregator<T> {
        Aggregator::new(Arc::clone(&self.driver))
    }
}
