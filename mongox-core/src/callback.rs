//! Named callback registry.
//!
//! A [`Callbacks`] instance holds, per [`OperationType`], an ordered set of
//! named callbacks. Dispatching a concrete stage runs that stage's bucket in
//! registration order and then the matching wildcard bucket (`before*` or
//! `after*`), stopping at the first error.
//!
//! ```rust
//! use mongox_core::callback::Callbacks;
//! use mongox_core::operation::{OpContext, OperationType};
//!
//! let callbacks = Callbacks::new();
//! callbacks.register(OperationType::BeforeInsert, "audit", |op: &mut OpContext<'_>| {
//!     tracing::info!(collection = op.collection_name(), "inserting");
//!     Ok(())
//! });
//! assert!(callbacks.contains(OperationType::BeforeInsert, "audit"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::error::MongoxResult;
use crate::operation::{OpContext, OperationType};

/// A function run by the registry for one operation stage.
///
/// Plain closures taking `&mut OpContext<'_>` implement this trait; implement
/// it directly when the callback needs to await.
#[async_trait]
pub trait Callback: Send + Sync {
    /// Run the callback. An error aborts the remaining chain and is returned
    /// to the caller as is.
    async fn call(&self, op: &mut OpContext<'_>) -> MongoxResult<()>;
}

#[async_trait]
impl<F> Callback for F
where
    F: Fn(&mut OpContext<'_>) -> MongoxResult<()> + Send + Sync,
{
    async fn call(&self, op: &mut OpContext<'_>) -> MongoxResult<()> {
        self(op)
    }
}

/// A shared callback.
pub type SharedCallback = Arc<dyn Callback>;

type Bucket = IndexMap<String, SharedCallback>;

/// Per-database callback registry.
///
/// Registration and removal take a write lock; dispatch copies the
/// callbacks it will run under a read lock and releases it before calling
/// them, so a callback may itself register or remove callbacks.
#[derive(Default)]
pub struct Callbacks {
    buckets: RwLock<HashMap<OperationType, Bucket>>,
}

impl Callbacks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `name` for `op_type`.
    ///
    /// An existing entry with the same name in that bucket is replaced in
    /// place, keeping its position.
    pub fn register<C>(&self, op_type: OperationType, name: impl Into<String>, callback: C)
    where
        C: Callback + 'static,
    {
        self.register_shared(op_type, name, Arc::new(callback));
    }

    /// Register an already shared callback.
    pub fn register_shared(
        &self,
        op_type: OperationType,
        name: impl Into<String>,
        callback: SharedCallback,
    ) {
        let name = name.into();
        debug!(op_type = %op_type, callback = %name, "registering callback");
        self.buckets
            .write()
            .entry(op_type)
            .or_default()
            .insert(name, callback);
    }

    /// Remove `name` from the `op_type` bucket.
    ///
    /// Returns whether an entry was removed; removing an absent name is a
    /// no-op.
    pub fn remove(&self, op_type: OperationType, name: &str) -> bool {
        let mut buckets = self.buckets.write();
        let Some(bucket) = buckets.get_mut(&op_type) else {
            return false;
        };
        let removed = bucket.shift_remove(name).is_some();
        if bucket.is_empty() {
            buckets.remove(&op_type);
        }
        if removed {
            debug!(op_type = %op_type, callback = %name, "removed callback");
        }
        removed
    }

    /// Check if `name` is registered for `op_type`.
    pub fn contains(&self, op_type: OperationType, name: &str) -> bool {
        self.buckets
            .read()
            .get(&op_type)
            .is_some_and(|bucket| bucket.contains_key(name))
    }

    /// Names registered for `op_type`, in execution order.
    pub fn names(&self, op_type: OperationType) -> Vec<String> {
        self.buckets
            .read()
            .get(&op_type)
            .map(|bucket| bucket.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of callbacks registered for `op_type`.
    pub fn len(&self, op_type: OperationType) -> usize {
        self.buckets.read().get(&op_type).map_or(0, Bucket::len)
    }

    /// Check if nothing is registered at all.
    pub fn is_empty(&self) -> bool {
        self.buckets.read().is_empty()
    }

    /// Remove every registration.
    pub fn clear(&self) {
        self.buckets.write().clear();
    }

    /// Run the callbacks for a concrete stage.
    ///
    /// The concrete bucket runs first, then the matching wildcard bucket,
    /// each in registration order. The first error stops the dispatch and is
    /// returned unchanged.
    pub async fn execute(&self, op: &mut OpContext<'_>, op_type: OperationType) -> MongoxResult<()> {
        if op_type.is_wildcard() {
            warn!(op_type = %op_type, "wildcard stage dispatched directly; nothing to run");
            return Ok(());
        }

        op.set_op_type(op_type);
        let chain = self.chain(op_type);
        if chain.is_empty() {
            return Ok(());
        }

        debug!(
            op_type = %op_type,
            collection = op.collection_name(),
            callbacks = chain.len(),
            "executing callbacks"
        );

        for (name, callback) in chain {
            trace!(op_type = %op_type, callback = %name, "running callback");
            if let Err(e) = callback.call(op).await {
                debug!(op_type = %op_type, callback = %name, error = %e, "callback failed");
                return Err(e);
            }
        }

        Ok(())
    }

    fn chain(&self, op_type: OperationType) -> Vec<(String, SharedCallback)> {
        let buckets = self.buckets.read();
        let concrete = buckets.get(&op_type).into_iter().flatten();
        let wildcard = op_type
            .wildcard()
            .and_then(|w| buckets.get(&w))
            .into_iter()
            .flatten();

        concrete
            .chain(wildcard)
            .map(|(name, callback)| (name.clone(), Arc::clone(callback)))
            .collect()
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buckets = self.buckets.read();
        let mut map = f.debug_map();
        for (op_type, bucket) in buckets.iter() {
            map.entry(&op_type.as_str(), &bucket.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MongoxError;
    use crate::testing::MemoryCollection;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    type Log = Arc<Mutex<Vec<String>>>;

    fn logger(log: &Log, entry: &str) -> impl Fn(&mut OpContext<'_>) -> MongoxResult<()> + use<> {
        let log = Arc::clone(log);
        let entry = entry.to_string();
        move |_op: &mut OpContext<'_>| {
            log.lock().push(entry.clone());
            Ok(())
        }
    }

    async fn run(callbacks: &Callbacks, op_type: OperationType) -> MongoxResult<()> {
        let collection = MemoryCollection::new("users");
        let mut op = OpContext::new(&collection);
        callbacks.execute(&mut op, op_type).await
    }

    #[tokio::test]
    async fn test_execute_in_registration_order() {
        let callbacks = Callbacks::new();
        let log = Log::default();
        callbacks.register(OperationType::BeforeInsert, "first", logger(&log, "first"));
        callbacks.register(OperationType::BeforeInsert, "second", logger(&log, "second"));
        callbacks.register(OperationType::BeforeInsert, "third", logger(&log, "third"));

        run(&callbacks, OperationType::BeforeInsert).await.unwrap();

        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_overwrite_keeps_position() {
        let callbacks = Callbacks::new();
        let log = Log::default();
        callbacks.register(OperationType::BeforeUpdate, "a", logger(&log, "a-old"));
        callbacks.register(OperationType::BeforeUpdate, "b", logger(&log, "b"));
        callbacks.register(OperationType::BeforeUpdate, "a", logger(&log, "a-new"));

        run(&callbacks, OperationType::BeforeUpdate).await.unwrap();

        assert_eq!(*log.lock(), vec!["a-new", "b"]);
        assert_eq!(callbacks.names(OperationType::BeforeUpdate), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_remove_only_touches_one_bucket() {
        let callbacks = Callbacks::new();
        let log = Log::default();
        callbacks.register(OperationType::BeforeInsert, "audit", logger(&log, "insert"));
        callbacks.register(OperationType::BeforeDelete, "audit", logger(&log, "delete"));

        assert!(callbacks.remove(OperationType::BeforeInsert, "audit"));

        run(&callbacks, OperationType::BeforeInsert).await.unwrap();
        run(&callbacks, OperationType::BeforeDelete).await.unwrap();

        assert_eq!(*log.lock(), vec!["delete"]);
        assert!(!callbacks.contains(OperationType::BeforeInsert, "audit"));
        assert!(callbacks.contains(OperationType::BeforeDelete, "audit"));
    }

    #[tokio::test]
    async fn test_remove_wildcard_keeps_concrete_registration() {
        let callbacks = Callbacks::new();
        let log = Log::default();
        callbacks.register(OperationType::BeforeInsert, "trace", logger(&log, "concrete"));
        callbacks.register(OperationType::BeforeAny, "trace", logger(&log, "wildcard"));

        callbacks.remove(OperationType::BeforeAny, "trace");
        run(&callbacks, OperationType::BeforeInsert).await.unwrap();

        assert_eq!(*log.lock(), vec!["concrete"]);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let callbacks = Callbacks::new();
        assert!(!callbacks.remove(OperationType::AfterFind, "missing"));
        assert!(!callbacks.remove(OperationType::AfterFind, "missing"));

        callbacks.register(OperationType::AfterFind, "present", logger(&Log::default(), "x"));
        assert!(callbacks.remove(OperationType::AfterFind, "present"));
        assert!(!callbacks.remove(OperationType::AfterFind, "present"));
        assert!(callbacks.is_empty());
    }

    #[tokio::test]
    async fn test_wildcard_runs_after_concrete_for_every_before_stage() {
        for op_type in OperationType::CONCRETE.into_iter().filter(OperationType::is_before) {
            let callbacks = Callbacks::new();
            let log = Log::default();
            callbacks.register(OperationType::BeforeAny, "any", logger(&log, "any"));
            callbacks.register(op_type, "own", logger(&log, "own"));

            run(&callbacks, op_type).await.unwrap();

            assert_eq!(*log.lock(), vec!["own", "any"], "stage {}", op_type);
        }
    }

    #[tokio::test]
    async fn test_before_wildcard_never_runs_for_after_stages() {
        let callbacks = Callbacks::new();
        let log = Log::default();
        callbacks.register(OperationType::BeforeAny, "any", logger(&log, "before"));

        for op_type in OperationType::CONCRETE.into_iter().filter(OperationType::is_after) {
            run(&callbacks, op_type).await.unwrap();
        }

        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_wildcard_dispatch_runs_nothing() {
        let callbacks = Callbacks::new();
        let log = Log::default();
        callbacks.register(OperationType::AfterAny, "any", logger(&log, "any"));

        run(&callbacks, OperationType::AfterAny).await.unwrap();

        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_error_short_circuits_bucket_and_wildcards() {
        let callbacks = Callbacks::new();
        let log = Log::default();
        callbacks.register(OperationType::BeforeDelete, "ok", logger(&log, "ok"));
        callbacks.register(
            OperationType::BeforeDelete,
            "deny",
            |_op: &mut OpContext<'_>| -> MongoxResult<()> { Err(MongoxError::hook("delete denied")) },
        );
        callbacks.register(OperationType::BeforeDelete, "later", logger(&log, "later"));
        callbacks.register(OperationType::BeforeAny, "any", logger(&log, "any"));

        let err = run(&callbacks, OperationType::BeforeDelete).await.unwrap_err();

        assert!(matches!(err, MongoxError::Hook(ref msg) if msg == "delete denied"));
        assert_eq!(*log.lock(), vec!["ok"]);
    }

    #[tokio::test]
    async fn test_callbacks_see_earlier_mutations() {
        let callbacks = Callbacks::new();
        callbacks.register(OperationType::BeforeUpdate, "stamp", |op: &mut OpContext<'_>| {
            op.updates = Some(bson::doc! { "$set": { "stamped": true } });
            Ok(())
        });
        callbacks.register(OperationType::BeforeUpdate, "check", |op: &mut OpContext<'_>| {
            let stamped = op
                .updates
                .as_ref()
                .and_then(|u| u.get_document("$set").ok())
                .is_some_and(|set| set.get_bool("stamped").unwrap_or(false));
            if stamped {
                Ok(())
            } else {
                Err(MongoxError::hook("not stamped"))
            }
        });

        run(&callbacks, OperationType::BeforeUpdate).await.unwrap();
    }

    #[tokio::test]
    async fn test_callback_reads_dispatched_stage() {
        let callbacks = Callbacks::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        callbacks.register(OperationType::AfterAny, "stage", move |op: &mut OpContext<'_>| {
            sink.lock().extend(op.op_type());
            Ok(())
        });

        run(&callbacks, OperationType::AfterInsert).await.unwrap();
        run(&callbacks, OperationType::AfterDelete).await.unwrap();

        assert_eq!(
            *seen.lock(),
            vec![OperationType::AfterInsert, OperationType::AfterDelete]
        );
    }

    struct Reregister {
        callbacks: Arc<Callbacks>,
    }

    #[async_trait]
    impl Callback for Reregister {
        async fn call(&self, _op: &mut OpContext<'_>) -> MongoxResult<()> {
            self.callbacks.remove(OperationType::BeforeFind, "once");
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_callback_may_mutate_registry() {
        let callbacks = Arc::new(Callbacks::new());
        callbacks.register(
            OperationType::BeforeFind,
            "once",
            Reregister {
                callbacks: Arc::clone(&callbacks),
            },
        );

        run(&callbacks, OperationType::BeforeFind).await.unwrap();

        assert!(!callbacks.contains(OperationType::BeforeFind, "once"));
    }

    #[tokio::test]
    async fn test_scenario_flag_survives_removal() {
        let callbacks = Callbacks::new();
        let flag = Arc::new(AtomicBool::new(false));
        let setter = Arc::clone(&flag);
        callbacks.register(OperationType::BeforeInsert, "audit", move |_op: &mut OpContext<'_>| {
            setter.store(true, Ordering::SeqCst);
            Ok(())
        });

        run(&callbacks, OperationType::BeforeInsert).await.unwrap();
        assert!(flag.load(Ordering::SeqCst));

        callbacks.remove(OperationType::BeforeInsert, "audit");
        run(&callbacks, OperationType::BeforeInsert).await.unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_scenario_after_update_log_exactly_once() {
        let callbacks = Callbacks::new();
        let log = Log::default();
        callbacks.register(OperationType::AfterUpdate, "a", logger(&log, "a"));
        callbacks.register(OperationType::AfterUpdate, "b", logger(&log, "b"));

        run(&callbacks, OperationType::AfterUpdate).await.unwrap();

        assert_eq!(*log.lock(), vec!["a", "b"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_register_and_execute() {
        let callbacks = Arc::new(Callbacks::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for i in 0..16 {
            let callbacks = Arc::clone(&callbacks);
            let hits = Arc::clone(&hits);
            tasks.push(tokio::spawn(async move {
                let counter = Arc::clone(&hits);
                callbacks.register(
                    OperationType::AfterInsert,
                    format!("cb-{}", i),
                    move |_op: &mut OpContext<'_>| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    },
                );
                run(&callbacks, OperationType::AfterInsert).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(callbacks.len(OperationType::AfterInsert), 16);
        assert!(hits.load(Ordering::SeqCst) >= 16);
    }
}
