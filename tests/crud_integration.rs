//! Integration tests for typed CRUD through a database with plugins enabled.
//!
//! These tests cover:
//! - Default ids and timestamps on insert, update, and upsert
//! - Model lifecycle hooks on documents and hook objects
//! - Validation errors blocking writes
//! - Finder, deleter, and aggregator round trips

use std::sync::Arc;

use bson::oid::ObjectId;
use bson::{DateTime, doc};
use mongox::finder::OpContext as FinderContext;
use mongox::prelude::*;
use mongox_core::testing::{DriverOp, MemoryDatabase};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime>,
    name: String,
    email: String,
    #[serde(skip)]
    loaded: bool,
}

impl User {
    fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            ..Self::default()
        }
    }
}

impl DefaultModel for User {
    fn default_id(&mut self) -> ObjectId {
        *self.id.get_or_insert_with(ObjectId::new)
    }

    fn default_created_at(&mut self) -> DateTime {
        *self.created_at.get_or_insert_with(DateTime::now)
    }

    fn default_updated_at(&mut self) -> DateTime {
        let now = DateTime::now();
        self.updated_at = Some(now);
        now
    }
}

impl ModelHooks for User {
    fn before_insert(&mut self) -> MongoxResult<()> {
        self.email = self.email.trim().to_lowercase();
        Ok(())
    }

    fn after_find(&mut self) -> MongoxResult<()> {
        self.loaded = true;
        Ok(())
    }
}

impl Validate for User {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::default();
        if self.name.is_empty() {
            errors.push("name", "is required");
        }
        if !self.email.contains('@') {
            errors.push("email", "must contain @");
        }
        errors.into_result()
    }
}

impl Entity for User {
    fn as_default_model(&mut self) -> Option<&mut dyn DefaultModel> {
        Some(self)
    }

    fn as_model_hooks(&mut self) -> Option<&mut dyn ModelHooks> {
        Some(self)
    }

    fn as_validate(&self) -> Option<&dyn Validate> {
        Some(self)
    }
}

#[derive(Default)]
struct UpdateCounter {
    updates: Arc<parking_lot::Mutex<usize>>,
}

impl ModelHooks for UpdateCounter {
    fn after_update(&mut self) -> MongoxResult<()> {
        *self.updates.lock() += 1;
        Ok(())
    }
}

fn setup() -> (Database, Arc<MemoryDatabase>) {
    let driver = Arc::new(MemoryDatabase::new("app"));
    let db = Database::from_shared(driver.clone());
    db.init_plugins(&PluginConfig::default());
    (db, driver)
}

#[tokio::test]
async fn test_insert_fills_defaults_and_runs_model_hooks() {
    let (db, driver) = setup();
    let users = db.collection::<User>("users");
    let mut user = User::new("Ada", "  ADA@Example.com ");

    let result = users.creator().insert_one(&mut user, None).await.unwrap();

    let id = user.id.expect("id filled before insert");
    assert_eq!(result.inserted_id, Bson::ObjectId(id));
    assert!(user.created_at.is_some());
    assert!(user.updated_at.is_some());
    assert_eq!(user.email, "ada@example.com");

    let stored = driver.memory_collection("users").documents().remove(0);
    assert_eq!(stored.get_object_id("_id").unwrap(), id);
    assert_eq!(stored.get_str("email").unwrap(), "ada@example.com");
}

#[tokio::test]
async fn test_insert_many_fills_every_document() {
    let (db, driver) = setup();
    let mut users = vec![User::new("a", "a@x.io"), User::new("b", "b@x.io")];

    let result = db
        .collection::<User>("users")
        .creator()
        .insert_many(&mut users, None)
        .await
        .unwrap();

    assert_eq!(result.inserted_ids.len(), 2);
    assert!(users.iter().all(|u| u.id.is_some() && u.created_at.is_some()));
    assert_eq!(driver.memory_collection("users").calls(DriverOp::InsertMany), 1);
}

#[tokio::test]
async fn test_validation_error_blocks_insert() {
    let (db, driver) = setup();
    let mut user = User::new("", "nobody");

    let err = db
        .collection::<User>("users")
        .creator()
        .insert_one(&mut user, None)
        .await
        .unwrap_err();

    let MongoxError::Validation(errors) = &err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(errors.violations().len(), 2);
    assert!(err.is_validation());
    assert_eq!(driver.memory_collection("users").calls(DriverOp::InsertOne), 0);
}

#[tokio::test]
async fn test_update_stamps_and_calls_hook_object() {
    let (db, driver) = setup();
    let users = db.collection::<User>("users");
    users
        .creator()
        .insert_one(&mut User::new("Ada", "ada@x.io"), None)
        .await
        .unwrap();

    let counter = UpdateCounter::default();
    let updates = Arc::clone(&counter.updates);
    let result = users
        .updater()
        .filter(doc! { "name": "Ada" })
        .updates(doc! { "$set": { "email": "ada@y.io" } })
        .model_hook(counter)
        .update_one(None)
        .await
        .unwrap();

    assert_eq!(result.matched_count, 1);
    assert_eq!(result.modified_count, 1);
    assert_eq!(*updates.lock(), 1);

    let stored = driver.memory_collection("users").documents().remove(0);
    assert_eq!(stored.get_str("email").unwrap(), "ada@y.io");
    assert!(stored.get_datetime("updated_at").is_ok());
}

#[tokio::test]
async fn test_upsert_replacement_fills_fields() {
    let (db, driver) = setup();

    let result = db
        .collection::<User>("users")
        .updater()
        .filter(doc! { "name": "Grace" })
        .replacement(doc! { "name": "Grace", "email": "grace@x.io" })
        .upsert(None)
        .await
        .unwrap();

    let users = driver.memory_collection("users");
    assert_eq!(users.calls(DriverOp::ReplaceOne), 1);
    assert_eq!(users.calls(DriverOp::UpdateOne), 0);
    let stored = users.documents().remove(0);
    assert!(stored.get_datetime("created_at").is_ok());
    assert!(stored.get_datetime("updated_at").is_ok());
    assert_eq!(stored.get("_id"), result.upserted_id.as_ref());
}

#[tokio::test]
async fn test_find_runs_after_find_hooks() {
    let (db, _) = setup();
    let users = db.collection::<User>("users");
    let mut seed = vec![User::new("a", "a@x.io"), User::new("b", "b@x.io")];
    users.creator().insert_many(&mut seed, None).await.unwrap();

    let found = users.finder().find(None).await.unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|u| u.loaded));

    let one = users
        .finder()
        .filter(doc! { "name": "b" })
        .register_after_hook(|op: &mut FinderContext<'_, User>| {
            if let Some(user) = op.doc.as_deref_mut() {
                user.name = user.name.to_uppercase();
            }
            Ok(())
        })
        .find_one(None)
        .await
        .unwrap()
        .unwrap();
    assert!(one.loaded);
    assert_eq!(one.name, "B");

    let missing = users
        .finder()
        .filter(doc! { "name": "zed" })
        .find_one(None)
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_delete_with_wildcard_audit() {
    let (db, _) = setup();
    let users = db.collection::<User>("users");
    users
        .creator()
        .insert_one(&mut User::new("Ada", "ada@x.io"), None)
        .await
        .unwrap();

    let stages = Arc::new(parking_lot::Mutex::new(Vec::new()));
    for wildcard in [OperationType::BeforeAny, OperationType::AfterAny] {
        let sink = Arc::clone(&stages);
        db.register_plugin(
            "audit",
            move |op: &mut OpContext<'_>| {
                if let Some(stage) = op.op_type() {
                    sink.lock().push(stage.to_string());
                }
                Ok(())
            },
            wildcard,
        );
    }

    let result = users
        .deleter()
        .filter(doc! { "name": "Ada" })
        .delete_one(None)
        .await
        .unwrap();

    assert_eq!(result.deleted_count, 1);
    assert_eq!(*stages.lock(), vec!["beforeDelete", "afterDelete"]);
    assert_eq!(users.finder().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_plugins_disabled_leave_documents_untouched() {
    let driver = Arc::new(MemoryDatabase::new("app"));
    let db = Database::from_shared(driver.clone());
    db.init_plugins(&PluginConfig::none());
    let mut user = User::new("", "Not-An-Email");

    db.collection::<User>("users")
        .creator()
        .insert_one(&mut user, None)
        .await
        .unwrap();

    assert!(user.id.is_none());
    assert!(user.created_at.is_none());
    assert_eq!(user.email, "Not-An-Email");
    assert_eq!(driver.memory_collection("users").len(), 1);
}

#[tokio::test]
async fn test_aggregate_bypasses_hooks() {
    #[derive(Debug, Deserialize)]
    struct NameOnly {
        name: String,
    }

    let (db, _) = setup();
    let users = db.collection::<User>("users");
    let mut seed = vec![User::new("a", "a@x.io"), User::new("b", "b@x.io")];
    users.creator().insert_many(&mut seed, None).await.unwrap();

    let names: Vec<NameOnly> = users
        .aggregator()
        .pipeline(PipelineBuilder::new().match_stage(doc! { "name": "b" }))
        .aggregate_with_parse(None)
        .await
        .unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].name, "b");

    let users: Vec<User> = users
        .aggregator()
        .pipeline(vec![doc! { "$limit": 1 }])
        .aggregate(None)
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
    assert!(!users[0].loaded);
}
