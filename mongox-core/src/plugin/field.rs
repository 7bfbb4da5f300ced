//! Default `_id` and timestamp population.

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use tracing::trace;

use crate::callback::Callback;
use crate::error::{MongoxError, MongoxResult};
use crate::model::Entity;
use crate::operation::{OpContext, OperationType};

/// Field holding the document id.
pub const FIELD_ID: &str = "_id";
/// Field holding the creation time.
pub const FIELD_CREATED_AT: &str = "created_at";
/// Field holding the last update time.
pub const FIELD_UPDATED_AT: &str = "updated_at";

/// Fills ids and timestamps before writes.
///
/// - insert: every payload document with a [`DefaultModel`] or
///   [`CustomModel`] capability gets its id and timestamps.
/// - update: `$set` receives the update time.
/// - upsert: a replacement document gets id, creation and update time when
///   absent; otherwise `$setOnInsert` receives id and creation time unless
///   the caller set them, and `$set` receives the update time.
///
/// [`DefaultModel`]: crate::model::DefaultModel
/// [`CustomModel`]: crate::model::CustomModel
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFieldPlugin;

impl DefaultFieldPlugin {
    /// Stages the plugin is registered at.
    pub const STAGES: &'static [OperationType] = &[
        OperationType::BeforeInsert,
        OperationType::BeforeUpdate,
        OperationType::BeforeUpsert,
    ];
}

#[async_trait]
impl Callback for DefaultFieldPlugin {
    async fn call(&self, op: &mut OpContext<'_>) -> MongoxResult<()> {
        match op.op_type() {
            Some(OperationType::BeforeInsert) => {
                for entity in op.payload.iter_mut() {
                    stamp(entity);
                }
            }
            Some(OperationType::BeforeUpdate) => touch(op)?,
            Some(OperationType::BeforeUpsert) => fill_upsert(op)?,
            _ => {}
        }
        Ok(())
    }
}

/// Field names and values a write should carry.
struct Stamp {
    id: Option<(String, Bson)>,
    created_at: Option<(String, Bson)>,
    updated_at: Option<(String, Bson)>,
}

impl Stamp {
    fn fresh() -> Self {
        let now = Bson::DateTime(bson::DateTime::now());
        Self {
            id: Some((FIELD_ID.to_string(), Bson::ObjectId(ObjectId::new()))),
            created_at: Some((FIELD_CREATED_AT.to_string(), now.clone())),
            updated_at: Some((FIELD_UPDATED_AT.to_string(), now)),
        }
    }
}

/// Fill the defaults of one document and report what was written.
fn stamp(entity: &mut (dyn Entity + '_)) -> Option<Stamp> {
    if let Some(model) = entity.as_default_model() {
        return Some(Stamp {
            id: Some((FIELD_ID.to_string(), Bson::ObjectId(model.default_id()))),
            created_at: Some((
                FIELD_CREATED_AT.to_string(),
                Bson::DateTime(model.default_created_at()),
            )),
            updated_at: Some((
                FIELD_UPDATED_AT.to_string(),
                Bson::DateTime(model.default_updated_at()),
            )),
        });
    }
    entity.as_custom_model().map(|custom| Stamp {
        id: custom.custom_id(),
        created_at: custom.custom_created_at(),
        updated_at: custom.custom_updated_at(),
    })
}

/// Stamp from the first payload document, or fresh defaults.
fn payload_stamp(op: &mut OpContext<'_>) -> Stamp {
    op.payload
        .iter_mut()
        .next()
        .and_then(stamp)
        .unwrap_or_else(Stamp::fresh)
}

fn touch(op: &mut OpContext<'_>) -> MongoxResult<()> {
    if op.updates.is_none() {
        return Ok(());
    }
    let Stamp { updated_at, .. } = payload_stamp(op);
    let (Some(updates), Some((field, now))) = (op.updates.as_mut(), updated_at) else {
        return Ok(());
    };
    trace!(field = %field, "setting update time");
    merge_operator(updates, "$set", |set| {
        set.insert(field, now);
    })
}

fn fill_upsert(op: &mut OpContext<'_>) -> MongoxResult<()> {
    let Stamp {
        id,
        created_at,
        updated_at,
    } = payload_stamp(op);

    if let Some(replacement) = op.replacement.as_mut() {
        for (field, value) in [id, created_at].into_iter().flatten() {
            if !replacement.contains_key(&field) {
                replacement.insert(field, value);
            }
        }
        if let Some((field, value)) = updated_at {
            replacement.insert(field, value);
        }
        return Ok(());
    }

    let Some(updates) = op.updates.as_mut() else {
        return Ok(());
    };
    merge_operator(updates, "$setOnInsert", |on_insert| {
        for (field, value) in [id, created_at].into_iter().flatten() {
            if !on_insert.contains_key(&field) {
                on_insert.insert(field, value);
            }
        }
    })?;
    if let Some((field, value)) = updated_at {
        merge_operator(updates, "$set", |set| {
            set.insert(field, value);
        })?;
    }
    Ok(())
}

/// Apply `apply` to the operator document under `key`, creating it when
/// absent. An operator holding anything but a document is left untouched and
/// reported.
fn merge_operator(
    updates: &mut Document,
    key: &str,
    apply: impl FnOnce(&mut Document),
) -> MongoxResult<()> {
    let slot = updates
        .entry(key.to_string())
        .or_insert_with(|| Bson::Document(Document::new()));
    match slot {
        Bson::Document(operator) => {
            apply(operator);
            Ok(())
        }
        other => Err(MongoxError::invalid_argument(format!(
            "{key} must be a document, found {:?}",
            other.element_type()
        ))),
    }
}
