//! Document capability traits.
//!
//! The registry works on type-erased documents. Whatever a plugin needs to
//! know about a document is discovered through the optional accessors on
//! [`Entity`]; an accessor returning `None` means "not applicable", never an
//! error.
//!
//! ```rust
//! use mongox_core::model::{DefaultModel, Entity, Model};
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
//! ```

use std::fmt;

use bson::oid::ObjectId;
use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::MongoxResult;

/// A document type that can travel through the callback pipeline.
pub trait Entity: Send + Sync {
    /// Access the standard `_id`/`created_at`/`updated_at` fields.
    fn as_default_model(&mut self) -> Option<&mut dyn DefaultModel> {
        None
    }

    /// Access caller-named id/timestamp fields.
    fn as_custom_model(&mut self) -> Option<&mut dyn CustomModel> {
        None
    }

    /// Access lifecycle hooks implemented by the document itself.
    fn as_model_hooks(&mut self) -> Option<&mut dyn ModelHooks> {
        None
    }

    /// Access the document's validation rules.
    fn as_validate(&self) -> Option<&dyn Validate> {
        None
    }
}

impl Entity for Document {}

/// Documents carrying the standard id and timestamp fields.
///
/// Each method is get-or-create: it fills the field when it is unset and
/// returns the stored value. `default_updated_at` always refreshes.
pub trait DefaultModel {
    /// Return the id, generating one if missing.
    fn default_id(&mut self) -> ObjectId;

    /// Return the creation time, setting it to now if missing.
    fn default_created_at(&mut self) -> bson::DateTime;

    /// Set the update time to now and return it.
    fn default_updated_at(&mut self) -> bson::DateTime;
}

/// Documents that store id and timestamps under their own field names.
///
/// Each method returns the field name and value to persist, or `None` when
/// the document does not track that field.
pub trait CustomModel {
    /// Id field name and value, generating the value if missing.
    fn custom_id(&mut self) -> Option<(String, Bson)>;

    /// Creation-time field name and value, set to now if missing.
    fn custom_created_at(&mut self) -> Option<(String, Bson)>;

    /// Update-time field name and the refreshed value.
    fn custom_updated_at(&mut self) -> Option<(String, Bson)>;
}

/// Lifecycle hooks invoked by the model plugin.
///
/// Every method defaults to a no-op.
pub trait ModelHooks: Send + Sync {
    /// Runs before an insert reaches the driver.
    fn before_insert(&mut self) -> MongoxResult<()> {
        Ok(())
    }

    /// Runs after a successful insert.
    fn after_insert(&mut self) -> MongoxResult<()> {
        Ok(())
    }

    /// Runs before an update reaches the driver.
    fn before_update(&mut self) -> MongoxResult<()> {
        Ok(())
    }

    /// Runs after a successful update.
    fn after_update(&mut self) -> MongoxResult<()> {
        Ok(())
    }

    /// Runs before an upsert reaches the driver.
    fn before_upsert(&mut self) -> MongoxResult<()> {
        Ok(())
    }

    /// Runs after a successful upsert.
    fn after_upsert(&mut self) -> MongoxResult<()> {
        Ok(())
    }

    /// Runs before a delete reaches the driver.
    fn before_delete(&mut self) -> MongoxResult<()> {
        Ok(())
    }

    /// Runs after a successful delete.
    fn after_delete(&mut self) -> MongoxResult<()> {
        Ok(())
    }

    /// Runs on each document a find returned.
    fn after_find(&mut self) -> MongoxResult<()> {
        Ok(())
    }
}

/// Borrow an owned hook object for one dispatch.
pub(crate) fn model_hook_mut(hook: &mut Option<Box<dyn ModelHooks>>) -> Option<&mut dyn ModelHooks> {
    match hook {
        Some(hook) => Some(hook.as_mut()),
        None => None,
    }
}

/// Field-level validation run by the validation plugin.
pub trait Validate {
    /// Check every rule, collecting all violations.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// A single failed field rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Field name.
    pub field: String,
    /// Human-readable reason.
    pub message: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation failure carrying every violated field rule.
#[derive(Error, Debug, Clone, PartialEq, Eq, Default)]
#[error("validation failed: {}", join_violations(.violations))]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Create an error with a single violation.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::default().with(field, message)
    }

    /// Add another violation.
    pub fn with(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.push(field, message);
        self
    }

    /// Add a violation in place.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Check if no violations were recorded.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// The recorded violations, in the order they were added.
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Standard id and timestamp fields, meant to be embedded with
/// `#[serde(flatten)]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<bson::DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<bson::DateTime>,
}

impl DefaultModel for Model {
    fn default_id(&mut self) -> ObjectId {
        *self.id.get_or_insert_with(ObjectId::new)
    }

    fn default_created_at(&mut self) -> bson::DateTime {
        *self.created_at.get_or_insert_with(bson::DateTime::now)
    }

    fn default_updated_at(&mut self) -> bson::DateTime {
        let now = bson::DateTime::now();
        self.updated_at = Some(now);
        now
    }
}
