//! Document validation before writes.

use async_trait::async_trait;
use tracing::trace;

use crate::callback::Callback;
use crate::error::MongoxResult;
use crate::operation::{OpContext, OperationType};

/// Runs [`Validate`](crate::model::Validate) on every payload document that
/// implements it. The first failure is returned as
/// [`MongoxError::Validation`](crate::error::MongoxError::Validation).
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationPlugin;

impl ValidationPlugin {
    /// Stages the plugin is registered at.
    pub const STAGES: &'static [OperationType] =
        &[OperationType::BeforeInsert, OperationType::BeforeUpsert];
}

#[async_trait]
impl Callback for ValidationPlugin {
    async fn call(&self, op: &mut OpContext<'_>) -> MongoxResult<()> {
        for entity in op.payload.iter_mut() {
            if let Some(rules) = entity.as_validate() {
                rules.validate()?;
            }
        }
        trace!(collection = op.collection_name(), "payload validated");
        Ok(())
    }
}
