//! Dispatch to [`ModelHooks`] implemented by documents or hook objects.

use async_trait::async_trait;

use crate::callback::Callback;
use crate::error::MongoxResult;
use crate::model::ModelHooks;
use crate::operation::{OpContext, OperationType};

/// Calls lifecycle hooks.
///
/// Insert and find stages call the hooks of each payload document. Update,
/// upsert, and delete stages call the context's model-hook object first,
/// then any payload document (an upsert may carry a typed replacement).
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelPlugin;

impl ModelPlugin {
    /// Stages the plugin is registered at.
    pub const STAGES: &'static [OperationType] = &[
        OperationType::BeforeInsert,
        OperationType::AfterInsert,
        OperationType::BeforeUpdate,
        OperationType::AfterUpdate,
        OperationType::BeforeUpsert,
        OperationType::AfterUpsert,
        OperationType::BeforeDelete,
        OperationType::AfterDelete,
        OperationType::AfterFind,
    ];
}

#[async_trait]
impl Callback for ModelPlugin {
    async fn call(&self, op: &mut OpContext<'_>) -> MongoxResult<()> {
        let Some(op_type) = op.op_type() else {
            return Ok(());
        };
        match op_type {
            OperationType::BeforeInsert => each_document(op, |hooks| hooks.before_insert()),
            OperationType::AfterInsert => each_document(op, |hooks| hooks.after_insert()),
            OperationType::AfterFind => each_document(op, |hooks| hooks.after_find()),
            OperationType::BeforeUpdate => write_hooks(op, |hooks| hooks.before_update()),
            OperationType::AfterUpdate => write_hooks(op, |hooks| hooks.after_update()),
            OperationType::BeforeUpsert => write_hooks(op, |hooks| hooks.before_upsert()),
            OperationType::AfterUpsert => write_hooks(op, |hooks| hooks.after_upsert()),
            OperationType::BeforeDelete => write_hooks(op, |hooks| hooks.before_delete()),
            OperationType::AfterDelete => write_hooks(op, |hooks| hooks.after_delete()),
            _ => Ok(()),
        }
    }
}

fn each_document(
    op: &mut OpContext<'_>,
    hook: impl Fn(&mut dyn ModelHooks) -> MongoxResult<()>,
) -> MongoxResult<()> {
    for entity in op.payload.iter_mut() {
        if let Some(hooks) = entity.as_model_hooks() {
            hook(hooks)?;
        }
    }
    Ok(())
}

fn write_hooks(
    op: &mut OpContext<'_>,
    hook: impl Fn(&mut dyn ModelHooks) -> MongoxResult<()>,
) -> MongoxResult<()> {
    if let Some(hooks) = op.model_hook.as_deref_mut() {
        hook(hooks)?;
    }
    each_document(op, hook)
}
