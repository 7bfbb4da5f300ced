//! Built-in plugins.
//!
//! Plugins are ordinary named callbacks. [`register_plugins`] attaches the
//! ones a [`PluginConfig`] enables to a registry, in a fixed order: default
//! fields, then model hooks, then validation. Validation therefore sees the
//! document after ids and timestamps have been filled.

mod field;
mod model;
mod validator;

use std::sync::Arc;

use tracing::debug;

use crate::callback::{Callbacks, SharedCallback};
use crate::config::PluginConfig;
use crate::operation::OperationType;

pub use field::{DefaultFieldPlugin, FIELD_CREATED_AT, FIELD_ID, FIELD_UPDATED_AT};
pub use model::ModelPlugin;
pub use validator::ValidationPlugin;

/// Registry name of [`DefaultFieldPlugin`].
pub const DEFAULT_FIELD_PLUGIN: &str = "mongox:default_field";
/// Registry name of [`ModelPlugin`].
pub const MODEL_PLUGIN: &str = "mongox:model";
/// Registry name of [`ValidationPlugin`].
pub const VALIDATION_PLUGIN: &str = "mongox:validation";

/// Register `callback` under `name` at every stage in `stages`.
pub fn register_at(
    callbacks: &Callbacks,
    name: &str,
    callback: SharedCallback,
    stages: &[OperationType],
) {
    for &stage in stages {
        callbacks.register_shared(stage, name, Arc::clone(&callback));
    }
}

/// Remove `name` from every stage in `stages`.
pub fn remove_at(callbacks: &Callbacks, name: &str, stages: &[OperationType]) {
    for &stage in stages {
        callbacks.remove(stage, name);
    }
}

/// Register the plugins `config` enables.
pub fn register_plugins(callbacks: &Callbacks, config: &PluginConfig) {
    if config.enable_default_field_hook {
        register_at(
            callbacks,
            DEFAULT_FIELD_PLUGIN,
            Arc::new(DefaultFieldPlugin),
            DefaultFieldPlugin::STAGES,
        );
    }
    if config.enable_model_hook {
        register_at(
            callbacks,
            MODEL_PLUGIN,
            Arc::new(ModelPlugin),
            ModelPlugin::STAGES,
        );
    }
    if config.enable_validation_hook {
        register_at(
            callbacks,
            VALIDATION_PLUGIN,
            Arc::new(ValidationPlugin),
            ValidationPlugin::STAGES,
        );
    }
    debug!(?config, "plugins registered");
}
