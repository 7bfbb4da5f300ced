//! Connection and plugin configuration.

use std::time::Duration;

use mongodb::options::ClientOptions;
use serde::{Deserialize, Serialize};

use crate::error::{MongoxError, MongoxResult};

/// Environment variable holding the connection URI.
pub const ENV_URI: &str = "MONGOX_URI";
/// Environment variable holding the database name.
pub const ENV_DATABASE: &str = "MONGOX_DATABASE";
/// Environment variable holding the application name.
pub const ENV_APP_NAME: &str = "MONGOX_APP_NAME";

const DEFAULT_URI: &str = "mongodb://localhost:27017";

/// MongoDB connection configuration.
///
/// Pooling, retries, and server selection stay with the driver; this only
/// carries what is needed to open a handle.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// MongoDB connection URI.
    pub uri: String,
    /// Database name.
    pub database: String,
    /// Application name (shown in server logs).
    pub app_name: Option<String>,
    /// Connection timeout.
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout.
    pub server_selection_timeout: Option<Duration>,
    /// Direct connection (bypass replica set discovery).
    pub direct_connection: Option<bool>,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            database: String::new(),
            app_name: Some("mongox".to_string()),
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            direct_connection: None,
        }
    }
}

impl MongoConfig {
    /// Create a new configuration from a MongoDB URI.
    pub fn from_uri(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Load configuration from `MONGOX_URI`, `MONGOX_DATABASE`, and
    /// `MONGOX_APP_NAME`.
    pub fn from_env() -> MongoxResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MongoxResult<Self> {
        let mut builder = Self::builder();
        if let Some(uri) = lookup(ENV_URI) {
            builder = builder.uri(uri);
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            builder = builder.database(database);
        }
        if let Some(app_name) = lookup(ENV_APP_NAME) {
            builder = builder.app_name(app_name);
        }
        builder.build()
    }

    /// Create a builder for configuration.
    pub fn builder() -> MongoConfigBuilder {
        MongoConfigBuilder::new()
    }

    /// Convert to MongoDB ClientOptions.
    pub async fn to_client_options(&self) -> MongoxResult<ClientOptions> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| MongoxError::config(format!("failed to parse URI: {}", e)))?;

        if let Some(ref app_name) = self.app_name {
            options.app_name = Some(app_name.clone());
        }

        if let Some(connect_timeout) = self.connect_timeout {
            options.connect_timeout = Some(connect_timeout);
        }

        if let Some(selection_timeout) = self.server_selection_timeout {
            options.server_selection_timeout = Some(selection_timeout);
        }

        if let Some(direct) = self.direct_connection {
            options.direct_connection = Some(direct);
        }

        Ok(options)
    }
}

/// Builder for MongoDB configuration.
#[derive(Debug, Default)]
pub struct MongoConfigBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    connect_timeout: Option<Duration>,
    server_selection_timeout: Option<Duration>,
    direct_connection: Option<bool>,
}

impl MongoConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the MongoDB URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Set the server selection timeout.
    pub fn server_selection_timeout(mut self, duration: Duration) -> Self {
        self.server_selection_timeout = Some(duration);
        self
    }

    /// Enable direct connection (bypass replica set discovery).
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MongoxResult<MongoConfig> {
        let database = self
            .database
            .filter(|name| !name.is_empty())
            .ok_or_else(|| MongoxError::config("database name is required"))?;

        Ok(MongoConfig {
            uri: self.uri.unwrap_or_else(|| DEFAULT_URI.to_string()),
            database,
            app_name: self.app_name.or(Some("mongox".to_string())),
            connect_timeout: self.connect_timeout.or(Some(Duration::from_secs(10))),
            server_selection_timeout: self
                .server_selection_timeout
                .or(Some(Duration::from_secs(30))),
            direct_connection: self.direct_connection,
        })
    }
}

/// Selects which built-in plugins `Database::init_plugins` registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Fill `_id`, `created_at`, and `updated_at` before writes.
    pub enable_default_field_hook: bool,
    /// Call `ModelHooks` implemented by documents and model-hook objects.
    pub enable_model_hook: bool,
    /// Run `Validate` on documents before insert and upsert.
    pub enable_validation_hook: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            enable_default_field_hook: true,
            enable_model_hook: true,
            enable_validation_hook: true,
        }
    }
}

impl PluginConfig {
    /// A configuration with every plugin disabled.
    pub fn none() -> Self {
        Self {
            enable_default_field_hook: false,
            enable_model_hook: false,
            enable_validation_hook: false,
        }
    }
}
