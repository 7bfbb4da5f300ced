//! Error types for mongox operations.

use mongox_bson::BsonError;
use thiserror::Error;

use crate::model::ValidationError;

/// Result type for mongox operations.
pub type MongoxResult<T> = Result<T, MongoxError>;

/// Errors that can occur during mongox operations.
///
/// Errors returned by callbacks and local hooks travel back to the caller
/// untouched, so hook authors pick the variant the caller will see.
#[derive(Error, Debug)]
pub enum MongoxError {
    /// MongoDB driver error.
    #[error("mongodb error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// BSON serialization error.
    #[error("bson error: {0}")]
    Bson(#[from] bson::ser::Error),

    /// BSON deserialization error.
    #[error("bson deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),

    /// Error from a BSON helper conversion.
    #[error(transparent)]
    Convert(#[from] BsonError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Query execution error.
    #[error("query error: {0}")]
    Query(String),

    /// A required argument was missing or malformed at call time.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Document validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Error raised by a callback or hook.
    #[error("hook error: {0}")]
    Hook(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MongoxError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a hook error.
    pub fn hook(message: impl Into<String>) -> Self {
        Self::Hook(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error came from the driver.
    pub fn is_driver_error(&self) -> bool {
        matches!(self, Self::Driver(_))
    }

    /// Check if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a hook error.
    pub fn is_hook(&self) -> bool {
        matches!(self, Self::Hook(_))
    }

    /// Check if this is a duplicate key error reported by the server.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            Self::Driver(e) => e.to_string().contains("duplicate key"),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = MongoxError::config("invalid URI");
        assert!(matches!(err, MongoxError::Config(_)));

        let err = MongoxError::hook("audit failed");
        assert!(err.is_hook());
        assert!(!err.is_driver_error());

        let err = MongoxError::invalid_argument("missing update");
        assert!(matches!(err, MongoxError::InvalidArgument(_)));
    }

    #[test]
    fn test_error_display() {
        let err = MongoxError::config("test error");
        assert_eq!(err.to_string(), "configuration error: test error");

        let err = MongoxError::Hook("denied".to_string());
        assert_eq!(err.to_string(), "hook error: denied");
    }

    #[test]
    fn test_validation_is_transparent() {
        let err: MongoxError = ValidationError::new("age", "must be positive").into();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "validation failed: age: must be positive");
    }

    #[test]
    fn test_convert_is_transparent() {
        let err: MongoxError = BsonError::conversion("bad").into();
        assert_eq!(err.to_string(), "conversion error: bad");
    }
}
