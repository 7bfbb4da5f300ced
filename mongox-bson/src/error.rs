//! Error types for BSON conversions.

use thiserror::Error;

/// Result type for BSON helper operations.
pub type BsonResult<T> = Result<T, BsonError>;

/// Errors that can occur while building or converting BSON values.
#[derive(Error, Debug)]
pub enum BsonError {
    /// BSON serialization error.
    #[error("bson error: {0}")]
    Serialize(#[from] bson::ser::Error),

    /// BSON deserialization error.
    #[error("bson deserialization error: {0}")]
    Deserialize(#[from] bson::de::Error),

    /// A value serialized to something other than a document.
    #[error("expected a document, found {0}")]
    NotADocument(String),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid ObjectId.
    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    /// Generic conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),
}

impl BsonError {
    /// Create a conversion error.
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion(message.into())
    }

    /// Create an invalid object id error.
    pub fn invalid_object_id(message: impl Into<String>) -> Self {
        Self::InvalidObjectId(message.into())
    }

    /// Check if this is an invalid object id error.
    pub fn is_invalid_object_id(&self) -> bool {
        matches!(self, Self::InvalidObjectId(_))
    }
}

impl From<bson::oid::Error> for BsonError {
    fn from(err: bson::oid::Error) -> Self {
        BsonError::InvalidObjectId(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BsonError::conversion("bad value");
        assert_eq!(err.to_string(), "conversion error: bad value");

        let err = BsonError::NotADocument("Int32(1)".to_string());
        assert_eq!(err.to_string(), "expected a document, found Int32(1)");
    }

    #[test]
    fn test_from_oid_error() {
        let err: BsonError = bson::oid::ObjectId::parse_str("zzz").unwrap_err().into();
        assert!(err.is_invalid_object_id());
    }
}
