//! Conversions between typed values, BSON documents, and JSON.

use bson::{Bson, Document, oid::ObjectId};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{BsonError, BsonResult};

/// Convert a struct to a BSON document.
pub fn to_document<T: Serialize + ?Sized>(value: &T) -> BsonResult<Document> {
    match bson::to_bson(value)? {
        Bson::Document(doc) => Ok(doc),
        other => Err(BsonError::NotADocument(format!("{:?}", other.element_type()))),
    }
}

/// Convert a slice of structs to BSON documents.
pub fn to_documents<T: Serialize>(values: &[T]) -> BsonResult<Vec<Document>> {
    values.iter().map(to_document).collect()
}

/// Convert a BSON document to a struct.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> BsonResult<T> {
    Ok(bson::from_document(doc)?)
}

/// Convert BSON documents to structs.
pub fn from_documents<T: DeserializeOwned>(docs: Vec<Document>) -> BsonResult<Vec<T>> {
    docs.into_iter().map(from_document).collect()
}

/// Parse a JSON object string into a BSON document.
pub fn document_from_json(json: &str) -> BsonResult<Document> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    match Bson::try_from(value).map_err(|e| BsonError::conversion(e.to_string()))? {
        Bson::Document(doc) => Ok(doc),
        other => Err(BsonError::NotADocument(format!("{:?}", other.element_type()))),
    }
}

/// Render a BSON document as relaxed extended JSON.
pub fn document_to_json(doc: Document) -> serde_json::Value {
    Bson::Document(doc).into_relaxed_extjson()
}

/// Parse an ObjectId from a hex string.
pub fn parse_object_id(s: &str) -> BsonResult<ObjectId> {
    ObjectId::parse_str(s).map_err(BsonError::from)
}

/// BSON type helpers.
pub mod bson_types {
    use super::*;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    /// Convert a UUID to BSON Binary.
    pub fn uuid_to_bson(uuid: Uuid) -> Bson {
        Bson::Binary(bson::Binary {
            subtype: bson::spec::BinarySubtype::Uuid,
            bytes: uuid.as_bytes().to_vec(),
        })
    }

    /// Convert BSON Binary to UUID.
    pub fn bson_to_uuid(bson: &Bson) -> BsonResult<Uuid> {
        match bson {
            Bson::Binary(binary) => {
                let bytes: [u8; 16] = binary
                    .bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| BsonError::conversion("invalid UUID bytes"))?;
                Ok(Uuid::from_bytes(bytes))
            }
            Bson::String(s) => Uuid::parse_str(s)
                .map_err(|e| BsonError::conversion(format!("invalid UUID string: {}", e))),
            _ => Err(BsonError::conversion("expected Binary or String for UUID")),
        }
    }

    /// Convert a DateTime to BSON DateTime.
    pub fn datetime_to_bson(dt: DateTime<Utc>) -> Bson {
        Bson::DateTime(bson::DateTime::from_chrono(dt))
    }

    /// Convert BSON DateTime to chrono DateTime.
    pub fn bson_to_datetime(bson: &Bson) -> BsonResult<DateTime<Utc>> {
        match bson {
            Bson::DateTime(dt) => Ok(dt.to_chrono()),
            _ => Err(BsonError::conversion("expected DateTime")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde::Deserialize;
    use uuid::Uuid;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        age: i32,
    }

    #[test]
    fn test_to_document() {
        let user = User {
            name: "Bob".to_string(),
            age: 25,
        };

        let doc = to_document(&user).unwrap();
        assert_eq!(doc.get_str("name").unwrap(), "Bob");
        assert_eq!(doc.get_i32("age").unwrap(), 25);
    }

    #[test]
    fn test_to_document_rejects_scalars() {
        let err = to_document(&42).unwrap_err();
        assert!(matches!(err, BsonError::NotADocument(_)));
    }

    #[test]
    fn test_from_documents() {
        let users: Vec<User> = from_documents(vec![
            doc! { "name": "Carol", "age": 35 },
            doc! { "name": "Dan", "age": 40 },
        ])
        .unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[1].name, "Dan");
    }

    #[test]
    fn test_document_from_json() {
        let doc = document_from_json(r#"{"name": "Alice", "tags": ["a"]}"#).unwrap();
        assert_eq!(doc.get_str("name").unwrap(), "Alice");

        assert!(document_from_json("[1, 2]").is_err());
        assert!(document_from_json("{not json").is_err());
    }

    #[test]
    fn test_document_to_json() {
        let json = document_to_json(doc! { "n": 1, "s": "x" });
        assert_eq!(json, serde_json::json!({ "n": 1, "s": "x" }));
    }

    #[test]
    fn test_parse_object_id() {
        let oid = ObjectId::new();
        assert_eq!(parse_object_id(&oid.to_hex()).unwrap(), oid);
        assert!(parse_object_id("invalid").is_err());
    }

    #[test]
    fn test_uuid_conversion() {
        use bson_types::*;

        let uuid = Uuid::new_v4();
        let bson = uuid_to_bson(uuid);
        assert_eq!(bson_to_uuid(&bson).unwrap(), uuid);
    }
}
