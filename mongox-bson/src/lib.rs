//! # mongox-bson
//!
//! BSON value-mapping helpers used by the mongox ODM.
//!
//! This crate provides:
//! - `bsonx` shorthands for building documents and elements
//! - A fluent query (filter) builder
//! - A fluent update builder that merges operator documents
//! - Aggregation pipeline stages and accumulators
//! - Conversions between typed values, documents, and JSON
//!
//! None of these helpers talk to a server; they only produce the `filter`,
//! `update`, and `pipeline` documents that the ODM hands to the driver.
//!
//! ## Example
//!
//! ```rust
//! use mongox_bson::{QueryBuilder, UpdateBuilder};
//!
//! let filter = QueryBuilder::new()
//!     .eq("status", "active")
//!     .gte("age", 18)
//!     .build();
//!
//! let update = UpdateBuilder::new()
//!     .set("status", "archived")
//!     .inc("version", 1)
//!     .build();
//!
//! assert_eq!(filter.get_str("status").unwrap(), "active");
//! assert!(update.contains_key("$set"));
//! assert!(update.contains_key("$inc"));
//! ```

pub mod aggregation;
pub mod bsonx;
pub mod converter;
pub mod error;
pub mod query;
pub mod update;

pub use aggregation::{PipelineBuilder, accumulators, stages};
pub use bson::oid::ObjectId;
pub use bson::{Bson, Document, doc};
pub use converter::{from_document, from_documents, to_document, to_documents};
pub use error::{BsonError, BsonResult};
pub use query::QueryBuilder;
pub use update::UpdateBuilder;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::aggregation::{PipelineBuilder, accumulators, stages};
    pub use crate::bsonx;
    pub use crate::converter::{from_document, to_document};
    pub use crate::error::{BsonError, BsonResult};
    pub use crate::query::QueryBuilder;
    pub use crate::update::UpdateBuilder;
    pub use bson::oid::ObjectId;
    pub use bson::{Bson, Document, doc};
}
