//! Aggregation pipeline building.
//!
//! # Example
//!
//! ```rust
//! use mongox_bson::{PipelineBuilder, accumulators, doc};
//!
//! let pipeline = PipelineBuilder::new()
//!     .match_stage(doc! { "status": "active" })
//!     .group("$department", doc! { "headcount": accumulators::count() })
//!     .sort(doc! { "headcount": -1 })
//!     .limit(5)
//!     .build();
//!
//! assert_eq!(pipeline.len(), 4);
//! ```

use bson::{Bson, Document};

/// Builder for an aggregation pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    stages: Vec<Document>,
}

impl PipelineBuilder {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw stage document.
    pub fn stage(mut self, stage: Document) -> Self {
        self.stages.push(stage);
        self
    }

    /// Add a $match stage.
    pub fn match_stage(self, filter: Document) -> Self {
        self.stage(stages::match_stage(filter))
    }

    /// Add a $project stage.
    pub fn project(self, fields: Document) -> Self {
        self.stage(stages::project(fields))
    }

    /// Add a $group stage.
    pub fn group(self, id: impl Into<Bson>, accumulators: Document) -> Self {
        self.stage(stages::group(id, accumulators))
    }

    /// Add a $sort stage.
    pub fn sort(self, fields: Document) -> Self {
        self.stage(stages::sort(fields))
    }

    /// Add a $limit stage.
    pub fn limit(self, n: i64) -> Self {
        self.stage(stages::limit(n))
    }

    /// Add a $skip stage.
    pub fn skip(self, n: i64) -> Self {
        self.stage(stages::skip(n))
    }

    /// Add a $lookup stage.
    pub fn lookup(
        self,
        from: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
        as_field: impl Into<String>,
    ) -> Self {
        self.stage(stages::lookup(from, local_field, foreign_field, as_field))
    }

    /// Add an $unwind stage.
    pub fn unwind(self, path: impl Into<String>) -> Self {
        self.stage(stages::unwind(path))
    }

    /// Add an $addFields stage.
    pub fn add_fields(self, fields: Document) -> Self {
        self.stage(stages::add_fields(fields))
    }

    /// Add a $count stage.
    pub fn count(self, field: impl Into<String>) -> Self {
        self.stage(stages::count(field))
    }

    /// Number of stages added so far.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if no stages have been added.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Build the pipeline.
    pub fn build(self) -> Vec<Document> {
        self.stages
    }
}

impl From<PipelineBuilder> for Vec<Document> {
    fn from(builder: PipelineBuilder) -> Self {
        builder.build()
    }
}

/// Aggregation pipeline stage builders.
pub mod stages {
    use bson::{Bson, Document, doc};

    /// Create a $match stage.
    pub fn match_stage(filter: Document) -> Document {
        doc! { "$match": filter }
    }

    /// Create a $project stage.
    pub fn project(fields: Document) -> Document {
        doc! { "$project": fields }
    }

    /// Create a $group stage.
    pub fn group(id: impl Into<Bson>, accumulators: Document) -> Document {
        let mut group_doc = doc! { "_id": id.into() };
        group_doc.extend(accumulators);
        doc! { "$group": group_doc }
    }

    /// Create a $sort stage.
    pub fn sort(fields: Document) -> Document {
        doc! { "$sort": fields }
    }

    /// Create a $limit stage.
    pub fn limit(n: i64) -> Document {
        doc! { "$limit": n }
    }

    /// Create a $skip stage.
    pub fn skip(n: i64) -> Document {
        doc! { "$skip": n }
    }

    /// Create a $lookup stage (left outer join).
    pub fn lookup(
        from: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
        as_field: impl Into<String>,
    ) -> Document {
        doc! {
            "$lookup": {
                "from": from.into(),
                "localField": local_field.into(),
                "foreignField": foreign_field.into(),
                "as": as_field.into(),
            }
        }
    }

    /// Create an $unwind stage.
    pub fn unwind(path: impl Into<String>) -> Document {
        doc! { "$unwind": path.into() }
    }

    /// Create an $unwind stage with options.
    pub fn unwind_with_options(
        path: impl Into<String>,
        preserve_null: bool,
        include_array_index: Option<&str>,
    ) -> Document {
        let mut unwind_doc = doc! { "path": path.into() };
        unwind_doc.insert("preserveNullAndEmptyArrays", preserve_null);
        if let Some(index_field) = include_array_index {
            unwind_doc.insert("includeArrayIndex", index_field);
        }
        doc! { "$unwind": unwind_doc }
    }

    /// Create a $count stage.
    pub fn count(field: impl Into<String>) -> Document {
        doc! { "$count": field.into() }
    }

    /// Create an $addFields stage.
    pub fn add_fields(fields: Document) -> Document {
        doc! { "$addFields": fields }
    }

    /// Create a $replaceRoot stage.
    pub fn replace_root(new_root: impl Into<Bson>) -> Document {
        doc! { "$replaceRoot": { "newRoot": new_root.into() } }
    }

    /// Create a $facet stage.
    pub fn facet(facets: Document) -> Document {
        doc! { "$facet": facets }
    }

    /// Create a $sample stage.
    pub fn sample(size: i64) -> Document {
        doc! { "$sample": { "size": size } }
    }
}

/// Aggregation accumulators for use in $group stages.
pub mod accumulators {
    use bson::{Bson, doc};

    /// Sum accumulator.
    pub fn sum(expr: impl Into<Bson>) -> Bson {
        Bson::Document(doc! { "$sum": expr.into() })
    }

    /// Average accumulator.
    pub fn avg(expr: impl Into<Bson>) -> Bson {
        Bson::Document(doc! { "$avg": expr.into() })
    }

    /// Minimum accumulator.
    pub fn min(expr: impl Into<Bson>) -> Bson {
        Bson::Document(doc! { "$min": expr.into() })
    }

    /// Maximum accumulator.
    pub fn max(expr: impl Into<Bson>) -> Bson {
        Bson::Document(doc! { "$max": expr.into() })
    }

    /// First accumulator.
    pub fn first(expr: impl Into<Bson>) -> Bson {
        Bson::Document(doc! { "$first": expr.into() })
    }

    /// Last accumulator.
    pub fn last(expr: impl Into<Bson>) -> Bson {
        Bson::Document(doc! { "$last": expr.into() })
    }

    /// Push accumulator (creates array).
    pub fn push(expr: impl Into<Bson>) -> Bson {
        Bson::Document(doc! { "$push": expr.into() })
    }

    /// AddToSet accumulator (creates unique array).
    pub fn add_to_set(expr: impl Into<Bson>) -> Bson {
        Bson::Document(doc! { "$addToSet": expr.into() })
    }

    /// Count accumulator.
    pub fn count() -> Bson {
        Bson::Document(doc! { "$sum": 1 })
    }
}
