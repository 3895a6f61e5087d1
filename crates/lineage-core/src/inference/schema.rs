//! Field type inference over a bounded sample of records.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::docstore::DocumentStore;
use crate::value::{Record, TypeTag};

/// Field name to the set of types observed for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldTypes(BTreeMap<String, BTreeSet<TypeTag>>);

impl FieldTypes {
    pub fn get(&self, field: &str) -> Option<&BTreeSet<TypeTag>> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Schema inferred for one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferredSchema {
    pub fields: FieldTypes,
    /// Records successfully read.
    pub sampled: usize,
    /// Set when sampling stopped early on a read error.
    pub read_error: Option<String>,
}

impl InferredSchema {
    /// Record the types of every field present in `record`.
    ///
    /// Absent fields contribute nothing; an explicit null is recorded as `null`.
    pub fn observe(&mut self, record: &Record) {
        for (field, value) in record {
            self.fields
                .0
                .entry(field.clone())
                .or_default()
                .insert(value.type_tag());
        }
        self.sampled += 1;
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut schema = Self::default();
        for record in records {
            schema.observe(record);
        }
        schema
    }

    pub fn is_partial(&self) -> bool {
        self.read_error.is_some()
    }

    /// Flat JSON form stored on the collection node, e.g.
    /// `{"_id":["objectId"],"name":["string"]}`.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.fields).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Infer the field types of `collection` from its first `sample_size` records.
///
/// A read failure (opening the cursor or mid-sample) is logged and the
/// mapping accumulated so far is returned.
pub fn infer_schema(store: &dyn DocumentStore, collection: &str, sample_size: usize) -> InferredSchema {
    let mut schema = InferredSchema::default();

    let cursor = match store.sample(collection, sample_size) {
        Ok(cursor) => cursor,
        Err(e) => {
            warn!(collection, error = %e, "Failed to open sample");
            schema.read_error = Some(e.to_string());
            return schema;
        }
    };

    for record in cursor {
        match record {
            Ok(record) => schema.observe(&record),
            Err(e) => {
                warn!(
                    collection,
                    sampled = schema.sampled,
                    error = %e,
                    "Sample read failed, keeping partial schema"
                );
                schema.read_error = Some(e.to_string());
                break;
            }
        }
    }

    debug!(collection, fields = schema.fields.len(), sampled = schema.sampled, "Inferred schema");
    schema
}
