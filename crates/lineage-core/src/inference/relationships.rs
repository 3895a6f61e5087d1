//! Foreign-key inference from field naming conventions.
//!
//! A field named `<X>Id` is a candidate reference to collection `X` when `X`
//! is one of the known collection names (exact, case-sensitive match). In
//! [`ReferenceNaming::Conventional`] mode the lower-camel singular form is
//! accepted as well, so `userId` also points at `Users`. Its sampled values
//! decide the cardinality: a single reference is `one`, a non-empty array of
//! references is `many`. Any other shape is ignored.
//!
//! When sampled records disagree on cardinality, the last record that
//! produced a candidate for the field wins.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::docstore::DocumentStore;
use crate::value::{Record, Value};

const REFERENCE_SUFFIX: &str = "Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    One,
    Many,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::One => "one",
            Self::Many => "many",
        }
    }

    /// Cardinality implied by a value's shape, if it is a reference at all.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::ReferenceId(_) => Some(Self::One),
            Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_reference) => {
                Some(Self::Many)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inferred reference from one collection's field to another collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKeyCandidate {
    pub source_collection: String,
    pub field: String,
    pub target_collection: String,
    pub cardinality: Cardinality,
}

/// Which field names count as a reference to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceNaming {
    /// Only `<X>Id`.
    Exact,
    /// `<X>Id`, plus `<x>Id` with `x` the lower-camel singular of `X`.
    #[default]
    Conventional,
}

/// Map of candidate field name to the collection it references.
///
/// Exact `<X>Id` names always take precedence over conventional aliases.
pub fn reference_fields(collections: &[String], naming: ReferenceNaming) -> HashMap<String, String> {
    let mut fields = HashMap::new();

    if naming == ReferenceNaming::Conventional {
        for name in collections {
            if let Some(alias) = conventional_stem(name) {
                fields.insert(format!("{}{}", alias, REFERENCE_SUFFIX), name.clone());
            }
        }
    }

    for name in collections {
        fields.insert(format!("{}{}", name, REFERENCE_SUFFIX), name.clone());
    }

    fields
}

/// `Users` -> `user`, `Categories` -> `category`, `OrderItems` -> `orderItem`.
fn conventional_stem(collection: &str) -> Option<String> {
    let singular = if let Some(stem) = collection.strip_suffix("ies") {
        format!("{}y", stem)
    } else if collection.ends_with("ss") {
        collection.to_string()
    } else if let Some(stem) = collection.strip_suffix('s') {
        stem.to_string()
    } else {
        collection.to_string()
    };

    let mut chars = singular.chars();
    let first = chars.next()?;
    let stem: String = first.to_lowercase().chain(chars).collect();
    (stem != collection).then_some(stem)
}

/// Accumulates candidates for a single collection, record by record.
#[derive(Debug)]
pub struct ReferenceScan<'a> {
    collection: &'a str,
    reference_fields: &'a HashMap<String, String>,
    found: BTreeMap<String, Cardinality>,
}

impl<'a> ReferenceScan<'a> {
    pub fn new(collection: &'a str, reference_fields: &'a HashMap<String, String>) -> Self {
        Self {
            collection,
            reference_fields,
            found: BTreeMap::new(),
        }
    }

    pub fn observe(&mut self, record: &Record) {
        for (field, value) in record {
            if !self.reference_fields.contains_key(field) {
                continue;
            }
            if let Some(cardinality) = Cardinality::of(value) {
                self.found.insert(field.clone(), cardinality);
            }
        }
    }

    /// One candidate per field, ordered by field name.
    pub fn finish(self) -> Vec<ForeignKeyCandidate> {
        let Self {
            collection,
            reference_fields,
            found,
        } = self;

        found
            .into_iter()
            .filter_map(|(field, cardinality)| {
                let target = reference_fields.get(&field)?.clone();
                Some(ForeignKeyCandidate {
                    source_collection: collection.to_string(),
                    field,
                    target_collection: target,
                    cardinality,
                })
            })
            .collect()
    }
}

/// Result of a relationship inference pass.
#[derive(Debug, Clone, Default)]
pub struct RelationshipReport {
    pub candidates: Vec<ForeignKeyCandidate>,
    /// Collections whose sample failed, with the error. Candidates found
    /// before the failure are kept in `candidates`.
    pub failures: Vec<(String, String)>,
}

/// Infer foreign-key candidates across `collections`.
pub fn infer_relationships(
    store: &dyn DocumentStore,
    collections: &[String],
    sample_size: usize,
    naming: ReferenceNaming,
) -> RelationshipReport {
    let fields = reference_fields(collections, naming);
    let mut report = RelationshipReport::default();

    for collection in collections {
        let mut scan = ReferenceScan::new(collection, &fields);

        match store.sample(collection, sample_size) {
            Ok(cursor) => {
                for record in cursor {
                    match record {
                        Ok(record) => scan.observe(&record),
                        Err(e) => {
                            warn!(
                                collection = %collection,
                                error = %e,
                                "Sample read failed, keeping relationships found so far"
                            );
                            report.failures.push((collection.clone(), e.to_string()));
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(collection = %collection, error = %e, "Failed to open sample");
                report.failures.push((collection.clone(), e.to_string()));
            }
        }

        let candidates = scan.finish();
        for (target, fields) in colliding_targets(&candidates) {
            warn!(
                from = %collection,
                to = target,
                fields = ?fields,
                "Several fields reference the same collection, they share one REFERENCES edge"
            );
        }
        for c in &candidates {
            debug!(
                from = %c.source_collection,
                to = %c.target_collection,
                field = %c.field,
                cardinality = %c.cardinality,
                "Inferred reference"
            );
        }
        report.candidates.extend(candidates);
    }

    report
}

/// Targets reached by more than one field of the same collection.
///
/// Edges are keyed by `(REFERENCES, source, target)`, so such candidates
/// collapse onto one edge and the last field in order keeps its properties.
fn colliding_targets(candidates: &[ForeignKeyCandidate]) -> BTreeMap<&str, Vec<&str>> {
    let mut by_target: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for c in candidates {
        by_target
            .entry(c.target_collection.as_str())
            .or_default()
            .push(c.field.as_str());
    }
    by_target.retain(|_, fields| fields.len() > 1);
    by_target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docstore::MemoryStore;

    fn record(fields: &[(&str, Value)]) -> Record {
        fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cardinality_of_shapes() {
        assert_eq!(Cardinality::of(&Value::reference("a")), Some(Cardinality::One));
        assert_eq!(
            Cardinality::of(&Value::Array(vec![Value::reference("a"), Value::reference("b")])),
            Some(Cardinality::Many)
        );
        assert_eq!(Cardinality::of(&Value::Array(vec![])), None);
        assert_eq!(
            Cardinality::of(&Value::Array(vec![Value::reference("a"), Value::integer(1)])),
            None
        );
        assert_eq!(Cardinality::of(&Value::string("65a1f0c2")), None);
    }

    #[test]
    fn test_last_observed_cardinality_wins() {
        let collections = names(&["widget", "Orders"]);
        let fields = reference_fields(&collections, ReferenceNaming::Exact);
        let mut scan = ReferenceScan::new("Orders", &fields);

        scan.observe(&record(&[("widgetId", Value::reference("w1"))]));
        scan.observe(&record(&[(
            "widgetId",
            Value::Array(vec![Value::reference("w2"), Value::reference("w3")]),
        )]));
        let candidates = scan.finish();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].cardinality, Cardinality::Many);

        let mut reversed = ReferenceScan::new("Orders", &fields);
        reversed.observe(&record(&[(
            "widgetId",
            Value::Array(vec![Value::reference("w2")]),
        )]));
        reversed.observe(&record(&[("widgetId", Value::reference("w1"))]));
        assert_eq!(reversed.finish()[0].cardinality, Cardinality::One);
    }

    #[test]
    fn test_unrecognised_shape_does_not_erase_candidate() {
        let collections = names(&["Users", "Orders"]);
        let fields = reference_fields(&collections, ReferenceNaming::Exact);
        let mut scan = ReferenceScan::new("Orders", &fields);

        scan.observe(&record(&[("UsersId", Value::reference("u1"))]));
        scan.observe(&record(&[("UsersId", Value::string("legacy"))]));
        scan.observe(&record(&[("UsersId", Value::Null)]));

        let candidates = scan.finish();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].cardinality, Cardinality::One);
    }

    #[test]
    fn test_name_match_is_exact_and_case_sensitive() {
        let store = MemoryStore::new("db")
            .with_collection("users", vec![record(&[("_id", Value::reference("u1"))])])
            .with_collection(
                "Orders",
                vec![record(&[
                    ("_id", Value::reference("o1")),
                    ("userId", Value::reference("u1")),
                    ("UsersId", Value::reference("u1")),
                    ("usersId", Value::reference("u1")),
                ])],
            );
        let collections = store.list_collections().unwrap();

        let report = infer_relationships(&store, &collections, 100, ReferenceNaming::Exact);
        assert_eq!(report.candidates.len(), 1);
        let c = &report.candidates[0];
        assert_eq!(c.source_collection, "Orders");
        assert_eq!(c.field, "usersId");
        assert_eq!(c.target_collection, "users");
    }

    #[test]
    fn test_exact_and_alias_fields_share_target() {
        let collections = names(&["Users", "Orders"]);
        let fields = reference_fields(&collections, ReferenceNaming::Conventional);
        let mut scan = ReferenceScan::new("Orders", &fields);
        scan.observe(&record(&[
            ("UsersId", Value::reference("u1")),
            ("userId", Value::reference("u1")),
        ]));

        let candidates = scan.finish();
        assert_eq!(candidates.len(), 2);
        let colliding = colliding_targets(&candidates);
        assert_eq!(colliding.len(), 1);
        assert_eq!(colliding["Users"], vec!["UsersId", "userId"]);
    }

    #[test]
    fn test_distinct_targets_do_not_collide() {
        let collections = names(&["Users", "Products", "Orders"]);
        let fields = reference_fields(&collections, ReferenceNaming::Exact);
        let mut scan = ReferenceScan::new("Orders", &fields);
        scan.observe(&record(&[
            ("UsersId", Value::reference("u1")),
            ("ProductsId", Value::reference("p1")),
        ]));

        assert!(colliding_targets(&scan.finish()).is_empty());
    }

    #[test]
    fn test_conventional_aliases() {
        let collections = names(&["Users", "Categories", "Address", "user"]);
        let fields = reference_fields(&collections, ReferenceNaming::Conventional);
        assert_eq!(fields.get("UsersId").map(String::as_str), Some("Users"));
        assert_eq!(fields.get("categoryId").map(String::as_str), Some("Categories"));
        assert_eq!(fields.get("addressId").map(String::as_str), Some("Address"));
        // the exact `<X>Id` of collection `user` beats the alias of `Users`
        assert_eq!(fields.get("userId").map(String::as_str), Some("user"));

        let exact = reference_fields(&collections, ReferenceNaming::Exact);
        assert!(!exact.contains_key("categoryId"));
    }

    #[test]
    fn test_empty_collection_yields_nothing() {
        let store = MemoryStore::new("db").with_collection("Empty", Vec::new());
        let report = infer_relationships(&store, &names(&["Empty"]), 100, ReferenceNaming::default());
        assert!(report.candidates.is_empty());
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_failure_keeps_earlier_evidence() {
        let store = MemoryStore::new("db")
            .with_collection("user", Vec::new())
            .with_collection("B", vec![record(&[("userId", Value::reference("u1"))])])
            .with_read_failure("B", "network reset");
        let collections = store.list_collections().unwrap();

        let report = infer_relationships(&store, &collections, 100, ReferenceNaming::Exact);
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "B");
    }
}
