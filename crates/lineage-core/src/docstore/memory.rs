//! In-process document store.

use std::collections::BTreeMap;

use super::{DocumentStore, RecordCursor};
use crate::error::{CoreError, CoreResult};
use crate::value::Record;

#[derive(Debug, Clone)]
enum Entry {
    Record(Record),
    ReadFailure(String),
}

/// Collections held in memory. Read failures can be injected at any
/// position of a collection to simulate a cursor dying mid-sample.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    database: String,
    collections: BTreeMap<String, Vec<Entry>>,
}

impl MemoryStore {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: BTreeMap::new(),
        }
    }

    /// Add (or extend) a collection.
    pub fn with_collection(mut self, name: &str, records: impl IntoIterator<Item = Record>) -> Self {
        self.collections
            .entry(name.to_string())
            .or_default()
            .extend(records.into_iter().map(Entry::Record));
        self
    }

    /// Append a read failure to a collection.
    pub fn with_read_failure(mut self, name: &str, reason: &str) -> Self {
        self.collections
            .entry(name.to_string())
            .or_default()
            .push(Entry::ReadFailure(reason.to_string()));
        self
    }

    pub fn remove_collection(&mut self, name: &str) {
        self.collections.remove(name);
    }
}

impl DocumentStore for MemoryStore {
    fn database(&self) -> &str {
        &self.database
    }

    fn list_collections(&self) -> CoreResult<Vec<String>> {
        Ok(self.collections.keys().cloned().collect())
    }

    fn sample(&self, collection: &str, limit: usize) -> CoreResult<RecordCursor<'_>> {
        let entries = self
            .collections
            .get(collection)
            .ok_or_else(|| CoreError::CollectionNotFound(collection.to_string()))?;

        let name = collection.to_string();
        Ok(Box::new(entries.iter().take(limit).map(move |entry| match entry {
            Entry::Record(record) => Ok(record.clone()),
            Entry::ReadFailure(reason) => Err(CoreError::sample_read(&name, reason)),
        })))
    }
}
