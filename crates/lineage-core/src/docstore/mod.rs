//! Document store capability.
//!
//! Inference only needs two things from a document store: the collection
//! names and a bounded prefix of each collection's records.

pub mod dump;
pub mod memory;

use crate::error::CoreResult;
use crate::value::Record;

pub use dump::DumpStore;
pub use memory::MemoryStore;

/// Lazily-read records. An `Err` item ends the useful part of the sample;
/// records yielded before it remain valid evidence.
pub type RecordCursor<'a> = Box<dyn Iterator<Item = CoreResult<Record>> + 'a>;

/// Read access to a document database.
pub trait DocumentStore {
    /// Name of the database the collections belong to.
    fn database(&self) -> &str;

    /// Collection names, in a stable order.
    fn list_collections(&self) -> CoreResult<Vec<String>>;

    /// At most `limit` records of `collection`, in the store's natural order.
    fn sample(&self, collection: &str, limit: usize) -> CoreResult<RecordCursor<'_>>;
}
