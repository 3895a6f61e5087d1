//! Document store backed by a directory of `mongoexport` files.
//!
//! Each collection is one `<collection>.json` file holding either JSON Lines
//! (the `mongoexport` default) or a single JSON array (`--jsonArray`).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use super::{DocumentStore, RecordCursor};
use crate::error::{CoreError, CoreResult};
use crate::value::{record_from_json, Record};

const EXPORT_EXTENSION: &str = "json";

/// A directory of exported collections.
#[derive(Debug, Clone)]
pub struct DumpStore {
    root: PathBuf,
    database: String,
}

impl DumpStore {
    /// Open a dump directory. The database name defaults to the directory name.
    pub fn open(root: impl Into<PathBuf>, database: Option<String>) -> CoreResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CoreError::Config(format!(
                "dump directory not found: {}",
                root.display()
            )));
        }

        let database = database
            .or_else(|| root.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "default".to_string());

        Ok(Self { root, database })
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{}.{}", collection, EXPORT_EXTENSION))
    }
}

impl DocumentStore for DumpStore {
    fn database(&self) -> &str {
        &self.database
    }

    fn list_collections(&self) -> CoreResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXPORT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !stem.starts_with('.') {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        debug!(database = %self.database, count = names.len(), "Listed collections");
        Ok(names)
    }

    fn sample(&self, collection: &str, limit: usize) -> CoreResult<RecordCursor<'_>> {
        let path = self.collection_path(collection);
        if !path.is_file() {
            return Err(CoreError::CollectionNotFound(collection.to_string()));
        }

        let mut reader = BufReader::new(File::open(&path)?);
        if peek_significant(&mut reader)? == Some(b'[') {
            return Ok(Box::new(JsonArray {
                collection: collection.to_string(),
                reader,
                remaining: limit,
                opened: false,
                done: false,
            }));
        }

        Ok(Box::new(JsonLines {
            collection: collection.to_string(),
            lines: reader.lines(),
            remaining: limit,
            failed: false,
        }))
    }
}

/// Skip whitespace and peek at the next byte without consuming it.
fn peek_significant(reader: &mut BufReader<File>) -> std::io::Result<Option<u8>> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(None);
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(pos) => {
                let byte = buf[pos];
                reader.consume(pos);
                return Ok(Some(byte));
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

fn to_record(collection: &str, json: serde_json::Value) -> CoreResult<Record> {
    record_from_json(json)
        .ok_or_else(|| CoreError::sample_read(collection, "document is not a JSON object"))
}

/// Elements of a `--jsonArray` export, parsed one at a time.
struct JsonArray {
    collection: String,
    reader: BufReader<File>,
    remaining: usize,
    opened: bool,
    done: bool,
}

impl JsonArray {
    /// Move past the bracket or comma before the next element.
    /// Returns `false` once the closing bracket is reached.
    fn advance(&mut self) -> CoreResult<bool> {
        let next = self.peek()?;
        if !self.opened {
            if next != Some(b'[') {
                return Err(CoreError::sample_read(&self.collection, "expected a JSON array"));
            }
            self.reader.consume(1);
            self.opened = true;
            return match self.peek()? {
                Some(b']') => Ok(false),
                Some(_) => Ok(true),
                None => Err(CoreError::sample_read(&self.collection, "unterminated JSON array")),
            };
        }

        match next {
            Some(b']') => Ok(false),
            Some(b',') => {
                self.reader.consume(1);
                Ok(true)
            }
            Some(other) => Err(CoreError::sample_read(
                &self.collection,
                format!("expected ',' or ']' but found '{}'", other as char),
            )),
            None => Err(CoreError::sample_read(&self.collection, "unterminated JSON array")),
        }
    }

    fn peek(&mut self) -> CoreResult<Option<u8>> {
        peek_significant(&mut self.reader).map_err(|e| CoreError::sample_read(&self.collection, e))
    }
}

impl Iterator for JsonArray {
    type Item = CoreResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.done {
            return None;
        }

        match self.advance() {
            Ok(true) => {}
            Ok(false) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        }

        // Records are objects, so the parser stops at the closing brace
        // without reading ahead into the rest of the array.
        self.remaining -= 1;
        let mut de = serde_json::Deserializer::from_reader(&mut self.reader);
        let parsed = serde_json::Value::deserialize(&mut de)
            .map_err(|e| CoreError::sample_read(&self.collection, e))
            .and_then(|json| to_record(&self.collection, json));
        if parsed.is_err() {
            self.done = true;
        }
        Some(parsed)
    }
}

struct JsonLines {
    collection: String,
    lines: std::io::Lines<BufReader<File>>,
    remaining: usize,
    failed: bool,
}

impl Iterator for JsonLines {
    type Item = CoreResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.failed {
            return None;
        }

        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(CoreError::sample_read(&self.collection, e)));
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            self.remaining -= 1;
            let parsed = serde_json::from_str(&line)
                .map_err(|e| CoreError::sample_read(&self.collection, e))
                .and_then(|json| to_record(&self.collection, json));
            if parsed.is_err() {
                self.failed = true;
            }
            return Some(parsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn write(dir: &std::path::Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_lists_sorted_json_stems() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Users.json", "");
        write(dir.path(), "Orders.json", "");
        write(dir.path(), "notes.txt", "");
        write(dir.path(), ".hidden.json", "");

        let store = DumpStore::open(dir.path(), Some("FanApp".to_string())).unwrap();
        assert_eq!(store.database(), "FanApp");
        assert_eq!(store.list_collections().unwrap(), vec!["Orders", "Users"]);
    }

    #[test]
    fn test_json_lines_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "Users.json",
            "{\"_id\":{\"$oid\":\"a1\"},\"name\":\"Ann\"}\n\n{\"_id\":{\"$oid\":\"a2\"}}\n{\"_id\":{\"$oid\":\"a3\"}}\n",
        );
        let store = DumpStore::open(dir.path(), None).unwrap();

        let records: Vec<_> = store.sample("Users", 2).unwrap().collect();
        assert_eq!(records.len(), 2);
        let first = records[0].as_ref().unwrap();
        assert_eq!(first.get("_id"), Some(&Value::reference("a1")));
    }

    #[test]
    fn test_json_array_export() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Orders.json", "  [{\"total\": 3}, {\"total\": 4.5}]");
        let store = DumpStore::open(dir.path(), None).unwrap();

        let records: Vec<_> = store.sample("Orders", 10).unwrap().collect();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn test_malformed_line_ends_sample_after_good_records() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Broken.json", "{\"a\":1}\n{\"a\":\n{\"a\":3}\n");
        let store = DumpStore::open(dir.path(), None).unwrap();

        let records: Vec<_> = store.sample("Broken", 10).unwrap().collect();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_ok());
        assert!(matches!(records[1], Err(CoreError::SampleRead { .. })));
    }

    #[test]
    fn test_malformed_array_element_ends_sample_after_good_records() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Users.json", "[{\"name\":\"a\"},{\"age\":3},{\"broken\": ]");
        let store = DumpStore::open(dir.path(), None).unwrap();

        let records: Vec<_> = store.sample("Users", 100).unwrap().collect();
        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        assert!(records[1].is_ok());
        assert!(matches!(records[2], Err(CoreError::SampleRead { .. })));

        let schema = crate::inference::infer_schema(&store, "Users", 100);
        assert_eq!(schema.sampled, 2);
        assert!(schema.fields.get("name").is_some());
        assert!(schema.fields.get("age").is_some());
        assert!(schema.read_error.is_some());
    }

    #[test]
    fn test_json_array_stops_at_limit() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Orders.json", "[{\"total\": 1},\n {\"total\": 2},\n {\"total\": ]");
        let store = DumpStore::open(dir.path(), None).unwrap();

        let records: Vec<_> = store.sample("Orders", 2).unwrap().collect();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn test_empty_json_array() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Empty.json", "[ ]\n");
        let store = DumpStore::open(dir.path(), None).unwrap();

        assert_eq!(store.sample("Empty", 5).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = DumpStore::open(dir.path(), None).unwrap();
        assert!(matches!(
            store.sample("Nope", 1),
            Err(CoreError::CollectionNotFound(_))
        ));
    }
}
