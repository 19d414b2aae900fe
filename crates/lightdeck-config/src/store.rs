// JSON file backend for `PersistentStore`.
//
// The whole store is one JSON object. Every write rewrites the file through a
// temp file in the same directory followed by a rename, so readers never see a
// partial write.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use lightdeck_core::{PersistentStore, StoreError};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        match serde_json::from_slice(&raw)? {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::Backend {
                message: format!(
                    "{} holds a JSON {} instead of an object",
                    self.path.display(),
                    json_kind(&other)
                ),
            }),
        }
    }

    fn write_all(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, map)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        debug!(path = %self.path.display(), keys = map.len(), "store written");
        Ok(())
    }

    /// Read, apply `f`, and write back if `f` changed anything.
    ///
    /// A file that no longer parses is replaced rather than blocking every
    /// later write.
    fn modify(&self, f: impl FnOnce(&mut Map<String, Value>) -> bool) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut map, corrupt) = match self.read_all() {
            Ok(map) => (map, false),
            Err(e @ (StoreError::Serialization(_) | StoreError::Backend { .. })) => {
                warn!(path = %self.path.display(), error = %e, "store is corrupt, rewriting it");
                (Map::new(), true)
            }
            Err(e) => return Err(e),
        };
        if f(&mut map) || corrupt {
            self.write_all(&map)?;
        }
        Ok(())
    }
}

impl PersistentStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.modify(|map| {
            map.insert(key.to_owned(), value);
            true
        })
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.modify(|map| map.remove(key).is_some())
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
