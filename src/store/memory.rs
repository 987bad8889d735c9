use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{RecordStore, StorePath};
use crate::attendance::RecordSet;
use crate::database::DbError;

/// In-process record store. Bodies are kept as JSON so reads and writes
/// go through the same serialization as the SQLite store.
#[derive(Default)]
pub struct MemoryStore {
    paths: Mutex<HashMap<String, RecordSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of paths that currently hold records
    pub fn path_count(&self) -> usize {
        self.paths.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl RecordStore for MemoryStore {
    fn read<T: DeserializeOwned>(&self, path: &StorePath) -> Result<RecordSet<T>, DbError> {
        let paths = self.paths.lock().map_err(|_| DbError::Lock)?;

        let mut records = RecordSet::new();
        if let Some(stored) = paths.get(&path.as_path()) {
            for (key, body) in stored {
                records.insert(key.clone(), serde_json::from_str(body)?);
            }
        }

        Ok(records)
    }

    fn write<T: Serialize>(&self, path: &StorePath, records: &RecordSet<T>) -> Result<(), DbError> {
        let mut bodies = RecordSet::new();
        for (key, record) in records {
            bodies.insert(key.clone(), serde_json::to_string(record)?);
        }

        let mut paths = self.paths.lock().map_err(|_| DbError::Lock)?;
        if bodies.is_empty() {
            paths.remove(&path.as_path());
        } else {
            paths.insert(path.as_path(), bodies);
        }

        Ok(())
    }
}
