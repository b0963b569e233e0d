//! JSON file record store.

use crate::domain::error::ClearbenchError;
use crate::ports::record_port::RecordStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each record as one pretty-printed JSON file.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRecordStore;

impl JsonRecordStore {
    pub fn new() -> Self {
        Self
    }
}

fn load_error(path: &Path, reason: impl ToString) -> ClearbenchError {
    ClearbenchError::RecordLoad {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn save_error(path: &Path, reason: impl ToString) -> ClearbenchError {
    ClearbenchError::RecordSave {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

impl RecordStore for JsonRecordStore {
    fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T, ClearbenchError> {
        let content = fs::read_to_string(path).map_err(|e| load_error(path, e))?;
        serde_json::from_str(&content).map_err(|e| load_error(path, e))
    }

    fn save<T: Serialize>(&self, value: &T, path: &Path) -> Result<(), ClearbenchError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| save_error(path, e))?;
        }
        let json = serde_json::to_string_pretty(value).map_err(|e| save_error(path, e))?;
        fs::write(path, json).map_err(|e| save_error(path, e))
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, ClearbenchError> {
        let entries = fs::read_dir(dir).map_err(|e| load_error(dir, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| load_error(dir, e))?;
            if entry.file_type().map_err(|e| load_error(dir, e))?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}
