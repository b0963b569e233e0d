//! Record store port trait.

use crate::domain::error::ClearbenchError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Port for persisting typed experiment records to named files.
pub trait RecordStore {
    /// Loads a record. Fails with `RecordLoad` if the file cannot be opened
    /// or parsed.
    fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T, ClearbenchError>;

    fn save<T: Serialize>(&self, value: &T, path: &Path) -> Result<(), ClearbenchError>;

    /// Regular files directly inside `dir`, sorted by name.
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, ClearbenchError>;
}
