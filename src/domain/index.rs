//! Aggregation index over single-configuration results.

use crate::domain::error::ClearbenchError;
use crate::domain::results::{ConfigKey, ResultCollection, SingleConfigResult};
use crate::ports::record_port::RecordStore;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{info, warn};

/// One [`SingleConfigResult`] per (tax_rate, smooth_mult, num_txs).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationIndex {
    entries: BTreeMap<ConfigKey, SingleConfigResult>,
}

/// A sweep dimension of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    TaxRate,
    SmoothMult,
    NumTxs,
}

impl Dimension {
    pub fn of(self, key: &ConfigKey) -> u64 {
        match self {
            Dimension::TaxRate => key.tax_rate as u64,
            Dimension::SmoothMult => key.smooth_mult as u64,
            Dimension::NumTxs => key.num_txs,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::TaxRate => "tax_rate",
            Dimension::SmoothMult => "smooth_mult",
            Dimension::NumTxs => "num_txs",
        }
    }
}

/// What to do when a directory scan finds no result files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyScanPolicy {
    /// Fail with `NoResultsFound`.
    #[default]
    Error,
    /// Return an empty index.
    Empty,
}

impl AggregationIndex {
    /// Builds the index, failing on the first repeated key.
    pub fn build(collection: &ResultCollection) -> Result<Self, ClearbenchError> {
        let mut index = AggregationIndex::default();
        index.extend(collection)?;
        Ok(index)
    }

    /// Adds every entry of `collection`. Any repeated key fails and leaves
    /// the index unchanged.
    pub fn extend(&mut self, collection: &ResultCollection) -> Result<(), ClearbenchError> {
        let mut incoming = BTreeMap::new();
        for exp in &collection.experiments {
            let key = exp.key();
            if self.entries.contains_key(&key) || incoming.contains_key(&key) {
                return Err(ClearbenchError::DuplicateKey {
                    tax_rate: key.tax_rate,
                    smooth_mult: key.smooth_mult,
                    num_txs: key.num_txs,
                });
            }
            incoming.insert(key, exp.clone());
        }
        self.entries.append(&mut incoming);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &ConfigKey) -> Option<&SingleConfigResult> {
        self.entries.get(key)
    }

    pub fn require(&self, key: &ConfigKey) -> Result<&SingleConfigResult, ClearbenchError> {
        self.entries
            .get(key)
            .ok_or(ClearbenchError::KeyNotFound {
                tax_rate: key.tax_rate,
                smooth_mult: key.smooth_mult,
                num_txs: key.num_txs,
            })
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ConfigKey, &SingleConfigResult)> {
        self.entries.iter()
    }

    /// Distinct values of `dim` across all keys, ascending.
    pub fn values_for(&self, dim: Dimension) -> BTreeSet<u64> {
        self.entries.keys().map(|k| dim.of(k)).collect()
    }

    pub fn values_for_tax(&self) -> BTreeSet<u32> {
        self.entries.keys().map(|k| k.tax_rate).collect()
    }

    pub fn values_for_smooth(&self) -> BTreeSet<u32> {
        self.entries.keys().map(|k| k.smooth_mult).collect()
    }

    pub fn values_for_num_txs(&self) -> BTreeSet<u64> {
        self.entries.keys().map(|k| k.num_txs).collect()
    }
}

pub fn build_index(collection: &ResultCollection) -> Result<AggregationIndex, ClearbenchError> {
    AggregationIndex::build(collection)
}

/// Files directly in `dir` whose name contains `marker`, sorted by name.
pub fn scan_result_files<R: RecordStore>(
    store: &R,
    dir: &Path,
    marker: &str,
) -> Result<Vec<std::path::PathBuf>, ClearbenchError> {
    let files = store
        .list_files(dir)?
        .into_iter()
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().contains(marker))
                .unwrap_or(false)
        })
        .collect();
    Ok(files)
}

/// Loads every result file in `dir` into one index.
pub fn load_result_index<R: RecordStore>(
    store: &R,
    dir: &Path,
    marker: &str,
    policy: EmptyScanPolicy,
) -> Result<AggregationIndex, ClearbenchError> {
    let files = scan_result_files(store, dir, marker)?;
    if files.is_empty() {
        match policy {
            EmptyScanPolicy::Error => {
                return Err(ClearbenchError::NoResultsFound {
                    dir: dir.display().to_string(),
                    marker: marker.to_string(),
                });
            }
            EmptyScanPolicy::Empty => {
                warn!(dir = %dir.display(), marker, "no result files found");
                return Ok(AggregationIndex::default());
            }
        }
    }

    let mut index = AggregationIndex::default();
    for file in &files {
        info!(file = %file.display(), "loading results");
        let collection: ResultCollection = store.load(file)?;
        index.extend(&collection)?;
    }
    Ok(index)
}
