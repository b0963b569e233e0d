//! Price-computation result records.

use crate::domain::field::{FieldPath, Fields};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// One successful trial of a price computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeMeasurement {
    /// Solve duration in seconds.
    pub runtime: f64,
    #[serde(default)]
    pub num_rounds: u64,
}

impl RuntimeMeasurement {
    pub fn from_runtime(runtime: f64) -> Self {
        Self {
            runtime,
            num_rounds: 0,
        }
    }
}

fn runtime(m: &RuntimeMeasurement) -> f64 {
    m.runtime
}

fn num_rounds(m: &RuntimeMeasurement) -> f64 {
    m.num_rounds as f64
}

const MEASUREMENT_FIELDS: &[(&str, fn(&RuntimeMeasurement) -> f64)] =
    &[("runtime", runtime), ("num_rounds", num_rounds)];

impl Fields for RuntimeMeasurement {
    fn lookup<'p>(&self, path: &'p FieldPath) -> Result<f64, &'p str> {
        MEASUREMENT_FIELDS
            .iter()
            .find(|(name, _)| *name == path.as_str())
            .map(|(_, accessor)| accessor(self))
            .ok_or_else(|| path.segments().next().unwrap_or_default())
    }
}

/// Grouping key of a single configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigKey {
    pub tax_rate: u32,
    pub smooth_mult: u32,
    pub num_txs: u64,
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(tax_rate={}, smooth_mult={}, num_txs={})",
            self.tax_rate, self.smooth_mult, self.num_txs
        )
    }
}

/// All trials of one (tax_rate, smooth_mult, num_txs) configuration.
///
/// `results` never exceeds `num_trials`; a shortfall means trials that timed
/// out or failed. Missing trials are never padded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleConfigResult {
    pub num_assets: u32,
    pub tax_rate: u32,
    pub smooth_mult: u32,
    pub num_txs: u64,
    pub num_trials: u32,
    pub results: Vec<RuntimeMeasurement>,
}

impl SingleConfigResult {
    pub fn new(num_assets: u32, tax_rate: u32, smooth_mult: u32, num_txs: u64, num_trials: u32) -> Self {
        Self {
            num_assets,
            tax_rate,
            smooth_mult,
            num_txs,
            num_trials,
            results: Vec::new(),
        }
    }

    pub fn key(&self) -> ConfigKey {
        ConfigKey {
            tax_rate: self.tax_rate,
            smooth_mult: self.smooth_mult,
            num_txs: self.num_txs,
        }
    }

    pub fn completed(&self) -> usize {
        self.results.len()
    }

    pub fn shortfall(&self) -> usize {
        (self.num_trials as usize).saturating_sub(self.results.len())
    }

    pub fn is_complete(&self) -> bool {
        self.results.len() == self.num_trials as usize
    }

    /// Appends a measurement. Refuses once every trial slot is filled.
    pub fn record(&mut self, measurement: RuntimeMeasurement) -> bool {
        if self.results.len() >= self.num_trials as usize {
            warn!(
                key = %self.key(),
                num_trials = self.num_trials,
                "measurement beyond trial count dropped"
            );
            return false;
        }
        self.results.push(measurement);
        true
    }
}

/// One entry per configuration actually run, in run order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultCollection {
    pub experiments: Vec<SingleConfigResult>,
}

impl ResultCollection {
    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }
}
