//! Per-group aggregation of a metric over completed trials.
//!
//! A group with fewer measurements than `num_trials` is averaged over what
//! completed. Missing trials are never extrapolated or counted as zero.

use crate::domain::error::ClearbenchError;
use crate::domain::field::{resolve, FieldPath};
use crate::domain::index::AggregationIndex;
use crate::domain::results::{ConfigKey, SingleConfigResult};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupMean {
    /// `None` when no trial completed.
    pub value: Option<f64>,
    pub completed: usize,
    pub num_trials: usize,
}

impl GroupMean {
    pub fn is_partial(&self) -> bool {
        self.completed < self.num_trials
    }

    /// `(mean, completed)`, or `None` for a group with no data.
    pub fn as_pair(&self) -> Option<(f64, usize)> {
        self.value.map(|v| (v, self.completed))
    }
}

/// Metric values of every completed trial, in trial order.
pub fn samples(result: &SingleConfigResult, metric: &FieldPath) -> Result<Vec<f64>, ClearbenchError> {
    result.results.iter().map(|m| resolve(m, metric)).collect()
}

/// Mean over completed trials without any logging.
pub fn group_mean(result: &SingleConfigResult, metric: &FieldPath) -> Result<GroupMean, ClearbenchError> {
    let values = samples(result, metric)?;
    let value = if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    };
    Ok(GroupMean {
        value,
        completed: values.len(),
        num_trials: result.num_trials as usize,
    })
}

/// Lenient aggregation: partial groups are warned about but still averaged.
pub fn aggregate_mean(
    index: &AggregationIndex,
    key: &ConfigKey,
    metric: &FieldPath,
) -> Result<GroupMean, ClearbenchError> {
    let result = index.require(key)?;
    let mean = group_mean(result, metric)?;
    if mean.is_partial() {
        warn!(
            key = %key,
            completed = mean.completed,
            num_trials = mean.num_trials,
            timeouts = mean.num_trials - mean.completed,
            "some trials timed out"
        );
    }
    Ok(mean)
}

/// Spread of one metric within a group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl GroupStats {
    /// `None` for an empty sample.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let n = samples.len();
        if n == 0 {
            return None;
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        Some(Self {
            mean,
            std_dev: variance.sqrt(),
            min: samples.iter().cloned().fold(f64::INFINITY, f64::min),
            max: samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            n,
        })
    }
}

/// One line of the per-key summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub key: ConfigKey,
    pub mean: GroupMean,
    pub stats: Option<GroupStats>,
}

/// Lenient means of `metric` for every key of the index, in key order.
pub fn summarize(index: &AggregationIndex, metric: &FieldPath) -> Result<Vec<SummaryRow>, ClearbenchError> {
    index
        .iter()
        .map(|(key, result)| -> Result<SummaryRow, ClearbenchError> {
            let mean = aggregate_mean(index, key, metric)?;
            let stats = GroupStats::from_samples(&samples(result, metric)?);
            Ok(SummaryRow {
                key: *key,
                mean,
                stats,
            })
        })
        .collect()
}
