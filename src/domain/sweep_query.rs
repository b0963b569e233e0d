//! Sweep queries: fix some dimensions of the index and walk the rest.

use crate::domain::aggregate::{group_mean, GroupMean};
use crate::domain::error::ClearbenchError;
use crate::domain::field::FieldPath;
use crate::domain::index::{AggregationIndex, Dimension};
use crate::domain::results::{ConfigKey, ResultCollection, SingleConfigResult};
use crate::domain::series::Series;
use tracing::{debug, warn};

/// How a group with fewer completed trials than `num_trials` is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPolicy {
    /// Skip the group with a warning. Used by single-series sweep plots.
    Strict,
    /// Average over completed trials with a warning.
    Lenient,
}

/// Dimensions held constant during a sweep. `None` means free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedDims {
    pub tax_rate: Option<u32>,
    pub smooth_mult: Option<u32>,
    pub num_txs: Option<u64>,
}

impl FixedDims {
    pub fn get(&self, dim: Dimension) -> Option<u64> {
        match dim {
            Dimension::TaxRate => self.tax_rate.map(u64::from),
            Dimension::SmoothMult => self.smooth_mult.map(u64::from),
            Dimension::NumTxs => self.num_txs,
        }
    }

    /// A copy with `dim` pinned to `value`.
    pub fn with(mut self, dim: Dimension, value: u64) -> Result<Self, ClearbenchError> {
        match dim {
            Dimension::TaxRate => self.tax_rate = Some(narrow(dim, value)?),
            Dimension::SmoothMult => self.smooth_mult = Some(narrow(dim, value)?),
            Dimension::NumTxs => self.num_txs = Some(value),
        }
        Ok(self)
    }

    /// The full key, if every dimension is pinned.
    pub fn key(&self) -> Option<ConfigKey> {
        Some(ConfigKey {
            tax_rate: self.tax_rate?,
            smooth_mult: self.smooth_mult?,
            num_txs: self.num_txs?,
        })
    }
}

fn narrow(dim: Dimension, value: u64) -> Result<u32, ClearbenchError> {
    u32::try_from(value).map_err(|_| ClearbenchError::InvalidQuery {
        reason: format!("{} value {} out of range", dim.name(), value),
    })
}

const ALL_DIMS: [Dimension; 3] = [Dimension::TaxRate, Dimension::SmoothMult, Dimension::NumTxs];

fn check_query(fixed: &FixedDims, varying: Dimension) -> Result<(), ClearbenchError> {
    if fixed.get(varying).is_some() {
        return Err(ClearbenchError::InvalidQuery {
            reason: format!("{} is both fixed and varying", varying.name()),
        });
    }
    for dim in ALL_DIMS.into_iter().filter(|&d| d != varying) {
        if fixed.get(dim).is_none() {
            return Err(ClearbenchError::InvalidQuery {
                reason: format!("{} must be fixed when sweeping {}", dim.name(), varying.name()),
            });
        }
    }
    Ok(())
}

/// Mean of `metric` for one group under `policy`, or `None` when the group
/// contributes no point.
fn point_for(
    result: &SingleConfigResult,
    metric: &FieldPath,
    policy: CompletionPolicy,
) -> Result<Option<f64>, ClearbenchError> {
    if policy == CompletionPolicy::Strict && !result.is_complete() {
        warn!(
            key = %result.key(),
            completed = result.completed(),
            num_trials = result.num_trials,
            "incomplete group skipped"
        );
        return Ok(None);
    }
    let GroupMean {
        value,
        completed,
        num_trials,
    } = group_mean(result, metric)?;
    if completed < num_trials {
        warn!(
            key = %result.key(),
            completed,
            num_trials,
            "averaging over completed trials only"
        );
    }
    Ok(value)
}

/// `(value, mean)` for each observed value of `varying`, ascending.
///
/// Every other dimension must be pinned in `fixed`. Keys missing from the
/// index and groups missing the metric are skipped.
pub fn sweep_over(
    index: &AggregationIndex,
    fixed: &FixedDims,
    varying: Dimension,
    metric: &FieldPath,
    policy: CompletionPolicy,
) -> Result<Vec<(f64, f64)>, ClearbenchError> {
    check_query(fixed, varying)?;
    let mut points = Vec::new();
    for value in index.values_for(varying) {
        let Some(key) = fixed.with(varying, value)?.key() else {
            continue;
        };
        let Some(result) = index.get(&key) else {
            debug!(key = %key, "no result for key");
            continue;
        };
        match point_for(result, metric, policy) {
            Ok(Some(mean)) => points.push((value as f64, mean)),
            Ok(None) => {}
            Err(e @ ClearbenchError::FieldNotFound { .. }) => {
                warn!(key = %key, error = %e, "metric missing, key skipped");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(points)
}

/// One series per observed value of `legend`, each sweeping `varying`.
/// Series without points are dropped.
pub fn sweep_family(
    index: &AggregationIndex,
    legend: Dimension,
    varying: Dimension,
    fixed: &FixedDims,
    metric: &FieldPath,
    policy: CompletionPolicy,
) -> Result<Vec<Series>, ClearbenchError> {
    if legend == varying {
        return Err(ClearbenchError::InvalidQuery {
            reason: format!("{} cannot be both legend and x-axis", legend.name()),
        });
    }
    let mut family = Vec::new();
    for value in index.values_for(legend) {
        let pinned = fixed.with(legend, value)?;
        let points = sweep_over(index, &pinned, varying, metric, policy)?;
        if points.is_empty() {
            debug!(legend = legend.name(), value, "empty series omitted");
            continue;
        }
        family.push(Series::new(value.to_string(), points));
    }
    Ok(family)
}

/// Lenient mean of `metric` per experiment, x = `num_txs`, in collection
/// order. Groups with no completed trial contribute no point.
pub fn mean_by_num_txs(
    label: impl Into<String>,
    collection: &ResultCollection,
    metric: &FieldPath,
) -> Result<Series, ClearbenchError> {
    let mut points = Vec::new();
    for exp in &collection.experiments {
        let mean = group_mean(exp, metric)?;
        if mean.is_partial() {
            warn!(
                num_txs = exp.num_txs,
                timeouts = mean.num_trials - mean.completed,
                "timeouts in group"
            );
        }
        if let Some(value) = mean.value {
            points.push((exp.num_txs as f64, value));
        }
    }
    Ok(Series::new(label, points))
}
