//! Round-by-round comparison of experiment runs.
//!
//! Every series here is indexed by round: element `t` comes from
//! `block_results[t]`, so runs must be compared in their stored order.

use crate::domain::error::ClearbenchError;
use crate::domain::field::{resolve, FieldPath};
use crate::domain::measurement::{ExperimentRun, MeasurementNode};
use crate::domain::series::Series;
use tracing::debug;

/// Starting value of the smoothed ratio.
pub const SMOOTHING_SEED: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub ratio: Vec<f64>,
    pub smoothed: Vec<f64>,
    pub baseline: Vec<f64>,
}

impl Comparison {
    pub fn len(&self) -> usize {
        self.ratio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratio.is_empty()
    }

    /// The three curves as labeled series, ready for a figure.
    pub fn to_series(&self, metric: &FieldPath) -> Vec<Series> {
        vec![
            Series::from_values(format!("{} ratio", metric), &self.ratio),
            Series::from_values(format!("{} smoothed", metric), &self.smoothed),
            Series::from_values("baseline", &self.baseline),
        ]
    }
}

/// The metric at `path` for every round of `run`.
pub fn metric_over_rounds(run: &ExperimentRun, path: &FieldPath) -> Result<Vec<f64>, ClearbenchError> {
    run.block_results.iter().map(|b| resolve(b, path)).collect()
}

/// Fails unless both runs have the same round count and the same
/// parameters apart from thread count.
pub fn check_comparable(run1: &ExperimentRun, run2: &ExperimentRun) -> Result<(), ClearbenchError> {
    if run1.num_rounds() != run2.num_rounds() {
        return Err(ClearbenchError::MisalignedRuns {
            left: run1.num_rounds(),
            right: run2.num_rounds(),
        });
    }
    check_params(run1, run2)
}

fn check_params(reference: &ExperimentRun, run: &ExperimentRun) -> Result<(), ClearbenchError> {
    match reference.params.mismatch_ignoring_thread_count(&run.params) {
        Some(reason) => Err(ClearbenchError::ParamsMismatch { reason }),
        None => Ok(()),
    }
}

/// `run1[t] / run2[t]` for every round.
pub fn ratio_series(
    run1: &ExperimentRun,
    run2: &ExperimentRun,
    path: &FieldPath,
) -> Result<Vec<f64>, ClearbenchError> {
    if run1.num_rounds() != run2.num_rounds() {
        return Err(ClearbenchError::MisalignedRuns {
            left: run1.num_rounds(),
            right: run2.num_rounds(),
        });
    }
    let numerators = metric_over_rounds(run1, path)?;
    let denominators = metric_over_rounds(run2, path)?;
    numerators
        .iter()
        .zip(&denominators)
        .enumerate()
        .map(|(round, (&n, &d))| {
            if d == 0.0 {
                Err(ClearbenchError::ZeroDenominator {
                    round,
                    path: path.to_string(),
                })
            } else {
                Ok(n / d)
            }
        })
        .collect()
}

/// Halves the distance to each new ratio, starting from [`SMOOTHING_SEED`].
/// The output has one element per input element.
pub fn smoothed_series(ratios: &[f64]) -> Vec<f64> {
    ratios
        .iter()
        .scan(SMOOTHING_SEED, |prev, &r| {
            *prev = (*prev + r) / 2.0;
            Some(*prev)
        })
        .collect()
}

pub fn baseline_series(len: usize) -> Vec<f64> {
    vec![1.0; len]
}

/// Ratio, smoothed ratio and baseline of `path` between two aligned runs.
pub fn compare_runs(
    run1: &ExperimentRun,
    run2: &ExperimentRun,
    path: &FieldPath,
) -> Result<Comparison, ClearbenchError> {
    check_comparable(run1, run2)?;
    let ratio = ratio_series(run1, run2, path)?;
    let smoothed = smoothed_series(&ratio);
    let baseline = baseline_series(ratio.len());
    debug!(metric = %path, rounds = ratio.len(), "compared runs");
    Ok(Comparison {
        ratio,
        smoothed,
        baseline,
    })
}

/// One series of `path` per run. Every run must match the first run's
/// parameters ignoring thread count.
pub fn overlay_runs(
    runs: &[(String, ExperimentRun)],
    path: &FieldPath,
) -> Result<Vec<Series>, ClearbenchError> {
    let Some((_, reference)) = runs.first() else {
        return Ok(Vec::new());
    };
    runs.iter()
        .map(|(label, run)| -> Result<Series, ClearbenchError> {
            check_params(reference, run)?;
            Ok(Series::from_values(label.clone(), &metric_over_rounds(run, path)?))
        })
        .collect()
}

/// Several metrics of one run, one series each, labeled by metric path.
pub fn overlay_metrics(run: &ExperimentRun, paths: &[FieldPath]) -> Result<Vec<Series>, ClearbenchError> {
    paths
        .iter()
        .map(|p| -> Result<Series, ClearbenchError> {
            Ok(Series::from_values(p.to_string(), &metric_over_rounds(run, p)?))
        })
        .collect()
}

/// One `(round, value)` point per element of the list at `list_path`,
/// reading `field` from each element.
pub fn scatter_over_rounds(
    run: &ExperimentRun,
    list_path: &FieldPath,
    field: &FieldPath,
) -> Result<Vec<(f64, f64)>, ClearbenchError> {
    let mut points = Vec::new();
    for (round, block) in run.block_results.iter().enumerate() {
        let node = block
            .node_at(list_path)
            .map_err(|segment| ClearbenchError::FieldNotFound {
                path: list_path.to_string(),
                segment: segment.to_string(),
            })?;
        let MeasurementNode::List(items) = node else {
            return Err(ClearbenchError::FieldNotFound {
                path: list_path.to_string(),
                segment: list_path.segments().last().unwrap_or_default().to_string(),
            });
        };
        for item in items {
            points.push((round as f64, resolve(item, field)?));
        }
    }
    Ok(points)
}
