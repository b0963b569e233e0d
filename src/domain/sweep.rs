//! Sweep runner: the driver across transaction-count levels and trials.
//!
//! Input directory layout: `params` holds the [`ExperimentParameters`],
//! `1.txs`, `2.txs`, ... hold one block of orders each. Trial `i` reads
//! block `i + 1`.

use crate::domain::error::ClearbenchError;
use crate::domain::order::Order;
use crate::domain::params::ExperimentParameters;
use crate::domain::price_comp::{run_price_computation, SolverConfig, TrialOutcome};
use crate::domain::results::{ResultCollection, SingleConfigResult};
use crate::ports::record_port::RecordStore;
use crate::ports::solver_port::ConvexSolver;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const PARAMS_FILE: &str = "params";

pub const DEFAULT_TX_LEVELS: [u64; 7] = [100, 500, 1000, 2000, 5000, 10000, 50000];

pub fn block_path(data_dir: &Path, block_num: u32) -> PathBuf {
    data_dir.join(format!("{}.txs", block_num))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepPlan {
    pub tx_levels: Vec<u64>,
    pub num_trials: u32,
}

impl Default for SweepPlan {
    fn default() -> Self {
        Self {
            tx_levels: DEFAULT_TX_LEVELS.to_vec(),
            num_trials: 5,
        }
    }
}

/// Runs every level of `plan` on every trial block.
///
/// `load_block(n)` supplies block `n` (1-based). A block that fails to load
/// aborts the sweep; a level that fails inside a trial is logged and skipped.
pub fn run_sweep<S, B>(
    solver: &S,
    params: &ExperimentParameters,
    plan: &SweepPlan,
    config: &SolverConfig,
    mut load_block: B,
) -> Result<ResultCollection, ClearbenchError>
where
    S: ConvexSolver + ?Sized,
    B: FnMut(u32) -> Result<Vec<Order>, ClearbenchError>,
{
    let mut collection = ResultCollection {
        experiments: plan
            .tx_levels
            .iter()
            .map(|&num_txs| {
                SingleConfigResult::new(
                    params.num_assets,
                    params.tax_rate,
                    params.smooth_mult,
                    num_txs,
                    plan.num_trials,
                )
            })
            .collect(),
    };

    for trial in 0..plan.num_trials {
        let block_num = trial + 1;
        let block = load_block(block_num)?;
        info!(block_num, orders = block.len(), "loaded input block");

        for target in collection.experiments.iter_mut() {
            let num_txs = target.num_txs as usize;
            match run_price_computation(
                solver,
                params.num_assets as usize,
                num_txs,
                &block,
                config,
                target,
            ) {
                Ok(TrialOutcome::Recorded(_)) => {}
                Ok(outcome) => {
                    warn!(block_num, num_txs, ?outcome, "trial produced no measurement");
                }
                Err(e) => {
                    warn!(block_num, num_txs, error = %e, "error when running trial");
                }
            }
        }
    }

    Ok(collection)
}

/// Loads `params` and the numbered blocks from `data_dir` through `store`.
pub fn run_sweep_from_store<R, S>(
    store: &R,
    solver: &S,
    data_dir: &Path,
    plan: &SweepPlan,
    config: &SolverConfig,
) -> Result<ResultCollection, ClearbenchError>
where
    R: RecordStore,
    S: ConvexSolver + ?Sized,
{
    let params: ExperimentParameters = store.load(&data_dir.join(PARAMS_FILE))?;
    info!(
        num_assets = params.num_assets,
        tax_rate = params.tax_rate,
        smooth_mult = params.smooth_mult,
        levels = plan.tx_levels.len(),
        trials = plan.num_trials,
        "starting price computation sweep"
    );
    run_sweep(solver, &params, plan, config, |block_num| {
        store.load(&block_path(data_dir, block_num))
    })
}
