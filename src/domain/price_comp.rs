//! Price-computation driver: one solve of the clearing program per trial.

use crate::domain::error::ClearbenchError;
use crate::domain::formulation::ClearingProblem;
use crate::domain::order::Order;
use crate::domain::results::{RuntimeMeasurement, SingleConfigResult};
use crate::domain::retry::{retry, BudgetSchedule};
use crate::ports::solver_port::{ConvexSolver, SolveSettings};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    pub schedule: BudgetSchedule,
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            schedule: BudgetSchedule::default(),
            tolerance: 0.001,
        }
    }
}

/// What a single trial left behind.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    /// A runtime (seconds) was appended to the result.
    Recorded(f64),
    /// The solve succeeded but reported no duration; nothing was appended.
    NoDuration,
    /// Every iteration budget failed; nothing was appended.
    Exhausted { attempts: usize },
    /// The result already held `num_trials` measurements.
    SlotsFull,
}

/// Solves `problem` under the retry schedule and appends the runtime to
/// `target` on a successful, duration-bearing solve.
pub fn solve_and_record<S: ConvexSolver + ?Sized>(
    solver: &S,
    problem: &ClearingProblem,
    config: &SolverConfig,
    target: &mut SingleConfigResult,
) -> TrialOutcome {
    let outcome = retry(&config.schedule, |max_iters| {
        let settings = SolveSettings {
            max_iters,
            tolerance: config.tolerance,
        };
        solver.solve(problem, &settings)
    });

    let report = match outcome {
        Ok(report) => report,
        Err(exhausted) => {
            let attempts = exhausted.attempts;
            let failure = ClearbenchError::from(exhausted);
            warn!(
                num_txs = target.num_txs,
                error = %failure,
                "hit max iteration budget, trial abandoned"
            );
            return TrialOutcome::Exhausted { attempts };
        }
    };

    debug!(status = ?report.status, objective = report.objective_value, "solved");

    match report.duration {
        Some(duration) => {
            let runtime = duration.as_secs_f64();
            if target.record(RuntimeMeasurement::from_runtime(runtime)) {
                info!(num_txs = target.num_txs, runtime, "recorded solve time");
                TrialOutcome::Recorded(runtime)
            } else {
                TrialOutcome::SlotsFull
            }
        }
        None => {
            warn!(num_txs = target.num_txs, "solver reported no duration");
            TrialOutcome::NoDuration
        }
    }
}

/// Runs one trial over the first `num_txs` orders of `block`.
pub fn run_price_computation<S: ConvexSolver + ?Sized>(
    solver: &S,
    num_assets: usize,
    num_txs: usize,
    block: &[Order],
    config: &SolverConfig,
    target: &mut SingleConfigResult,
) -> Result<TrialOutcome, ClearbenchError> {
    if block.len() < num_txs {
        return Err(ClearbenchError::InsufficientOrders {
            available: block.len(),
            requested: num_txs,
        });
    }
    let problem = ClearingProblem::from_orders(num_assets, &block[..num_txs])?;
    Ok(solve_and_record(solver, &problem, config, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::Price;
    use crate::ports::solver_port::{SolveReport, SolveStatus, SolverError};
    use std::cell::RefCell;
    use std::time::Duration;

    struct ScriptedSolver {
        fail_below: u32,
        duration: Option<Duration>,
        budgets: RefCell<Vec<u32>>,
    }

    impl ScriptedSolver {
        fn new(fail_below: u32, duration: Option<Duration>) -> Self {
            Self {
                fail_below,
                duration,
                budgets: RefCell::new(Vec::new()),
            }
        }
    }

    impl ConvexSolver for ScriptedSolver {
        fn solve(
            &self,
            _problem: &ClearingProblem,
            settings: &SolveSettings,
        ) -> Result<SolveReport, SolverError> {
            self.budgets.borrow_mut().push(settings.max_iters);
            if settings.max_iters < self.fail_below {
                return Err(SolverError::NonConvergence {
                    max_iters: settings.max_iters,
                });
            }
            Ok(SolveReport {
                status: SolveStatus::Optimal,
                objective_value: 0.0,
                duration: self.duration,
            })
        }
    }

    fn block() -> Vec<Order> {
        vec![
            Order {
                sell_asset: 0,
                buy_asset: 1,
                min_price: Price::from_f64(0.5),
                amount: 10,
            },
            Order {
                sell_asset: 1,
                buy_asset: 0,
                min_price: Price::from_f64(0.5),
                amount: 10,
            },
            Order {
                sell_asset: 0,
                buy_asset: 1,
                min_price: Price::from_f64(0.9),
                amount: 4,
            },
        ]
    }

    #[test]
    fn records_runtime_on_first_success() {
        let solver = ScriptedSolver::new(0, Some(Duration::from_millis(250)));
        let mut target = SingleConfigResult::new(2, 20, 7, 3, 1);
        let outcome =
            run_price_computation(&solver, 2, 3, &block(), &SolverConfig::default(), &mut target)
                .unwrap();
        assert_eq!(outcome, TrialOutcome::Recorded(0.25));
        assert_eq!(target.results.len(), 1);
        assert!(target.results[0].runtime >= 0.0);
        assert_eq!(*solver.budgets.borrow(), vec![100]);
    }

    #[test]
    fn escalates_budget_until_success() {
        let solver = ScriptedSolver::new(150, Some(Duration::from_millis(10)));
        let mut target = SingleConfigResult::new(2, 20, 7, 3, 1);
        run_price_computation(&solver, 2, 3, &block(), &SolverConfig::default(), &mut target)
            .unwrap();
        assert_eq!(*solver.budgets.borrow(), vec![100, 120, 140, 160]);
        assert_eq!(target.results.len(), 1);
    }

    #[test]
    fn always_failing_solver_leaves_results_empty() {
        let solver = ScriptedSolver::new(u32::MAX, Some(Duration::from_millis(10)));
        let mut target = SingleConfigResult::new(2, 20, 7, 3, 1);
        let outcome =
            run_price_computation(&solver, 2, 3, &block(), &SolverConfig::default(), &mut target)
                .unwrap();
        assert_eq!(outcome, TrialOutcome::Exhausted { attempts: 6 });
        assert!(target.results.is_empty());
        assert_eq!(solver.budgets.borrow().last(), Some(&200));
    }

    #[test]
    fn missing_duration_records_nothing() {
        let solver = ScriptedSolver::new(0, None);
        let mut target = SingleConfigResult::new(2, 20, 7, 3, 1);
        let outcome =
            run_price_computation(&solver, 2, 3, &block(), &SolverConfig::default(), &mut target)
                .unwrap();
        assert_eq!(outcome, TrialOutcome::NoDuration);
        assert!(target.results.is_empty());
    }

    #[test]
    fn short_block_is_an_error() {
        let solver = ScriptedSolver::new(0, Some(Duration::from_millis(10)));
        let mut target = SingleConfigResult::new(2, 20, 7, 5, 1);
        let err =
            run_price_computation(&solver, 2, 5, &block(), &SolverConfig::default(), &mut target)
                .unwrap_err();
        assert!(matches!(
            err,
            ClearbenchError::InsufficientOrders {
                available: 3,
                requested: 5
            }
        ));
        assert!(solver.budgets.borrow().is_empty());
    }
}
