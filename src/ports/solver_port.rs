//! Convex solver port trait.

use crate::domain::formulation::ClearingProblem;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Termination status reported by a solver that returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    OptimalInaccurate,
    Infeasible,
    Unbounded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    pub status: SolveStatus,
    pub objective_value: f64,
    /// Wall-clock solve time, if the solver measured one.
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveSettings {
    pub max_iters: u32,
    /// Absolute and relative tolerance, also used for the inaccurate stop.
    pub tolerance: f64,
}

/// Why one solve attempt produced no report.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverError {
    #[error("no convergence within {max_iters} iterations")]
    NonConvergence { max_iters: u32 },
    #[error("solver error: {reason}")]
    Internal { reason: String },
}

/// Port for the black-box convex solver.
pub trait ConvexSolver {
    fn solve(
        &self,
        problem: &ClearingProblem,
        settings: &SolveSettings,
    ) -> Result<SolveReport, SolverError>;
}
