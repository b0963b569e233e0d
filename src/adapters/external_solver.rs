//! Convex solver backed by an external process.
//!
//! The program is spawned once per attempt. It reads a [`SolveRequest`] as
//! JSON on stdin and writes a [`SolveResponse`] as the last non-empty line
//! of stdout.

use crate::domain::formulation::ClearingProblem;
use crate::ports::solver_port::{ConvexSolver, SolveReport, SolveSettings, SolveStatus, SolverError};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct SolveRequest<'a> {
    pub problem: &'a ClearingProblem,
    pub settings: &'a SolveSettings,
}

/// Outcome reported by the solver process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireStatus {
    Optimal,
    OptimalInaccurate,
    Infeasible,
    Unbounded,
    /// Iteration budget ran out.
    MaxIterations,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResponse {
    pub status: WireStatus,
    #[serde(default)]
    pub objective_value: f64,
    /// Seconds.
    #[serde(default)]
    pub solve_time: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SolveResponse {
    pub fn into_report(self, settings: &SolveSettings) -> Result<SolveReport, SolverError> {
        let status = match self.status {
            WireStatus::Optimal => SolveStatus::Optimal,
            WireStatus::OptimalInaccurate => SolveStatus::OptimalInaccurate,
            WireStatus::Infeasible => SolveStatus::Infeasible,
            WireStatus::Unbounded => SolveStatus::Unbounded,
            WireStatus::MaxIterations => {
                return Err(SolverError::NonConvergence {
                    max_iters: settings.max_iters,
                });
            }
            WireStatus::Error => {
                return Err(SolverError::Internal {
                    reason: self.message.unwrap_or_else(|| "unspecified".to_string()),
                });
            }
        };
        let duration = self
            .solve_time
            .and_then(|t| Duration::try_from_secs_f64(t).ok());
        Ok(SolveReport {
            status,
            objective_value: self.objective_value,
            duration,
        })
    }
}

/// Parses the last non-empty line of the process output.
pub fn parse_response(stdout: &str) -> Result<SolveResponse, SolverError> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| SolverError::Internal {
            reason: "solver produced no output".to_string(),
        })?;
    serde_json::from_str(line).map_err(|e| SolverError::Internal {
        reason: format!("unreadable solver response: {}", e),
    })
}

#[derive(Debug, Clone)]
pub struct ExternalSolverAdapter {
    program: String,
    args: Vec<String>,
}

impl ExternalSolverAdapter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn internal(reason: impl std::fmt::Display) -> SolverError {
        SolverError::Internal {
            reason: reason.to_string(),
        }
    }
}

impl ConvexSolver for ExternalSolverAdapter {
    fn solve(
        &self,
        problem: &ClearingProblem,
        settings: &SolveSettings,
    ) -> Result<SolveReport, SolverError> {
        let request = serde_json::to_vec(&SolveRequest { problem, settings }).map_err(Self::internal)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Self::internal(format!("failed to spawn {}: {}", self.program, e)))?;
        // The request is written on its own thread while stdout is drained.
        let stdin = child.stdin.take();
        let (sent, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(&request),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });
        let output = output.map_err(Self::internal)?;
        debug!(program = %self.program, status = %output.status, max_iters = settings.max_iters, "solver exited");

        let sent = sent.unwrap_or_else(|_| Err(std::io::Error::other("request writer panicked")));
        if let Err(e) = sent {
            return Err(Self::internal(format!(
                "failed to send request to {} (exited with {}): {}",
                self.program, output.status, e
            )));
        }
        if !output.status.success() {
            return Err(Self::internal(format!("{} exited with {}", self.program, output.status)));
        }
        parse_response(&String::from_utf8_lossy(&output.stdout))?.into_report(settings)
    }
}
