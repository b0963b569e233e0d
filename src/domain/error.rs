//! Domain error types.

use crate::domain::retry::Exhausted;
use crate::ports::solver_port::SolverError;

/// Top-level error type for clearbench.
#[derive(Debug, thiserror::Error)]
pub enum ClearbenchError {
    #[error("solver failed after {attempts} attempts: {reason}")]
    SolverFailure { attempts: usize, reason: String },

    #[error("failed to load record {path}: {reason}")]
    RecordLoad { path: String, reason: String },

    #[error("failed to save record {path}: {reason}")]
    RecordSave { path: String, reason: String },

    #[error("duplicate result for tax_rate={tax_rate} smooth_mult={smooth_mult} num_txs={num_txs}")]
    DuplicateKey {
        tax_rate: u32,
        smooth_mult: u32,
        num_txs: u64,
    },

    #[error("no result for tax_rate={tax_rate} smooth_mult={smooth_mult} num_txs={num_txs}")]
    KeyNotFound {
        tax_rate: u32,
        smooth_mult: u32,
        num_txs: u64,
    },

    #[error("field not found: {path} (missing segment '{segment}')")]
    FieldNotFound { path: String, segment: String },

    #[error("runs are not aligned: {left} rounds vs {right} rounds")]
    MisalignedRuns { left: usize, right: usize },

    #[error("experiment parameters differ: {reason}")]
    ParamsMismatch { reason: String },

    #[error("zero denominator in round {round} for {path}")]
    ZeroDenominator { round: usize, path: String },

    #[error("no result files containing '{marker}' in {dir}")]
    NoResultsFound { dir: String, marker: String },

    #[error("order {index} is invalid: {reason}")]
    InvalidOrder { index: usize, reason: String },

    #[error("block has {available} orders, need {requested}")]
    InsufficientOrders { available: usize, requested: usize },

    #[error("invalid sweep query: {reason}")]
    InvalidQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("figure error: {reason}")]
    Figure { reason: String },
}

impl From<Exhausted<SolverError>> for ClearbenchError {
    fn from(exhausted: Exhausted<SolverError>) -> Self {
        ClearbenchError::SolverFailure {
            attempts: exhausted.attempts,
            reason: exhausted
                .last_error
                .map_or_else(|| "empty budget schedule".to_string(), |e| e.to_string()),
        }
    }
}

impl From<&ClearbenchError> for std::process::ExitCode {
    fn from(err: &ClearbenchError) -> Self {
        let code: u8 = match err {
            ClearbenchError::Figure { .. } => 1,
            ClearbenchError::ConfigParse { .. }
            | ClearbenchError::ConfigMissing { .. }
            | ClearbenchError::ConfigInvalid { .. } => 2,
            ClearbenchError::RecordLoad { .. }
            | ClearbenchError::RecordSave { .. }
            | ClearbenchError::NoResultsFound { .. } => 3,
            ClearbenchError::DuplicateKey { .. }
            | ClearbenchError::KeyNotFound { .. }
            | ClearbenchError::FieldNotFound { .. }
            | ClearbenchError::InvalidQuery { .. } => 4,
            ClearbenchError::MisalignedRuns { .. }
            | ClearbenchError::ParamsMismatch { .. }
            | ClearbenchError::ZeroDenominator { .. } => 5,
            ClearbenchError::SolverFailure { .. }
            | ClearbenchError::InvalidOrder { .. }
            | ClearbenchError::InsufficientOrders { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
