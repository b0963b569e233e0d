//! Configuration validation.
//!
//! Every key has a default, so an empty config validates. The checks run
//! before any sweep or analysis touches the filesystem.

use crate::domain::error::ClearbenchError;
use crate::domain::index::EmptyScanPolicy;
use crate::domain::retry::BudgetSchedule;
use crate::domain::sweep::DEFAULT_TX_LEVELS;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_NUM_TRIALS: i64 = 5;
pub const DEFAULT_TOLERANCE: f64 = 0.001;
pub const DEFAULT_RESULTS_MARKER: &str = "results";
pub const DEFAULT_FIGURE_EXTENSION: &str = ".svg";

pub fn validate_sweep_config(config: &dyn ConfigPort) -> Result<(), ClearbenchError> {
    validate_num_trials(config)?;
    parse_tx_levels(config)?;
    Ok(())
}

pub fn validate_solver_config(config: &dyn ConfigPort) -> Result<(), ClearbenchError> {
    validate_budgets(config)?;
    validate_tolerance(config)?;
    Ok(())
}

/// `price-comp` additionally needs a solver program.
pub fn validate_price_comp_config(config: &dyn ConfigPort) -> Result<(), ClearbenchError> {
    validate_sweep_config(config)?;
    validate_solver_config(config)?;
    match config.get_string("solver", "program") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(ClearbenchError::ConfigMissing {
            section: "solver".to_string(),
            key: "program".to_string(),
        }),
    }
}

pub fn validate_analysis_config(config: &dyn ConfigPort) -> Result<(), ClearbenchError> {
    validate_results_marker(config)?;
    validate_figure_extension(config)?;
    parse_empty_scan(config)?;
    Ok(())
}

fn validate_num_trials(config: &dyn ConfigPort) -> Result<(), ClearbenchError> {
    parse_num_trials(config).map(|_| ())
}

/// The positive trial count from `[sweep] num_trials`.
pub fn parse_num_trials(config: &dyn ConfigPort) -> Result<u32, ClearbenchError> {
    let value = config.get_int("sweep", "num_trials", DEFAULT_NUM_TRIALS);
    u32::try_from(value)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| ClearbenchError::ConfigInvalid {
            section: "sweep".to_string(),
            key: "num_trials".to_string(),
            reason: "num_trials must be a positive integer".to_string(),
        })
}

/// Comma-separated positive transaction counts, in the order given.
pub fn parse_tx_levels(config: &dyn ConfigPort) -> Result<Vec<u64>, ClearbenchError> {
    let Some(raw) = config.get_string("sweep", "tx_levels") else {
        return Ok(DEFAULT_TX_LEVELS.to_vec());
    };
    let invalid = |reason: String| ClearbenchError::ConfigInvalid {
        section: "sweep".to_string(),
        key: "tx_levels".to_string(),
        reason,
    };
    let levels = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<u64>() {
            Ok(0) => Err(invalid("tx levels must be positive".to_string())),
            Ok(n) => Ok(n),
            Err(_) => Err(invalid(format!("'{}' is not a transaction count", s))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if levels.is_empty() {
        return Err(invalid("at least one tx level is required".to_string()));
    }
    Ok(levels)
}

fn budget_value(config: &dyn ConfigPort, key: &str, default: u32) -> Result<u32, ClearbenchError> {
    let value = config.get_int("solver", key, default as i64);
    u32::try_from(value).map_err(|_| ClearbenchError::ConfigInvalid {
        section: "solver".to_string(),
        key: key.to_string(),
        reason: format!("{} must be a non-negative integer", key),
    })
}

/// The iteration budget schedule from `[solver]`.
pub fn parse_budget_schedule(config: &dyn ConfigPort) -> Result<BudgetSchedule, ClearbenchError> {
    let defaults = BudgetSchedule::default();
    Ok(BudgetSchedule {
        initial: budget_value(config, "initial_budget", defaults.initial)?,
        step: budget_value(config, "budget_step", defaults.step)?,
        max: budget_value(config, "max_budget", defaults.max)?,
    })
}

fn validate_budgets(config: &dyn ConfigPort) -> Result<(), ClearbenchError> {
    let schedule = parse_budget_schedule(config)?;
    if schedule.initial == 0 {
        return Err(ClearbenchError::ConfigInvalid {
            section: "solver".to_string(),
            key: "initial_budget".to_string(),
            reason: "initial_budget must be positive".to_string(),
        });
    }
    if schedule.step == 0 {
        return Err(ClearbenchError::ConfigInvalid {
            section: "solver".to_string(),
            key: "budget_step".to_string(),
            reason: "budget_step must be positive".to_string(),
        });
    }
    if schedule.max < schedule.initial {
        return Err(ClearbenchError::ConfigInvalid {
            section: "solver".to_string(),
            key: "max_budget".to_string(),
            reason: "max_budget must not be below initial_budget".to_string(),
        });
    }
    Ok(())
}

fn validate_tolerance(config: &dyn ConfigPort) -> Result<(), ClearbenchError> {
    let value = config.get_double("solver", "tolerance", DEFAULT_TOLERANCE);
    if value <= 0.0 || !value.is_finite() {
        return Err(ClearbenchError::ConfigInvalid {
            section: "solver".to_string(),
            key: "tolerance".to_string(),
            reason: "tolerance must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_results_marker(config: &dyn ConfigPort) -> Result<(), ClearbenchError> {
    match config.get_string("analysis", "results_marker") {
        Some(s) if s.trim().is_empty() => Err(ClearbenchError::ConfigInvalid {
            section: "analysis".to_string(),
            key: "results_marker".to_string(),
            reason: "results_marker must not be empty".to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_figure_extension(config: &dyn ConfigPort) -> Result<(), ClearbenchError> {
    match config.get_string("analysis", "figure_extension") {
        Some(ext) if !ext.starts_with('.') || ext.len() < 2 => {
            Err(ClearbenchError::ConfigInvalid {
                section: "analysis".to_string(),
                key: "figure_extension".to_string(),
                reason: "figure_extension must start with '.'".to_string(),
            })
        }
        _ => Ok(()),
    }
}

pub fn parse_empty_scan(config: &dyn ConfigPort) -> Result<EmptyScanPolicy, ClearbenchError> {
    match config.get_string("analysis", "empty_scan").as_deref().map(str::trim) {
        None | Some("error") => Ok(EmptyScanPolicy::Error),
        Some("empty") => Ok(EmptyScanPolicy::Empty),
        Some(other) => Err(ClearbenchError::ConfigInvalid {
            section: "analysis".to_string(),
            key: "empty_scan".to_string(),
            reason: format!("unknown policy '{}', expected 'error' or 'empty'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn empty_config_passes() {
        let config = make_config("");
        assert!(validate_sweep_config(&config).is_ok());
        assert!(validate_solver_config(&config).is_ok());
        assert!(validate_analysis_config(&config).is_ok());
        assert_eq!(parse_tx_levels(&config).unwrap(), DEFAULT_TX_LEVELS.to_vec());
        assert_eq!(parse_budget_schedule(&config).unwrap(), BudgetSchedule::default());
    }

    #[test]
    fn num_trials_zero_fails() {
        let config = make_config("[sweep]\nnum_trials = 0\n");
        let err = validate_sweep_config(&config).unwrap_err();
        assert!(matches!(err, ClearbenchError::ConfigInvalid { key, .. } if key == "num_trials"));
    }

    #[test]
    fn num_trials_out_of_u32_range_fails() {
        let config = make_config("[sweep]\nnum_trials = 4294967296\n");
        let err = parse_num_trials(&config).unwrap_err();
        assert!(matches!(err, ClearbenchError::ConfigInvalid { key, .. } if key == "num_trials"));
        assert_eq!(parse_num_trials(&make_config("[sweep]\nnum_trials = 7\n")).unwrap(), 7);
    }

    #[test]
    fn tx_levels_parse_in_order() {
        let config = make_config("[sweep]\ntx_levels = 500, 100 ,2000\n");
        assert_eq!(parse_tx_levels(&config).unwrap(), vec![500, 100, 2000]);
    }

    #[test]
    fn non_numeric_tx_level_fails() {
        let config = make_config("[sweep]\ntx_levels = 100,lots\n");
        let err = validate_sweep_config(&config).unwrap_err();
        assert!(matches!(err, ClearbenchError::ConfigInvalid { key, .. } if key == "tx_levels"));
    }

    #[test]
    fn zero_tx_level_fails() {
        let config = make_config("[sweep]\ntx_levels = 0,100\n");
        assert!(parse_tx_levels(&config).is_err());
    }

    #[test]
    fn zero_budget_step_fails() {
        let config = make_config("[solver]\nbudget_step = 0\n");
        let err = validate_solver_config(&config).unwrap_err();
        assert!(matches!(err, ClearbenchError::ConfigInvalid { key, .. } if key == "budget_step"));
    }

    #[test]
    fn max_below_initial_fails() {
        let config = make_config("[solver]\ninitial_budget = 300\nmax_budget = 200\n");
        let err = validate_solver_config(&config).unwrap_err();
        assert!(matches!(err, ClearbenchError::ConfigInvalid { key, .. } if key == "max_budget"));
    }

    #[test]
    fn negative_budget_fails() {
        let config = make_config("[solver]\ninitial_budget = -1\n");
        let err = validate_solver_config(&config).unwrap_err();
        assert!(
            matches!(err, ClearbenchError::ConfigInvalid { key, .. } if key == "initial_budget")
        );
    }

    #[test]
    fn non_positive_tolerance_fails() {
        let config = make_config("[solver]\ntolerance = 0\n");
        let err = validate_solver_config(&config).unwrap_err();
        assert!(matches!(err, ClearbenchError::ConfigInvalid { key, .. } if key == "tolerance"));
    }

    #[test]
    fn price_comp_requires_program() {
        let config = make_config("[solver]\ntolerance = 0.01\n");
        let err = validate_price_comp_config(&config).unwrap_err();
        assert!(matches!(err, ClearbenchError::ConfigMissing { key, .. } if key == "program"));

        let config = make_config("[solver]\nprogram = clear-solve\n");
        assert!(validate_price_comp_config(&config).is_ok());
    }

    #[test]
    fn unknown_empty_scan_policy_fails() {
        let config = make_config("[analysis]\nempty_scan = ignore\n");
        let err = validate_analysis_config(&config).unwrap_err();
        assert!(matches!(err, ClearbenchError::ConfigInvalid { key, .. } if key == "empty_scan"));

        let config = make_config("[analysis]\nempty_scan = empty\n");
        assert_eq!(parse_empty_scan(&config).unwrap(), EmptyScanPolicy::Empty);
    }

    #[test]
    fn extension_without_dot_fails() {
        let config = make_config("[analysis]\nfigure_extension = svg\n");
        let err = validate_analysis_config(&config).unwrap_err();
        assert!(
            matches!(err, ClearbenchError::ConfigInvalid { key, .. } if key == "figure_extension")
        );
    }
}
