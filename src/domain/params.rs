//! Simulation configuration of one experiment run.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentParameters {
    pub num_assets: u32,
    pub tax_rate: u32,
    pub smooth_mult: u32,
    pub num_threads: u32,
    pub num_accounts: u64,
}

impl ExperimentParameters {
    /// Equality used when grouping runs of a thread-count sweep.
    pub fn same_ignoring_thread_count(&self, other: &Self) -> bool {
        self.mismatch_ignoring_thread_count(other).is_none()
    }

    /// Names the first differing field, ignoring `num_threads`.
    pub fn mismatch_ignoring_thread_count(&self, other: &Self) -> Option<String> {
        if self.tax_rate != other.tax_rate {
            return Some(format!("tax_rate {} vs {}", self.tax_rate, other.tax_rate));
        }
        if self.smooth_mult != other.smooth_mult {
            return Some(format!(
                "smooth_mult {} vs {}",
                self.smooth_mult, other.smooth_mult
            ));
        }
        if self.num_assets != other.num_assets {
            return Some(format!(
                "num_assets {} vs {}",
                self.num_assets, other.num_assets
            ));
        }
        if self.num_accounts != other.num_accounts {
            return Some(format!(
                "num_accounts {} vs {}",
                self.num_accounts, other.num_accounts
            ));
        }
        None
    }

    /// Multi-line annotation printed on figures.
    pub fn annotation(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ExperimentParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "num assets={}", self.num_assets)?;
        writeln!(f, "tax rate={}", self.tax_rate)?;
        writeln!(f, "smooth mult={}", self.smooth_mult)?;
        writeln!(f, "num threads={}", self.num_threads)?;
        write!(f, "num accounts={}", self.num_accounts)
    }
}
