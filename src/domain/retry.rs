//! Bounded retry over an escalating iteration budget.

use tracing::debug;

/// Iteration budgets tried in order: `initial`, `initial + step`, ... while
/// the budget does not exceed `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetSchedule {
    pub initial: u32,
    pub step: u32,
    pub max: u32,
}

impl Default for BudgetSchedule {
    fn default() -> Self {
        Self {
            initial: 100,
            step: 20,
            max: 200,
        }
    }
}

impl BudgetSchedule {
    pub fn budgets(&self) -> impl Iterator<Item = u32> {
        let BudgetSchedule { initial, step, max } = *self;
        std::iter::successors(Some(initial), move |&b| {
            if step == 0 { None } else { b.checked_add(step) }
        })
        .take_while(move |&b| b <= max)
    }
}

/// Every budget failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Exhausted<E> {
    pub attempts: usize,
    pub last_error: Option<E>,
}

/// Calls `f` with each budget of `schedule` until it succeeds.
pub fn retry<T, E, F>(schedule: &BudgetSchedule, mut f: F) -> Result<T, Exhausted<E>>
where
    F: FnMut(u32) -> Result<T, E>,
    E: std::fmt::Display,
{
    let mut attempts = 0;
    let mut last_error = None;
    for budget in schedule.budgets() {
        attempts += 1;
        match f(budget) {
            Ok(value) => return Ok(value),
            Err(e) => {
                debug!(budget, error = %e, "attempt failed");
                last_error = Some(e);
            }
        }
    }
    Err(Exhausted {
        attempts,
        last_error,
    })
}
