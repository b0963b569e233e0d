#![allow(dead_code)]

use clearbench::domain::error::ClearbenchError;
use clearbench::domain::formulation::ClearingProblem;
use clearbench::domain::measurement::{ExperimentRun, MeasurementNode};
use clearbench::domain::order::{Order, Price};
pub use clearbench::domain::params::ExperimentParameters;
use clearbench::domain::results::{ResultCollection, RuntimeMeasurement, SingleConfigResult};
use clearbench::domain::series::Series;
use clearbench::ports::figure_port::{AxisScale, FigurePort};
use clearbench::ports::record_port::RecordStore;
use clearbench::ports::solver_port::{
    ConvexSolver, SolveReport, SolveSettings, SolveStatus, SolverError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fails every attempt whose budget is below `fail_below`.
pub struct MockSolver {
    pub fail_below: u32,
    pub duration: Option<Duration>,
    pub calls: Cell<usize>,
}

impl MockSolver {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            fail_below: 0,
            duration: Some(Duration::from_millis(duration_ms)),
            calls: Cell::new(0),
        }
    }

    pub fn failing_below(mut self, budget: u32) -> Self {
        self.fail_below = budget;
        self
    }

    pub fn always_failing() -> Self {
        Self::new(1).failing_below(u32::MAX)
    }
}

impl ConvexSolver for MockSolver {
    fn solve(
        &self,
        _problem: &ClearingProblem,
        settings: &SolveSettings,
    ) -> Result<SolveReport, SolverError> {
        self.calls.set(self.calls.get() + 1);
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

/// Record store over an in-memory map of JSON documents.
#[derive(Default)]
pub struct MemoryRecordStore {
    pub files: RefCell<BTreeMap<PathBuf, String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record<T: Serialize>(self, path: impl Into<PathBuf>, value: &T) -> Self {
        self.files
            .borrow_mut()
            .insert(path.into(), serde_json::to_string(value).unwrap());
        self
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }
}

impl RecordStore for MemoryRecordStore {
    fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T, ClearbenchError> {
        let files = self.files.borrow();
        let content = files.get(path).ok_or_else(|| ClearbenchError::RecordLoad {
            path: path.display().to_string(),
            reason: "not found".into(),
        })?;
        serde_json::from_str(content).map_err(|e| ClearbenchError::RecordLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn save<T: Serialize>(&self, value: &T, path: &Path) -> Result<(), ClearbenchError> {
        let json = serde_json::to_string(value).map_err(|e| ClearbenchError::RecordSave {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        self.files.borrow_mut().insert(path.to_path_buf(), json);
        Ok(())
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, ClearbenchError> {
        Ok(self
            .files
            .borrow()
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect())
    }
}

/// A figure as it was when flushed.
#[derive(Debug, Clone, Default)]
pub struct FlushedFigure {
    pub path: PathBuf,
    pub x_label: String,
    pub y_label: String,
    pub scale: (AxisScale, AxisScale),
    pub annotation: Option<String>,
    pub series: Vec<Series>,
}

#[derive(Default)]
pub struct RecordingFigure {
    current: FlushedFigure,
    pub flushed: Vec<FlushedFigure>,
}

impl RecordingFigure {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FigurePort for RecordingFigure {
    fn set_labels(&mut self, x_label: &str, y_label: &str) {
        self.current.x_label = x_label.to_string();
        self.current.y_label = y_label.to_string();
    }

    fn set_scale(&mut self, x: AxisScale, y: AxisScale) {
        self.current.scale = (x, y);
    }

    fn annotate(&mut self, text: &str) {
        self.current.annotation = Some(text.to_string());
    }

    fn add_series(&mut self, series: Series) {
        self.current.series.push(series);
    }

    fn flush(&mut self, path: &Path) -> Result<(), ClearbenchError> {
        let mut figure = std::mem::take(&mut self.current);
        figure.path = path.to_path_buf();
        self.flushed.push(figure);
        Ok(())
    }
}

pub fn make_params(num_threads: u32) -> ExperimentParameters {
    ExperimentParameters {
        num_assets: 2,
        tax_rate: 20,
        smooth_mult: 7,
        num_threads,
        num_accounts: 100,
    }
}

/// `len` alternating orders between assets 0 and 1.
pub fn make_block(len: usize) -> Vec<Order> {
    (0..len)
        .map(|i| Order {
            sell_asset: (i % 2) as u32,
            buy_asset: ((i + 1) % 2) as u32,
            min_price: Price::from_f64(0.5),
            amount: 10 + i as u64,
        })
        .collect()
}

pub fn make_result(tax: u32, smooth: u32, txs: u64, runtimes: &[f64], trials: u32) -> SingleConfigResult {
    let mut r = SingleConfigResult::new(10, tax, smooth, txs, trials);
    for &t in runtimes {
        r.record(RuntimeMeasurement::from_runtime(t));
    }
    r
}

pub fn make_collection(results: Vec<SingleConfigResult>) -> ResultCollection {
    ResultCollection {
        experiments: results,
    }
}

/// A run whose rounds hold `total_time` and a nested persistence timing.
pub fn make_run(num_threads: u32, totals: &[f64]) -> ExperimentRun {
    ExperimentRun {
        params: make_params(num_threads),
        block_results: totals
            .iter()
            .map(|&t| {
                MeasurementNode::record([
                    ("total_time", MeasurementNode::Scalar(t)),
                    (
                        "persist",
                        MeasurementNode::record([("header_write_time", MeasurementNode::Scalar(t / 10.0))]),
                    ),
                ])
            })
            .collect(),
    }
}
