//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::external_solver::ExternalSolverAdapter;
use crate::adapters::figure_for_extension;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_store::JsonRecordStore;
use crate::domain::aggregate::{summarize, SummaryRow};
use crate::domain::compare::{compare_runs, overlay_metrics, overlay_runs, Comparison};
use crate::domain::config_validation::{
    parse_budget_schedule, parse_empty_scan, parse_num_trials, parse_tx_levels,
    validate_analysis_config, validate_price_comp_config, validate_solver_config,
    validate_sweep_config, DEFAULT_FIGURE_EXTENSION, DEFAULT_RESULTS_MARKER, DEFAULT_TOLERANCE,
};
use crate::domain::error::ClearbenchError;
use crate::domain::field::{figure_file_name, FieldPath};
use crate::domain::index::{load_result_index, Dimension, EmptyScanPolicy};
use crate::domain::measurement::ExperimentRun;
use crate::domain::order::{flag_anomalous_orders, sell_volumes, Order};
use crate::domain::price_comp::SolverConfig;
use crate::domain::results::ResultCollection;
use crate::domain::sweep::{run_sweep_from_store, SweepPlan};
use crate::domain::sweep_query::{mean_by_num_txs, sweep_family, CompletionPolicy, FixedDims};
use crate::ports::config_port::ConfigPort;
use crate::ports::figure_port::{AxisScale, FigurePort};
use crate::ports::record_port::RecordStore;
use crate::ports::solver_port::ConvexSolver;

#[derive(Parser, Debug)]
#[command(name = "clearbench", about = "Market-clearing benchmark harness")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// `label=file` pair for an overlaid line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSpec {
    pub label: String,
    pub path: PathBuf,
}

pub fn parse_line_spec(s: &str) -> Result<LineSpec, String> {
    match s.split_once('=') {
        Some((label, path)) if !label.is_empty() && !path.is_empty() => Ok(LineSpec {
            label: label.to_string(),
            path: PathBuf::from(path),
        }),
        _ => Err(format!("expected <label>=<file>, got '{}'", s)),
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the price-computation sweep with the external solver
    PriceComp {
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Plot strict sweep families for every observed transaction count
    SweepPlots {
        #[arg(long)]
        results_dir: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "runtime")]
        metric: Vec<String>,
    },
    /// Print lenient per-configuration means
    Summary {
        #[arg(long)]
        results_dir: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "runtime")]
        metric: String,
    },
    /// Overlay runtime against number of offers for several result files
    RuntimePlot {
        #[arg(long, value_parser = parse_line_spec, required = true)]
        line: Vec<LineSpec>,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value = "runtime")]
        metric: String,
    },
    /// Plot metrics of one run over its rounds
    Rounds {
        #[arg(long)]
        run: PathBuf,
        #[arg(long, required = true)]
        metric: Vec<String>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Compare the same metrics across runs that differ only in thread count
    ThreadCompare {
        #[arg(long)]
        root: String,
        #[arg(long, required = true)]
        metric: Vec<String>,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Ratio and smoothed ratio of a metric between two aligned runs
    Ratio {
        #[arg(long)]
        run1: PathBuf,
        #[arg(long)]
        run2: PathBuf,
        #[arg(long)]
        metric: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Sum sell amounts per asset in one block
    Volumes {
        #[arg(long)]
        block: PathBuf,
        #[arg(long)]
        num_assets: usize,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::PriceComp {
            data_dir,
            output,
            config,
        } => run_price_comp(&data_dir, &output, config.as_deref()),
        Command::SweepPlots {
            results_dir,
            config,
            metric,
        } => run_sweep_plots(&results_dir, config.as_deref(), &to_paths(&metric)),
        Command::Summary {
            results_dir,
            config,
            metric,
        } => run_summary(&results_dir, config.as_deref(), &FieldPath::new(metric)),
        Command::RuntimePlot {
            line,
            output,
            metric,
        } => run_runtime_plot(&line, &output, &FieldPath::new(metric)),
        Command::Rounds {
            run,
            metric,
            output,
        } => run_rounds(&run, &to_paths(&metric), &output),
        Command::ThreadCompare {
            root,
            metric,
            files,
            config,
        } => run_thread_compare(&root, &to_paths(&metric), &files, config.as_deref()),
        Command::Ratio {
            run1,
            run2,
            metric,
            output,
            config,
        } => run_ratio(
            &run1,
            &run2,
            &FieldPath::new(metric),
            output.as_deref(),
            config.as_deref(),
        ),
        Command::Volumes { block, num_assets } => run_volumes(&block, num_assets),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(&e)
        }
    }
}

fn to_paths(metrics: &[String]) -> Vec<FieldPath> {
    metrics.iter().map(|m| FieldPath::new(m.as_str())).collect()
}

/// Reads the INI file, or an empty config when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, ClearbenchError> {
    match path {
        None => Ok(FileConfigAdapter::empty()),
        Some(path) => {
            info!(path = %path.display(), "loading config");
            FileConfigAdapter::from_file(path).map_err(|e| ClearbenchError::ConfigParse {
                file: path.display().to_string(),
                reason: e.to_string(),
            })
        }
    }
}

pub fn build_sweep_plan(config: &dyn ConfigPort) -> Result<SweepPlan, ClearbenchError> {
    validate_sweep_config(config)?;
    Ok(SweepPlan {
        tx_levels: parse_tx_levels(config)?,
        num_trials: parse_num_trials(config)?,
    })
}

pub fn build_solver_config(config: &dyn ConfigPort) -> Result<SolverConfig, ClearbenchError> {
    validate_solver_config(config)?;
    Ok(SolverConfig {
        schedule: parse_budget_schedule(config)?,
        tolerance: config.get_double("solver", "tolerance", DEFAULT_TOLERANCE),
    })
}

pub fn build_solver(config: &dyn ConfigPort) -> Result<ExternalSolverAdapter, ClearbenchError> {
    validate_price_comp_config(config)?;
    let program = config
        .get_string("solver", "program")
        .ok_or(ClearbenchError::ConfigMissing {
            section: "solver".to_string(),
            key: "program".to_string(),
        })?;
    let args = config
        .get_string("solver", "args")
        .map(|a| a.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    Ok(ExternalSolverAdapter::new(program.trim(), args))
}

/// Settings shared by the analysis commands.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub results_marker: String,
    pub figure_extension: String,
    pub output_dir: PathBuf,
    pub empty_scan: EmptyScanPolicy,
}

pub fn build_analysis_config(config: &dyn ConfigPort) -> Result<AnalysisConfig, ClearbenchError> {
    validate_analysis_config(config)?;
    Ok(AnalysisConfig {
        results_marker: config
            .get_string("analysis", "results_marker")
            .unwrap_or_else(|| DEFAULT_RESULTS_MARKER.to_string()),
        figure_extension: config
            .get_string("analysis", "figure_extension")
            .unwrap_or_else(|| DEFAULT_FIGURE_EXTENSION.to_string()),
        output_dir: config
            .get_string("analysis", "output_dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
        empty_scan: parse_empty_scan(config)?,
    })
}

fn figure_for_path(path: &Path) -> Result<Box<dyn FigurePort>, ClearbenchError> {
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_else(|| DEFAULT_FIGURE_EXTENSION.to_string());
    figure_for_extension(&extension)
}

fn run_price_comp(data_dir: &Path, output: &Path, config_path: Option<&Path>) -> Result<(), ClearbenchError> {
    let config = load_config(config_path)?;
    let solver = build_solver(&config)?;
    let plan = build_sweep_plan(&config)?;
    let solver_config = build_solver_config(&config)?;
    price_comp_pipeline(&JsonRecordStore, &solver, data_dir, output, &plan, &solver_config)?;
    Ok(())
}

/// Runs the sweep over `data_dir` and saves the collection to `output`.
pub fn price_comp_pipeline<R: RecordStore, S: ConvexSolver + ?Sized>(
    store: &R,
    solver: &S,
    data_dir: &Path,
    output: &Path,
    plan: &SweepPlan,
    config: &SolverConfig,
) -> Result<ResultCollection, ClearbenchError> {
    let collection = run_sweep_from_store(store, solver, data_dir, plan, config)?;
    for exp in &collection.experiments {
        if !exp.is_complete() {
            warn!(key = %exp.key(), shortfall = exp.shortfall(), "trials missing from result");
        }
    }
    store.save(&collection, output)?;
    info!(path = %output.display(), experiments = collection.len(), "results saved");
    Ok(collection)
}

fn axis_label(dim: Dimension) -> &'static str {
    match dim {
        Dimension::TaxRate => "Tax Rate",
        Dimension::SmoothMult => "Smooth Mult",
        Dimension::NumTxs => "Number of Transactions",
    }
}

fn run_sweep_plots(results_dir: &Path, config_path: Option<&Path>, metrics: &[FieldPath]) -> Result<(), ClearbenchError> {
    let config = load_config(config_path)?;
    let analysis = build_analysis_config(&config)?;
    let mut figure = figure_for_extension(&analysis.figure_extension)?;
    let written = sweep_plots_pipeline(&JsonRecordStore, figure.as_mut(), results_dir, &analysis, metrics)?;
    info!(figures = written.len(), "sweep plots done");
    Ok(())
}

/// For every observed `num_txs`, one strict family per orientation
/// (smooth_mult lines over tax_rate and tax_rate lines over smooth_mult).
pub fn sweep_plots_pipeline<R: RecordStore>(
    store: &R,
    figure: &mut dyn FigurePort,
    results_dir: &Path,
    analysis: &AnalysisConfig,
    metrics: &[FieldPath],
) -> Result<Vec<PathBuf>, ClearbenchError> {
    let index = load_result_index(store, results_dir, &analysis.results_marker, analysis.empty_scan)?;
    let orientations = [
        (Dimension::SmoothMult, Dimension::TaxRate),
        (Dimension::TaxRate, Dimension::SmoothMult),
    ];
    let mut written = Vec::new();
    for num_txs in index.values_for_num_txs() {
        let fixed = FixedDims {
            num_txs: Some(num_txs),
            ..FixedDims::default()
        };
        for metric in metrics {
            for (legend, varying) in orientations {
                let family = sweep_family(&index, legend, varying, &fixed, metric, CompletionPolicy::Strict)?;
                if family.is_empty() {
                    warn!(num_txs, metric = %metric, x = varying.name(), "no complete groups to plot");
                    continue;
                }
                figure.set_labels(axis_label(varying), metric.as_str());
                figure.annotate(&format!("num txs={}\nlegend={}", num_txs, legend.name()));
                for series in family {
                    figure.add_series(series);
                }
                let root = format!("sweep_{}_{}txs", varying.name(), num_txs);
                let path = analysis
                    .output_dir
                    .join(figure_file_name(&root, metric, &analysis.figure_extension));
                figure.flush(&path)?;
                written.push(path);
            }
        }
    }
    Ok(written)
}

fn run_summary(results_dir: &Path, config_path: Option<&Path>, metric: &FieldPath) -> Result<(), ClearbenchError> {
    let config = load_config(config_path)?;
    let analysis = build_analysis_config(&config)?;
    let rows = summary_pipeline(&JsonRecordStore, results_dir, &analysis, metric)?;
    println!("{}", format_summary(metric, &rows));
    Ok(())
}

pub fn summary_pipeline<R: RecordStore>(
    store: &R,
    results_dir: &Path,
    analysis: &AnalysisConfig,
    metric: &FieldPath,
) -> Result<Vec<SummaryRow>, ClearbenchError> {
    let index = load_result_index(store, results_dir, &analysis.results_marker, analysis.empty_scan)?;
    summarize(&index, metric)
}

pub fn format_summary(metric: &FieldPath, rows: &[SummaryRow]) -> String {
    let mut out = format!(
        "{:>8} {:>11} {:>8} {:>9} {:>12} {:>12} {:>12} {:>12}\n",
        "tax_rate", "smooth_mult", "num_txs", "completed", metric.as_str(), "std_dev", "min", "max"
    );
    for row in rows {
        let completed = format!("{}/{}", row.mean.completed, row.mean.num_trials);
        match (row.mean.value, row.stats) {
            (Some(mean), Some(stats)) => out.push_str(&format!(
                "{:>8} {:>11} {:>8} {:>9} {:>12.6} {:>12.6} {:>12.6} {:>12.6}\n",
                row.key.tax_rate,
                row.key.smooth_mult,
                row.key.num_txs,
                completed,
                mean,
                stats.std_dev,
                stats.min,
                stats.max
            )),
            _ => out.push_str(&format!(
                "{:>8} {:>11} {:>8} {:>9} {:>12}\n",
                row.key.tax_rate, row.key.smooth_mult, row.key.num_txs, completed, "no data"
            )),
        }
    }
    out
}

fn run_runtime_plot(lines: &[LineSpec], output: &Path, metric: &FieldPath) -> Result<(), ClearbenchError> {
    let mut figure = figure_for_path(output)?;
    runtime_plot_pipeline(&JsonRecordStore, figure.as_mut(), lines, metric, output)
}

/// Lenient per-experiment means of each collection, overlaid on log-log axes.
pub fn runtime_plot_pipeline<R: RecordStore>(
    store: &R,
    figure: &mut dyn FigurePort,
    lines: &[LineSpec],
    metric: &FieldPath,
    output: &Path,
) -> Result<(), ClearbenchError> {
    figure.set_labels("Number of Offers", metric.as_str());
    figure.set_scale(AxisScale::Log, AxisScale::Log);
    for line in lines {
        let collection: ResultCollection = store.load(&line.path)?;
        figure.add_series(mean_by_num_txs(line.label.as_str(), &collection, metric)?);
    }
    figure.flush(output)
}

fn run_rounds(run_path: &Path, metrics: &[FieldPath], output: &Path) -> Result<(), ClearbenchError> {
    let mut figure = figure_for_path(output)?;
    rounds_pipeline(&JsonRecordStore, figure.as_mut(), run_path, metrics, output)
}

pub fn rounds_pipeline<R: RecordStore>(
    store: &R,
    figure: &mut dyn FigurePort,
    run_path: &Path,
    metrics: &[FieldPath],
    output: &Path,
) -> Result<(), ClearbenchError> {
    let run: ExperimentRun = store.load(run_path)?;
    figure.set_labels("Round", "Time (s)");
    figure.annotate(&run.params.to_string());
    for series in overlay_metrics(&run, metrics)? {
        figure.add_series(series);
    }
    figure.flush(output)
}

fn run_thread_compare(
    root: &str,
    metrics: &[FieldPath],
    files: &[PathBuf],
    config_path: Option<&Path>,
) -> Result<(), ClearbenchError> {
    let config = load_config(config_path)?;
    let analysis = build_analysis_config(&config)?;
    let mut figure = figure_for_extension(&analysis.figure_extension)?;
    let written = thread_compare_pipeline(&JsonRecordStore, figure.as_mut(), root, metrics, files, &analysis)?;
    info!(figures = written.len(), "thread comparison done");
    Ok(())
}

/// One figure per metric, one line per run, labeled by thread count.
pub fn thread_compare_pipeline<R: RecordStore>(
    store: &R,
    figure: &mut dyn FigurePort,
    root: &str,
    metrics: &[FieldPath],
    files: &[PathBuf],
    analysis: &AnalysisConfig,
) -> Result<Vec<PathBuf>, ClearbenchError> {
    let runs = files
        .iter()
        .map(|f| -> Result<(String, ExperimentRun), ClearbenchError> {
            let run: ExperimentRun = store.load(f)?;
            Ok((format!("{} threads", run.params.num_threads), run))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let Some((_, first)) = runs.first() else {
        return Ok(Vec::new());
    };
    let annotation = first.params.annotation();

    let mut written = Vec::new();
    for metric in metrics {
        let lines = overlay_runs(&runs, metric)?;
        figure.set_labels("Round", metric.as_str());
        figure.annotate(&annotation);
        for series in lines {
            figure.add_series(series);
        }
        let path = analysis
            .output_dir
            .join(figure_file_name(root, metric, &analysis.figure_extension));
        figure.flush(&path)?;
        written.push(path);
    }
    Ok(written)
}

fn run_ratio(
    run1: &Path,
    run2: &Path,
    metric: &FieldPath,
    output: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<(), ClearbenchError> {
    let config = load_config(config_path)?;
    let analysis = build_analysis_config(&config)?;
    let output = match output {
        Some(p) => p.to_path_buf(),
        None => analysis
            .output_dir
            .join(figure_file_name("ratio", metric, &analysis.figure_extension)),
    };
    let mut figure = figure_for_path(&output)?;
    let comparison = ratio_pipeline(&JsonRecordStore, figure.as_mut(), run1, run2, metric, &output)?;
    if let Some(last) = comparison.smoothed.last() {
        info!(rounds = comparison.len(), final_smoothed = *last, "ratio computed");
    }
    Ok(())
}

pub fn ratio_pipeline<R: RecordStore>(
    store: &R,
    figure: &mut dyn FigurePort,
    run1: &Path,
    run2: &Path,
    metric: &FieldPath,
    output: &Path,
) -> Result<Comparison, ClearbenchError> {
    let first: ExperimentRun = store.load(run1)?;
    let second: ExperimentRun = store.load(run2)?;
    let comparison = compare_runs(&first, &second, metric)?;
    figure.set_labels("Round", &format!("{} ratio", metric));
    figure.annotate(&first.params.annotation());
    for series in comparison.to_series(metric) {
        figure.add_series(series);
    }
    figure.flush(output)?;
    Ok(comparison)
}

fn run_volumes(block: &Path, num_assets: usize) -> Result<(), ClearbenchError> {
    let volumes = volumes_pipeline(&JsonRecordStore, block, num_assets)?;
    for (asset, volume) in volumes.iter().enumerate() {
        println!("asset {}: {}", asset, volume);
    }
    Ok(())
}

pub fn volumes_pipeline<R: RecordStore>(
    store: &R,
    block: &Path,
    num_assets: usize,
) -> Result<Vec<u128>, ClearbenchError> {
    let orders: Vec<Order> = store.load(block)?;
    let anomalous = flag_anomalous_orders(&orders);
    info!(orders = orders.len(), anomalous, "block loaded");
    Ok(sell_volumes(&orders, num_assets))
}
