//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Config loading and the build_* helpers with real INI files on disk
//! - Each command pipeline with the in-memory record store and a recording figure
//! - Figure output on disk for the SVG and CSV sinks

mod common;

use clearbench::adapters::json_store::JsonRecordStore;
use clearbench::cli::{
    self, build_analysis_config, build_solver_config, build_sweep_plan, format_summary,
    price_comp_pipeline, ratio_pipeline, rounds_pipeline, runtime_plot_pipeline,
    summary_pipeline, sweep_plots_pipeline, thread_compare_pipeline, volumes_pipeline,
    AnalysisConfig, LineSpec,
};
use clearbench::domain::error::ClearbenchError;
use clearbench::domain::field::FieldPath;
use clearbench::domain::index::EmptyScanPolicy;
use clearbench::domain::order::{Order, Price};
use clearbench::domain::results::ResultCollection;
use clearbench::domain::sweep::{block_path, PARAMS_FILE};
use clearbench::ports::figure_port::AxisScale;
use clearbench::ports::record_port::RecordStore;
use common::*;
use std::io::Write;
use std::path::{Path, PathBuf};

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[sweep]
tx_levels = 2,4
num_trials = 2

[solver]
program = clear-solve
args = --format json
initial_budget = 100
budget_step = 50
max_budget = 200
tolerance = 0.0001

[analysis]
results_marker = results
figure_extension = .csv
output_dir = plots
empty_scan = empty
"#;

fn analysis(output_dir: &str) -> AnalysisConfig {
    AnalysisConfig {
        results_marker: "results".to_string(),
        figure_extension: ".svg".to_string(),
        output_dir: PathBuf::from(output_dir),
        empty_scan: EmptyScanPolicy::Error,
    }
}

fn results_store() -> MemoryRecordStore {
    MemoryRecordStore::new()
        .with_record(
            "out/run_a_results",
            &make_collection(vec![
                make_result(10, 5, 100, &[1.0, 3.0], 2),
                make_result(20, 5, 100, &[4.0, 4.0], 2),
                make_result(10, 7, 100, &[5.0], 2),
            ]),
        )
        .with_record(
            "out/run_b_results",
            &make_collection(vec![
                make_result(10, 5, 500, &[6.0, 6.0], 2),
                make_result(20, 7, 500, &[7.0, 9.0], 2),
            ]),
        )
        .with_record("out/params", &make_params(1))
}

#[test]
fn config_file_drives_every_builder() {
    let file = write_temp_ini(VALID_INI);
    let config = cli::load_config(Some(file.path())).unwrap();

    let plan = build_sweep_plan(&config).unwrap();
    assert_eq!(plan.tx_levels, vec![2, 4]);
    assert_eq!(plan.num_trials, 2);

    let solver = build_solver_config(&config).unwrap();
    assert_eq!(solver.schedule.budgets().collect::<Vec<_>>(), vec![100, 150, 200]);
    assert_eq!(solver.tolerance, 0.0001);

    let analysis = build_analysis_config(&config).unwrap();
    assert_eq!(analysis.figure_extension, ".csv");
    assert_eq!(analysis.output_dir, PathBuf::from("plots"));
    assert_eq!(analysis.empty_scan, EmptyScanPolicy::Empty);

    assert!(cli::build_solver(&config).is_ok());
}

#[test]
fn invalid_config_is_rejected_with_config_exit_code() {
    let file = write_temp_ini("[solver]\ninitial_budget = 300\nmax_budget = 200\n");
    let config = cli::load_config(Some(file.path())).unwrap();
    let err = build_solver_config(&config).unwrap_err();
    assert!(matches!(err, ClearbenchError::ConfigInvalid { ref key, .. } if key == "max_budget"));
    assert_eq!(
        std::process::ExitCode::from(&err),
        std::process::ExitCode::from(2)
    );
}

#[test]
fn price_comp_pipeline_persists_collection() {
    let data = Path::new("data");
    let store = MemoryRecordStore::new()
        .with_record(data.join(PARAMS_FILE), &make_params(1))
        .with_record(block_path(data, 1), &make_block(4))
        .with_record(block_path(data, 2), &make_block(4));
    let file = write_temp_ini(VALID_INI);
    let config = cli::load_config(Some(file.path())).unwrap();
    let plan = build_sweep_plan(&config).unwrap();
    let solver_config = build_solver_config(&config).unwrap();

    let output = Path::new("out/price_comp_results");
    let collection = price_comp_pipeline(
        &store,
        &MockSolver::new(3),
        data,
        output,
        &plan,
        &solver_config,
    )
    .unwrap();

    assert!(store.contains(output));
    let saved: ResultCollection = store.load(output).unwrap();
    assert_eq!(saved, collection);
    assert_eq!(saved.experiments[1].num_txs, 4);
    assert_eq!(saved.experiments[1].results.len(), 2);
}

#[test]
fn sweep_plots_cover_both_orientations_per_num_txs() {
    let store = results_store();
    let mut figure = RecordingFigure::new();
    let written = sweep_plots_pipeline(
        &store,
        &mut figure,
        Path::new("out"),
        &analysis("plots"),
        &[FieldPath::from("runtime")],
    )
    .unwrap();

    assert_eq!(written.len(), 4);
    assert_eq!(
        written[0],
        PathBuf::from("plots").join("sweep_tax_rate_100txs_runtime.svg")
    );
    let first = &figure.flushed[0];
    assert_eq!(first.x_label, "Tax Rate");
    // (10, 7, 100) is incomplete, so only the smooth_mult=5 line survives.
    assert_eq!(first.series.len(), 1);
    assert_eq!(first.series[0].label, "5");
    assert_eq!(first.series[0].points, vec![(10.0, 2.0), (20.0, 4.0)]);
}

#[test]
fn summary_lists_every_key_with_partial_means() {
    let store = results_store();
    let rows = summary_pipeline(&store, Path::new("out"), &analysis("plots"), &"runtime".into()).unwrap();
    assert_eq!(rows.len(), 5);
    let partial = rows
        .iter()
        .find(|r| r.key.tax_rate == 10 && r.key.smooth_mult == 7)
        .unwrap();
    assert_eq!(partial.mean.as_pair(), Some((5.0, 1)));

    let table = format_summary(&"runtime".into(), &rows);
    assert_eq!(table.lines().count(), 6);
    assert!(table.contains("1/2"));
}

#[test]
fn runtime_plot_overlays_collections_on_log_axes() {
    let store = results_store();
    let mut figure = RecordingFigure::new();
    let lines = vec![
        LineSpec {
            label: "a".to_string(),
            path: PathBuf::from("out/run_a_results"),
        },
        LineSpec {
            label: "b".to_string(),
            path: PathBuf::from("out/run_b_results"),
        },
    ];
    runtime_plot_pipeline(
        &store,
        &mut figure,
        &lines,
        &"runtime".into(),
        Path::new("runtime.svg"),
    )
    .unwrap();

    let flushed = &figure.flushed[0];
    assert_eq!(flushed.scale, (AxisScale::Log, AxisScale::Log));
    assert_eq!(flushed.series.len(), 2);
    assert_eq!(flushed.series[1].points, vec![(500.0, 6.0), (500.0, 8.0)]);
}

#[test]
fn rounds_overlays_metrics_with_params_annotation() {
    let store = MemoryRecordStore::new().with_record("run", &make_run(4, &[1.0, 2.0, 3.0]));
    let mut figure = RecordingFigure::new();
    rounds_pipeline(
        &store,
        &mut figure,
        Path::new("run"),
        &[FieldPath::from("total_time"), FieldPath::from("persist.header_write_time")],
        Path::new("rounds.svg"),
    )
    .unwrap();

    let flushed = &figure.flushed[0];
    assert_eq!(flushed.series.len(), 2);
    assert_eq!(flushed.series[0].ys(), vec![1.0, 2.0, 3.0]);
    assert!(flushed.annotation.as_deref().unwrap().contains("num threads=4"));
}

#[test]
fn thread_compare_names_figures_by_metric() {
    let store = MemoryRecordStore::new()
        .with_record("one", &make_run(1, &[4.0, 4.0]))
        .with_record("four", &make_run(4, &[1.0, 2.0]));
    let mut figure = RecordingFigure::new();
    let written = thread_compare_pipeline(
        &store,
        &mut figure,
        "thread_comparison",
        &[FieldPath::from("persist.header_write_time")],
        &[PathBuf::from("one"), PathBuf::from("four")],
        &analysis("plots"),
    )
    .unwrap();

    assert_eq!(
        written,
        vec![PathBuf::from("plots").join("thread_comparison_persist_header_write_time.svg")]
    );
    let labels: Vec<&str> = figure.flushed[0].series.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["1 threads", "4 threads"]);
}

#[test]
fn ratio_pipeline_aborts_on_param_mismatch_without_flushing() {
    let mut other = make_run(4, &[1.0, 1.0]);
    other.params.tax_rate = 40;
    let store = MemoryRecordStore::new()
        .with_record("one", &make_run(1, &[2.0, 2.0]))
        .with_record("other", &other);
    let mut figure = RecordingFigure::new();
    let err = ratio_pipeline(
        &store,
        &mut figure,
        Path::new("one"),
        Path::new("other"),
        &"total_time".into(),
        Path::new("ratio.svg"),
    )
    .unwrap_err();
    assert!(matches!(err, ClearbenchError::ParamsMismatch { .. }));
    assert!(figure.flushed.is_empty());
}

#[test]
fn ratio_pipeline_plots_three_curves() {
    let store = MemoryRecordStore::new()
        .with_record("one", &make_run(1, &[2.0, 6.0]))
        .with_record("four", &make_run(4, &[2.0, 2.0]));
    let mut figure = RecordingFigure::new();
    let cmp = ratio_pipeline(
        &store,
        &mut figure,
        Path::new("one"),
        Path::new("four"),
        &"total_time".into(),
        Path::new("ratio.svg"),
    )
    .unwrap();
    assert_eq!(cmp.ratio, vec![1.0, 3.0]);
    assert_eq!(cmp.smoothed, vec![1.0, 2.0]);
    assert_eq!(figure.flushed[0].series.len(), 3);
}

#[test]
fn volumes_sum_sell_amounts_per_asset() {
    let block = vec![
        Order {
            sell_asset: 0,
            buy_asset: 1,
            min_price: Price::from_f64(0.5),
            amount: 10,
        },
        Order {
            sell_asset: 2,
            buy_asset: 0,
            min_price: Price::from_f64(0.5),
            amount: 7,
        },
        Order {
            sell_asset: 0,
            buy_asset: 2,
            min_price: Price::from_f64(0.5),
            amount: 5,
        },
    ];
    let store = MemoryRecordStore::new().with_record("1.txs", &block);
    assert_eq!(
        volumes_pipeline(&store, Path::new("1.txs"), 3).unwrap(),
        vec![15, 0, 7]
    );
}

#[test]
fn figures_land_on_disk_through_real_sinks() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = JsonRecordStore::new();
    let run_path = dir.path().join("run");
    store.save(&make_run(2, &[1.0, 2.0]), &run_path).unwrap();

    for ext in [".svg", ".csv"] {
        let output = dir.path().join(format!("rounds{}", ext));
        let mut figure = clearbench::adapters::figure_for_extension(ext).unwrap();
        rounds_pipeline(
            &store,
            figure.as_mut(),
            &run_path,
            &[FieldPath::from("total_time")],
            &output,
        )
        .unwrap();
        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("total_time"));
    }
}
