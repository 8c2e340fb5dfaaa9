//! Integration tests for the freeze and retune pipelines.
//!
//! The evaluator is a deterministic synthetic model: `edge` sets the return
//! level, `hold` sets the drawdown, and a per-window phase derived from the
//! slice's first timestamp makes windows differ.

use anyhow::bail;
use chrono::{Datelike, Duration, TimeZone, Utc};

use robustlab_core::{
    metric, Bar, ParamSpace, ParamValue, ParamValues, ParameterSet, PerformanceSummary,
    TimeSeries,
};
use robustlab_runner::{
    BasinMode, PipelineConfig, PipelineError, RobustnessPipeline, Segment,
};

fn daily_series(symbol: &str, days: i64) -> TimeSeries {
    let t0 = Utc.with_ymd_and_hms(2018, 1, 2, 21, 0, 0).unwrap();
    let bars = (0..days)
        .map(|i| {
            let px = 100.0 + (i % 17) as f64;
            Bar {
                ts: t0 + Duration::days(i),
                open: px,
                high: px + 1.0,
                low: px - 1.0,
                close: px + 0.5,
                volume: 1_000.0,
            }
        })
        .collect();
    TimeSeries::new(symbol, bars).unwrap()
}

fn param_f64(p: &ParameterSet, name: &str) -> f64 {
    p.get(name).and_then(ParamValue::as_f64).unwrap_or(0.0)
}

fn synthetic(data: &[TimeSeries], params: &ParameterSet) -> anyhow::Result<PerformanceSummary> {
    let Some(series) = data.first() else {
        bail!("no data");
    };
    let (Some(first), Some(last)) = (series.first_ts(), series.last_ts()) else {
        return Ok(PerformanceSummary::new());
    };
    let edge = param_f64(params, "edge");
    let hold = param_f64(params, "hold");
    let phase = (first.ordinal() % 4) as f64 / 3.0;
    let quality = edge - 0.5 * phase;

    Ok(PerformanceSummary::new()
        .with_metric(metric::NET_RETURN_PCT, quality * 2.0)
        .with_metric(metric::NET_PNL, quality * 200.0)
        .with_metric(metric::MAX_DRAWDOWN_INTRABAR_PCT, 4.0 + hold * 0.5)
        .with_metric(metric::TOTAL_TRADES, series.len() as f64 * 4.0)
        .with_metric(metric::PROFIT_FACTOR, 1.0 + quality * 0.5)
        .with_metric(metric::EXPECTANCY, quality * 0.01)
        .with_metric(metric::SHARPE, quality)
        .with_coverage(first, last)
        .with_strategy_params(params.clone()))
}

fn space() -> ParamSpace {
    ParamSpace::default()
        .dim("edge", ParamValues::Float(vec![-0.5, 0.5, 1.5]))
        .dim("hold", ParamValues::Int(vec![4, 16]))
}

/// Route pipeline logs through the test harness; `RUST_LOG=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn serial() -> PipelineConfig {
    init_tracing();
    PipelineConfig {
        parallel: false,
        ..PipelineConfig::default()
    }
}

#[test]
fn test_freeze_selects_strong_low_drawdown_candidate() {
    let data = vec![daily_series("SPY", 5 * 365)];
    let pipeline = RobustnessPipeline::new(synthetic, serial()).unwrap();
    let report = pipeline.run_freeze(&data, &space()).unwrap();

    assert_eq!(report.n_trials, 6);
    assert_eq!(report.candidates.len(), 6);
    assert!(!report.windows.is_empty());
    assert!(!report.selection.used_fallback);
    assert_eq!(report.selection.index, 4);
    assert_eq!(report.selection.params.get("edge"), Some(&ParamValue::Float(1.5)));
    assert_eq!(report.selection.params.get("hold"), Some(&ParamValue::Int(4)));

    let frozen = report.frozen();
    assert_eq!(frozen.aggregate.pass_rate, Some(1.0));
    assert!(frozen.wfa_gate.wfa_gate_ok);
    assert_eq!(frozen.outcomes.len(), report.windows.len());

    // High-drawdown twin fails every window.
    assert_eq!(report.candidates[5].aggregate.pass_rate, Some(0.0));
    assert!(!report.candidates[5].wfa_gate.wfa_gate_ok);
}

#[test]
fn test_freeze_scorecard_is_bounded_and_audited() {
    let data = vec![daily_series("SPY", 5 * 365)];
    let pipeline = RobustnessPipeline::new(synthetic, serial()).unwrap();
    let report = pipeline.run_freeze(&data, &space()).unwrap();
    let card = &report.scorecard;

    assert!(card.total_score > 0.0 && card.total_score < 100.0);
    assert_eq!(card.inputs.n_trials, Some(6));
    assert!(card.deflated_confidence.is_some());
    // The synthetic model never reports drawdown length.
    assert!(card
        .missing_inputs
        .contains(&robustlab_runner::MissingInput::MaxDrawdownLen));
    assert!(!card
        .missing_inputs
        .contains(&robustlab_runner::MissingInput::StrategyParams));
    assert!(report.validation.gate.gate_ok);
}

#[test]
fn test_validation_basin_is_single_segment() {
    let data = vec![daily_series("SPY", 5 * 365)];
    let pipeline = RobustnessPipeline::new(synthetic, serial()).unwrap();
    let report = pipeline.run_freeze(&data, &space()).unwrap();

    assert_eq!(report.basin.mode, BasinMode::Validation);
    // edge 1.5 -> 7 floats, hold 4 -> {1,2,3,4,5,6,8}.
    assert_eq!(report.basin.points, 49);
    assert_eq!(report.basin.aggregate.segments.len(), 1);
    let rate = report.basin.aggregate.pass_rate().unwrap();
    assert!(rate > 0.0 && rate <= 1.0);
}

#[test]
fn test_walk_forward_basin_covers_every_window() {
    let data = vec![daily_series("SPY", 5 * 365)];
    let mut cfg = serial();
    cfg.basin.mode = BasinMode::WalkForward;
    let pipeline = RobustnessPipeline::new(synthetic, cfg).unwrap();
    let report = pipeline.run_freeze(&data, &space()).unwrap();

    assert_eq!(report.basin.aggregate.segments.len(), report.windows.len());
    assert!(report.scorecard.inputs.basin_pass_rate > 0.0);
}

#[test]
fn test_parallel_and_serial_reports_match() {
    let data = vec![daily_series("SPY", 5 * 365)];
    init_tracing();
    let parallel = RobustnessPipeline::new(synthetic, PipelineConfig::default()).unwrap();
    let sequential = RobustnessPipeline::new(synthetic, serial()).unwrap();

    assert_eq!(
        parallel.run_freeze(&data, &space()).unwrap(),
        sequential.run_freeze(&data, &space()).unwrap()
    );
    assert_eq!(
        parallel.run_retune(&data, &space()).unwrap(),
        sequential.run_retune(&data, &space()).unwrap()
    );
}

#[test]
fn test_fallback_when_no_candidate_passes() {
    let data = vec![daily_series("SPY", 5 * 365)];
    let mut cfg = serial();
    cfg.gates.maxdd_intrabar_pct = 1.0;
    let pipeline = RobustnessPipeline::new(synthetic, cfg).unwrap();
    let report = pipeline.run_freeze(&data, &space()).unwrap();

    assert!(report.selection.used_fallback);
    assert_eq!(report.selection.eligible_count, 0);
    // edge 1.5 twins tie on every OOS statistic; the earlier one wins.
    assert_eq!(report.selection.index, 4);
}

#[test]
fn test_retune_picks_best_train_candidate_per_window() {
    let data = vec![daily_series("SPY", 5 * 365)];
    let pipeline = RobustnessPipeline::new(synthetic, serial()).unwrap();
    let report = pipeline.run_retune(&data, &space()).unwrap();

    assert_eq!(report.n_candidates, 6);
    assert!(!report.windows.is_empty());
    for w in &report.windows {
        assert!(!w.selection.used_fallback);
        assert_eq!(w.selection.params.get("edge"), Some(&ParamValue::Float(1.5)));
        assert_eq!(w.selection.params.get("hold"), Some(&ParamValue::Int(4)));
        assert_eq!(w.oos.window_index, w.window.index);
    }
    assert_eq!(report.aggregate.window_count, report.windows.len());
    assert_eq!(report.aggregate.pass_rate, Some(1.0));
    assert!(report.wfa_gate.wfa_gate_ok);
}

#[test]
fn test_short_history_is_insufficient() {
    let pipeline = RobustnessPipeline::new(synthetic, serial()).unwrap();

    // Splits, but leaves no room for a 12+3 month window.
    let err = pipeline
        .run_freeze(&[daily_series("SPY", 500)], &space())
        .unwrap_err();
    assert!(matches!(err, PipelineError::InsufficientHistory { .. }));

    // Cannot even split.
    let err = pipeline
        .run_retune(&[daily_series("SPY", 300)], &space())
        .unwrap_err();
    assert!(matches!(err, PipelineError::InsufficientHistory { .. }));
}

#[test]
fn test_evaluator_failure_names_candidate_and_segment() {
    let failing = |_: &[TimeSeries], p: &ParameterSet| -> anyhow::Result<PerformanceSummary> {
        if param_f64(p, "edge") < 0.0 {
            bail!("engine rejected negative edge");
        }
        Ok(PerformanceSummary::new())
    };
    let pipeline = RobustnessPipeline::new(failing, serial()).unwrap();
    let err = pipeline
        .run_freeze(&[daily_series("SPY", 5 * 365)], &space())
        .unwrap_err();
    match err {
        PipelineError::Evaluation {
            candidate,
            segment,
            source,
        } => {
            assert_eq!(candidate.len(), 12);
            assert_eq!(segment, Segment::Oos { window: 0 });
            assert!(source.to_string().contains("negative edge"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_misaligned_instruments_rejected() {
    let pipeline = RobustnessPipeline::new(synthetic, serial()).unwrap();
    let data = vec![daily_series("SPY", 5 * 365), daily_series("QQQ", 5 * 365 - 3)];
    let err = pipeline.run_freeze(&data, &space()).unwrap_err();
    assert!(matches!(err, PipelineError::Series(_)));
}

#[test]
fn test_aligned_pair_is_accepted() {
    let pipeline = RobustnessPipeline::new(synthetic, serial()).unwrap();
    let aligned = robustlab_core::align::intersect(&[
        daily_series("SPY", 5 * 365),
        daily_series("QQQ", 5 * 365 - 3),
    ])
    .unwrap();
    let report = pipeline.run_freeze(&aligned, &space()).unwrap();
    assert_eq!(report.selection.index, 4);
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let mut cfg = serial();
    cfg.wfa.min_pass_rate = 2.0;
    assert!(matches!(
        RobustnessPipeline::new(synthetic, cfg),
        Err(PipelineError::Config(_))
    ));
}
