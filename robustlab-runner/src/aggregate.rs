//! Walk-forward aggregation: per-window gate results to pass-rate statistics.
//!
//! The median and worst OOS values are the primary robustness signals: a
//! single lucky window can drag the mean but barely moves either of them.
//!
//! Also aggregates parameter basins: for each evaluated segment, the share of
//! basin points that qualify, and the spread of that share across segments.

use serde::{Deserialize, Serialize};
use std::fmt;

use robustlab_core::{metric, PerformanceSummary};

use crate::gates::GateResult;
use crate::stats::{mean, median, worst};

// ─── Per-window aggregation ──────────────────────────────────────────

/// One evaluated OOS window: the evaluator's summary and its gate verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowOutcome {
    pub window_index: usize,
    pub summary: PerformanceSummary,
    pub gate: GateResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowAggregate {
    pub window_count: usize,
    pub pass_count: usize,
    /// `pass_count / window_count`; `None` with no windows.
    pub pass_rate: Option<f64>,
    /// Fraction of windows with `net_pnl > 0`.
    pub positive_window_rate: Option<f64>,
    /// Name of the OOS metric summarized below.
    pub metric: String,
    pub metric_mean: Option<f64>,
    pub metric_median: Option<f64>,
    pub metric_worst: Option<f64>,
    /// Windows whose summary lacked `metric`; they count as 0.0.
    pub missing_metric_windows: Vec<usize>,
}

impl WindowAggregate {
    pub fn has_missing_metric(&self) -> bool {
        !self.missing_metric_windows.is_empty()
    }
}

/// Summarize per-window outcomes for the OOS metric `metric_name`.
pub fn aggregate(outcomes: &[WindowOutcome], metric_name: &str) -> WindowAggregate {
    let n = outcomes.len();
    let pass_count = outcomes.iter().filter(|o| o.gate.gate_ok).count();
    let positive = outcomes
        .iter()
        .filter(|o| o.summary.get(metric::NET_PNL).is_some_and(|v| v > 0.0))
        .count();

    let mut missing_metric_windows = Vec::new();
    let values: Vec<f64> = outcomes
        .iter()
        .map(|o| match o.summary.get(metric_name) {
            Some(v) => v,
            None => {
                missing_metric_windows.push(o.window_index);
                0.0
            }
        })
        .collect();

    let rate = |k: usize| (n > 0).then(|| k as f64 / n as f64);

    WindowAggregate {
        window_count: n,
        pass_count,
        pass_rate: rate(pass_count),
        positive_window_rate: rate(positive),
        metric: metric_name.to_string(),
        metric_mean: mean(&values),
        metric_median: median(&values),
        metric_worst: worst(&values),
        missing_metric_windows,
    }
}

// ─── WFA gate ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WfaGateConfig {
    pub min_pass_rate: f64,
}

impl Default for WfaGateConfig {
    fn default() -> Self {
        Self { min_pass_rate: 0.70 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum WfaGateReason {
    MissingWindows,
    PassRateBelow { min: f64 },
}

impl fmt::Display for WfaGateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WfaGateReason::MissingWindows => f.write_str("missing_windows"),
            WfaGateReason::PassRateBelow { min } => write!(f, "pass_rate<{min}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WfaGateResult {
    pub wfa_gate_ok: bool,
    pub reasons: Vec<WfaGateReason>,
    pub window_count: usize,
    pub pass_rate: Option<f64>,
    pub min_pass_rate: f64,
}

/// Accept iff the pass rate is defined and at least `min_pass_rate`.
pub fn wfa_gate(agg: &WindowAggregate, cfg: &WfaGateConfig) -> WfaGateResult {
    let reasons = match agg.pass_rate {
        None => vec![WfaGateReason::MissingWindows],
        Some(rate) if rate < cfg.min_pass_rate => vec![WfaGateReason::PassRateBelow {
            min: cfg.min_pass_rate,
        }],
        Some(_) => Vec::new(),
    };
    WfaGateResult {
        wfa_gate_ok: reasons.is_empty(),
        reasons,
        window_count: agg.window_count,
        pass_rate: agg.pass_rate,
        min_pass_rate: cfg.min_pass_rate,
    }
}

// ─── Basin aggregation ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasinQualification {
    /// Profit factor a basin point needs on top of passing its gates.
    pub min_profit_factor: f64,
}

impl Default for BasinQualification {
    fn default() -> Self {
        Self {
            min_profit_factor: 1.0,
        }
    }
}

impl BasinQualification {
    /// Gate passed and profit factor at least the floor. Missing PF fails.
    pub fn qualifies(&self, summary: &PerformanceSummary, gate: &GateResult) -> bool {
        gate.gate_ok
            && summary
                .get(metric::PROFIT_FACTOR)
                .is_some_and(|pf| pf >= self.min_profit_factor)
    }
}

/// Basin pass rate on one evaluated segment (validation, or one OOS window).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasinSegment {
    pub segment: usize,
    pub points: usize,
    pub passed: usize,
    pub pass_rate: Option<f64>,
}

impl BasinSegment {
    pub fn from_flags(segment: usize, qualified: &[bool]) -> Self {
        let points = qualified.len();
        let passed = qualified.iter().filter(|q| **q).count();
        Self {
            segment,
            points,
            passed,
            pass_rate: (points > 0).then(|| passed as f64 / points as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasinAggregate {
    pub segments: Vec<BasinSegment>,
    pub pass_rate_mean: Option<f64>,
    pub pass_rate_median: Option<f64>,
    pub pass_rate_worst: Option<f64>,
}

impl BasinAggregate {
    pub fn from_segments(segments: Vec<BasinSegment>) -> Self {
        let rates: Vec<f64> = segments.iter().filter_map(|s| s.pass_rate).collect();
        Self {
            pass_rate_mean: mean(&rates),
            pass_rate_median: median(&rates),
            pass_rate_worst: worst(&rates),
            segments,
        }
    }

    /// Headline basin pass rate: the median across segments.
    pub fn pass_rate(&self) -> Option<f64> {
        self.pass_rate_median
    }
}
