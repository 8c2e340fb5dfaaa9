//! Hard gates: pass/fail thresholds applied to one evaluation summary.
//!
//! Every check runs regardless of earlier failures, so a summary that fails
//! two independent checks reports both reasons. Trade counts are compared on
//! an annualized basis so that short OOS windows are judged fairly against
//! long ones.

use serde::{Deserialize, Serialize};
use std::fmt;

use robustlab_core::{metric, PerformanceSummary};

/// Days per year used to annualize trade counts.
pub const DAYS_PER_YEAR: f64 = 365.25;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Maximum tolerated intrabar drawdown, in percent.
    pub maxdd_intrabar_pct: f64,
    /// Minimum annualized trade count.
    pub min_trades_annualized: f64,
    /// Optional floor on average holding period (bars). `None` disables.
    pub min_avg_hold_bars: Option<f64>,
    /// Optional overtrading ceiling on annualized trades. `None` disables.
    pub max_trades_annualized: Option<f64>,
    pub require_net_positive: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            maxdd_intrabar_pct: 10.0,
            min_trades_annualized: 200.0,
            min_avg_hold_bars: None,
            max_trades_annualized: None,
            require_net_positive: true,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Why a summary failed a hard gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum GateReason {
    MissingMaxdd,
    MaxddExceeded { limit: f64 },
    TradesUndeterminable,
    TooFewTrades { min: f64 },
    HoldTooShort { min: f64 },
    TooManyTrades { max: f64 },
    NetNotPositive,
}

impl GateReason {
    /// Stable short tag, e.g. `maxdd_intrabar>10`.
    pub fn tag(&self) -> String {
        match self {
            GateReason::MissingMaxdd => "missing_maxdd".to_string(),
            GateReason::MaxddExceeded { limit } => format!("maxdd_intrabar>{limit}"),
            GateReason::TradesUndeterminable => "trades_undeterminable".to_string(),
            GateReason::TooFewTrades { min } => format!("trades_annualized<{min}"),
            GateReason::HoldTooShort { min } => format!("avg_hold_bars<{min}"),
            GateReason::TooManyTrades { max } => format!("trades_annualized>{max}"),
            GateReason::NetNotPositive => "net_pnl<=0".to_string(),
        }
    }
}

impl fmt::Display for GateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub gate_ok: bool,
    /// Failure reasons in check order. Empty iff `gate_ok`.
    pub reasons: Vec<GateReason>,
    /// Annualized trade count actually compared, if it could be resolved.
    pub trades_annualized: Option<f64>,
    /// Configuration the summary was judged against.
    pub config: GateConfig,
}

impl GateResult {
    pub fn tags(&self) -> Vec<String> {
        self.reasons.iter().map(GateReason::tag).collect()
    }
}

// ─── Evaluation ──────────────────────────────────────────────────────

/// Annualized trade count: the precomputed metric if present, else
/// `total_trades * 365.25 / max(days_covered, 1)` from the summary's own
/// coverage timestamps. `None` when neither route is available.
pub fn resolve_trades_annualized(summary: &PerformanceSummary) -> Option<f64> {
    if let Some(ann) = summary.get(metric::TRADES_ANNUALIZED) {
        return Some(ann);
    }
    let trades = summary.get(metric::TOTAL_TRADES)?;
    let days = summary.days_covered()?.max(1.0);
    Some(trades * DAYS_PER_YEAR / days)
}

/// Apply every configured hard gate to `summary`.
pub fn evaluate(summary: &PerformanceSummary, cfg: &GateConfig) -> GateResult {
    let mut reasons = Vec::new();

    match summary.get(metric::MAX_DRAWDOWN_INTRABAR_PCT) {
        None => reasons.push(GateReason::MissingMaxdd),
        Some(dd) if dd > cfg.maxdd_intrabar_pct => reasons.push(GateReason::MaxddExceeded {
            limit: cfg.maxdd_intrabar_pct,
        }),
        Some(_) => {}
    }

    let trades_annualized = resolve_trades_annualized(summary);
    match trades_annualized {
        None => reasons.push(GateReason::TradesUndeterminable),
        Some(ann) if ann < cfg.min_trades_annualized => reasons.push(GateReason::TooFewTrades {
            min: cfg.min_trades_annualized,
        }),
        Some(_) => {}
    }

    if let Some(min) = cfg.min_avg_hold_bars {
        let ok = summary
            .get(metric::AVG_HOLD_BARS)
            .is_some_and(|hold| hold >= min);
        if !ok {
            reasons.push(GateReason::HoldTooShort { min });
        }
    }

    // An unresolved count is already reported above.
    if let (Some(max), Some(ann)) = (cfg.max_trades_annualized, trades_annualized) {
        if ann > max {
            reasons.push(GateReason::TooManyTrades { max });
        }
    }

    if cfg.require_net_positive {
        let ok = summary.get(metric::NET_PNL).is_some_and(|net| net > 0.0);
        if !ok {
            reasons.push(GateReason::NetNotPositive);
        }
    }

    GateResult {
        gate_ok: reasons.is_empty(),
        reasons,
        trades_annualized,
        config: cfg.clone(),
    }
}
