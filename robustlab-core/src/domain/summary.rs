//! PerformanceSummary: the opaque metric record produced by an evaluator.
//!
//! Metrics are looked up by name. A metric that is absent or non-finite is
//! reported as missing (`None`); nothing here infers or defaults a value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::bar::Timestamp;
use super::params::ParameterSet;

/// Well-known metric names.
pub mod metric {
    pub const NET_PNL: &str = "net_pnl";
    pub const NET_RETURN_PCT: &str = "net_return_pct";
    pub const MAX_DRAWDOWN_INTRABAR_PCT: &str = "max_drawdown_intrabar_pct";
    pub const MAX_DRAWDOWN_LEN: &str = "max_drawdown_len";
    pub const TOTAL_TRADES: &str = "total_trades";
    pub const TRADES_ANNUALIZED: &str = "trades_annualized";
    pub const AVG_HOLD_BARS: &str = "avg_hold_bars";
    pub const PROFIT_FACTOR: &str = "profit_factor";
    pub const EXPECTANCY: &str = "expectancy";
    /// Expectancy normalized by starting equity, in percent.
    pub const EXPECTANCY_PCT_OF_START: &str = "expectancy_pct_of_start";
    pub const SHARPE: &str = "sharpe";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    /// First bar timestamp actually covered by the evaluation.
    #[serde(default)]
    pub data_dt_min: Option<Timestamp>,
    /// Last bar timestamp actually covered by the evaluation.
    #[serde(default)]
    pub data_dt_max: Option<Timestamp>,
    /// The parameter record the strategy reported running with.
    #[serde(default)]
    pub strategy_params: Option<ParameterSet>,
}

impl PerformanceSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style metric insertion.
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn with_coverage(mut self, min: Timestamp, max: Timestamp) -> Self {
        self.data_dt_min = Some(min);
        self.data_dt_max = Some(max);
        self
    }

    pub fn with_strategy_params(mut self, params: ParameterSet) -> Self {
        self.strategy_params = Some(params);
        self
    }

    /// Metric by name; `None` if absent or not finite.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied().filter(|v| v.is_finite())
    }

    /// Observed coverage in days, from the summary's own first/last timestamps.
    pub fn days_covered(&self) -> Option<f64> {
        match (self.data_dt_min, self.data_dt_max) {
            (Some(lo), Some(hi)) => Some((hi - lo).num_seconds() as f64 / 86_400.0),
            _ => None,
        }
    }
}
