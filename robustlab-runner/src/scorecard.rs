//! Scorecard: one auditable 0..100 score from robustness, risk, return
//! quality and implementability signals.
//!
//! Every input is optional. A missing input takes its most conservative value
//! and is listed in `missing_inputs`; scoring never fails.
//!
//! Sub-scores (each in [0, 1]):
//! - robustness = 0.6 * temporal + 0.4 * basin
//! - risk = 0.7 * drawdown depth + 0.3 * drawdown length (both inverted)
//! - return quality = 0.35 * PF + 0.25 * expectancy + 0.25 * Sharpe + 0.15 * net return
//! - implementability = 1.0, or 0.5 without a strategy parameter record

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use robustlab_core::{metric, PerformanceSummary};

use crate::stats::{deflated_confidence, linear, DeflationConfig};

pub const SCORE_VERSION: &str = "v1";

// ─── Configuration ───────────────────────────────────────────────────

/// Relative weights of the four sub-scores. Normalized by their sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub robustness: f64,
    pub risk: f64,
    pub return_quality: f64,
    pub implementability: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            robustness: 55.0,
            risk: 25.0,
            return_quality: 15.0,
            implementability: 5.0,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.robustness + self.risk + self.return_quality + self.implementability
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub weights: ScoreWeights,
    pub deflation: DeflationConfig,
}

// ─── Inputs ──────────────────────────────────────────────────────────

/// Everything the scorecard may draw on. All fields optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    /// Fraction of OOS windows with positive net P&L.
    pub pos_window_rate: Option<f64>,
    /// WFA hard-gate pass rate; stands in for `pos_window_rate` when absent.
    pub wfa_pass_rate: Option<f64>,
    /// Median basin pass rate across walk-forward windows.
    pub basin_wfa_pass_rate: Option<f64>,
    /// Basin pass rate on the validation segment.
    pub basin_pass_rate: Option<f64>,
    pub val: Option<PerformanceSummary>,
    pub test: Option<PerformanceSummary>,
    /// Number of parameter sets tried before freezing.
    pub n_trials: Option<usize>,
}

/// Audit tag for an input that was absent and defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingInput {
    BasinPassRate,
    Expectancy,
    MaxDrawdownIntrabarPct,
    MaxDrawdownLen,
    NetReturnPct,
    ProfitFactor,
    Sharpe,
    StrategyParams,
    #[serde(rename = "wfa_pos_window_rate")]
    PosWindowRate,
}

/// Input values after fallback and defaulting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedInputs {
    pub pos_window_rate: f64,
    pub basin_pass_rate: f64,
    pub max_drawdown_intrabar_pct: f64,
    pub max_drawdown_len: Option<f64>,
    pub profit_factor: f64,
    pub expectancy: f64,
    pub sharpe: f64,
    pub net_return_pct: f64,
    pub n_trials: Option<usize>,
    /// Sharpe fed to the deflation statistic (test first, then validation).
    pub deflation_sharpe: Option<f64>,
}

// ─── Output ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscores {
    pub robustness: f64,
    pub risk: f64,
    pub return_quality: f64,
    pub implementability: f64,
    /// Temporal component of robustness.
    pub temporal_consistency: f64,
    /// Basin component of robustness.
    pub basin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub score_version: String,
    pub weights: ScoreWeights,
    pub inputs: ResolvedInputs,
    pub subscores: Subscores,
    /// Weighted total in [0, 100], rounded to 6 decimals.
    pub total_score: f64,
    /// `None` unless `n_trials >= 2` and a Sharpe ratio was available.
    pub deflated_confidence: Option<f64>,
    pub missing_inputs: BTreeSet<MissingInput>,
}

// ─── Scoring ─────────────────────────────────────────────────────────

fn clip01(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `value`, or `default` with `tag` recorded as missing.
fn or_missing(
    missing: &mut BTreeSet<MissingInput>,
    value: Option<f64>,
    tag: MissingInput,
    default: f64,
) -> f64 {
    value.unwrap_or_else(|| {
        missing.insert(tag);
        default
    })
}

/// First present metric across summaries, in order.
fn first_metric(sources: &[Option<&PerformanceSummary>], name: &str) -> Option<f64> {
    sources.iter().flatten().find_map(|s| s.get(name))
}

pub fn score(inputs: &ScoreInputs, cfg: &ScoreConfig) -> Scorecard {
    let mut missing = BTreeSet::new();

    let val = inputs.val.as_ref();
    let test = inputs.test.as_ref();

    // Robustness
    let pos_window_rate = or_missing(
        &mut missing,
        inputs.pos_window_rate.or(inputs.wfa_pass_rate),
        MissingInput::PosWindowRate,
        0.0,
    );
    let basin_pass_rate = or_missing(
        &mut missing,
        inputs.basin_wfa_pass_rate.or(inputs.basin_pass_rate),
        MissingInput::BasinPassRate,
        0.0,
    );
    let temporal = linear(pos_window_rate, 0.0, 0.7);
    let basin = linear(basin_pass_rate, 0.0, 0.3);
    let robustness = 0.6 * temporal + 0.4 * basin;

    // Risk: per-field fallback from validation to test.
    let max_dd = or_missing(
        &mut missing,
        first_metric(&[val, test], metric::MAX_DRAWDOWN_INTRABAR_PCT),
        MissingInput::MaxDrawdownIntrabarPct,
        100.0,
    );
    let max_dd_len = first_metric(&[val, test], metric::MAX_DRAWDOWN_LEN);
    let dd_len_score = match max_dd_len {
        Some(len) => 1.0 - linear(len, 500.0, 5000.0),
        None => {
            missing.insert(MissingInput::MaxDrawdownLen);
            0.0
        }
    };
    let risk = 0.7 * (1.0 - linear(max_dd, 5.0, 20.0)) + 0.3 * dd_len_score;

    // Return quality: one source summary, validation preferred.
    let primary = val.or(test);
    let from_primary = |name: &str| primary.and_then(|s| s.get(name));
    let profit_factor = or_missing(
        &mut missing,
        from_primary(metric::PROFIT_FACTOR),
        MissingInput::ProfitFactor,
        0.0,
    );
    let expectancy = or_missing(
        &mut missing,
        from_primary(metric::EXPECTANCY_PCT_OF_START).or_else(|| from_primary(metric::EXPECTANCY)),
        MissingInput::Expectancy,
        0.0,
    );
    let sharpe = or_missing(
        &mut missing,
        from_primary(metric::SHARPE),
        MissingInput::Sharpe,
        0.0,
    );
    let net_return_pct = or_missing(
        &mut missing,
        from_primary(metric::NET_RETURN_PCT),
        MissingInput::NetReturnPct,
        0.0,
    );
    let return_quality = 0.35 * clip01((profit_factor - 0.7) / 0.6)
        + 0.25 * clip01((expectancy + 0.05) / 0.10)
        + 0.25 * clip01((sharpe + 1.0) / 2.0)
        + 0.15 * linear(net_return_pct, -5.0, 5.0);

    // Implementability
    let has_params = primary
        .and_then(|s| s.strategy_params.as_ref())
        .is_some_and(|p| !p.is_empty());
    let implementability = if has_params {
        1.0
    } else {
        missing.insert(MissingInput::StrategyParams);
        0.5
    };

    // Deflation: test Sharpe first.
    let deflation_sharpe = first_metric(&[test, val], metric::SHARPE);
    let deflated = match (inputs.n_trials, deflation_sharpe) {
        (Some(n), Some(s)) => deflated_confidence(s, n, &cfg.deflation),
        _ => None,
    };

    let w = &cfg.weights;
    let weight_sum = w.sum();
    let total = if weight_sum > 0.0 {
        100.0
            * (w.robustness * robustness
                + w.risk * risk
                + w.return_quality * return_quality
                + w.implementability * implementability)
            / weight_sum
    } else {
        0.0
    };
    let total_score = ((clip01(total / 100.0) * 100.0) * 1e6).round() / 1e6;

    Scorecard {
        score_version: SCORE_VERSION.to_string(),
        weights: w.clone(),
        inputs: ResolvedInputs {
            pos_window_rate,
            basin_pass_rate,
            max_drawdown_intrabar_pct: max_dd,
            max_drawdown_len: max_dd_len,
            profit_factor,
            expectancy,
            sharpe,
            net_return_pct,
            n_trials: inputs.n_trials,
            deflation_sharpe,
        },
        subscores: Subscores {
            robustness,
            risk,
            return_quality,
            implementability,
            temporal_consistency: temporal,
            basin,
        },
        total_score,
        deflated_confidence: deflated,
        missing_inputs: missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robustlab_core::{ParamValue, ParameterSet};

    fn mid_summary() -> PerformanceSummary {
        let params: ParameterSet = [("entry_rsi", ParamValue::Float(10.0))].into_iter().collect();
        PerformanceSummary::new()
            .with_metric(metric::MAX_DRAWDOWN_INTRABAR_PCT, 12.0)
            .with_metric(metric::MAX_DRAWDOWN_LEN, 2000.0)
            .with_metric(metric::PROFIT_FACTOR, 1.0)
            .with_metric(metric::EXPECTANCY, 0.0)
            .with_metric(metric::SHARPE, 0.5)
            .with_metric(metric::NET_RETURN_PCT, 1.0)
            .with_strategy_params(params)
    }

    fn mid_inputs() -> ScoreInputs {
        ScoreInputs {
            pos_window_rate: Some(0.5),
            basin_pass_rate: Some(0.15),
            val: Some(mid_summary()),
            test: Some(mid_summary()),
            n_trials: Some(27),
            ..ScoreInputs::default()
        }
    }

    #[test]
    fn mid_range_inputs_score_strictly_inside() {
        let card = score(&mid_inputs(), &ScoreConfig::default());
        assert!(card.total_score > 0.0 && card.total_score < 100.0);
        assert!(card.missing_inputs.is_empty());
        assert_eq!(card.score_version, "v1");
        assert!(card.deflated_confidence.is_some());
    }

    #[test]
    fn empty_inputs_degrade_and_disclose() {
        let card = score(&ScoreInputs::default(), &ScoreConfig::default());
        assert_eq!(card.subscores.robustness, 0.0);
        assert_eq!(card.subscores.risk, 0.0);
        assert_eq!(card.subscores.implementability, 0.5);
        assert_eq!(card.deflated_confidence, None);
        let tags = serde_json::to_value(&card.missing_inputs).unwrap();
        assert_eq!(
            tags,
            serde_json::json!([
                "basin_pass_rate",
                "expectancy",
                "max_drawdown_intrabar_pct",
                "max_drawdown_len",
                "net_return_pct",
                "profit_factor",
                "sharpe",
                "strategy_params",
                "wfa_pos_window_rate"
            ])
        );
        // Only the neutral parts of return quality and implementability remain.
        assert!(card.total_score > 0.0 && card.total_score < 20.0);
    }

    #[test]
    fn best_case_scores_one_hundred() {
        let params: ParameterSet = [("n", ParamValue::Int(2))].into_iter().collect();
        let best = PerformanceSummary::new()
            .with_metric(metric::MAX_DRAWDOWN_INTRABAR_PCT, 2.0)
            .with_metric(metric::MAX_DRAWDOWN_LEN, 100.0)
            .with_metric(metric::PROFIT_FACTOR, 2.0)
            .with_metric(metric::EXPECTANCY, 0.2)
            .with_metric(metric::SHARPE, 2.0)
            .with_metric(metric::NET_RETURN_PCT, 10.0)
            .with_strategy_params(params);
        let inputs = ScoreInputs {
            pos_window_rate: Some(0.9),
            basin_pass_rate: Some(0.5),
            val: Some(best),
            ..ScoreInputs::default()
        };
        let card = score(&inputs, &ScoreConfig::default());
        assert_eq!(card.total_score, 100.0);
    }

    #[test]
    fn wfa_pass_rate_stands_in_for_positive_rate() {
        let inputs = ScoreInputs {
            wfa_pass_rate: Some(0.35),
            ..ScoreInputs::default()
        };
        let card = score(&inputs, &ScoreConfig::default());
        assert_eq!(card.inputs.pos_window_rate, 0.35);
        assert!(!card.missing_inputs.contains(&MissingInput::PosWindowRate));
        assert!((card.subscores.temporal_consistency - 0.5).abs() < 1e-12);
    }

    #[test]
    fn basin_wfa_median_preferred_over_validation_basin() {
        let inputs = ScoreInputs {
            basin_wfa_pass_rate: Some(0.3),
            basin_pass_rate: Some(0.0),
            ..ScoreInputs::default()
        };
        let card = score(&inputs, &ScoreConfig::default());
        assert_eq!(card.subscores.basin, 1.0);
    }

    #[test]
    fn risk_falls_back_to_test_per_field() {
        let val = PerformanceSummary::new().with_metric(metric::MAX_DRAWDOWN_INTRABAR_PCT, 5.0);
        let test = PerformanceSummary::new().with_metric(metric::MAX_DRAWDOWN_LEN, 500.0);
        let inputs = ScoreInputs {
            val: Some(val),
            test: Some(test),
            ..ScoreInputs::default()
        };
        let card = score(&inputs, &ScoreConfig::default());
        assert!((card.subscores.risk - 1.0).abs() < 1e-12);
        assert_eq!(card.inputs.max_drawdown_len, Some(500.0));
    }

    #[test]
    fn missing_drawdown_length_is_conservative() {
        let val = PerformanceSummary::new().with_metric(metric::MAX_DRAWDOWN_INTRABAR_PCT, 5.0);
        let inputs = ScoreInputs {
            val: Some(val),
            ..ScoreInputs::default()
        };
        let card = score(&inputs, &ScoreConfig::default());
        assert!((card.subscores.risk - 0.7).abs() < 1e-12);
        assert!(card.missing_inputs.contains(&MissingInput::MaxDrawdownLen));
    }

    #[test]
    fn deflation_prefers_test_sharpe() {
        let val = PerformanceSummary::new().with_metric(metric::SHARPE, 3.0);
        let test = PerformanceSummary::new().with_metric(metric::SHARPE, 0.2);
        let inputs = ScoreInputs {
            val: Some(val),
            test: Some(test),
            n_trials: Some(2),
            ..ScoreInputs::default()
        };
        let card = score(&inputs, &ScoreConfig::default());
        assert_eq!(card.inputs.deflation_sharpe, Some(0.2));
        // Return quality still reads the validation Sharpe.
        assert_eq!(card.inputs.sharpe, 3.0);
    }

    #[test]
    fn single_trial_leaves_confidence_undefined() {
        let mut inputs = mid_inputs();
        inputs.n_trials = Some(1);
        let card = score(&inputs, &ScoreConfig::default());
        assert_eq!(card.deflated_confidence, None);
    }

    #[test]
    fn more_trials_lower_confidence() {
        let mut few = mid_inputs();
        few.n_trials = Some(2);
        let mut many = mid_inputs();
        many.n_trials = Some(500);
        let cfg = ScoreConfig::default();
        let a = score(&few, &cfg).deflated_confidence.unwrap();
        let b = score(&many, &cfg).deflated_confidence.unwrap();
        assert!(a > b);
    }

    #[test]
    fn weights_are_normalized() {
        let doubled = ScoreConfig {
            weights: ScoreWeights {
                robustness: 110.0,
                risk: 50.0,
                return_quality: 30.0,
                implementability: 10.0,
            },
            ..ScoreConfig::default()
        };
        let a = score(&mid_inputs(), &ScoreConfig::default()).total_score;
        let b = score(&mid_inputs(), &doubled).total_score;
        assert!((a - b).abs() < 1e-6);

        let zero = ScoreConfig {
            weights: ScoreWeights {
                robustness: 0.0,
                risk: 0.0,
                return_quality: 0.0,
                implementability: 0.0,
            },
            ..ScoreConfig::default()
        };
        assert_eq!(score(&mid_inputs(), &zero).total_score, 0.0);
    }

    #[test]
    fn normalized_expectancy_preferred() {
        let val = PerformanceSummary::new()
            .with_metric(metric::EXPECTANCY, 40.0)
            .with_metric(metric::EXPECTANCY_PCT_OF_START, 0.01);
        let inputs = ScoreInputs {
            val: Some(val),
            ..ScoreInputs::default()
        };
        assert_eq!(score(&inputs, &ScoreConfig::default()).inputs.expectancy, 0.01);
    }
}
