//! Candidate selection: deterministic choice of one parameter set.
//!
//! Two named policies with different objectives:
//! - [`OosFreezePolicy`]: freeze on walk-forward OOS statistics
//!   (median, then worst, then mean, all descending).
//! - [`TrainScorePolicy`]: per-window retune on a train-segment summary
//!   (`net_pnl + 0.01 * profit_factor` under soft risk filters).
//!
//! Both reduce over candidates in enumeration order and replace the incumbent
//! only on strict improvement, so ties keep the earliest candidate. When no
//! candidate is eligible both fall back to the full set and say so via
//! `used_fallback`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

use robustlab_core::{metric, ParameterSet, PerformanceSummary};

use crate::aggregate::WindowAggregate;

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("no candidates to select from")]
    NoCandidates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Position of the chosen candidate in the input list.
    pub index: usize,
    pub params: ParameterSet,
    /// No candidate met the eligibility filter; chosen from the full set.
    pub used_fallback: bool,
    pub eligible_count: usize,
}

/// Keep the incumbent unless `challenger` is strictly better.
fn better_of<T>(incumbent: T, challenger: T, cmp: impl Fn(&T, &T) -> Ordering) -> T {
    if cmp(&challenger, &incumbent) == Ordering::Greater {
        challenger
    } else {
        incumbent
    }
}

/// `None` ranks below every value.
fn cmp_opt(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

// ─── OOS freeze policy ───────────────────────────────────────────────

/// Which per-candidate rate the eligibility filter reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    #[default]
    GatePassRate,
    PositiveWindowRate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OosFreezePolicy {
    pub min_pass_rate: f64,
    pub eligibility: Eligibility,
}

impl Default for OosFreezePolicy {
    fn default() -> Self {
        Self {
            min_pass_rate: 0.70,
            eligibility: Eligibility::GatePassRate,
        }
    }
}

impl OosFreezePolicy {
    fn rate(&self, agg: &WindowAggregate) -> Option<f64> {
        match self.eligibility {
            Eligibility::GatePassRate => agg.pass_rate,
            Eligibility::PositiveWindowRate => agg.positive_window_rate,
        }
    }

    pub fn is_eligible(&self, agg: &WindowAggregate) -> bool {
        self.rate(agg).is_some_and(|r| r >= self.min_pass_rate)
    }

    /// Order two aggregates by OOS median, then worst, then mean.
    pub fn rank(a: &WindowAggregate, b: &WindowAggregate) -> Ordering {
        cmp_opt(a.metric_median, b.metric_median)
            .then_with(|| cmp_opt(a.metric_worst, b.metric_worst))
            .then_with(|| cmp_opt(a.metric_mean, b.metric_mean))
    }

    pub fn select(
        &self,
        candidates: &[(ParameterSet, WindowAggregate)],
    ) -> Result<Selection, SelectionError> {
        let eligible: Vec<usize> = (0..candidates.len())
            .filter(|&i| self.is_eligible(&candidates[i].1))
            .collect();
        let used_fallback = eligible.is_empty();
        let pool: Vec<usize> = if used_fallback {
            (0..candidates.len()).collect()
        } else {
            eligible.clone()
        };

        let index = pool
            .into_iter()
            .reduce(|best, i| {
                better_of(best, i, |a, b| Self::rank(&candidates[*a].1, &candidates[*b].1))
            })
            .ok_or(SelectionError::NoCandidates)?;

        Ok(Selection {
            index,
            params: candidates[index].0.clone(),
            used_fallback,
            eligible_count: eligible.len(),
        })
    }
}

// ─── Train-score policy ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainScorePolicy {
    /// Soft ceiling on train drawdown. Missing drawdown fails the filter.
    pub max_dd_intrabar_pct: f64,
    /// Soft floor on raw train trade count. Missing counts as zero.
    pub min_trades: f64,
    /// Weight of profit factor in the train score.
    pub profit_factor_weight: f64,
}

impl Default for TrainScorePolicy {
    fn default() -> Self {
        Self {
            max_dd_intrabar_pct: 10.0,
            min_trades: 200.0,
            profit_factor_weight: 0.01,
        }
    }
}

impl TrainScorePolicy {
    /// `net_pnl + w * profit_factor`, missing values as 0.
    pub fn score(&self, summary: &PerformanceSummary) -> f64 {
        let net = summary.get(metric::NET_PNL).unwrap_or(0.0);
        let pf = summary.get(metric::PROFIT_FACTOR).unwrap_or(0.0);
        net + self.profit_factor_weight * pf
    }

    pub fn passes_filters(&self, summary: &PerformanceSummary) -> bool {
        let dd_ok = summary
            .get(metric::MAX_DRAWDOWN_INTRABAR_PCT)
            .is_some_and(|dd| dd <= self.max_dd_intrabar_pct);
        let trades = summary.get(metric::TOTAL_TRADES).unwrap_or(0.0);
        dd_ok && trades >= self.min_trades
    }

    pub fn select(
        &self,
        candidates: &[(ParameterSet, PerformanceSummary)],
    ) -> Result<Selection, SelectionError> {
        let scores: Vec<f64> = candidates.iter().map(|(_, s)| self.score(s)).collect();
        let eligible: Vec<usize> = (0..candidates.len())
            .filter(|&i| self.passes_filters(&candidates[i].1))
            .collect();
        let used_fallback = eligible.is_empty();
        let pool: Vec<usize> = if used_fallback {
            (0..candidates.len()).collect()
        } else {
            eligible.clone()
        };

        let index = pool
            .into_iter()
            .reduce(|best, i| better_of(best, i, |a, b| scores[*a].total_cmp(&scores[*b])))
            .ok_or(SelectionError::NoCandidates)?;

        Ok(Selection {
            index,
            params: candidates[index].0.clone(),
            used_fallback,
            eligible_count: eligible.len(),
        })
    }
}
