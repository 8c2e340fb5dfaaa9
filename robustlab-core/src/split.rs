//! Train / validation / test splitting.
//!
//! Test is always the most recent calendar window (`test_months`, default 12)
//! so it stays isolated from any parameter selection. The history before the
//! test cut is divided by *time*, not by row count: the first `train_fraction`
//! of the elapsed span is train, the rest is validation.

use chrono::{Duration, Months};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{TimeSeries, Timestamp};

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("insufficient history: {reason}")]
    InsufficientHistory { reason: String },

    #[error("invalid split policy: {0}")]
    InvalidPolicy(String),
}

/// How to carve a series into train / val / test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitPolicy {
    /// Length of the trailing test window in calendar months.
    pub test_months: u32,
    /// Fraction of the pre-test time span assigned to train.
    pub train_fraction: f64,
}

impl Default for SplitPolicy {
    fn default() -> Self {
        Self {
            test_months: 12,
            train_fraction: 0.8,
        }
    }
}

/// Cut points derived from one series; reusable on any series aligned to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitBounds {
    /// First timestamp of the test segment: `last - test_months`.
    pub test_cut: Timestamp,
    /// Last timestamp (inclusive) that still belongs to train.
    pub split_point: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitResult {
    pub train: TimeSeries,
    pub val: TimeSeries,
    pub test: TimeSeries,
    /// Everything before the test cut (train followed by val), sliced from
    /// the source series.
    pub pre_test: TimeSeries,
    pub test_cut: Timestamp,
}

impl SplitBounds {
    pub fn compute(series: &TimeSeries, policy: &SplitPolicy) -> Result<Self, SplitError> {
        if !(policy.train_fraction > 0.0 && policy.train_fraction <= 1.0) {
            return Err(SplitError::InvalidPolicy(format!(
                "train_fraction must be in (0, 1], got {}",
                policy.train_fraction
            )));
        }

        let end = series.last_ts().ok_or_else(|| SplitError::InsufficientHistory {
            reason: "series is empty".into(),
        })?;
        let test_cut = end
            .checked_sub_months(Months::new(policy.test_months))
            .ok_or_else(|| SplitError::InsufficientHistory {
                reason: format!("cannot step back {} months from {end}", policy.test_months),
            })?;

        let pre = series.before(test_cut);
        let (first, last) = match (pre.first_ts(), pre.last_ts()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(SplitError::InsufficientHistory {
                    reason: format!(
                        "no history before test window starting {test_cut} \
                         (series must span more than {} months)",
                        policy.test_months
                    ),
                })
            }
        };

        let span_ms = (last - first).num_milliseconds() as f64;
        let split_point = first + Duration::milliseconds((span_ms * policy.train_fraction) as i64);

        Ok(Self {
            test_cut,
            split_point,
        })
    }

    pub fn apply(&self, series: &TimeSeries) -> SplitResult {
        let pre = series.before(self.test_cut);
        SplitResult {
            train: pre.up_to(self.split_point),
            val: pre.after(self.split_point),
            test: series.starting_at(self.test_cut),
            pre_test: pre,
            test_cut: self.test_cut,
        }
    }
}

/// Split with the default policy: last 12 months test, 80/20 train/val by time.
pub fn split(series: &TimeSeries) -> Result<SplitResult, SplitError> {
    split_with(series, &SplitPolicy::default())
}

pub fn split_with(series: &TimeSeries, policy: &SplitPolicy) -> Result<SplitResult, SplitError> {
    Ok(SplitBounds::compute(series, policy)?.apply(series))
}
