//! The external evaluator seam.
//!
//! Whatever turns (data slice, parameter set) into a performance summary
//! (a backtest engine, a cached result store, a synthetic model in tests)
//! plugs in here. Implementations must be pure from the pipeline's point of
//! view: no state carried between calls, safe to call from several threads.

use serde::{Deserialize, Serialize};
use std::fmt;

use robustlab_core::{ParameterSet, PerformanceSummary, TimeSeries};

pub trait Evaluator: Send + Sync {
    /// Evaluate `params` on `data`, one aligned series per instrument.
    fn evaluate(
        &self,
        data: &[TimeSeries],
        params: &ParameterSet,
    ) -> anyhow::Result<PerformanceSummary>;
}

impl<F> Evaluator for F
where
    F: Fn(&[TimeSeries], &ParameterSet) -> anyhow::Result<PerformanceSummary> + Send + Sync,
{
    fn evaluate(
        &self,
        data: &[TimeSeries],
        params: &ParameterSet,
    ) -> anyhow::Result<PerformanceSummary> {
        self(data, params)
    }
}

/// Which slice of history an evaluation ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "segment", rename_all = "snake_case")]
pub enum Segment {
    Train { window: usize },
    Oos { window: usize },
    Validation,
    Test,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Train { window } => write!(f, "train[{window}]"),
            Segment::Oos { window } => write!(f, "oos[{window}]"),
            Segment::Validation => f.write_str("validation"),
            Segment::Test => f.write_str("test"),
        }
    }
}
