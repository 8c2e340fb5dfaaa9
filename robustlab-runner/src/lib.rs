//! RobustLab Runner: gating, walk-forward aggregation, selection, scoring,
//! and pipeline orchestration.
//!
//! Key modules:
//! - `evaluator`: the pluggable (data, params) → summary seam
//! - `gates`: hard pass/fail thresholds on one summary
//! - `aggregate`: per-window pass rates, OOS median/worst/mean, WFA gate, basin rates
//! - `selection`: OOS freeze policy and per-window train-score retune policy
//! - `stats`: descriptive statistics, normal CDF, deflated confidence
//! - `scorecard`: weighted 0..100 score with an audit trail of missing inputs
//! - `config`: TOML pipeline configuration
//! - `pipeline`: freeze and retune runs

pub mod aggregate;
pub mod config;
pub mod evaluator;
pub mod gates;
pub mod pipeline;
pub mod scorecard;
pub mod selection;
pub mod stats;

pub use aggregate::{
    aggregate, wfa_gate, BasinAggregate, BasinQualification, BasinSegment, WfaGateConfig,
    WfaGateReason, WfaGateResult, WindowAggregate, WindowOutcome,
};
pub use config::{
    BasinConfig, BasinMode, ConfigError, PipelineConfig, SelectionConfig, WalkForwardConfig,
};
pub use evaluator::{Evaluator, Segment};
pub use gates::{GateConfig, GateReason, GateResult};
pub use pipeline::{
    BasinReport, CandidateReport, FreezeReport, PipelineError, RetuneReport, RetuneWindow,
    RobustnessPipeline, SegmentReport,
};
pub use scorecard::{
    score, MissingInput, ResolvedInputs, ScoreConfig, ScoreInputs, ScoreWeights, Scorecard,
    Subscores,
};
pub use selection::{Eligibility, OosFreezePolicy, Selection, SelectionError, TrainScorePolicy};
pub use stats::{deflated_confidence, DeflationConfig};
