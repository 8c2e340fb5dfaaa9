//! Pipeline orchestration: split, walk forward, gate, aggregate, select and score.
//!
//! Two runs share the same front end (alignment check, train/val/test split,
//! rolling windows over the pre-test history, grid enumeration):
//!
//! - [`RobustnessPipeline::run_freeze`] evaluates every grid candidate on every
//!   OOS window, freezes one candidate on OOS statistics, checks it on
//!   validation and test, evaluates its parameter basin, and scores the result.
//! - [`RobustnessPipeline::run_retune`] re-selects the best train-segment
//!   candidate inside each window and judges only the chosen set out of sample.
//!
//! Evaluations fan out over rayon when `parallel` is set. Results are always
//! collected by job index, so both paths produce identical reports.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use robustlab_core::{
    align, basin, make_windows, ParamSetId, ParamSpace, ParameterSet, PerformanceSummary,
    SeriesError, SpaceError, SplitBounds, SplitError, SplitResult, TimeSeries, Window,
};

use crate::aggregate::{
    aggregate, wfa_gate, BasinAggregate, BasinSegment, WfaGateResult, WindowAggregate,
    WindowOutcome,
};
use crate::config::{BasinMode, ConfigError, PipelineConfig};
use crate::evaluator::{Evaluator, Segment};
use crate::gates::{self, GateResult};
use crate::scorecard::{score, ScoreInputs, Scorecard};
use crate::selection::{Selection, SelectionError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("insufficient history: {reason}")]
    InsufficientHistory { reason: String },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("series error: {0}")]
    Series(#[from] SeriesError),

    #[error("parameter space error: {0}")]
    Space(#[from] SpaceError),

    #[error("selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("evaluation of candidate {candidate} on {segment} failed")]
    Evaluation {
        candidate: String,
        segment: Segment,
        #[source]
        source: anyhow::Error,
    },
}

impl From<SplitError> for PipelineError {
    fn from(err: SplitError) -> Self {
        match err {
            SplitError::InsufficientHistory { reason } => {
                PipelineError::InsufficientHistory { reason }
            }
            SplitError::InvalidPolicy(msg) => PipelineError::Config(ConfigError::Invalid(msg)),
        }
    }
}

// ─── Report types ────────────────────────────────────────────────────

/// One grid candidate's walk-forward record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub index: usize,
    pub id: ParamSetId,
    pub params: ParameterSet,
    pub outcomes: Vec<WindowOutcome>,
    pub aggregate: WindowAggregate,
    pub wfa_gate: WfaGateResult,
}

/// A single-segment evaluation and its gate verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub summary: PerformanceSummary,
    pub gate: GateResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasinReport {
    pub mode: BasinMode,
    pub points: usize,
    pub aggregate: BasinAggregate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreezeReport {
    pub bounds: SplitBounds,
    pub windows: Vec<Window>,
    /// Number of parameter sets tried before freezing.
    pub n_trials: usize,
    pub candidates: Vec<CandidateReport>,
    pub selection: Selection,
    pub validation: SegmentReport,
    pub test: SegmentReport,
    pub basin: BasinReport,
    pub scorecard: Scorecard,
}

impl FreezeReport {
    /// Walk-forward record of the frozen candidate.
    pub fn frozen(&self) -> &CandidateReport {
        &self.candidates[self.selection.index]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetuneWindow {
    pub window: Window,
    pub selection: Selection,
    pub train_summary: PerformanceSummary,
    pub oos: WindowOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetuneReport {
    pub bounds: SplitBounds,
    pub n_candidates: usize,
    pub windows: Vec<RetuneWindow>,
    pub aggregate: WindowAggregate,
    pub wfa_gate: WfaGateResult,
}

// ─── Pipeline ────────────────────────────────────────────────────────

/// Pre-test history carved into rolling windows, with every series sliced.
struct WalkForwardFrame {
    bounds: SplitBounds,
    splits: Vec<SplitResult>,
    windows: Vec<Window>,
    train_slices: Vec<Vec<TimeSeries>>,
    oos_slices: Vec<Vec<TimeSeries>>,
}

impl WalkForwardFrame {
    fn validation(&self) -> Vec<TimeSeries> {
        self.splits.iter().map(|s| s.val.clone()).collect()
    }

    fn test(&self) -> Vec<TimeSeries> {
        self.splits.iter().map(|s| s.test.clone()).collect()
    }
}

/// One unit of evaluation work.
struct Job<'a> {
    params: &'a ParameterSet,
    segment: Segment,
    data: &'a [TimeSeries],
}

pub struct RobustnessPipeline<E> {
    evaluator: E,
    config: PipelineConfig,
}

impl<E: Evaluator> RobustnessPipeline<E> {
    pub fn new(evaluator: E, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { evaluator, config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn evaluate_one(&self, job: &Job<'_>) -> Result<PerformanceSummary, PipelineError> {
        self.evaluator
            .evaluate(job.data, job.params)
            .map_err(|source| PipelineError::Evaluation {
                candidate: job.params.fingerprint().short().to_string(),
                segment: job.segment,
                source,
            })
    }

    /// Evaluate every job; output order equals job order.
    fn run_jobs(&self, jobs: &[Job<'_>]) -> Result<Vec<PerformanceSummary>, PipelineError> {
        let run = |job: &Job<'_>| self.evaluate_one(job);
        if self.config.parallel {
            jobs.par_iter().map(run).collect()
        } else {
            jobs.iter().map(run).collect()
        }
    }

    fn segment_report(&self, summary: PerformanceSummary) -> SegmentReport {
        let gate = gates::evaluate(&summary, &self.config.gates);
        SegmentReport { summary, gate }
    }

    fn frame(&self, data: &[TimeSeries]) -> Result<WalkForwardFrame, PipelineError> {
        align::ensure_aligned(data)?;
        let primary = data.first().ok_or(SeriesError::Empty)?;

        let bounds = SplitBounds::compute(primary, &self.config.split)?;
        let splits: Vec<SplitResult> = data.iter().map(|s| bounds.apply(s)).collect();
        let pre: Vec<TimeSeries> = splits.iter().map(|s| s.pre_test.clone()).collect();
        info!(
            symbol = primary.symbol(),
            test_cut = %bounds.test_cut,
            split_point = %bounds.split_point,
            train_bars = splits[0].train.len(),
            val_bars = splits[0].val.len(),
            test_bars = splits[0].test.len(),
            "split history"
        );

        let wf = &self.config.walk_forward;
        let windows = make_windows(&pre[0], wf.train_months, wf.oos_months);
        if windows.is_empty() {
            return Err(PipelineError::InsufficientHistory {
                reason: format!(
                    "pre-test history too short for one {}+{} month walk-forward window",
                    wf.train_months, wf.oos_months
                ),
            });
        }
        info!(windows = windows.len(), "generated walk-forward windows");

        let train_slices: Vec<Vec<TimeSeries>> = windows
            .iter()
            .map(|w| pre.iter().map(|s| w.train_slice(s)).collect())
            .collect();
        let oos_slices: Vec<Vec<TimeSeries>> = windows
            .iter()
            .map(|w| pre.iter().map(|s| w.oos_slice(s)).collect())
            .collect();

        Ok(WalkForwardFrame {
            bounds,
            splits,
            windows,
            train_slices,
            oos_slices,
        })
    }

    /// Freeze one grid candidate on walk-forward OOS statistics and score it.
    pub fn run_freeze(
        &self,
        data: &[TimeSeries],
        space: &ParamSpace,
    ) -> Result<FreezeReport, PipelineError> {
        let frame = self.frame(data)?;
        let candidates = space.grid()?;
        info!(candidates = candidates.len(), "evaluating grid on OOS windows");

        // Candidate-major job order: job c * n_windows + w.
        let jobs: Vec<Job<'_>> = candidates
            .iter()
            .flat_map(|params| frame.windows.iter().map(move |w| (params, w.index)))
            .map(|(params, w)| Job {
                params,
                segment: Segment::Oos { window: w },
                data: &frame.oos_slices[w],
            })
            .collect();
        let mut summaries = self.run_jobs(&jobs)?.into_iter();

        let metric_name = self.config.selection.metric.as_str();
        let mut reports = Vec::with_capacity(candidates.len());
        for (index, params) in candidates.iter().enumerate() {
            let outcomes: Vec<WindowOutcome> = frame
                .windows
                .iter()
                .zip(summaries.by_ref())
                .map(|(w, summary)| WindowOutcome {
                    window_index: w.index,
                    gate: gates::evaluate(&summary, &self.config.gates),
                    summary,
                })
                .collect();
            let agg = aggregate(&outcomes, metric_name);
            let gate = wfa_gate(&agg, &self.config.wfa);
            let id = params.fingerprint();
            debug!(
                candidate = %id.short(),
                params = %params,
                pass_rate = ?agg.pass_rate,
                median = ?agg.metric_median,
                worst = ?agg.metric_worst,
                wfa_gate_ok = gate.wfa_gate_ok,
                "candidate aggregated"
            );
            reports.push(CandidateReport {
                index,
                id,
                params: params.clone(),
                outcomes,
                aggregate: agg,
                wfa_gate: gate,
            });
        }

        let pairs: Vec<(ParameterSet, WindowAggregate)> = reports
            .iter()
            .map(|r| (r.params.clone(), r.aggregate.clone()))
            .collect();
        let selection = self.config.selection.freeze_policy().select(&pairs)?;
        if selection.used_fallback {
            warn!(
                candidates = reports.len(),
                min_pass_rate = self.config.selection.min_pass_rate,
                "no candidate met the eligibility filter; selected from the full grid"
            );
        }
        let frozen = &selection.params;
        info!(
            candidate = %reports[selection.index].id.short(),
            params = %frozen,
            used_fallback = selection.used_fallback,
            "froze parameters"
        );

        let val_data = frame.validation();
        let test_data = frame.test();
        let validation = self.segment_report(self.evaluate_one(&Job {
            params: frozen,
            segment: Segment::Validation,
            data: &val_data,
        })?);
        let test = self.segment_report(self.evaluate_one(&Job {
            params: frozen,
            segment: Segment::Test,
            data: &test_data,
        })?);
        info!(
            val_gate_ok = validation.gate.gate_ok,
            test_gate_ok = test.gate.gate_ok,
            "evaluated holdout segments"
        );

        let basin_report = self.evaluate_basin(frozen, &frame, &val_data)?;

        let chosen = &reports[selection.index];
        let inputs = ScoreInputs {
            pos_window_rate: chosen.aggregate.positive_window_rate,
            wfa_pass_rate: chosen.wfa_gate.pass_rate,
            basin_wfa_pass_rate: match basin_report.mode {
                BasinMode::WalkForward => basin_report.aggregate.pass_rate(),
                BasinMode::Validation => None,
            },
            basin_pass_rate: match basin_report.mode {
                BasinMode::Validation => basin_report.aggregate.pass_rate(),
                BasinMode::WalkForward => None,
            },
            val: Some(validation.summary.clone()),
            test: Some(test.summary.clone()),
            n_trials: Some(candidates.len()),
        };
        let scorecard = score(&inputs, &self.config.score);
        info!(
            total_score = scorecard.total_score,
            deflated_confidence = ?scorecard.deflated_confidence,
            missing = scorecard.missing_inputs.len(),
            "scored frozen candidate"
        );

        Ok(FreezeReport {
            bounds: frame.bounds,
            windows: frame.windows.clone(),
            n_trials: candidates.len(),
            candidates: reports,
            selection,
            validation,
            test,
            basin: basin_report,
            scorecard,
        })
    }

    fn evaluate_basin(
        &self,
        frozen: &ParameterSet,
        frame: &WalkForwardFrame,
        val_data: &[TimeSeries],
    ) -> Result<BasinReport, PipelineError> {
        let basin_cfg = &self.config.basin;
        let points = basin(frozen, &basin_cfg.spec);
        let n_points = points.len();
        let qualification = basin_cfg.qualification();
        if n_points == 0 {
            warn!(
                params = %frozen,
                "frozen parameters violate a basin sanity rule; basin is empty"
            );
        }

        let segments: Vec<(Segment, &[TimeSeries])> = match basin_cfg.mode {
            BasinMode::Validation => vec![(Segment::Validation, val_data)],
            BasinMode::WalkForward => frame
                .windows
                .iter()
                .map(|w| {
                    (
                        Segment::Oos { window: w.index },
                        frame.oos_slices[w.index].as_slice(),
                    )
                })
                .collect(),
        };
        info!(
            points = n_points,
            segments = segments.len(),
            mode = ?basin_cfg.mode,
            "probing parameter basin"
        );

        // Segment-major job order: job s * n_points + p.
        let jobs: Vec<Job<'_>> = segments
            .iter()
            .flat_map(|(segment, data)| {
                points.iter().map(move |params| Job {
                    params,
                    segment: *segment,
                    data: *data,
                })
            })
            .collect();
        let summaries = self.run_jobs(&jobs)?;

        // An empty basin still reports each segment, with an undefined rate.
        let basin_segments: Vec<BasinSegment> = (0..segments.len())
            .map(|i| {
                let flags: Vec<bool> = summaries[i * n_points..(i + 1) * n_points]
                    .iter()
                    .map(|s| qualification.qualifies(s, &gates::evaluate(s, &self.config.gates)))
                    .collect();
                BasinSegment::from_flags(i, &flags)
            })
            .collect();
        let aggregate = BasinAggregate::from_segments(basin_segments);
        debug!(
            median = ?aggregate.pass_rate_median,
            worst = ?aggregate.pass_rate_worst,
            "basin aggregated"
        );

        Ok(BasinReport {
            mode: basin_cfg.mode,
            points: n_points,
            aggregate,
        })
    }

    /// Re-select the best train candidate inside each window; judge it OOS.
    pub fn run_retune(
        &self,
        data: &[TimeSeries],
        space: &ParamSpace,
    ) -> Result<RetuneReport, PipelineError> {
        let frame = self.frame(data)?;
        let candidates = space.grid()?;
        let n_candidates = candidates.len();
        info!(candidates = n_candidates, "retuning on each train window");

        // Window-major job order: job w * n_candidates + c.
        let train_jobs: Vec<Job<'_>> = frame
            .windows
            .iter()
            .flat_map(|w| {
                let data = frame.train_slices[w.index].as_slice();
                candidates.iter().map(move |params| Job {
                    params,
                    segment: Segment::Train { window: w.index },
                    data,
                })
            })
            .collect();
        let train_summaries = self.run_jobs(&train_jobs)?;

        let policy = &self.config.selection.retune;
        let mut selections = Vec::with_capacity(frame.windows.len());
        for (w, chunk) in frame
            .windows
            .iter()
            .zip(train_summaries.chunks(n_candidates.max(1)))
        {
            let scored: Vec<(ParameterSet, PerformanceSummary)> = candidates
                .iter()
                .cloned()
                .zip(chunk.iter().cloned())
                .collect();
            let selection = policy.select(&scored)?;
            if selection.used_fallback {
                warn!(
                    window = w.index,
                    "no candidate passed the train filters; selected unfiltered"
                );
            }
            debug!(window = w.index, params = %selection.params, "window selection");
            let train_summary = chunk[selection.index].clone();
            selections.push((selection, train_summary));
        }

        let oos_jobs: Vec<Job<'_>> = frame
            .windows
            .iter()
            .zip(&selections)
            .map(|(w, (selection, _))| Job {
                params: &selection.params,
                segment: Segment::Oos { window: w.index },
                data: &frame.oos_slices[w.index],
            })
            .collect();
        let oos_summaries = self.run_jobs(&oos_jobs)?;

        let windows: Vec<RetuneWindow> = frame
            .windows
            .iter()
            .zip(selections)
            .zip(oos_summaries)
            .map(|((w, (selection, train_summary)), summary)| RetuneWindow {
                window: *w,
                selection,
                train_summary,
                oos: WindowOutcome {
                    window_index: w.index,
                    gate: gates::evaluate(&summary, &self.config.gates),
                    summary,
                },
            })
            .collect();

        let outcomes: Vec<WindowOutcome> = windows.iter().map(|w| w.oos.clone()).collect();
        let agg = aggregate(&outcomes, &self.config.selection.metric);
        let gate = wfa_gate(&agg, &self.config.wfa);
        info!(
            pass_rate = ?agg.pass_rate,
            median = ?agg.metric_median,
            wfa_gate_ok = gate.wfa_gate_ok,
            "retune walk-forward complete"
        );

        Ok(RetuneReport {
            bounds: frame.bounds,
            n_candidates,
            windows,
            aggregate: agg,
            wfa_gate: gate,
        })
    }
}
