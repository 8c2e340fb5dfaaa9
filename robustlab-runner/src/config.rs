//! Pipeline configuration, loadable from TOML.
//!
//! Every section has defaults, so an empty document is a valid config:
//!
//! ```toml
//! parallel = true
//!
//! [split]
//! test_months = 12
//! train_fraction = 0.8
//!
//! [walk_forward]
//! train_months = 12
//! oos_months = 3
//!
//! [gates]
//! maxdd_intrabar_pct = 10.0
//! min_trades_annualized = 200.0
//!
//! [selection]
//! min_pass_rate = 0.7
//! eligibility = "gate_pass_rate"
//!
//! [basin]
//! mode = "validation"
//! min_profit_factor = 1.0
//!
//! [basin.spec]
//! pct_steps = [0.05, 0.10, 0.20]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use robustlab_core::{metric, BasinSpec, SplitPolicy};

use crate::aggregate::{BasinQualification, WfaGateConfig};
use crate::gates::GateConfig;
use crate::scorecard::ScoreConfig;
use crate::selection::{Eligibility, OosFreezePolicy, TrainScorePolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ─── Sections ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    pub train_months: u32,
    pub oos_months: u32,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_months: 12,
            oos_months: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub min_pass_rate: f64,
    pub eligibility: Eligibility,
    /// OOS metric ranked by the freeze policy.
    pub metric: String,
    /// Per-window retune policy.
    pub retune: TrainScorePolicy,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_pass_rate: 0.70,
            eligibility: Eligibility::GatePassRate,
            metric: metric::NET_RETURN_PCT.to_string(),
            retune: TrainScorePolicy::default(),
        }
    }
}

impl SelectionConfig {
    pub fn freeze_policy(&self) -> OosFreezePolicy {
        OosFreezePolicy {
            min_pass_rate: self.min_pass_rate,
            eligibility: self.eligibility,
        }
    }
}

/// Where basin points around the frozen candidate are evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasinMode {
    /// Once, on the validation segment.
    #[default]
    Validation,
    /// On every walk-forward OOS window.
    WalkForward,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasinConfig {
    pub mode: BasinMode,
    pub min_profit_factor: f64,
    pub spec: BasinSpec,
}

impl Default for BasinConfig {
    fn default() -> Self {
        Self {
            mode: BasinMode::Validation,
            min_profit_factor: BasinQualification::default().min_profit_factor,
            spec: BasinSpec::default(),
        }
    }
}

impl BasinConfig {
    pub fn qualification(&self) -> BasinQualification {
        BasinQualification {
            min_profit_factor: self.min_profit_factor,
        }
    }
}

// ─── Top level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fan candidate evaluation out across the rayon pool.
    pub parallel: bool,
    pub split: SplitPolicy,
    pub walk_forward: WalkForwardConfig,
    pub gates: GateConfig,
    pub wfa: WfaGateConfig,
    pub selection: SelectionConfig,
    pub basin: BasinConfig,
    pub score: ScoreConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            split: SplitPolicy::default(),
            walk_forward: WalkForwardConfig::default(),
            gates: GateConfig::default(),
            wfa: WfaGateConfig::default(),
            selection: SelectionConfig::default(),
            basin: BasinConfig::default(),
            score: ScoreConfig::default(),
        }
    }
}

fn check_rate(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be in [0, 1], got {value}"
        )))
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be finite and >= 0, got {value}"
        )))
    }
}

impl PipelineConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.split.test_months == 0 {
            return Err(ConfigError::Invalid("split.test_months must be > 0".into()));
        }
        if !(self.split.train_fraction > 0.0 && self.split.train_fraction <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "split.train_fraction must be in (0, 1], got {}",
                self.split.train_fraction
            )));
        }
        if self.walk_forward.train_months == 0 || self.walk_forward.oos_months == 0 {
            return Err(ConfigError::Invalid(
                "walk_forward month lengths must be > 0".into(),
            ));
        }

        check_non_negative("gates.maxdd_intrabar_pct", self.gates.maxdd_intrabar_pct)?;
        check_non_negative(
            "gates.min_trades_annualized",
            self.gates.min_trades_annualized,
        )?;
        if let Some(min) = self.gates.min_avg_hold_bars {
            check_non_negative("gates.min_avg_hold_bars", min)?;
        }
        if let Some(hi) = self.gates.max_trades_annualized {
            check_non_negative("gates.max_trades_annualized", hi)?;
            let lo = self.gates.min_trades_annualized;
            if hi < lo {
                return Err(ConfigError::Invalid(format!(
                    "gates.max_trades_annualized ({hi}) below min_trades_annualized ({lo})"
                )));
            }
        }

        check_rate("wfa.min_pass_rate", self.wfa.min_pass_rate)?;
        check_rate("selection.min_pass_rate", self.selection.min_pass_rate)?;
        if self.selection.metric.is_empty() {
            return Err(ConfigError::Invalid("selection.metric must be named".into()));
        }

        check_non_negative("basin.min_profit_factor", self.basin.min_profit_factor)?;
        for p in &self.basin.spec.pct_steps {
            if !(p.is_finite() && *p >= 0.0 && *p < 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "basin.spec.pct_steps must be in [0, 1), got {p}"
                )));
            }
        }
        if self.basin.spec.int_steps.iter().any(|d| *d < 0) {
            return Err(ConfigError::Invalid(
                "basin.spec.int_steps must be >= 0".into(),
            ));
        }

        let w = &self.score.weights;
        for (name, value) in [
            ("score.weights.robustness", w.robustness),
            ("score.weights.risk", w.risk),
            ("score.weights.return_quality", w.return_quality),
            ("score.weights.implementability", w.implementability),
        ] {
            check_non_negative(name, value)?;
        }
        let proxy = self.score.deflation.periods_proxy;
        if !(proxy.is_finite() && proxy > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "score.deflation.periods_proxy must be finite and > 0, got {proxy}"
            )));
        }
        Ok(())
    }
}
