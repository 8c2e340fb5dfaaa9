//! Parameter basins: the neighbourhood of perturbations around one point.
//!
//! Per parameter of the base point:
//! - explicit discrete override → that set plus the base value
//! - integer → `base ± d` for each `d` in `int_steps`, floored at 1
//! - float → `base * (1 ± p)` for each `p` in `pct_steps`
//! - bool / text → base value only
//!
//! The cartesian product of the per-parameter sets is filtered through the
//! configured sanity rules, de-duplicated by full value equality, and returned
//! in canonical (sorted) order. The base point itself is always present unless
//! it violates a sanity rule.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::grid::cartesian;
use crate::domain::{ParamValue, ParameterSet};

/// Domain sanity predicate applied to every basin candidate.
///
/// A candidate that lacks the named parameter, or holds a non-numeric value
/// under that name, passes the rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SanityRule {
    /// Value must lie strictly inside `(low, high)`. Entry-threshold style.
    ExclusiveRange { param: String, low: f64, high: f64 },
    /// Value must be strictly positive. Stop/take distance style.
    Positive { param: String },
}

impl SanityRule {
    /// Oscillator-style threshold that must stay inside (0, 100).
    pub fn entry_threshold(param: impl Into<String>) -> Self {
        SanityRule::ExclusiveRange {
            param: param.into(),
            low: 0.0,
            high: 100.0,
        }
    }

    pub fn positive(param: impl Into<String>) -> Self {
        SanityRule::Positive {
            param: param.into(),
        }
    }

    pub fn allows(&self, params: &ParameterSet) -> bool {
        match self {
            SanityRule::ExclusiveRange { param, low, high } => {
                match params.get(param).and_then(ParamValue::as_f64) {
                    Some(v) => v > *low && v < *high,
                    None => true,
                }
            }
            SanityRule::Positive { param } => {
                match params.get(param).and_then(ParamValue::as_f64) {
                    Some(v) => v > 0.0,
                    None => true,
                }
            }
        }
    }
}

/// Perturbation policy for basin construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasinSpec {
    /// Multiplicative steps for float parameters.
    pub pct_steps: Vec<f64>,
    /// Additive steps for integer parameters.
    pub int_steps: Vec<i64>,
    /// Explicit candidate values per parameter (the base value is always added).
    pub discrete_overrides: BTreeMap<String, Vec<ParamValue>>,
    pub sanity_rules: Vec<SanityRule>,
}

impl Default for BasinSpec {
    fn default() -> Self {
        Self {
            pct_steps: vec![0.05, 0.10, 0.20],
            int_steps: vec![1, 2, 4],
            discrete_overrides: BTreeMap::new(),
            sanity_rules: Vec::new(),
        }
    }
}

impl BasinSpec {
    pub fn with_rule(mut self, rule: SanityRule) -> Self {
        self.sanity_rules.push(rule);
        self
    }

    pub fn with_override(mut self, param: impl Into<String>, values: Vec<ParamValue>) -> Self {
        self.discrete_overrides.insert(param.into(), values);
        self
    }

    /// Candidate values for a single parameter, sorted and unique.
    pub fn values_for(&self, name: &str, base: &ParamValue) -> BTreeSet<ParamValue> {
        let mut vals = BTreeSet::new();
        vals.insert(base.clone());

        if let Some(explicit) = self.discrete_overrides.get(name) {
            vals.extend(explicit.iter().cloned());
            return vals;
        }

        match base {
            ParamValue::Int(v) => {
                for d in &self.int_steps {
                    vals.insert(ParamValue::Int(v.saturating_sub(*d).max(1)));
                    vals.insert(ParamValue::Int(v.saturating_add(*d).max(1)));
                }
            }
            ParamValue::Float(v) => {
                for p in &self.pct_steps {
                    vals.insert(ParamValue::Float(v * (1.0 - p)));
                    vals.insert(ParamValue::Float(v * (1.0 + p)));
                }
            }
            ParamValue::Bool(_) | ParamValue::Text(_) => {}
        }
        vals
    }

    pub fn admits(&self, params: &ParameterSet) -> bool {
        self.sanity_rules.iter().all(|r| r.allows(params))
    }
}

/// Expand `base` into its perturbation basin.
pub fn basin(base: &ParameterSet, spec: &BasinSpec) -> Vec<ParameterSet> {
    let axes: Vec<(&str, Vec<ParamValue>)> = base
        .iter()
        .map(|(name, value)| (name, spec.values_for(name, value).into_iter().collect()))
        .collect();

    cartesian(&axes)
        .into_iter()
        .filter(|p| spec.admits(p))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
