//! Explicit parameter spaces and their full cartesian grid.
//!
//! Each dimension declares its value type up front (int, float, bool or a
//! string choice), so no candidate ever depends on guessing a type from the
//! first listed value.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::SpaceError;
use crate::domain::{ParamValue, ParameterSet};

/// Candidate values for one dimension, tagged with their declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValues {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Bool(Vec<bool>),
    Choice(Vec<String>),
}

impl ParamValues {
    /// Declared values as `ParamValue`s, first occurrence of each kept.
    pub fn to_values(&self) -> Vec<ParamValue> {
        let raw: Vec<ParamValue> = match self {
            ParamValues::Int(v) => v.iter().map(|x| ParamValue::Int(*x)).collect(),
            ParamValues::Float(v) => v.iter().map(|x| ParamValue::Float(*x)).collect(),
            ParamValues::Bool(v) => v.iter().map(|x| ParamValue::Bool(*x)).collect(),
            ParamValues::Choice(v) => v.iter().map(|x| ParamValue::Text(x.clone())).collect(),
        };
        let mut seen = HashSet::new();
        raw.into_iter().filter(|v| seen.insert(v.clone())).collect()
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ParamValues::Int(v) => v.is_empty(),
            ParamValues::Float(v) => v.is_empty(),
            ParamValues::Bool(v) => v.is_empty(),
            ParamValues::Choice(v) => v.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDim {
    pub name: String,
    pub values: ParamValues,
}

impl ParamDim {
    pub fn new(name: impl Into<String>, values: ParamValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Ordered list of dimensions. Order matters: the first dimension varies
/// slowest when the grid is enumerated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSpace {
    pub dims: Vec<ParamDim>,
}

impl ParamSpace {
    pub fn new(dims: Vec<ParamDim>) -> Result<Self, SpaceError> {
        let space = Self { dims };
        space.validate()?;
        Ok(space)
    }

    /// Builder-style dimension append.
    pub fn dim(mut self, name: impl Into<String>, values: ParamValues) -> Self {
        self.dims.push(ParamDim::new(name, values));
        self
    }

    pub fn validate(&self) -> Result<(), SpaceError> {
        let mut names = HashSet::new();
        for dim in &self.dims {
            if !names.insert(dim.name.as_str()) {
                return Err(SpaceError::DuplicateDimension(dim.name.clone()));
            }
            if dim.values.is_empty() {
                return Err(SpaceError::EmptyDimension(dim.name.clone()));
            }
        }
        Ok(())
    }

    /// Number of grid points.
    pub fn size(&self) -> usize {
        self.dims
            .iter()
            .map(|d| d.values.to_values().len())
            .product()
    }

    /// Full cartesian product in nested-loop order.
    pub fn grid(&self) -> Result<Vec<ParameterSet>, SpaceError> {
        self.validate()?;
        let axes: Vec<(&str, Vec<ParamValue>)> = self
            .dims
            .iter()
            .map(|d| (d.name.as_str(), d.values.to_values()))
            .collect();
        Ok(cartesian(&axes))
    }
}

/// Cartesian product over named axes; the first axis varies slowest.
pub(crate) fn cartesian(axes: &[(&str, Vec<ParamValue>)]) -> Vec<ParameterSet> {
    let mut points: Vec<BTreeMap<String, ParamValue>> = vec![BTreeMap::new()];
    for (name, values) in axes {
        points = points
            .iter()
            .flat_map(|partial| {
                values.iter().map(move |v| {
                    let mut next = partial.clone();
                    next.insert((*name).to_string(), v.clone());
                    next
                })
            })
            .collect();
    }
    points.into_iter().map(ParameterSet::new).collect()
}
