//! Parameter values and parameter sets.
//!
//! A `ParameterSet` is an immutable name → value map. It uses `BTreeMap` so
//! iteration, serialization and hashing are deterministic, and it carries a
//! total order so candidate lists can be sorted canonically and de-duplicated
//! by full value equality.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::ids::ParamSetId;

/// A single scalar parameter value.
///
/// Floats compare with `f64::total_cmp` after folding `-0.0` into `0.0` and
/// every NaN into one NaN, so `Eq`, `Ord`, `Hash` and the fingerprint agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Numeric view used by sanity rules and metric-like comparisons.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Bool(_) | ParamValue::Text(_) => None,
        }
    }

    /// Append a type-tagged, bit-exact encoding of the value to `buf`.
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.rank());
        match self {
            ParamValue::Bool(v) => buf.push(u8::from(*v)),
            ParamValue::Int(v) => buf.extend_from_slice(&v.to_le_bytes()),
            ParamValue::Float(v) => {
                buf.extend_from_slice(&float_key(*v).to_bits().to_le_bytes())
            }
            ParamValue::Text(v) => encode_str(v, buf),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ParamValue::Bool(_) => 0,
            ParamValue::Int(_) => 1,
            ParamValue::Float(_) => 2,
            ParamValue::Text(_) => 3,
        }
    }
}

/// Canonical float: `-0.0` becomes `0.0`, any NaN becomes `f64::NAN`.
fn float_key(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

fn encode_str(s: &str, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ParamValue {}

impl PartialOrd for ParamValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParamValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ParamValue::Bool(a), ParamValue::Bool(b)) => a.cmp(b),
            (ParamValue::Int(a), ParamValue::Int(b)) => a.cmp(b),
            (ParamValue::Float(a), ParamValue::Float(b)) => {
                float_key(*a).total_cmp(&float_key(*b))
            }
            (ParamValue::Text(a), ParamValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for ParamValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            ParamValue::Bool(v) => v.hash(state),
            ParamValue::Int(v) => v.hash(state),
            ParamValue::Float(v) => float_key(*v).to_bits().hash(state),
            ParamValue::Text(v) => v.hash(state),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Immutable mapping from parameter name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    pub fn new(values: BTreeMap<String, ParamValue>) -> Self {
        Self(values)
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Return a copy with one value replaced or added.
    pub fn with(&self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        let mut values = self.0.clone();
        values.insert(name.into(), value.into());
        Self(values)
    }

    /// Exact identity: BLAKE3 over a length-prefixed binary encoding of the
    /// sorted map. Two sets share an id iff they compare equal.
    pub fn fingerprint(&self) -> ParamSetId {
        let mut buf = Vec::new();
        for (name, value) in &self.0 {
            encode_str(name, &mut buf);
            value.encode(&mut buf);
        }
        ParamSetId::from_bytes(&buf)
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, "}}")
    }
}
