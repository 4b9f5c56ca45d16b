//! Typed hyperparameter values

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single typed hyperparameter value.
///
/// Serializes as a bare JSON scalar so profile params and recorded
/// hyperparameters read naturally in `run.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Explicit "unset" (e.g. `max_depth=none`)
    Null,
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            // Debug keeps the decimal point ("-1.0", not "-1")
            ParamValue::Float(v) => write!(f, "{:?}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
            ParamValue::Null => write!(f, "None"),
        }
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

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

/// Validated, typed hyperparameters ready for estimator construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypedHyperparameters(BTreeMap<String, ParamValue>);

impl TypedHyperparameters {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    pub fn extend(&mut self, other: TypedHyperparameters) {
        self.0.extend(other.0);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Float parameter, or `default` when absent
    pub fn f64_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).and_then(ParamValue::as_f64).unwrap_or(default)
    }

    /// Non-negative integer parameter, or `default` when absent
    pub fn usize_or(&self, name: &str, default: usize) -> usize {
        self.get(name)
            .and_then(ParamValue::as_i64)
            .map(|v| v.max(0) as usize)
            .unwrap_or(default)
    }

    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(ParamValue::as_bool).unwrap_or(default)
    }

    pub fn str_or(&self, name: &str, default: &str) -> String {
        self.get(name)
            .and_then(ParamValue::as_str)
            .unwrap_or(default)
            .to_string()
    }

    /// Optional integer: absent and explicit `Null` both mean `None`
    pub fn optional_usize(&self, name: &str) -> Option<usize> {
        self.get(name)
            .and_then(ParamValue::as_i64)
            .map(|v| v.max(0) as usize)
    }

    pub fn as_map(&self) -> &BTreeMap<String, ParamValue> {
        &self.0
    }
}

impl FromIterator<(String, ParamValue)> for TypedHyperparameters {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
