//! Per-family hyperparameter specifications
//!
//! Each model family has a closed allow-list of parameters. A spec pairs
//! a declared type with an optional range check that returns an error
//! description, or `None` when the value is acceptable.

use super::value::ParamValue;

/// Declared semantic type of a hyperparameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Int,
    Float,
    Bool,
    Str,
    OptionalInt,
}

impl ParamType {
    /// Name used in `TypeParseError` messages
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Bool => "bool",
            ParamType::Str => "str",
            ParamType::OptionalInt => "int or None",
        }
    }

    /// Parse a raw CLI string into this type.
    pub fn parse(&self, raw: &str) -> Option<ParamValue> {
        match self {
            ParamType::Int => parse_int(raw),
            ParamType::Float => raw.parse::<f64>().ok().map(ParamValue::Float),
            ParamType::Bool => parse_bool(raw),
            ParamType::Str => Some(ParamValue::Str(raw.to_string())),
            ParamType::OptionalInt => {
                if raw.eq_ignore_ascii_case("none") {
                    Some(ParamValue::Null)
                } else {
                    parse_int(raw)
                }
            }
        }
    }

    /// Coerce an already-typed value into this type, if compatible.
    ///
    /// Integers widen to floats; nothing else converts.
    pub fn coerce(&self, value: &ParamValue) -> Option<ParamValue> {
        match (self, value) {
            (ParamType::Int, ParamValue::Int(_)) => Some(value.clone()),
            (ParamType::Float, ParamValue::Float(_)) => Some(value.clone()),
            (ParamType::Float, ParamValue::Int(v)) => Some(ParamValue::Float(*v as f64)),
            (ParamType::Bool, ParamValue::Bool(_)) => Some(value.clone()),
            (ParamType::Str, ParamValue::Str(_)) => Some(value.clone()),
            (ParamType::OptionalInt, ParamValue::Int(_) | ParamValue::Null) => Some(value.clone()),
            _ => None,
        }
    }
}

fn parse_int(raw: &str) -> Option<ParamValue> {
    raw.parse::<i64>().ok().map(ParamValue::Int)
}

fn parse_bool(raw: &str) -> Option<ParamValue> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(ParamValue::Bool(true)),
        "false" | "0" | "no" => Some(ParamValue::Bool(false)),
        _ => None,
    }
}

/// Range/shape check: `Some(message)` on violation
pub type RangeCheck = fn(&ParamValue) -> Option<String>;

/// Specification for a single hyperparameter
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub param_type: ParamType,
    pub check: Option<RangeCheck>,
    pub description: &'static str,
}

impl ParamSpec {
    const fn new(
        name: &'static str,
        param_type: ParamType,
        check: Option<RangeCheck>,
        description: &'static str,
    ) -> Self {
        Self { name, param_type, check, description }
    }

    /// Run the range check, if any
    pub fn check_range(&self, value: &ParamValue) -> Option<String> {
        self.check.and_then(|check| check(value))
    }
}

fn positive_int(value: &ParamValue) -> Option<String> {
    match value.as_i64() {
        Some(v) if v <= 0 => Some("must be > 0".to_string()),
        _ => None,
    }
}

fn positive_float(value: &ParamValue) -> Option<String> {
    match value.as_f64() {
        // NaN fails the comparison and is rejected too
        Some(v) if !(v > 0.0) => Some("must be > 0".to_string()),
        _ => None,
    }
}

fn positive_int_or_none(value: &ParamValue) -> Option<String> {
    match value.as_i64() {
        Some(v) if v < 1 => Some("must be >= 1 or None".to_string()),
        _ => None,
    }
}

fn at_least_two(value: &ParamValue) -> Option<String> {
    match value.as_i64() {
        Some(v) if v < 2 => Some("must be >= 2".to_string()),
        _ => None,
    }
}

pub const LOGISTIC_REGRESSION_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("C", ParamType::Float, Some(positive_float), "Inverse regularization strength"),
    ParamSpec::new("max_iter", ParamType::Int, Some(positive_int), "Maximum iterations"),
    ParamSpec::new("solver", ParamType::Str, None, "Optimization solver"),
    ParamSpec::new("warm_start", ParamType::Bool, None, "Reuse previous solution"),
];

pub const RANDOM_FOREST_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("n_estimators", ParamType::Int, Some(positive_int), "Number of trees"),
    ParamSpec::new("max_depth", ParamType::OptionalInt, Some(positive_int_or_none), "Maximum tree depth"),
    ParamSpec::new("min_samples_split", ParamType::Int, Some(at_least_two), "Minimum samples to split a node"),
    ParamSpec::new("min_samples_leaf", ParamType::Int, Some(positive_int), "Minimum samples per leaf"),
];

pub const LINEAR_SVC_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("C", ParamType::Float, Some(positive_float), "Inverse regularization strength"),
    ParamSpec::new("max_iter", ParamType::Int, Some(positive_int), "Maximum iterations"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_variants() {
        for raw in ["true", "TRUE", "1", "Yes"] {
            assert_eq!(ParamType::Bool.parse(raw), Some(ParamValue::Bool(true)));
        }
        for raw in ["false", "False", "0", "NO"] {
            assert_eq!(ParamType::Bool.parse(raw), Some(ParamValue::Bool(false)));
        }
        assert_eq!(ParamType::Bool.parse("maybe"), None);
    }

    #[test]
    fn test_parse_optional_int() {
        assert_eq!(ParamType::OptionalInt.parse("None"), Some(ParamValue::Null));
        assert_eq!(ParamType::OptionalInt.parse("none"), Some(ParamValue::Null));
        assert_eq!(ParamType::OptionalInt.parse("10"), Some(ParamValue::Int(10)));
        assert_eq!(ParamType::OptionalInt.parse("ten"), None);
    }

    #[test]
    fn test_parse_int_rejects_float_text() {
        assert_eq!(ParamType::Int.parse("1.5"), None);
        assert_eq!(ParamType::Int.parse("abc"), None);
    }

    #[test]
    fn test_coerce_widens_int_to_float() {
        assert_eq!(
            ParamType::Float.coerce(&ParamValue::Int(3)),
            Some(ParamValue::Float(3.0))
        );
        assert_eq!(ParamType::Int.coerce(&ParamValue::Float(3.0)), None);
        assert_eq!(ParamType::Str.coerce(&ParamValue::Int(3)), None);
    }

    #[test]
    fn test_range_checks() {
        assert_eq!(positive_float(&ParamValue::Float(0.0)), Some("must be > 0".into()));
        assert_eq!(positive_float(&ParamValue::Float(f64::NAN)), Some("must be > 0".into()));
        assert_eq!(positive_float(&ParamValue::Float(0.1)), None);
        assert_eq!(positive_int(&ParamValue::Int(0)), Some("must be > 0".into()));
        assert_eq!(at_least_two(&ParamValue::Int(1)), Some("must be >= 2".into()));
        assert_eq!(positive_int_or_none(&ParamValue::Null), None);
        assert_eq!(
            positive_int_or_none(&ParamValue::Int(0)),
            Some("must be >= 1 or None".into())
        );
    }
}
