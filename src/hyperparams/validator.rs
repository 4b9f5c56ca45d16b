//! Hyperparameter validation against per-family allow-lists

use super::spec::{ParamSpec, LINEAR_SVC_PARAMS, LOGISTIC_REGRESSION_PARAMS, RANDOM_FOREST_PARAMS};
use super::value::{ParamValue, TypedHyperparameters};
use crate::error::{Result, RunForgeError};
use std::collections::BTreeMap;

/// Validates and converts hyperparameters for each model family.
///
/// The spec tables are static; a validator just holds references to them,
/// so tests can build one over substitute tables with [`HyperparamValidator::from_tables`].
#[derive(Debug, Clone)]
pub struct HyperparamValidator {
    families: BTreeMap<&'static str, &'static [ParamSpec]>,
}

impl Default for HyperparamValidator {
    fn default() -> Self {
        Self::builtin()
    }
}

impl HyperparamValidator {
    /// Validator over the built-in model families
    pub fn builtin() -> Self {
        Self::from_tables([
            ("logistic_regression", LOGISTIC_REGRESSION_PARAMS),
            ("random_forest", RANDOM_FOREST_PARAMS),
            ("linear_svc", LINEAR_SVC_PARAMS),
        ])
    }

    pub fn from_tables(
        tables: impl IntoIterator<Item = (&'static str, &'static [ParamSpec])>,
    ) -> Self {
        Self {
            families: tables.into_iter().collect(),
        }
    }

    fn specs(&self, model_family: &str) -> Result<&'static [ParamSpec]> {
        self.families
            .get(model_family)
            .copied()
            .ok_or_else(|| RunForgeError::UnknownModelFamily {
                model_family: model_family.to_string(),
            })
    }

    /// Sorted parameter names accepted for `model_family`
    pub fn valid_params(&self, model_family: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .specs(model_family)?
            .iter()
            .map(|spec| spec.name.to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Spec for a single parameter, if the family allows it
    pub fn spec(&self, model_family: &str, name: &str) -> Result<Option<&'static ParamSpec>> {
        Ok(self.specs(model_family)?.iter().find(|spec| spec.name == name))
    }

    fn lookup(&self, model_family: &str, name: &str) -> Result<&'static ParamSpec> {
        match self.spec(model_family, name)? {
            Some(spec) => Ok(spec),
            None => Err(RunForgeError::UnknownParam {
                name: name.to_string(),
                model_family: model_family.to_string(),
                valid: self.valid_params(model_family)?,
            }),
        }
    }

    /// Convert raw CLI strings into typed values.
    ///
    /// Pairs are checked in the order given; the first bad one aborts the
    /// whole call and nothing is returned.
    pub fn validate_and_convert<'a, I>(
        &self,
        model_family: &str,
        raw_params: I,
    ) -> Result<TypedHyperparameters>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut typed = TypedHyperparameters::new();
        for (name, raw) in raw_params {
            let spec = self.lookup(model_family, name)?;

            let value = spec.param_type.parse(raw).ok_or_else(|| RunForgeError::TypeParseError {
                name: name.clone(),
                value: raw.clone(),
                expected: spec.param_type.name().to_string(),
            })?;

            check_range(spec, &value)?;
            typed.insert(name.clone(), value);
        }
        Ok(typed)
    }

    /// Apply the same rules to an already-typed value (profile params).
    ///
    /// Returns the value coerced to the declared type.
    pub fn check_typed(
        &self,
        model_family: &str,
        name: &str,
        value: &ParamValue,
    ) -> Result<ParamValue> {
        let spec = self.lookup(model_family, name)?;
        let coerced = spec
            .param_type
            .coerce(value)
            .ok_or_else(|| RunForgeError::TypeParseError {
                name: name.to_string(),
                value: value.to_string(),
                expected: spec.param_type.name().to_string(),
            })?;
        check_range(spec, &coerced)?;
        Ok(coerced)
    }
}

fn check_range(spec: &ParamSpec, value: &ParamValue) -> Result<()> {
    match spec.check_range(value) {
        Some(constraint) => Err(RunForgeError::RangeError {
            name: spec.name.to_string(),
            value: value.to_string(),
            constraint,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn convert(family: &str, pairs: &[(&str, &str)]) -> Result<TypedHyperparameters> {
        let pairs = raw(pairs);
        HyperparamValidator::builtin().validate_and_convert(family, pairs.iter().map(|(k, v)| (k, v)))
    }

    #[test]
    fn test_converts_logistic_regression_params() {
        let typed = convert(
            "logistic_regression",
            &[("C", "0.5"), ("max_iter", "200"), ("solver", "saga"), ("warm_start", "yes")],
        )
        .unwrap();

        assert_eq!(typed.get("C"), Some(&ParamValue::Float(0.5)));
        assert_eq!(typed.get("max_iter"), Some(&ParamValue::Int(200)));
        assert_eq!(typed.get("solver"), Some(&ParamValue::Str("saga".into())));
        assert_eq!(typed.get("warm_start"), Some(&ParamValue::Bool(true)));
    }

    #[test]
    fn test_every_allowed_param_converts_to_its_type() {
        let cases: &[(&str, &str, &str, ParamValue)] = &[
            ("logistic_regression", "C", "0.25", ParamValue::Float(0.25)),
            ("logistic_regression", "max_iter", "300", ParamValue::Int(300)),
            ("logistic_regression", "solver", "lbfgs", ParamValue::Str("lbfgs".into())),
            ("logistic_regression", "warm_start", "FALSE", ParamValue::Bool(false)),
            ("logistic_regression", "warm_start", "1", ParamValue::Bool(true)),
            ("random_forest", "n_estimators", "50", ParamValue::Int(50)),
            ("random_forest", "max_depth", "4", ParamValue::Int(4)),
            ("random_forest", "max_depth", "none", ParamValue::Null),
            ("random_forest", "min_samples_split", "2", ParamValue::Int(2)),
            ("random_forest", "min_samples_leaf", "1", ParamValue::Int(1)),
            ("linear_svc", "C", "2", ParamValue::Float(2.0)),
            ("linear_svc", "max_iter", "1000", ParamValue::Int(1000)),
        ];

        for (family, name, raw_value, expected) in cases {
            let typed = convert(family, &[(*name, *raw_value)])
                .unwrap_or_else(|e| panic!("{family}.{name}={raw_value}: {e}"));
            assert_eq!(typed.get(name), Some(expected), "{family}.{name}={raw_value}");
        }
    }

    #[test]
    fn test_every_family_rejects_out_of_range() {
        let cases: &[(&str, &str, &str)] = &[
            ("logistic_regression", "C", "0"),
            ("logistic_regression", "max_iter", "0"),
            ("random_forest", "n_estimators", "0"),
            ("random_forest", "max_depth", "0"),
            ("random_forest", "min_samples_split", "1"),
            ("random_forest", "min_samples_leaf", "0"),
            ("linear_svc", "C", "-1"),
            ("linear_svc", "max_iter", "-5"),
        ];

        for (family, name, raw_value) in cases {
            let err = convert(family, &[(*name, *raw_value)]).unwrap_err();
            assert!(matches!(err, RunForgeError::RangeError { .. }), "{family}.{name}={raw_value}");
        }
    }

    #[test]
    fn test_errors_follow_input_order() {
        let err = convert("logistic_regression", &[("max_iter", "abc"), ("C", "-1")]).unwrap_err();
        assert!(matches!(err, RunForgeError::TypeParseError { ref name, .. } if name == "max_iter"));

        let err = convert("logistic_regression", &[("C", "-1"), ("max_iter", "abc")]).unwrap_err();
        assert!(matches!(err, RunForgeError::RangeError { ref name, .. } if name == "C"));
    }

    #[test]
    fn test_random_forest_max_depth_none() {
        let typed = convert("random_forest", &[("max_depth", "None")]).unwrap();
        assert_eq!(typed.get("max_depth"), Some(&ParamValue::Null));
    }

    #[test]
    fn test_min_samples_split_range() {
        let err = convert("random_forest", &[("min_samples_split", "1")]).unwrap_err();
        assert!(matches!(err, RunForgeError::RangeError { .. }));
        assert!(err.to_string().contains("must be >= 2"));
    }

    #[test]
    fn test_c_must_be_positive() {
        for bad in ["0", "-1", "NaN"] {
            let err = convert("linear_svc", &[("C", bad)]).unwrap_err();
            assert!(matches!(err, RunForgeError::RangeError { .. }), "C={}", bad);
        }
    }

    #[test]
    fn test_type_parse_error() {
        let err = convert("logistic_regression", &[("max_iter", "abc")]).unwrap_err();
        match err {
            RunForgeError::TypeParseError { name, value, expected } => {
                assert_eq!(name, "max_iter");
                assert_eq!(value, "abc");
                assert_eq!(expected, "int");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_param_lists_sorted_valid_names() {
        let err = convert("linear_svc", &[("n_estimators", "10")]).unwrap_err();
        match err {
            RunForgeError::UnknownParam { name, model_family, valid } => {
                assert_eq!(name, "n_estimators");
                assert_eq!(model_family, "linear_svc");
                assert_eq!(valid, vec!["C".to_string(), "max_iter".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_first_invalid_param_aborts() {
        let err = convert("logistic_regression", &[("C", "-1"), ("bogus", "1")]).unwrap_err();
        assert!(matches!(err, RunForgeError::RangeError { .. }));
    }

    #[test]
    fn test_unknown_family() {
        let validator = HyperparamValidator::builtin();
        assert!(matches!(
            validator.valid_params("xgboost"),
            Err(RunForgeError::UnknownModelFamily { .. })
        ));
    }

    #[test]
    fn test_check_typed_coerces_and_validates() {
        let validator = HyperparamValidator::builtin();
        let c = validator
            .check_typed("logistic_regression", "C", &ParamValue::Int(2))
            .unwrap();
        assert_eq!(c, ParamValue::Float(2.0));

        let err = validator
            .check_typed("random_forest", "n_estimators", &ParamValue::Int(0))
            .unwrap_err();
        assert!(matches!(err, RunForgeError::RangeError { .. }));

        let err = validator
            .check_typed("random_forest", "n_estimators", &ParamValue::Str("many".into()))
            .unwrap_err();
        assert!(matches!(err, RunForgeError::TypeParseError { .. }));
    }
}
