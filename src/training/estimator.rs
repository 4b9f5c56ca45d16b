//! Estimator boundary
//!
//! Model families are a closed set. Each trained classifier reports what
//! it can do through [`Capabilities`] instead of being probed at runtime,
//! and the artifact writers branch on those flags.

use super::linear_models::LogisticRegression;
use super::random_forest::RandomForest;
use super::svm::LinearSvc;
use crate::error::{Result, RunForgeError};
use crate::hyperparams::TypedHyperparameters;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Supported classifier families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    LogisticRegression,
    RandomForest,
    LinearSvc,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::LogisticRegression,
        ModelFamily::RandomForest,
        ModelFamily::LinearSvc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::LogisticRegression => "logistic_regression",
            ModelFamily::RandomForest => "random_forest",
            ModelFamily::LinearSvc => "linear_svc",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelFamily::LogisticRegression => "Logistic Regression",
            ModelFamily::RandomForest => "Random Forest",
            ModelFamily::LinearSvc => "Linear SVC",
        }
    }

    pub fn supported() -> Vec<String> {
        Self::ALL.iter().map(|f| f.as_str().to_string()).collect()
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = RunForgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|family| family.as_str() == s)
            .ok_or_else(|| RunForgeError::UnsupportedModel {
                model_family: s.to_string(),
                supported: Self::supported(),
            })
    }
}

/// What a trained classifier exposes beyond `fit`/`predict`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub predict_proba: bool,
    pub decision_function: bool,
    pub coefficients: bool,
    pub feature_importances: bool,
}

/// Learned weights of a linear model, in standardized feature space.
///
/// Binary models carry a single row for the positive class.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearCoefficients {
    /// Shape `(rows, n_features)`
    pub coef: Array2<f64>,
    pub intercept: Array1<f64>,
}

/// Common classifier interface
pub trait Classifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Sorted class labels seen during `fit`
    fn classes(&self) -> &[f64];

    fn capabilities(&self) -> Capabilities;

    /// Shape `(n_samples, n_classes)`, columns in `classes()` order
    fn predict_proba(&self, _x: &Array2<f64>) -> Result<Array2<f64>> {
        Err(RunForgeError::InvalidInput(
            "predict_proba is not available for this model".to_string(),
        ))
    }

    /// Shape `(n_samples, 1)` for binary models, `(n_samples, n_classes)` otherwise
    fn decision_function(&self, _x: &Array2<f64>) -> Result<Array2<f64>> {
        Err(RunForgeError::InvalidInput(
            "decision_function is not available for this model".to_string(),
        ))
    }

    fn linear_coefficients(&self) -> Option<LinearCoefficients> {
        None
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }

    fn is_fitted(&self) -> bool {
        !self.classes().is_empty()
    }

    /// Fraction of correct predictions
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let y_pred = self.predict(x)?;
        if y.is_empty() {
            return Ok(0.0);
        }
        let correct = y_pred
            .iter()
            .zip(y.iter())
            .filter(|(pred, actual)| pred == actual)
            .count();
        Ok(correct as f64 / y.len() as f64)
    }
}

/// A constructed classifier of one of the supported families
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    LinearSvc(LinearSvc),
}

impl Estimator {
    pub fn family(&self) -> ModelFamily {
        match self {
            Estimator::LogisticRegression(_) => ModelFamily::LogisticRegression,
            Estimator::RandomForest(_) => ModelFamily::RandomForest,
            Estimator::LinearSvc(_) => ModelFamily::LinearSvc,
        }
    }

    /// Concrete type name and module path, as recorded in artifact inspection
    pub fn type_info(&self) -> (&'static str, &'static str) {
        match self {
            Estimator::LogisticRegression(_) => split_type_name(std::any::type_name::<LogisticRegression>()),
            Estimator::RandomForest(_) => split_type_name(std::any::type_name::<RandomForest>()),
            Estimator::LinearSvc(_) => split_type_name(std::any::type_name::<LinearSvc>()),
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            Estimator::LogisticRegression(m) => m,
            Estimator::RandomForest(m) => m,
            Estimator::LinearSvc(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            Estimator::LogisticRegression(m) => m,
            Estimator::RandomForest(m) => m,
            Estimator::LinearSvc(m) => m,
        }
    }

    pub fn as_logistic_regression_mut(&mut self) -> Option<&mut LogisticRegression> {
        match self {
            Estimator::LogisticRegression(m) => Some(m),
            _ => None,
        }
    }
}

/// `a::b::Type` into `("Type", "a::b")`
pub(crate) fn split_type_name(full: &'static str) -> (&'static str, &'static str) {
    match full.rsplit_once("::") {
        Some((module, name)) => (name, module),
        None => (full, ""),
    }
}

impl Classifier for Estimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }

    fn classes(&self) -> &[f64] {
        self.inner().classes()
    }

    fn capabilities(&self) -> Capabilities {
        self.inner().capabilities()
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.inner().predict_proba(x)
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.inner().decision_function(x)
    }

    fn linear_coefficients(&self) -> Option<LinearCoefficients> {
        self.inner().linear_coefficients()
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.inner().feature_importances()
    }
}

/// Build an estimator for `family`, filling unset params with the
/// family's own defaults.
pub fn create_estimator(family: &str, seed: u64, params: &TypedHyperparameters) -> Result<Estimator> {
    let family: ModelFamily = family.parse()?;
    debug!(family = %family, seed, params = params.len(), "Creating estimator");

    let estimator = match family {
        ModelFamily::LogisticRegression => Estimator::LogisticRegression(
            LogisticRegression::new()
                .with_c(params.f64_or("C", 1.0))
                .with_solver(params.str_or("solver", "lbfgs"))
                .with_max_iter(params.usize_or("max_iter", 100))
                .with_warm_start(params.bool_or("warm_start", false))
                .with_random_state(seed),
        ),
        ModelFamily::RandomForest => Estimator::RandomForest(
            RandomForest::new(params.usize_or("n_estimators", 100))
                .with_max_depth(params.optional_usize("max_depth"))
                .with_min_samples_split(params.usize_or("min_samples_split", 2))
                .with_min_samples_leaf(params.usize_or("min_samples_leaf", 1))
                .with_random_state(seed),
        ),
        ModelFamily::LinearSvc => Estimator::LinearSvc(
            LinearSvc::new()
                .with_c(params.f64_or("C", 1.0))
                .with_max_iter(params.usize_or("max_iter", 1000))
                .with_random_state(seed),
        ),
    };
    Ok(estimator)
}

/// Sorted distinct labels
pub(crate) fn unique_classes(y: &Array1<f64>) -> Vec<f64> {
    let mut classes: Vec<f64> = y.iter().copied().collect();
    classes.sort_by(|a, b| a.total_cmp(b));
    classes.dedup();
    classes
}

/// Index of each label in `classes`
pub(crate) fn encode_labels(y: &Array1<f64>, classes: &[f64]) -> Vec<usize> {
    y.iter()
        .map(|v| classes.iter().position(|c| c == v).unwrap_or(0))
        .collect()
}

pub(crate) fn check_shapes(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(RunForgeError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(RunForgeError::TrainingError("Cannot fit on zero samples".to_string()));
    }
    Ok(())
}

pub(crate) fn require_two_classes(classes: &[f64]) -> Result<()> {
    if classes.len() < 2 {
        return Err(RunForgeError::TrainingError(format!(
            "Training data needs samples of at least 2 classes, got {}",
            classes.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperparams::ParamValue;
    use ndarray::array;

    #[test]
    fn test_family_round_trip() {
        for family in ModelFamily::ALL {
            assert_eq!(family.as_str().parse::<ModelFamily>().unwrap(), family);
        }
    }

    #[test]
    fn test_unsupported_model() {
        let err = "xgboost".parse::<ModelFamily>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported model: 'xgboost'. Valid options: logistic_regression, random_forest, linear_svc"
        );
    }

    #[test]
    fn test_create_estimator_applies_params() {
        let mut params = TypedHyperparameters::new();
        params.insert("n_estimators", ParamValue::Int(7));
        params.insert("max_depth", ParamValue::Null);

        match create_estimator("random_forest", 1, &params).unwrap() {
            Estimator::RandomForest(rf) => {
                assert_eq!(rf.n_estimators, 7);
                assert_eq!(rf.max_depth, None);
                assert_eq!(rf.min_samples_split, 2);
            }
            other => panic!("unexpected estimator: {:?}", other.family()),
        }
    }

    #[test]
    fn test_create_estimator_defaults() {
        match create_estimator("logistic_regression", 0, &TypedHyperparameters::new()).unwrap() {
            Estimator::LogisticRegression(lr) => {
                assert_eq!(lr.c, 1.0);
                assert_eq!(lr.max_iter, 100);
                assert_eq!(lr.solver, "lbfgs");
                assert!(!lr.warm_start);
            }
            other => panic!("unexpected estimator: {:?}", other.family()),
        }
    }

    #[test]
    fn test_capabilities_by_family() {
        let params = TypedHyperparameters::new();
        let lr = create_estimator("logistic_regression", 0, &params).unwrap();
        let rf = create_estimator("random_forest", 0, &params).unwrap();
        let svc = create_estimator("linear_svc", 0, &params).unwrap();

        assert!(lr.capabilities().predict_proba && lr.capabilities().coefficients);
        assert!(rf.capabilities().feature_importances && !rf.capabilities().coefficients);
        assert!(svc.capabilities().decision_function && !svc.capabilities().predict_proba);
    }

    #[test]
    fn test_type_info() {
        let est = create_estimator("linear_svc", 0, &TypedHyperparameters::new()).unwrap();
        let (name, module) = est.type_info();
        assert_eq!(name, "LinearSvc");
        assert!(module.ends_with("training::svm"));
    }

    #[test]
    fn test_encode_labels() {
        let y = array![2.0, 0.0, 2.0, 1.0];
        let classes = unique_classes(&y);
        assert_eq!(classes, vec![0.0, 1.0, 2.0]);
        assert_eq!(encode_labels(&y, &classes), vec![2, 0, 2, 1]);
    }
}
