//! Logistic regression

use super::estimator::{
    check_shapes, encode_labels, require_two_classes, unique_classes, Capabilities, Classifier,
    LinearCoefficients,
};
use crate::error::{Result, RunForgeError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// L2-regularized logistic regression fitted by gradient descent.
///
/// Minimizes mean log-loss plus `||w||^2 / (2 * C * n)`, which has the same
/// minimizer as the `C`-weighted objective. Three or more classes are
/// handled one-vs-rest; two classes use a single row for the positive class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Inverse regularization strength
    pub c: f64,
    /// Recorded for provenance; optimization is always gradient descent
    pub solver: String,
    pub max_iter: usize,
    /// Continue from the previous coefficients on the next `fit`
    pub warm_start: bool,
    pub tol: f64,
    pub learning_rate: f64,
    pub random_state: Option<u64>,
    coef: Option<Array2<f64>>,
    intercept: Option<Array1<f64>>,
    classes: Vec<f64>,
    /// Iterations used by the last `fit`
    pub n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            c: 1.0,
            solver: "lbfgs".to_string(),
            max_iter: 100,
            warm_start: false,
            tol: 1e-6,
            learning_rate: 0.1,
            random_state: None,
            coef: None,
            intercept: None,
            classes: Vec::new(),
            n_iter: 0,
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_solver(mut self, solver: impl Into<String>) -> Self {
        self.solver = solver.into();
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_warm_start(mut self, warm_start: bool) -> Self {
        self.warm_start = warm_start;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    /// One binary problem: `target` is 1.0 for the positive class, else 0.0.
    /// Returns the fitted row, bias and iterations used.
    fn fit_binary(
        &self,
        x: &Array2<f64>,
        target: &Array1<f64>,
        mut weights: Array1<f64>,
        mut bias: f64,
    ) -> (Array1<f64>, f64, usize) {
        let n_samples = x.nrows() as f64;
        let alpha = 1.0 / (self.c * n_samples);
        let lr = self.learning_rate;

        let mut iterations = 0;
        for _ in 0..self.max_iter {
            iterations += 1;
            let linear = x.dot(&weights) + bias;
            let errors = Self::sigmoid(&linear) - target;

            let dw = x.t().dot(&errors) / n_samples + alpha * &weights;
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - lr * dw;
            bias -= lr * db;
        }
        (weights, bias, iterations)
    }

    fn fitted(&self) -> Result<(&Array2<f64>, &Array1<f64>)> {
        match (&self.coef, &self.intercept) {
            (Some(coef), Some(intercept)) => Ok((coef, intercept)),
            _ => Err(RunForgeError::ModelNotFitted),
        }
    }

    fn check_features(&self, x: &Array2<f64>) -> Result<()> {
        let (coef, _) = self.fitted()?;
        if x.ncols() != coef.ncols() {
            return Err(RunForgeError::ShapeError {
                expected: format!("{} features", coef.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_shapes(x, y)?;
        let classes = unique_classes(y);
        require_two_classes(&classes)?;

        let n_features = x.ncols();
        let rows = if classes.len() == 2 { 1 } else { classes.len() };
        let encoded = encode_labels(y, &classes);

        let reuse = self.warm_start
            && self.classes == classes
            && self.coef.as_ref().map_or(false, |c| c.dim() == (rows, n_features));

        let (mut coef, mut intercept) = match (reuse, &self.coef, &self.intercept) {
            (true, Some(c), Some(b)) => (c.clone(), b.clone()),
            _ => (Array2::zeros((rows, n_features)), Array1::zeros(rows)),
        };

        let mut max_used = 0;
        for row in 0..rows {
            // Binary problems train the positive (second) class
            let positive = if rows == 1 { 1 } else { row };
            let target: Array1<f64> = encoded
                .iter()
                .map(|&label| if label == positive { 1.0 } else { 0.0 })
                .collect();

            let (w, b, used) = self.fit_binary(x, &target, coef.row(row).to_owned(), intercept[row]);
            coef.row_mut(row).assign(&w);
            intercept[row] = b;
            max_used = max_used.max(used);
        }

        self.coef = Some(coef);
        self.intercept = Some(intercept);
        self.classes = classes;
        self.n_iter = max_used;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .axis_iter(Axis(0))
            .map(|row| self.classes[argmax(row.iter().copied())])
            .collect())
    }

    fn classes(&self) -> &[f64] {
        &self.classes
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            predict_proba: true,
            decision_function: true,
            coefficients: true,
            feature_importances: false,
        }
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let scores = self.decision_function(x)?;
        let probs = scores.mapv(|v| 1.0 / (1.0 + (-v).exp()));

        if probs.ncols() == 1 {
            let positive = probs.column(0).to_owned();
            let mut out = Array2::zeros((x.nrows(), 2));
            out.column_mut(0).assign(&positive.mapv(|p| 1.0 - p));
            out.column_mut(1).assign(&positive);
            return Ok(out);
        }

        // One-vs-rest: normalize the per-class sigmoids
        let mut out = probs;
        for mut row in out.axis_iter_mut(Axis(0)) {
            let total = row.sum();
            if total > 0.0 {
                row.mapv_inplace(|p| p / total);
            }
        }
        Ok(out)
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_features(x)?;
        let (coef, intercept) = self.fitted()?;
        Ok(x.dot(&coef.t()) + intercept)
    }

    fn linear_coefficients(&self) -> Option<LinearCoefficients> {
        let (coef, intercept) = self.fitted().ok()?;
        Some(LinearCoefficients {
            coef: coef.clone(),
            intercept: intercept.clone(),
        })
    }
}

/// Index of the largest value; the first one wins ties
pub(crate) fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_logistic_regression() {
        let x = array![
            [1.0, 1.0],
            [1.5, 1.5],
            [2.0, 2.0],
            [5.0, 5.0],
            [5.5, 5.5],
            [6.0, 6.0],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new()
            .with_max_iter(1000)
            .with_learning_rate(0.5);
        model.fit(&x, &y).unwrap();
        assert!(model.is_fitted());

        let accuracy = model.score(&x, &y).unwrap();
        assert!(accuracy >= 0.8, "Accuracy should be >= 0.8, got {}", accuracy);
    }

    #[test]
    fn test_predict_proba() {
        let x = array![[-1.0, -1.0], [1.0, 1.0]];
        let y = array![0.0, 1.0];

        let mut model = LogisticRegression::new().with_max_iter(500);
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (2, 2));
        assert!(proba[[0, 1]] < 0.5);
        assert!(proba[[1, 1]] > 0.5);
        assert!((proba.row(0).sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_binary_has_single_coefficient_row() {
        let x = array![[-1.0], [-0.5], [0.5], [1.0]];
        let y = array![3.0, 3.0, 7.0, 7.0];

        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        let coefs = model.linear_coefficients().unwrap();
        assert_eq!(coefs.coef.dim(), (1, 1));
        assert!(coefs.coef[[0, 0]] > 0.0);
        assert_eq!(model.classes(), &[3.0, 7.0]);
    }

    #[test]
    fn test_multiclass_one_vs_rest() {
        let x = array![
            [-2.0, 0.0],
            [-2.2, 0.1],
            [0.0, 2.0],
            [0.1, 2.2],
            [2.0, 0.0],
            [2.2, -0.1],
        ];
        let y = array![0.0, 0.0, 1.0, 1.0, 2.0, 2.0];

        let mut model = LogisticRegression::new().with_max_iter(500).with_learning_rate(0.5);
        model.fit(&x, &y).unwrap();

        assert_eq!(model.linear_coefficients().unwrap().coef.dim(), (3, 2));
        let predictions = model.predict(&x).unwrap();
        assert_eq!(predictions, y);
    }

    #[test]
    fn test_warm_start_continues() {
        let x = array![[-1.0], [-0.5], [0.5], [1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut warm = LogisticRegression::new().with_max_iter(5).with_warm_start(true);
        warm.fit(&x, &y).unwrap();
        let first = warm.linear_coefficients().unwrap().coef[[0, 0]];
        warm.fit(&x, &y).unwrap();
        let second = warm.linear_coefficients().unwrap().coef[[0, 0]];
        assert!(second > first);

        let mut cold = LogisticRegression::new().with_max_iter(5);
        cold.fit(&x, &y).unwrap();
        cold.fit(&x, &y).unwrap();
        assert_eq!(cold.linear_coefficients().unwrap().coef[[0, 0]], first);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 1.0];
        let err = LogisticRegression::new().fit(&x, &y).unwrap_err();
        assert!(matches!(err, RunForgeError::TrainingError(_)));
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LogisticRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(RunForgeError::ModelNotFitted)
        ));
    }
}
