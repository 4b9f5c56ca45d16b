//! Linear support vector classifier
//!
//! Squared-norm regularized hinge loss, minimized by stochastic
//! subgradient descent (Pegasos-style step size). Multi-class problems are
//! solved one-vs-rest.

use super::estimator::{
    check_shapes, encode_labels, require_two_classes, unique_classes, Capabilities, Classifier,
    LinearCoefficients,
};
use super::linear_models::argmax;
use crate::error::{Result, RunForgeError};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Linear SVM classifier. Exposes `decision_function`, no probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvc {
    /// Regularization parameter
    pub c: f64,
    /// Passes over the training data
    pub max_iter: usize,
    pub random_state: Option<u64>,
    coef: Option<Array2<f64>>,
    intercept: Option<Array1<f64>>,
    classes: Vec<f64>,
}

impl Default for LinearSvc {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearSvc {
    pub fn new() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            random_state: None,
            coef: None,
            intercept: None,
            classes: Vec::new(),
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit one binary problem with targets in `{-1, +1}`
    fn fit_binary(&self, x: &Array2<f64>, target: &[f64], rng: &mut ChaCha8Rng) -> (Array1<f64>, f64) {
        let n_samples = x.nrows();
        let lambda = 1.0 / (self.c * n_samples as f64);

        let mut weights = Array1::zeros(x.ncols());
        let mut bias = 0.0;
        let mut order: Vec<usize> = (0..n_samples).collect();
        let mut step = 0usize;

        for _ in 0..self.max_iter.max(1) {
            order.shuffle(rng);
            for &i in &order {
                step += 1;
                let eta = 1.0 / (lambda * step as f64);
                let row = x.row(i);
                let margin = target[i] * (row.dot(&weights) + bias);

                // The intercept is regularized like a weight on a constant feature
                let shrink = 1.0 - eta * lambda;
                weights *= shrink;
                bias *= shrink;
                if margin < 1.0 {
                    weights.scaled_add(eta * target[i], &row);
                    bias += eta * target[i];
                }
            }
        }
        (weights, bias)
    }

    fn fitted(&self) -> Result<(&Array2<f64>, &Array1<f64>)> {
        match (&self.coef, &self.intercept) {
            (Some(coef), Some(intercept)) => Ok((coef, intercept)),
            _ => Err(RunForgeError::ModelNotFitted),
        }
    }
}

impl Classifier for LinearSvc {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_shapes(x, y)?;
        let classes = unique_classes(y);
        require_two_classes(&classes)?;
        let encoded = encode_labels(y, &classes);

        let rows = if classes.len() == 2 { 1 } else { classes.len() };
        let mut coef = Array2::zeros((rows, x.ncols()));
        let mut intercept = Array1::zeros(rows);
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));

        for row in 0..rows {
            let positive = if rows == 1 { 1 } else { row };
            let target: Vec<f64> = encoded
                .iter()
                .map(|&label| if label == positive { 1.0 } else { -1.0 })
                .collect();

            let (w, b) = self.fit_binary(x, &target, &mut rng);
            coef.row_mut(row).assign(&w);
            intercept[row] = b;
        }

        self.coef = Some(coef);
        self.intercept = Some(intercept);
        self.classes = classes;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scores = self.decision_function(x)?;
        if scores.ncols() == 1 {
            return Ok(scores
                .column(0)
                .mapv(|s| if s > 0.0 { self.classes[1] } else { self.classes[0] }));
        }
        Ok(scores
            .axis_iter(Axis(0))
            .map(|row| self.classes[argmax(row.iter().copied())])
            .collect())
    }

    fn classes(&self) -> &[f64] {
        &self.classes
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            predict_proba: false,
            decision_function: true,
            coefficients: true,
            feature_importances: false,
        }
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (coef, intercept) = self.fitted()?;
        if x.ncols() != coef.ncols() {
            return Err(RunForgeError::ShapeError {
                expected: format!("{} features", coef.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_linear_svc_binary() {
        let x = array![
            [-2.0, -1.0],
            [-1.5, -2.0],
            [-1.0, -1.5],
            [1.0, 1.5],
            [1.5, 2.0],
            [2.0, 1.0],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut svc = LinearSvc::new().with_max_iter(50).with_random_state(0);
        svc.fit(&x, &y).unwrap();

        assert_eq!(svc.predict(&x).unwrap(), y);
        let scores = svc.decision_function(&x).unwrap();
        assert_eq!(scores.dim(), (6, 1));
        assert!(scores[[0, 0]] < 0.0 && scores[[5, 0]] > 0.0);
    }

    #[test]
    fn test_no_predict_proba() {
        let x = array![[-1.0], [1.0]];
        let y = array![0.0, 1.0];
        let mut svc = LinearSvc::new().with_max_iter(10);
        svc.fit(&x, &y).unwrap();
        assert!(matches!(svc.predict_proba(&x), Err(RunForgeError::InvalidInput(_))));
    }

    #[test]
    fn test_multiclass_shapes() {
        let x = array![
            [-3.0, 0.0],
            [-3.2, 0.2],
            [0.0, 3.0],
            [0.2, 3.2],
            [3.0, 0.0],
            [3.2, -0.2],
        ];
        let y = array![0.0, 0.0, 1.0, 1.0, 2.0, 2.0];

        let mut svc = LinearSvc::new().with_max_iter(100).with_random_state(1);
        svc.fit(&x, &y).unwrap();

        let coefs = svc.linear_coefficients().unwrap();
        assert_eq!(coefs.coef.dim(), (3, 2));
        assert_eq!(coefs.intercept.len(), 3);
        assert_eq!(svc.decision_function(&x).unwrap().dim(), (6, 3));
    }
}
