//! Random Forest classifier

use super::decision_tree::DecisionTree;
use super::estimator::{
    check_shapes, encode_labels, require_two_classes, unique_classes, Capabilities, Classifier,
};
use super::linear_models::argmax;
use crate::error::{Result, RunForgeError};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bagged Gini trees with `sqrt(n_features)` candidates per split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Bootstrap sampling
    pub bootstrap: bool,
    pub random_state: Option<u64>,
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
    classes: Vec<f64>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            random_state: None,
            feature_importances: None,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn max_features(n_features: usize) -> usize {
        ((n_features as f64).sqrt().floor() as usize).max(1)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn compute_feature_importances(&mut self) {
        if self.trees.is_empty() {
            return;
        }

        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (i, &val) in imp.iter().enumerate() {
                    total[i] += val;
                }
            }
        }

        let n_trees = self.trees.len() as f64;
        for imp in &mut total {
            *imp /= n_trees;
        }

        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for imp in &mut total {
                *imp /= sum;
            }
        }

        self.feature_importances = Some(Array1::from_vec(total));
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_shapes(x, y)?;
        if self.n_estimators == 0 {
            return Err(RunForgeError::TrainingError(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        let classes = unique_classes(y);
        require_two_classes(&classes)?;
        let encoded = encode_labels(y, &classes);

        let n_samples = x.nrows();
        self.n_features = x.ncols();
        let max_features = Self::max_features(self.n_features);
        let base_seed = self.random_state.unwrap_or(42);

        debug!(
            n_estimators = self.n_estimators,
            max_features,
            n_samples,
            "Growing forest"
        );

        let mut trees = Vec::with_capacity(self.n_estimators);
        for tree_idx in 0..self.n_estimators {
            let seed = base_seed.wrapping_add(tree_idx as u64);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            let sample_indices: Vec<usize> = if self.bootstrap {
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
            } else {
                (0..n_samples).collect()
            };

            let x_boot = x.select(Axis(0), &sample_indices);
            let y_boot: Vec<usize> = sample_indices.iter().map(|&i| encoded[i]).collect();

            let mut tree = DecisionTree::new()
                .with_max_depth(self.max_depth)
                .with_min_samples_split(self.min_samples_split)
                .with_min_samples_leaf(self.min_samples_leaf)
                .with_max_features(Some(max_features))
                .with_random_state(rng.gen());
            tree.fit(&x_boot, &y_boot, classes.len())?;
            trees.push(tree);
        }

        self.trees = trees;
        self.classes = classes;
        self.compute_feature_importances();
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
            decision_function: false,
            coefficients: false,
            feature_importances: true,
        }
    }

    /// Mean of the per-tree leaf distributions
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(RunForgeError::ModelNotFitted);
        }

        let mut sum: Array2<f64> = Array2::zeros((x.nrows(), self.classes.len()));
        for tree in &self.trees {
            sum += &tree.predict_distribution(x)?;
        }
        Ok(sum / self.trees.len() as f64)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [1.0, 5.0],
            [1.2, 4.0],
            [0.8, 6.0],
            [1.1, 5.5],
            [4.0, 5.0],
            [4.2, 4.5],
            [3.8, 6.0],
            [4.1, 5.2],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_random_forest_classifier() {
        let (x, y) = separable();
        let mut rf = RandomForest::new(20).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        assert_eq!(rf.n_trees(), 20);
        let accuracy = rf.score(&x, &y).unwrap();
        assert!(accuracy >= 0.75, "accuracy {}", accuracy);
    }

    #[test]
    fn test_predict_proba_rows_sum_to_one() {
        let (x, y) = separable();
        let mut rf = RandomForest::new(10).with_random_state(7);
        rf.fit(&x, &y).unwrap();

        let proba = rf.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (8, 2));
        for row in proba.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_deterministic_with_seed() {
        let (x, y) = separable();
        let mut a = RandomForest::new(5).with_random_state(3);
        let mut b = RandomForest::new(5).with_random_state(3);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn test_feature_importances_normalized() {
        let (x, y) = separable();
        let mut rf = RandomForest::new(10).with_random_state(1);
        rf.fit(&x, &y).unwrap();

        let importances = rf.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        assert!((importances.sum() - 1.0).abs() < 1e-9);
        assert!(importances[0] > importances[1]);
    }

    #[test]
    fn test_predict_before_fit() {
        let rf = RandomForest::new(3);
        assert!(matches!(rf.predict(&array![[1.0]]), Err(RunForgeError::ModelNotFitted)));
    }
}
