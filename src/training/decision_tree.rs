//! CART classification tree
//!
//! Trees are grown on encoded class indices. Leaves hold the class
//! distribution of their samples so a forest can average probabilities.

use crate::error::{Result, RunForgeError};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        /// Class probabilities, indexed like the tree's class list
        distribution: Vec<f64>,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Gini-impurity classification tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn per split; all of them when `None`
    pub max_features: Option<usize>,
    pub random_state: Option<u64>,
    n_features: usize,
    n_classes: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
            n_features: 0,
            n_classes: 0,
            feature_importances: None,
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

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit on encoded labels in `0..n_classes`
    pub fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(RunForgeError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(RunForgeError::TrainingError("Cannot fit on zero samples".to_string()));
        }

        self.n_features = x.ncols();
        self.n_classes = n_classes;

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut importances = vec![0.0; self.n_features];
        let indices: Vec<usize> = (0..n_samples).collect();

        let root = self.build_tree(x, y, &indices, 0, &mut importances, &mut rng);
        self.root = Some(root);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(())
    }

    fn class_counts(&self, y: &[usize], indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[y[i]] += 1;
        }
        counts
    }

    fn leaf(&self, counts: &[usize], n_samples: usize) -> TreeNode {
        let n = n_samples.max(1) as f64;
        TreeNode::Leaf {
            distribution: counts.iter().map(|&c| c as f64 / n).collect(),
            n_samples,
        }
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(y, indices);
        let parent_impurity = gini(&counts, n_samples);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || parent_impurity == 0.0;

        if should_stop {
            return self.leaf(&counts, n_samples);
        }

        let Some((feature_idx, threshold, gain)) =
            self.find_best_split(x, y, indices, parent_impurity, rng)
        else {
            return self.leaf(&counts, n_samples);
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature_idx]] <= threshold);

        importances[feature_idx] += n_samples as f64 * gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
            impurity: parent_impurity,
        }
    }

    /// Best `(feature, threshold, impurity decrease)` over a random
    /// subset of features
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64, f64)> {
        let n_features = self.n_features;
        let n_try = self.max_features.unwrap_or(n_features).clamp(1, n_features.max(1));

        let mut features: Vec<usize> = (0..n_features).collect();
        if n_try < n_features {
            features.shuffle(rng);
            features.truncate(n_try);
        }

        let n = indices.len();
        let mut best: Option<(usize, f64, f64)> = None;

        for &feature_idx in &features {
            let mut sorted: Vec<(f64, usize)> = indices
                .iter()
                .map(|&i| (x[[i, feature_idx]], y[i]))
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            // Sweep thresholds left to right, moving one sample at a time
            let mut left_counts = vec![0usize; self.n_classes];
            let mut right_counts = self.class_counts(y, indices);

            for split in 1..n {
                let (value, class) = sorted[split - 1];
                left_counts[class] += 1;
                right_counts[class] -= 1;

                let next_value = sorted[split].0;
                if value == next_value {
                    continue;
                }
                if split < self.min_samples_leaf || n - split < self.min_samples_leaf {
                    continue;
                }

                let weighted = (split as f64 * gini(&left_counts, split)
                    + (n - split) as f64 * gini(&right_counts, n - split))
                    / n as f64;
                let gain = parent_impurity - weighted;

                if gain > best.map_or(0.0, |b| b.2) {
                    best = Some((feature_idx, (value + next_value) / 2.0, gain));
                }
            }
        }

        best
    }

    /// Class distribution for each row, shape `(n_samples, n_classes)`
    pub fn predict_distribution(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let root = self.root.as_ref().ok_or(RunForgeError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(RunForgeError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut out = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.outer_iter().enumerate() {
            let sample = row.to_vec();
            let distribution = Self::leaf_distribution(root, &sample);
            for (j, p) in distribution.iter().enumerate() {
                out[[i, j]] = *p;
            }
        }
        Ok(out)
    }

    fn leaf_distribution<'a>(node: &'a TreeNode, sample: &[f64]) -> &'a [f64] {
        let mut node = node;
        loop {
            match node {
                TreeNode::Leaf { distribution, .. } => return distribution,
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    node = if sample[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Normalized impurity decrease per feature
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }
}

fn gini(counts: &[usize], n_samples: usize) -> f64 {
    if n_samples == 0 {
        return 0.0;
    }
    let n = n_samples as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_simple() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = [0, 0, 1, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();

        let dist = tree.predict_distribution(&x).unwrap();
        assert_eq!(dist.dim(), (4, 2));
        assert_eq!(dist[[0, 0]], 1.0);
        assert_eq!(dist[[3, 1]], 1.0);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = [0, 1, 0, 1, 0, 1];

        let mut tree = DecisionTree::new().with_max_depth(Some(2));
        tree.fit(&x, &y, 2).unwrap();
        assert!(tree.get_depth() <= 3);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = [0, 0, 1, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert_eq!(importances[0], 1.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_leaf_distribution_is_mixed_when_depth_limited() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = [0, 1, 0, 1];

        let mut tree = DecisionTree::new().with_max_depth(Some(0));
        tree.fit(&x, &y, 2).unwrap();

        let dist = tree.predict_distribution(&x).unwrap();
        assert_eq!(dist[[0, 0]], 0.5);
        assert_eq!(dist[[0, 1]], 0.5);
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[2, 2], 4), 0.5);
        assert_eq!(gini(&[4, 0], 4), 0.0);
    }
}
