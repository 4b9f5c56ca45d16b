//! Deterministic train/validation split

use super::estimator::{encode_labels, unique_classes};
use crate::error::{Result, RunForgeError};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Fraction of samples held out for validation
pub const VALIDATION_FRACTION: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct TrainValSplit {
    pub x_train: Array2<f64>,
    pub x_val: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_val: Array1<f64>,
    /// False when the split fell back to a plain shuffle
    pub stratified: bool,
}

/// Number of validation samples for `n_samples`: `ceil(0.2 * n)`.
pub fn validation_size(n_samples: usize) -> usize {
    (n_samples as f64 * VALIDATION_FRACTION).ceil() as usize
}

/// 80/20 split seeded by `seed`.
///
/// Stratified when every class has at least two samples and the
/// validation set can hold one sample per class; otherwise a plain shuffle.
pub fn train_val_split(x: &Array2<f64>, y: &Array1<f64>, seed: u64) -> Result<TrainValSplit> {
    let n_samples = x.nrows();
    if n_samples != y.len() {
        return Err(RunForgeError::ShapeError {
            expected: format!("y length = {}", n_samples),
            actual: format!("y length = {}", y.len()),
        });
    }

    let n_val = validation_size(n_samples);
    if n_samples < 2 || n_val >= n_samples {
        return Err(RunForgeError::DataError(format!(
            "Need at least 2 samples for an 80/20 split, got {}",
            n_samples
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (val_idx, stratified) = match stratified_indices(y, n_val, &mut rng) {
        Some(indices) => (indices, true),
        None => {
            let mut all: Vec<usize> = (0..n_samples).collect();
            all.shuffle(&mut rng);
            all.truncate(n_val);
            (all, false)
        }
    };

    let mut is_val = vec![false; n_samples];
    for &i in &val_idx {
        is_val[i] = true;
    }
    let train_idx: Vec<usize> = (0..n_samples).filter(|&i| !is_val[i]).collect();
    let mut val_idx = val_idx;
    val_idx.sort_unstable();

    debug!(
        train = train_idx.len(),
        val = val_idx.len(),
        stratified,
        "Split dataset"
    );

    Ok(TrainValSplit {
        x_train: x.select(Axis(0), &train_idx),
        x_val: x.select(Axis(0), &val_idx),
        y_train: y.select(Axis(0), &train_idx),
        y_val: y.select(Axis(0), &val_idx),
        stratified,
    })
}

/// Validation indices allocated per class in proportion to class size.
fn stratified_indices(y: &Array1<f64>, n_val: usize, rng: &mut ChaCha8Rng) -> Option<Vec<usize>> {
    let classes = unique_classes(y);
    let encoded = encode_labels(y, &classes);

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); classes.len()];
    for (i, &class) in encoded.iter().enumerate() {
        members[class].push(i);
    }

    if members.iter().any(|m| m.len() < 2) || n_val < classes.len() {
        return None;
    }
    if y.len() - n_val < classes.len() {
        return None;
    }

    // Largest-remainder allocation, at least one sample per class
    let n = y.len() as f64;
    let mut quota: Vec<usize> = members
        .iter()
        .map(|m| ((m.len() as f64 * n_val as f64 / n).floor() as usize).max(1))
        .collect();
    let mut remainders: Vec<(f64, usize)> = members
        .iter()
        .enumerate()
        .map(|(c, m)| (m.len() as f64 * n_val as f64 / n - quota[c] as f64, c))
        .collect();
    remainders.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut assigned: usize = quota.iter().sum();
    let mut cursor = 0;
    while assigned < n_val {
        let class = remainders[cursor % remainders.len()].1;
        if quota[class] + 1 < members[class].len() {
            quota[class] += 1;
            assigned += 1;
        }
        cursor += 1;
        if cursor > remainders.len() * n_val.max(1) {
            return None;
        }
    }
    while assigned > n_val {
        let class = (0..quota.len()).max_by_key(|&c| (quota[c], std::cmp::Reverse(c)))?;
        if quota[class] <= 1 {
            return None;
        }
        quota[class] -= 1;
        assigned -= 1;
    }

    let mut val = Vec::with_capacity(n_val);
    for (class, indices) in members.iter_mut().enumerate() {
        indices.shuffle(rng);
        val.extend_from_slice(&indices[..quota[class]]);
    }
    Some(val)
}
