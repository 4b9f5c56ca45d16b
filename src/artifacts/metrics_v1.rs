//! Model-aware validation metrics (`metrics.v1.json`)
//!
//! The metrics profile depends on what the classifier can do:
//! binary with probabilities gets `classification.proba.v1`, three or more
//! classes get `classification.multiclass.v1`, everything else
//! `classification.base.v1`. Binary models that only expose a decision
//! function still report `roc_auc` under the base profile.

use super::canonical::write_canonical_json;
use crate::error::Result;
use crate::training::Classifier;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const METRICS_V1_SCHEMA_VERSION: &str = "metrics.v1";
pub const METRICS_V1_FILE: &str = "metrics.v1.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricsProfile {
    #[serde(rename = "classification.base.v1")]
    Base,
    #[serde(rename = "classification.proba.v1")]
    Proba,
    #[serde(rename = "classification.multiclass.v1")]
    Multiclass,
}

impl MetricsProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricsProfile::Base => "classification.base.v1",
            MetricsProfile::Proba => "classification.proba.v1",
            MetricsProfile::Multiclass => "classification.multiclass.v1",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MetricsProfile::Base => "Classification Base",
            MetricsProfile::Proba => "Classification with Probabilities",
            MetricsProfile::Multiclass => "Multiclass Classification",
        }
    }

    pub fn select(num_classes: usize, has_proba: bool) -> Self {
        if num_classes == 2 && has_proba {
            MetricsProfile::Proba
        } else if num_classes > 2 {
            MetricsProfile::Multiclass
        } else {
            MetricsProfile::Base
        }
    }
}

/// Contents of `metrics.v1.json`. Profile-specific groups are omitted, not
/// null, when they do not apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsV1 {
    pub schema_version: String,
    pub metrics_profile: MetricsProfile,
    pub num_classes: usize,
    pub accuracy: f64,
    pub precision_macro: f64,
    pub recall_macro: f64,
    pub f1_macro: f64,
    /// Rows are true labels, columns predictions, both in class order
    pub confusion_matrix: Vec<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roc_auc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_class_precision: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_class_recall: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_class_f1: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_labels: Option<Vec<f64>>,
}

/// Per-label precision, recall and F1; zero where undefined
fn per_class_scores(y_true: &Array1<f64>, y_pred: &Array1<f64>, labels: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut precision = Vec::with_capacity(labels.len());
    let mut recall = Vec::with_capacity(labels.len());
    let mut f1 = Vec::with_capacity(labels.len());

    for &label in labels {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t == label, p == label) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }
        precision.push(ratio(tp, tp + fp));
        recall.push(ratio(tp, tp + fn_));
        f1.push(ratio(2 * tp, 2 * tp + fp + fn_));
    }
    (precision, recall, f1)
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn sorted_labels<'a>(values: impl Iterator<Item = &'a f64>) -> Vec<f64> {
    let mut labels: Vec<f64> = values.copied().collect();
    labels.sort_by(|a, b| a.total_cmp(b));
    labels.dedup();
    labels
}

pub fn confusion_matrix(y_true: &Array1<f64>, y_pred: &Array1<f64>, labels: &[f64]) -> Vec<Vec<u64>> {
    let mut matrix = vec![vec![0u64; labels.len()]; labels.len()];
    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        let row = labels.iter().position(|l| l == t);
        let col = labels.iter().position(|l| l == p);
        if let (Some(r), Some(c)) = (row, col) {
            matrix[r][c] += 1;
        }
    }
    matrix
}

/// Area under the ROC curve via the rank-sum statistic, ties averaged.
///
/// `None` unless both classes are present.
pub fn roc_auc(y_true: &[bool], scores: &[f64]) -> Option<f64> {
    let n_pos = y_true.iter().filter(|&&t| t).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            ranks[order[k]] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = ranks
        .iter()
        .zip(y_true)
        .filter(|(_, &t)| t)
        .map(|(r, _)| r)
        .sum();
    let u = pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some(u / (n_pos * n_neg) as f64)
}

/// Mean binary cross-entropy with probabilities clipped away from 0 and 1
pub fn log_loss(y_true: &[bool], prob_positive: &[f64]) -> f64 {
    let eps = f64::EPSILON;
    let total: f64 = y_true
        .iter()
        .zip(prob_positive)
        .map(|(&t, &p)| {
            let p = p.clamp(eps, 1.0 - eps);
            if t {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / y_true.len().max(1) as f64
}

/// Evaluate a fitted classifier on the validation set.
///
/// A binary validation set that holds only one class cannot score ROC AUC;
/// it falls back to the base profile.
pub fn compute_metrics_v1<C: Classifier + ?Sized>(clf: &C, x_val: &Array2<f64>, y_val: &Array1<f64>) -> Result<MetricsV1> {
    let caps = clf.capabilities();
    let class_labels: Vec<f64> = clf.classes().to_vec();
    let num_classes = class_labels.len();

    let y_pred = clf.predict(x_val)?;

    let observed = sorted_labels(y_val.iter().chain(y_pred.iter()));
    let (precision, recall, f1) = per_class_scores(y_val, &y_pred, &observed);
    let correct = y_val.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();

    let positive: Vec<bool> = match class_labels.get(1) {
        Some(&label) => y_val.iter().map(|&v| v == label).collect(),
        None => Vec::new(),
    };
    let both_present = positive.iter().any(|&p| p) && positive.iter().any(|&p| !p);

    let mut profile = MetricsProfile::select(num_classes, caps.predict_proba);
    if profile == MetricsProfile::Proba && !both_present {
        profile = MetricsProfile::Base;
    }

    let mut metrics = MetricsV1 {
        schema_version: METRICS_V1_SCHEMA_VERSION.to_string(),
        metrics_profile: profile,
        num_classes,
        accuracy: ratio(correct, y_val.len()),
        precision_macro: mean(&precision),
        recall_macro: mean(&recall),
        f1_macro: mean(&f1),
        confusion_matrix: confusion_matrix(y_val, &y_pred, &class_labels),
        roc_auc: None,
        log_loss: None,
        per_class_precision: None,
        per_class_recall: None,
        per_class_f1: None,
        class_labels: None,
    };

    match profile {
        MetricsProfile::Proba => {
            let proba = clf.predict_proba(x_val)?;
            let prob_positive: Vec<f64> = proba.column(1).to_vec();
            metrics.roc_auc = roc_auc(&positive, &prob_positive);
            metrics.log_loss = Some(log_loss(&positive, &prob_positive));
        }
        MetricsProfile::Multiclass => {
            let (p, r, f) = per_class_scores(y_val, &y_pred, &class_labels);
            metrics.per_class_precision = Some(p);
            metrics.per_class_recall = Some(r);
            metrics.per_class_f1 = Some(f);
            metrics.class_labels = Some(class_labels);
        }
        MetricsProfile::Base => {
            if num_classes == 2 && caps.decision_function && !caps.predict_proba && both_present {
                if let Ok(scores) = clf.decision_function(x_val) {
                    metrics.roc_auc = roc_auc(&positive, &scores.column(0).to_vec());
                }
            }
        }
    }

    debug!(profile = profile.as_str(), accuracy = metrics.accuracy, "Computed metrics v1");
    Ok(metrics)
}

/// Write `metrics.v1.json` into `run_dir`
pub fn write_metrics_v1(metrics: &MetricsV1, run_dir: &Path) -> Result<PathBuf> {
    let path = run_dir.join(METRICS_V1_FILE);
    write_canonical_json(&path, metrics)?;
    Ok(path)
}
