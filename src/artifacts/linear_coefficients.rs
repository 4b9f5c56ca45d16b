//! Linear model coefficients (`linear_coefficients.v1.json`)
//!
//! Coefficients live in standardized feature space: the pipeline scales
//! every feature before the classifier sees it, so a coefficient is the
//! effect of one standard deviation. Nothing is mapped back to raw units.

use super::canonical::write_canonical_json;
use super::ARTIFACTS_DIR;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Extraction, Severity};
use crate::error::Result;
use crate::training::{Classifier, ModelFamily};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

pub const LINEAR_COEFFICIENTS_SCHEMA_VERSION: &str = "linear_coefficients.v1";
pub const LINEAR_COEFFICIENTS_FILE: &str = "linear_coefficients.v1.json";
pub const COEFFICIENT_SPACE: &str = "standardized";
pub const TOP_K: usize = 10;

const SUPPORTED: [ModelFamily; 2] = [ModelFamily::LinearSvc, ModelFamily::LogisticRegression];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCoefficient {
    pub name: String,
    pub coefficient: f64,
    pub abs_coefficient: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassCoefficients {
    pub class: f64,
    pub features: Vec<FeatureCoefficient>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassIntercept {
    pub class: f64,
    pub intercept: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassTopFeatures {
    pub class: f64,
    pub top_features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearCoefficientsV1 {
    pub schema_version: String,
    pub model_family: ModelFamily,
    pub coefficient_space: String,
    pub num_features: usize,
    pub num_classes: usize,
    pub classes: Vec<f64>,
    pub intercepts: Vec<ClassIntercept>,
    pub coefficients_by_class: Vec<ClassCoefficients>,
    pub top_k_by_class: Vec<ClassTopFeatures>,
}

pub fn supports_linear_coefficients(family: ModelFamily) -> bool {
    SUPPORTED.contains(&family)
}

fn unavailable(code: DiagnosticCode, message: String) -> Extraction<LinearCoefficientsV1> {
    Extraction::Unavailable(Diagnostic::new(code, Severity::Info, message))
}

/// Features sorted by |coefficient| descending, ties by name
fn sorted_features(row: ArrayView1<f64>, feature_names: &[String]) -> Vec<FeatureCoefficient> {
    let mut features: Vec<(String, f64)> = feature_names
        .iter()
        .cloned()
        .zip(row.iter().copied())
        .collect();
    features.sort_by(|a, b| {
        b.1.abs()
            .partial_cmp(&a.1.abs())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    features
        .into_iter()
        .enumerate()
        .map(|(i, (name, coefficient))| FeatureCoefficient {
            name,
            coefficient,
            abs_coefficient: coefficient.abs(),
            rank: i + 1,
        })
        .collect()
}

/// Build the artifact from a fitted linear classifier.
///
/// Binary models report only the positive class, `classes[1]`.
pub fn extract_linear_coefficients<C: Classifier + ?Sized>(
    clf: &C,
    family: ModelFamily,
    feature_names: &[String],
) -> Extraction<LinearCoefficientsV1> {
    if !supports_linear_coefficients(family) {
        return unavailable(
            DiagnosticCode::LinearCoefficientsUnsupportedModel,
            format!(
                "Model family '{}' does not support coefficient extraction in v1. Supported models: {}",
                family,
                SUPPORTED.iter().map(|f| f.as_str()).collect::<Vec<_>>().join(", ")
            ),
        );
    }
    if feature_names.is_empty() {
        return unavailable(
            DiagnosticCode::FeatureNamesUnavailable,
            "Feature names are required but not available".to_string(),
        );
    }

    let weights = match clf.linear_coefficients() {
        Some(weights) => weights,
        None => {
            return unavailable(
                DiagnosticCode::CoefficientsMissingOnArtifact,
                "Classifier does not expose coefficients".to_string(),
            )
        }
    };

    let mut classes: Vec<f64> = clf.classes().to_vec();
    classes.sort_by(|a, b| a.total_cmp(b));
    if classes.is_empty() {
        return unavailable(
            DiagnosticCode::CoefficientsMissingOnArtifact,
            "Classifier does not expose class labels".to_string(),
        );
    }

    if weights.coef.ncols() != feature_names.len() {
        return unavailable(
            DiagnosticCode::FeatureNamesUnavailable,
            format!(
                "Feature count mismatch: {} coefficients vs {} names",
                weights.coef.ncols(),
                feature_names.len()
            ),
        );
    }

    let binary = weights.coef.nrows() == 1 && classes.len() == 2;
    let row_classes: Vec<f64> = if binary { vec![classes[1]] } else { classes.clone() };
    if !binary && weights.coef.nrows() != classes.len() {
        return unavailable(
            DiagnosticCode::CoefficientsMissingOnArtifact,
            format!(
                "Expected {} coefficient rows, found {}",
                classes.len(),
                weights.coef.nrows()
            ),
        );
    }

    let coefficients_by_class: Vec<ClassCoefficients> = row_classes
        .iter()
        .zip(weights.coef.outer_iter())
        .map(|(&class, row)| ClassCoefficients {
            class,
            features: sorted_features(row, feature_names),
        })
        .collect();

    let intercepts = row_classes
        .iter()
        .enumerate()
        .map(|(i, &class)| ClassIntercept {
            class,
            intercept: weights.intercept.get(i).copied().unwrap_or(0.0),
        })
        .collect();

    let top_k_by_class = coefficients_by_class
        .iter()
        .map(|entry| ClassTopFeatures {
            class: entry.class,
            top_features: entry.features.iter().take(TOP_K).map(|f| f.name.clone()).collect(),
        })
        .collect();

    Extraction::Ready(LinearCoefficientsV1 {
        schema_version: LINEAR_COEFFICIENTS_SCHEMA_VERSION.to_string(),
        model_family: family,
        coefficient_space: COEFFICIENT_SPACE.to_string(),
        num_features: feature_names.len(),
        num_classes: classes.len(),
        classes,
        intercepts,
        coefficients_by_class,
        top_k_by_class,
    })
}

/// Write `artifacts/linear_coefficients.v1.json` under `run_dir`
pub fn write_linear_coefficients(artifact: &LinearCoefficientsV1, run_dir: &Path) -> Result<PathBuf> {
    let dir = run_dir.join(ARTIFACTS_DIR);
    fs::create_dir_all(&dir)?;
    let path = dir.join(LINEAR_COEFFICIENTS_FILE);
    write_canonical_json(&path, artifact)?;
    Ok(path)
}
