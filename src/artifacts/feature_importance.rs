//! Native feature importance (`feature_importance.v1.json`)
//!
//! Only random forest exposes importances in v1. Anything else yields a
//! diagnostic, never an approximation.

use super::canonical::write_canonical_json;
use super::ARTIFACTS_DIR;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Extraction, Severity};
use crate::error::Result;
use crate::training::{Classifier, ModelFamily};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

pub const FEATURE_IMPORTANCE_SCHEMA_VERSION: &str = "feature_importance.v1";
pub const FEATURE_IMPORTANCE_FILE: &str = "feature_importance.v1.json";
pub const IMPORTANCE_TYPE: &str = "gini_importance";
pub const TOP_K: usize = 10;

const SUPPORTED: [ModelFamily; 1] = [ModelFamily::RandomForest];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedImportance {
    pub name: String,
    pub importance: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedImportance {
    pub name: String,
    pub importance: f64,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportanceV1 {
    pub schema_version: String,
    pub model_family: ModelFamily,
    pub importance_type: String,
    pub num_features: usize,
    pub features_by_importance: Vec<RankedImportance>,
    pub features_by_original_order: Vec<IndexedImportance>,
    pub top_k: Vec<String>,
}

pub fn supports_feature_importance(family: ModelFamily) -> bool {
    SUPPORTED.contains(&family)
}

fn unavailable(code: DiagnosticCode, message: String) -> Extraction<FeatureImportanceV1> {
    Extraction::Unavailable(Diagnostic::new(code, Severity::Info, message))
}

/// Build the artifact from a fitted classifier and the feature names in
/// column order.
pub fn extract_feature_importance<C: Classifier + ?Sized>(
    clf: &C,
    family: ModelFamily,
    feature_names: &[String],
) -> Extraction<FeatureImportanceV1> {
    if !supports_feature_importance(family) {
        return unavailable(
            DiagnosticCode::FeatureImportanceUnsupportedModel,
            format!(
                "Model family '{}' does not support native feature importance in v1. Supported models: {}",
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

    let importances = match clf.feature_importances() {
        Some(values) => values,
        None => {
            return unavailable(
                DiagnosticCode::FeatureImportanceUnsupportedModel,
                "Classifier does not expose feature importances".to_string(),
            )
        }
    };
    if importances.len() != feature_names.len() {
        return unavailable(
            DiagnosticCode::FeatureNamesUnavailable,
            format!(
                "Feature count mismatch: {} importances vs {} names",
                importances.len(),
                feature_names.len()
            ),
        );
    }

    let features_by_original_order: Vec<IndexedImportance> = feature_names
        .iter()
        .zip(importances.iter())
        .enumerate()
        .map(|(index, (name, &importance))| IndexedImportance {
            name: name.clone(),
            importance,
            index,
        })
        .collect();

    let mut sorted: Vec<&IndexedImportance> = features_by_original_order.iter().collect();
    sorted.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    let features_by_importance: Vec<RankedImportance> = sorted
        .into_iter()
        .enumerate()
        .map(|(i, f)| RankedImportance {
            name: f.name.clone(),
            importance: f.importance,
            rank: i + 1,
        })
        .collect();

    let top_k = features_by_importance
        .iter()
        .take(TOP_K)
        .map(|f| f.name.clone())
        .collect();

    Extraction::Ready(FeatureImportanceV1 {
        schema_version: FEATURE_IMPORTANCE_SCHEMA_VERSION.to_string(),
        model_family: family,
        importance_type: IMPORTANCE_TYPE.to_string(),
        num_features: feature_names.len(),
        features_by_importance,
        features_by_original_order,
        top_k,
    })
}

/// Write `artifacts/feature_importance.v1.json` under `run_dir`
pub fn write_feature_importance(artifact: &FeatureImportanceV1, run_dir: &Path) -> Result<PathBuf> {
    let dir = run_dir.join(ARTIFACTS_DIR);
    fs::create_dir_all(&dir)?;
    let path = dir.join(FEATURE_IMPORTANCE_FILE);
    write_canonical_json(&path, artifact)?;
    Ok(path)
}
