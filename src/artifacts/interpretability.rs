//! Interpretability index (`interpretability.index.v1.json`)
//!
//! Links the interpretability artifacts a run produced. An entry appears
//! only when `run.json` references the artifact and the file exists.
//! Summaries carry names, never numeric values.

use super::canonical::write_canonical_json;
use super::feature_importance::FeatureImportanceV1;
use super::linear_coefficients::LinearCoefficientsV1;
use super::metadata::{RunMetadata, RUNFORGE_VERSION};
use super::ARTIFACTS_DIR;
use crate::config::format_timestamp;
use crate::error::Result;
use crate::training::ModelFamily;
use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const INTERPRETABILITY_INDEX_SCHEMA_VERSION: &str = "interpretability.index.v1";
pub const INTERPRETABILITY_INDEX_FILE: &str = "interpretability.index.v1.json";
/// Names kept per summary list
pub const SUMMARY_TOP_K: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry<S> {
    pub schema_version: String,
    pub path: String,
    pub summary: S,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub metrics_profile: String,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportanceSummary {
    pub model_family: ModelFamily,
    pub top_k: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassTopK {
    pub class: f64,
    pub top_features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearCoefficientsSummary {
    pub model_family: ModelFamily,
    pub num_classes: usize,
    pub top_k_by_class: Vec<ClassTopK>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableArtifacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_v1: Option<ArtifactEntry<MetricsSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importance_v1: Option<ArtifactEntry<FeatureImportanceSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linear_coefficients_v1: Option<ArtifactEntry<LinearCoefficientsSummary>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpretabilityIndexV1 {
    pub schema_version: String,
    pub run_id: String,
    pub runforge_version: String,
    pub created_at: String,
    pub available_artifacts: AvailableArtifacts,
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let text = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "Skipping unreadable artifact");
            None
        }
    }
}

fn metrics_entry(run: &RunMetadata, run_dir: &Path) -> Option<ArtifactEntry<MetricsSummary>> {
    let pointer = run.metrics_v1.as_ref()?;
    if !run_dir.join(&pointer.artifact_path).exists() {
        return None;
    }
    Some(ArtifactEntry {
        schema_version: pointer.schema_version.clone(),
        path: pointer.artifact_path.clone(),
        summary: MetricsSummary {
            metrics_profile: pointer.metrics_profile.clone(),
            accuracy: run.metrics.accuracy,
        },
    })
}

fn feature_importance_entry(run: &RunMetadata, run_dir: &Path) -> Option<ArtifactEntry<FeatureImportanceSummary>> {
    let pointer = run.feature_importance.as_ref()?;
    let artifact: FeatureImportanceV1 = read_artifact(&run_dir.join(&pointer.feature_importance_artifact))?;
    Some(ArtifactEntry {
        schema_version: pointer.feature_importance_schema_version.clone(),
        path: pointer.feature_importance_artifact.clone(),
        summary: FeatureImportanceSummary {
            model_family: artifact.model_family,
            top_k: artifact.top_k.into_iter().take(SUMMARY_TOP_K).collect(),
        },
    })
}

fn linear_coefficients_entry(run: &RunMetadata, run_dir: &Path) -> Option<ArtifactEntry<LinearCoefficientsSummary>> {
    let pointer = run.linear_coefficients.as_ref()?;
    let artifact: LinearCoefficientsV1 = read_artifact(&run_dir.join(&pointer.linear_coefficients_artifact))?;
    Some(ArtifactEntry {
        schema_version: pointer.linear_coefficients_schema_version.clone(),
        path: pointer.linear_coefficients_artifact.clone(),
        summary: LinearCoefficientsSummary {
            model_family: artifact.model_family,
            num_classes: artifact.num_classes,
            top_k_by_class: artifact
                .top_k_by_class
                .into_iter()
                .map(|entry| ClassTopK {
                    class: entry.class,
                    top_features: entry.top_features.into_iter().take(SUMMARY_TOP_K).collect(),
                })
                .collect(),
        },
    })
}

/// Build the index from a run's metadata and what is on disk in `run_dir`
pub fn build_interpretability_index(
    run: &RunMetadata,
    run_dir: &Path,
    created_at: &DateTime<FixedOffset>,
) -> InterpretabilityIndexV1 {
    InterpretabilityIndexV1 {
        schema_version: INTERPRETABILITY_INDEX_SCHEMA_VERSION.to_string(),
        run_id: run.run_id.clone(),
        runforge_version: RUNFORGE_VERSION.to_string(),
        created_at: format_timestamp(created_at),
        available_artifacts: AvailableArtifacts {
            metrics_v1: metrics_entry(run, run_dir),
            feature_importance_v1: feature_importance_entry(run, run_dir),
            linear_coefficients_v1: linear_coefficients_entry(run, run_dir),
        },
    }
}

/// Write `artifacts/interpretability.index.v1.json` under `run_dir`
pub fn write_interpretability_index(index: &InterpretabilityIndexV1, run_dir: &Path) -> Result<PathBuf> {
    let dir = run_dir.join(ARTIFACTS_DIR);
    fs::create_dir_all(&dir)?;
    let path = dir.join(INTERPRETABILITY_INDEX_FILE);
    write_canonical_json(&path, index)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::feature_importance::{IndexedImportance, RankedImportance};
    use crate::artifacts::metadata::{DatasetRef, LegacyMetrics};
    use tempfile::tempdir;

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-06-01T08:30:00+00:00").unwrap()
    }

    fn run() -> RunMetadata {
        RunMetadata::new(
            "20240601-083000-00000000",
            &now(),
            DatasetRef {
                path: "d.csv".to_string(),
                fingerprint_sha256: "0".repeat(64),
            },
            "label",
            "random_forest",
            LegacyMetrics::new(0.9, 10, 7),
            0,
            "artifacts/model.pkl",
        )
    }

    fn importance_artifact(n: usize) -> FeatureImportanceV1 {
        let names: Vec<String> = (0..n).map(|i| format!("f{}", i)).collect();
        FeatureImportanceV1 {
            schema_version: "feature_importance.v1".to_string(),
            model_family: ModelFamily::RandomForest,
            importance_type: "gini_importance".to_string(),
            num_features: n,
            features_by_importance: names
                .iter()
                .enumerate()
                .map(|(i, name)| RankedImportance {
                    name: name.clone(),
                    importance: 1.0 / n as f64,
                    rank: i + 1,
                })
                .collect(),
            features_by_original_order: names
                .iter()
                .enumerate()
                .map(|(i, name)| IndexedImportance {
                    name: name.clone(),
                    importance: 1.0 / n as f64,
                    index: i,
                })
                .collect(),
            top_k: names.clone(),
        }
    }

    #[test]
    fn test_empty_when_nothing_referenced() {
        let dir = tempdir().unwrap();
        let index = build_interpretability_index(&run(), dir.path(), &now());
        assert_eq!(index.available_artifacts, AvailableArtifacts::default());

        let value = serde_json::to_value(&index).unwrap();
        assert_eq!(value["available_artifacts"], serde_json::json!({}));
        assert_eq!(value["schema_version"], "interpretability.index.v1");
    }

    #[test]
    fn test_referenced_but_missing_file_is_skipped() {
        let dir = tempdir().unwrap();
        let metadata = run().with_metrics_v1("metrics.v1", "classification.base.v1", "metrics.v1.json");
        let index = build_interpretability_index(&metadata, dir.path(), &now());
        assert!(index.available_artifacts.metrics_v1.is_none());
    }

    #[test]
    fn test_entries_and_truncated_summaries() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("metrics.v1.json"), "{}\n").unwrap();
        crate::artifacts::feature_importance::write_feature_importance(&importance_artifact(7), dir.path()).unwrap();

        let metadata = run()
            .with_metrics_v1("metrics.v1", "classification.proba.v1", "metrics.v1.json")
            .with_feature_importance("feature_importance.v1", "artifacts/feature_importance.v1.json");
        let index = build_interpretability_index(&metadata, dir.path(), &now());

        let metrics = index.available_artifacts.metrics_v1.unwrap();
        assert_eq!(metrics.summary.metrics_profile, "classification.proba.v1");
        assert_eq!(metrics.summary.accuracy, 0.9);

        let fi = index.available_artifacts.feature_importance_v1.unwrap();
        assert_eq!(fi.path, "artifacts/feature_importance.v1.json");
        assert_eq!(fi.summary.top_k.len(), 5);
        assert!(index.available_artifacts.linear_coefficients_v1.is_none());
    }

    #[test]
    fn test_write_location() {
        let dir = tempdir().unwrap();
        let index = build_interpretability_index(&run(), dir.path(), &now());
        let path = write_interpretability_index(&index, dir.path()).unwrap();
        assert!(path.ends_with("artifacts/interpretability.index.v1.json"));
    }
}
