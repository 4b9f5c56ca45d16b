//! Run metadata (`run.json`) and the legacy `metrics.json`
//!
//! Optional groups are structs wrapped in `Option` and flattened into the
//! document, so a group is either fully present or absent. Nothing is
//! written as `null`.

use super::canonical::write_canonical_json;
use crate::config::format_timestamp;
use crate::error::{Result, RunForgeError};
use crate::resolver::{ParamSource, ProfileInfo};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

pub const RUNFORGE_VERSION: &str = "0.3.6.0";
pub const RUN_SCHEMA_VERSION: &str = "run.v0.3.6";
pub const RUN_JSON_FILE: &str = "run.json";
pub const LEGACY_METRICS_FILE: &str = "metrics.json";

/// `YYYYMMDD-HHMMSS-<8 hex>`; the suffix is derived from the dataset
/// fingerprint and label column.
pub fn generate_run_id(dataset_fingerprint: &str, label_column: &str, at: &DateTime<FixedOffset>) -> String {
    let digest = Sha256::digest(format!("{}:{}", dataset_fingerprint, label_column).as_bytes());
    let hex = format!("{:x}", digest);
    format!("{}-{}", at.format("%Y%m%d-%H%M%S"), &hex[..8])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRef {
    pub path: String,
    pub fingerprint_sha256: String,
}

/// The frozen three-key metrics contract, also embedded in `run.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LegacyMetrics {
    pub accuracy: f64,
    pub num_samples: usize,
    pub num_features: usize,
}

impl LegacyMetrics {
    /// Accuracy is rounded to four decimals
    pub fn new(accuracy: f64, num_samples: usize, num_features: usize) -> Self {
        Self {
            accuracy: (accuracy * 10_000.0).round() / 10_000.0,
            num_samples,
            num_features,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunArtifacts {
    pub model_pkl: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_v1_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importance_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linear_coefficients_json: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsV1Pointer {
    pub schema_version: String,
    pub metrics_profile: String,
    pub artifact_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureImportancePointer {
    pub feature_importance_schema_version: String,
    pub feature_importance_artifact: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearCoefficientsPointer {
    pub linear_coefficients_schema_version: String,
    pub linear_coefficients_artifact: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProfile {
    pub profile_name: String,
    pub profile_version: String,
    pub expanded_parameters_hash: String,
}

impl From<ProfileInfo> for RunProfile {
    fn from(info: ProfileInfo) -> Self {
        Self {
            profile_name: info.name,
            profile_version: info.version,
            expanded_parameters_hash: info.expanded_parameters_hash,
        }
    }
}

/// Contents of `run.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub runforge_version: String,
    pub schema_version: String,
    pub created_at: String,
    pub dataset: DatasetRef,
    pub label_column: String,
    pub model_family: String,
    pub num_samples: usize,
    pub num_features: usize,
    pub dropped_rows_missing_values: usize,
    pub metrics: LegacyMetrics,
    pub artifacts: RunArtifacts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_v1: Option<MetricsV1Pointer>,
    #[serde(flatten)]
    pub feature_importance: Option<FeatureImportancePointer>,
    #[serde(flatten)]
    pub linear_coefficients: Option<LinearCoefficientsPointer>,
    #[serde(flatten)]
    pub profile: Option<RunProfile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hyperparameters: Vec<ParamSource>,
}

impl RunMetadata {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: impl Into<String>,
        created_at: &DateTime<FixedOffset>,
        dataset: DatasetRef,
        label_column: impl Into<String>,
        model_family: impl Into<String>,
        metrics: LegacyMetrics,
        dropped_rows: usize,
        model_pkl: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            runforge_version: RUNFORGE_VERSION.to_string(),
            schema_version: RUN_SCHEMA_VERSION.to_string(),
            created_at: format_timestamp(created_at),
            dataset,
            label_column: label_column.into(),
            model_family: model_family.into(),
            num_samples: metrics.num_samples,
            num_features: metrics.num_features,
            dropped_rows_missing_values: dropped_rows,
            metrics,
            artifacts: RunArtifacts {
                model_pkl: model_pkl.into(),
                metrics_v1_json: None,
                feature_importance_json: None,
                linear_coefficients_json: None,
            },
            metrics_v1: None,
            feature_importance: None,
            linear_coefficients: None,
            profile: None,
            hyperparameters: Vec::new(),
        }
    }

    pub fn with_metrics_v1(
        mut self,
        schema_version: impl Into<String>,
        metrics_profile: impl Into<String>,
        artifact_path: impl Into<String>,
    ) -> Self {
        let artifact_path = artifact_path.into();
        self.artifacts.metrics_v1_json = Some(artifact_path.clone());
        self.metrics_v1 = Some(MetricsV1Pointer {
            schema_version: schema_version.into(),
            metrics_profile: metrics_profile.into(),
            artifact_path,
        });
        self
    }

    pub fn with_feature_importance(mut self, schema_version: impl Into<String>, artifact_path: impl Into<String>) -> Self {
        let artifact_path = artifact_path.into();
        self.artifacts.feature_importance_json = Some(artifact_path.clone());
        self.feature_importance = Some(FeatureImportancePointer {
            feature_importance_schema_version: schema_version.into(),
            feature_importance_artifact: artifact_path,
        });
        self
    }

    pub fn with_linear_coefficients(mut self, schema_version: impl Into<String>, artifact_path: impl Into<String>) -> Self {
        let artifact_path = artifact_path.into();
        self.artifacts.linear_coefficients_json = Some(artifact_path.clone());
        self.linear_coefficients = Some(LinearCoefficientsPointer {
            linear_coefficients_schema_version: schema_version.into(),
            linear_coefficients_artifact: artifact_path,
        });
        self
    }

    pub fn with_profile(mut self, profile: Option<ProfileInfo>) -> Self {
        self.profile = profile.map(RunProfile::from);
        self
    }

    pub fn with_hyperparameters(mut self, hyperparameters: Vec<ParamSource>) -> Self {
        self.hyperparameters = hyperparameters;
        self
    }
}

/// Write `run.json` into `run_dir`, creating the directory if needed
pub fn write_run_metadata(metadata: &RunMetadata, run_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(run_dir)?;
    let path = run_dir.join(RUN_JSON_FILE);
    write_canonical_json(&path, metadata)?;
    Ok(path)
}

pub fn read_run_metadata(run_dir: &Path) -> Result<RunMetadata> {
    let path = run_dir.join(RUN_JSON_FILE);
    if !path.exists() {
        return Err(RunForgeError::RunNotFound(format!(
            "run.json not found in {}",
            run_dir.display()
        )));
    }
    let text = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn write_legacy_metrics(metrics: &LegacyMetrics, run_dir: &Path) -> Result<PathBuf> {
    let path = run_dir.join(LEGACY_METRICS_FILE);
    write_canonical_json(&path, metrics)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperparams::ParamValue;
    use crate::resolver::Source;
    use serde_json::Value;
    use tempfile::tempdir;

    fn fixed_time() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-01-01T12:00:00+00:00").unwrap()
    }

    fn base() -> RunMetadata {
        RunMetadata::new(
            "20240101-120000-abcdef12",
            &fixed_time(),
            DatasetRef {
                path: "data.csv".to_string(),
                fingerprint_sha256: "f".repeat(64),
            },
            "label",
            "logistic_regression",
            LegacyMetrics::new(0.87654, 80, 3),
            2,
            "artifacts/model.pkl",
        )
    }

    #[test]
    fn test_run_id_format() {
        let id = generate_run_id("abc", "label", &fixed_time());
        assert!(id.starts_with("20240101-120000-"));
        assert_eq!(id.len(), "20240101-120000-".len() + 8);
        assert_eq!(id, generate_run_id("abc", "label", &fixed_time()));
        assert_ne!(id, generate_run_id("abc", "target", &fixed_time()));
    }

    #[test]
    fn test_legacy_metrics_rounding() {
        let metrics = LegacyMetrics::new(0.87654, 10, 2);
        assert_eq!(metrics.accuracy, 0.8765);
        let value = serde_json::to_value(&metrics).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_optional_groups_omitted() {
        let value = serde_json::to_value(base()).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "profile_name",
            "profile_version",
            "expanded_parameters_hash",
            "hyperparameters",
            "metrics_v1",
            "feature_importance_schema_version",
            "linear_coefficients_artifact",
        ] {
            assert!(!obj.contains_key(key), "unexpected key {}", key);
        }
        assert_eq!(value["artifacts"].as_object().unwrap().len(), 1);
        assert_eq!(value["created_at"], "2024-01-01T12:00:00+00:00");
    }

    #[test]
    fn test_optional_groups_present_together() {
        let metadata = base()
            .with_profile(Some(ProfileInfo {
                name: "fast".to_string(),
                version: "1.0".to_string(),
                expanded_parameters_hash: "a".repeat(64),
            }))
            .with_metrics_v1("metrics.v1", "classification.proba.v1", "metrics.v1.json")
            .with_linear_coefficients("linear_coefficients.v1", "artifacts/linear_coefficients.v1.json")
            .with_hyperparameters(vec![ParamSource {
                name: "max_iter".to_string(),
                value: ParamValue::Int(50),
                source: Source::Profile,
            }]);

        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["profile_name"], "fast");
        assert_eq!(value["profile_version"], "1.0");
        assert_eq!(value["metrics_v1"]["artifact_path"], "metrics.v1.json");
        assert_eq!(value["artifacts"]["metrics_v1_json"], "metrics.v1.json");
        assert_eq!(
            value["artifacts"]["linear_coefficients_json"],
            "artifacts/linear_coefficients.v1.json"
        );
        assert_eq!(value["hyperparameters"][0]["source"], "profile");
        assert!(value.get("feature_importance_artifact").is_none());
    }

    #[test]
    fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let metadata = base().with_feature_importance("feature_importance.v1", "artifacts/feature_importance.v1.json");
        let path = write_run_metadata(&metadata, dir.path()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("\n"));
        let raw: Value = serde_json::from_str(&text).unwrap();
        let keys: Vec<&String> = raw.as_object().unwrap().keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);

        let loaded = read_run_metadata(dir.path()).unwrap();
        assert_eq!(loaded, metadata);
    }

    #[test]
    fn test_read_missing() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_run_metadata(dir.path()),
            Err(RunForgeError::RunNotFound(_))
        ));
    }
}
