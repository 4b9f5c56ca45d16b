//! Read-only inspection of a trained `model.pkl`
//!
//! Reports pipeline structure only. No learned values leave this module.

use crate::error::Result;
use crate::provenance::relative_slash_path;
use crate::training::{Pipeline, StepInfo};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ARTIFACT_INSPECT_SCHEMA_VERSION: &str = "0.2.2.2";

/// Step types that transform features rather than predict
pub const PREPROCESSING_TYPES: &[&str] = &["StandardScaler", "MinMaxScaler", "RobustScaler", "Normalizer"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInspection {
    pub schema_version: String,
    pub artifact_path: String,
    pub pipeline_steps: Vec<StepInfo>,
    pub has_preprocessing: bool,
    pub step_count: usize,
}

pub fn has_preprocessing_steps(steps: &[StepInfo]) -> bool {
    steps
        .iter()
        .any(|step| PREPROCESSING_TYPES.contains(&step.type_name.as_str()))
}

/// Inspect the pipeline stored at `artifact_path`.
///
/// `artifact_path` in the result is relative to `base_path` with `/`
/// separators, or just the file name when no base is given or the
/// artifact lies outside it.
pub fn inspect_artifact(artifact_path: &Path, base_path: Option<&Path>) -> Result<ArtifactInspection> {
    let pipeline = Pipeline::load(artifact_path)?;
    let steps = pipeline.steps();

    let file_name = || {
        artifact_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    let relative = match base_path {
        Some(base) => relative_slash_path(artifact_path, base).unwrap_or_else(file_name),
        None => file_name(),
    };

    Ok(ArtifactInspection {
        schema_version: ARTIFACT_INSPECT_SCHEMA_VERSION.to_string(),
        artifact_path: relative,
        has_preprocessing: has_preprocessing_steps(&steps),
        step_count: steps.len(),
        pipeline_steps: steps,
    })
}
