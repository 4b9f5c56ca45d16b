//! Versioned JSON artifacts written for each run
//!
//! Every document is canonical JSON (sorted keys, 2-space indent, trailing
//! newline) under a fixed path inside the run directory.

pub mod canonical;
pub mod feature_importance;
pub mod inspect;
pub mod interpretability;
pub mod linear_coefficients;
pub mod metadata;
pub mod metrics_v1;

/// Sub-directory of a run holding the model and interpretability files
pub const ARTIFACTS_DIR: &str = "artifacts";
/// Trained pipeline blob inside [`ARTIFACTS_DIR`]
pub const MODEL_FILE: &str = "model.pkl";

pub use canonical::{to_canonical_compact, to_canonical_pretty, write_canonical_json};
pub use feature_importance::{extract_feature_importance, write_feature_importance, FeatureImportanceV1};
pub use inspect::{inspect_artifact, ArtifactInspection};
pub use interpretability::{build_interpretability_index, write_interpretability_index, InterpretabilityIndexV1};
pub use linear_coefficients::{extract_linear_coefficients, write_linear_coefficients, LinearCoefficientsV1};
pub use metadata::{
    generate_run_id, read_run_metadata, write_legacy_metrics, write_run_metadata, DatasetRef, LegacyMetrics,
    RunMetadata, RUNFORGE_VERSION, RUN_SCHEMA_VERSION,
};
pub use metrics_v1::{compute_metrics_v1, write_metrics_v1, MetricsProfile, MetricsV1};
