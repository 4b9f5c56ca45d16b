//! End-to-end training run
//!
//! Resolve and validate hyperparameters, load the dataset, fit the
//! pipeline on an 80/20 split, then write every artifact of the run.
//! Provenance is updated last and its failure never fails the run.

use super::estimator::{create_estimator, Classifier, ModelFamily};
use super::pipeline::Pipeline;
use super::split::train_val_split;
use crate::artifacts::feature_importance::{extract_feature_importance, write_feature_importance};
use crate::artifacts::interpretability::{build_interpretability_index, write_interpretability_index};
use crate::artifacts::linear_coefficients::{extract_linear_coefficients, write_linear_coefficients};
use crate::artifacts::metadata::{
    generate_run_id, write_legacy_metrics, write_run_metadata, DatasetRef, LegacyMetrics, RunMetadata,
};
use crate::artifacts::metrics_v1::{compute_metrics_v1, write_metrics_v1, METRICS_V1_FILE};
use crate::artifacts::{ARTIFACTS_DIR, MODEL_FILE};
use crate::config::{get_preset, PresetDefaults, RunnerSettings};
use crate::data::{compute_dataset_fingerprint, load_csv, LABEL_COLUMN};
use crate::diagnostics::{Diagnostic, Extraction};
use crate::error::{Result, RunForgeError};
use crate::hyperparams::{HyperparamValidator, ParamValue, TypedHyperparameters};
use crate::params::RawParams;
use crate::provenance::{find_runforge_dir, relative_slash_path, ProvenanceStore, RunEntry};
use crate::resolver::{get_param_provenance, ParamResolver, ParamSource, ResolvedConfig};
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What to train and where to put it
#[derive(Debug, Clone)]
pub struct TrainRequest {
    pub preset_id: String,
    pub out_dir: PathBuf,
    /// Falls back to the preset seed
    pub seed: Option<u64>,
    pub device: String,
    pub model_family: String,
    pub cli_params: RawParams,
    pub profile_name: Option<String>,
}

impl TrainRequest {
    pub fn new(preset_id: impl Into<String>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            preset_id: preset_id.into(),
            out_dir: out_dir.into(),
            seed: None,
            device: "cpu".to_string(),
            model_family: ModelFamily::LogisticRegression.as_str().to_string(),
            cli_params: RawParams::new(),
            profile_name: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn with_model_family(mut self, family: impl Into<String>) -> Self {
        self.model_family = family.into();
        self
    }

    pub fn with_cli_params(mut self, params: RawParams) -> Self {
        self.cli_params = params;
        self
    }

    pub fn with_profile(mut self, profile_name: impl Into<String>) -> Self {
        self.profile_name = Some(profile_name.into());
        self
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub model_family: ModelFamily,
    pub profile_name: Option<String>,
    pub seed: u64,
    pub accuracy: f64,
    pub metrics_profile: String,
    pub num_samples: usize,
    pub num_features: usize,
    pub rows_dropped: usize,
    pub model_path: PathBuf,
    pub metrics_path: PathBuf,
    /// Index file that received the entry, if any
    pub provenance_index: Option<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs training requests against one set of settings
#[derive(Debug, Clone)]
pub struct TrainingRunner {
    settings: RunnerSettings,
    resolver: ParamResolver,
    validator: HyperparamValidator,
}

impl TrainingRunner {
    pub fn new(settings: RunnerSettings) -> Self {
        Self {
            settings,
            resolver: ParamResolver::default(),
            validator: HyperparamValidator::builtin(),
        }
    }

    pub fn with_resolver(mut self, resolver: ParamResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_validator(mut self, validator: HyperparamValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    pub fn run(&self, request: &TrainRequest) -> Result<RunOutcome> {
        let preset = get_preset(&request.preset_id)?;
        let defaults = &preset.defaults;

        let resolved = self.resolver.resolve(
            &request.model_family,
            Some(&request.cli_params),
            request.profile_name.as_deref(),
        )?;
        let family: ModelFamily = resolved.model_family.parse()?;
        let hyperparams = resolved.into_typed(&self.validator)?;
        let seed = request.seed.unwrap_or(defaults.seed);

        if request.device != "cpu" {
            warn!(device = %request.device, "Only CPU training is available, continuing on cpu");
        }

        let out_dir = request.out_dir.as_path();
        let artifacts_dir = out_dir.join(ARTIFACTS_DIR);
        fs::create_dir_all(&artifacts_dir)?;

        let dataset_path = self.settings.require_dataset()?;
        if !dataset_path.exists() {
            return Err(RunForgeError::DataError(format!(
                "Dataset not found: {}",
                dataset_path.display()
            )));
        }

        info!(
            preset = preset.id,
            model = family.display_name(),
            profile = resolved.profile_name().unwrap_or("-"),
            seed,
            dataset = %dataset_path.display(),
            output = %out_dir.display(),
            "Starting training run"
        );

        let fingerprint = compute_dataset_fingerprint(dataset_path)?;
        debug!(fingerprint = %&fingerprint[..16], "Dataset fingerprinted");

        let dataset = load_csv(dataset_path)?;
        let mut diagnostics: Vec<Diagnostic> = dataset.diagnostics.all().to_vec();
        info!(
            samples = dataset.num_samples(),
            features = dataset.num_features(),
            dropped = dataset.rows_dropped,
            "Dataset loaded"
        );

        let split = train_val_split(&dataset.x, &dataset.y, seed)?;
        info!(
            train = split.x_train.nrows(),
            val = split.x_val.nrows(),
            stratified = split.stratified,
            "Training {} (80/20 split)",
            family.display_name()
        );

        let effective = apply_preset_defaults(family, hyperparams.clone(), defaults);
        let mut pipeline = Pipeline::new(create_estimator(family.as_str(), seed, &effective)?);
        fit_pipeline(&mut pipeline, &effective, defaults, &split.x_train, &split.y_train, &split.x_val, &split.y_val)?;
        let accuracy = pipeline.score(&split.x_val, &split.y_val)?;

        let model_path = artifacts_dir.join(MODEL_FILE);
        pipeline.save(&model_path)?;
        info!(path = %model_path.display(), "Model saved");

        let legacy = LegacyMetrics::new(accuracy, dataset.num_samples(), dataset.num_features());
        let metrics_path = write_legacy_metrics(&legacy, out_dir)?;

        let metrics_v1 = compute_metrics_v1(&pipeline, &split.x_val, &split.y_val)?;
        write_metrics_v1(&metrics_v1, out_dir)?;

        let created_at = self.settings.clock.now();
        let run_id = generate_run_id(&fingerprint, LABEL_COLUMN, &created_at);
        let dataset_ref = DatasetRef {
            path: dataset_path
                .canonicalize()
                .unwrap_or_else(|_| dataset_path.clone())
                .display()
                .to_string(),
            fingerprint_sha256: fingerprint.clone(),
        };

        let mut metadata = RunMetadata::new(
            &run_id,
            &created_at,
            dataset_ref,
            LABEL_COLUMN,
            family.as_str(),
            legacy,
            dataset.rows_dropped,
            format!("{}/{}", ARTIFACTS_DIR, MODEL_FILE),
        )
        .with_metrics_v1(
            metrics_v1.schema_version.clone(),
            metrics_v1.metrics_profile.as_str(),
            METRICS_V1_FILE,
        )
        .with_profile(resolved.profile.clone())
        .with_hyperparameters(recorded_hyperparameters(&resolved, &hyperparams));

        match extract_feature_importance(&pipeline, family, &dataset.feature_names) {
            Extraction::Ready(artifact) => {
                let path = write_feature_importance(&artifact, out_dir)?;
                metadata = metadata.with_feature_importance(artifact.schema_version.clone(), relative_artifact(&path, out_dir));
            }
            Extraction::Unavailable(diagnostic) => {
                debug!(code = %diagnostic.code, "Feature importance skipped");
                diagnostics.push(diagnostic);
            }
        }

        match extract_linear_coefficients(&pipeline, family, &dataset.feature_names) {
            Extraction::Ready(artifact) => {
                let path = write_linear_coefficients(&artifact, out_dir)?;
                metadata = metadata.with_linear_coefficients(artifact.schema_version.clone(), relative_artifact(&path, out_dir));
            }
            Extraction::Unavailable(diagnostic) => {
                debug!(code = %diagnostic.code, "Linear coefficients skipped");
                diagnostics.push(diagnostic);
            }
        }

        let run_json = write_run_metadata(&metadata, out_dir)?;
        info!(path = %run_json.display(), run_id = %run_id, "Metadata saved");

        let index = build_interpretability_index(&metadata, out_dir, &created_at);
        write_interpretability_index(&index, out_dir)?;

        let provenance_index = self.update_provenance(out_dir, &metadata);

        info!(
            run_id = %run_id,
            accuracy,
            metrics_profile = metrics_v1.metrics_profile.as_str(),
            "Training complete"
        );

        Ok(RunOutcome {
            run_id,
            run_dir: out_dir.to_path_buf(),
            model_family: family,
            profile_name: resolved.profile_name().map(str::to_string),
            seed,
            accuracy,
            metrics_profile: metrics_v1.metrics_profile.as_str().to_string(),
            num_samples: dataset.num_samples(),
            num_features: dataset.num_features(),
            rows_dropped: dataset.rows_dropped,
            model_path,
            metrics_path,
            provenance_index,
            diagnostics,
        })
    }

    /// Append the run to the workspace ledger; failures are logged only
    fn update_provenance(&self, out_dir: &Path, metadata: &RunMetadata) -> Option<PathBuf> {
        let runforge_dir = match &self.settings.runforge_dir {
            Some(dir) => Some(dir.canonicalize().unwrap_or_else(|_| dir.clone())),
            None => find_runforge_dir(out_dir),
        };
        let runforge_dir = match runforge_dir {
            Some(dir) => dir,
            None => {
                info!("Not in a .runforge workspace, skipping provenance index");
                return None;
            }
        };

        let store = ProvenanceStore::new(&runforge_dir);
        let result = append_entry(&store, out_dir, metadata);
        match result {
            Ok(()) => {
                info!(index = %store.index_path().display(), "Provenance index updated");
                Some(store.index_path())
            }
            Err(err) => {
                warn!(error = %err, "Could not update provenance index");
                None
            }
        }
    }
}

fn append_entry(store: &ProvenanceStore, out_dir: &Path, metadata: &RunMetadata) -> Result<()> {
    let out_dir = out_dir.canonicalize()?;
    let rel = relative_slash_path(&out_dir, store.dir()).ok_or_else(|| {
        RunForgeError::ConfigError(format!(
            "Run directory {} is not inside {}",
            out_dir.display(),
            store.dir().display()
        ))
    })?;
    let join = |tail: &str| {
        if rel.is_empty() {
            tail.to_string()
        } else {
            format!("{}/{}", rel, tail)
        }
    };

    store.append(RunEntry {
        run_id: metadata.run_id.clone(),
        created_at: metadata.created_at.clone(),
        dataset_fingerprint_sha256: metadata.dataset.fingerprint_sha256.clone(),
        label_column: metadata.label_column.clone(),
        run_dir: join("run.json"),
        model_pkl: join(&format!("{}/{}", ARTIFACTS_DIR, MODEL_FILE)),
        extra: Default::default(),
    })
}

fn relative_artifact(path: &Path, run_dir: &Path) -> String {
    relative_slash_path(path, run_dir).unwrap_or_else(|| path.display().to_string())
}

/// Fill preset-level knobs the user left unset.
///
/// Linear models take `C` from the preset regularization and `max_iter`
/// from the preset; logistic regression also takes the solver and warm
/// starts across epochs unless told otherwise.
pub fn apply_preset_defaults(
    family: ModelFamily,
    mut params: TypedHyperparameters,
    defaults: &PresetDefaults,
) -> TypedHyperparameters {
    let mut fill = |name: &str, value: ParamValue| {
        if !params.contains(name) {
            params.insert(name, value);
        }
    };

    match family {
        ModelFamily::LogisticRegression => {
            fill("C", ParamValue::Float(defaults.c()));
            fill("solver", ParamValue::Str(defaults.solver.to_string()));
            fill("max_iter", ParamValue::Int(defaults.max_iter as i64));
            fill("warm_start", ParamValue::Bool(true));
        }
        ModelFamily::LinearSvc => {
            fill("C", ParamValue::Float(defaults.c()));
            fill("max_iter", ParamValue::Int(defaults.max_iter as i64));
        }
        ModelFamily::RandomForest => {}
    }
    params
}

/// Fit, splitting logistic regression into warm-started epochs.
///
/// Intermediate epochs run `max(1, max_iter / epochs)` iterations and the
/// last one runs the full `max_iter`.
#[allow(clippy::too_many_arguments)]
fn fit_pipeline(
    pipeline: &mut Pipeline,
    params: &TypedHyperparameters,
    defaults: &PresetDefaults,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_val: &Array2<f64>,
    y_val: &Array1<f64>,
) -> Result<()> {
    if pipeline.clf.as_logistic_regression_mut().is_none() {
        return pipeline.fit(x_train, y_train);
    }

    let max_iter = params.usize_or("max_iter", defaults.max_iter);
    let epochs = defaults.epochs.max(1);
    for epoch in 1..=epochs {
        let iterations = if epoch == epochs {
            max_iter
        } else {
            (max_iter / epochs).max(1)
        };
        if let Some(lr) = pipeline.clf.as_logistic_regression_mut() {
            lr.max_iter = iterations;
        }
        pipeline.fit(x_train, y_train)?;
        let val_accuracy = pipeline.score(x_val, y_val)?;
        debug!(epoch, epochs, val_accuracy, "Epoch finished");
    }
    Ok(())
}

/// Parameter provenance with validated values in place of raw strings
fn recorded_hyperparameters(resolved: &ResolvedConfig, typed: &TypedHyperparameters) -> Vec<ParamSource> {
    get_param_provenance(resolved)
        .into_iter()
        .map(|mut entry| {
            if let Some(value) = typed.get(&entry.name) {
                entry.value = value.clone();
            }
            entry
        })
        .collect()
}
