//! Scaler + classifier pipeline and its on-disk artifact

use super::estimator::{split_type_name, Capabilities, Classifier, Estimator, LinearCoefficients};
use crate::error::{Result, RunForgeError};
use crate::preprocessing::StandardScaler;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Name of the classifier step, kept stable for artifact inspection
pub const CLASSIFIER_STEP: &str = "clf";
pub const SCALER_STEP: &str = "scaler";

/// One named step of a fitted pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub module: String,
}

/// `StandardScaler` followed by a classifier.
///
/// Coefficients reported by the classifier are in the scaled feature
/// space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub scaler: StandardScaler,
    pub clf: Estimator,
}

impl Pipeline {
    pub fn new(clf: Estimator) -> Self {
        Self {
            scaler: StandardScaler::new(),
            clf,
        }
    }

    /// Steps in execution order
    pub fn steps(&self) -> Vec<StepInfo> {
        let (scaler_type, scaler_module) = split_type_name(std::any::type_name::<StandardScaler>());
        let (clf_type, clf_module) = self.clf.type_info();
        vec![
            StepInfo {
                name: SCALER_STEP.to_string(),
                type_name: scaler_type.to_string(),
                module: scaler_module.to_string(),
            },
            StepInfo {
                name: CLASSIFIER_STEP.to_string(),
                type_name: clf_type.to_string(),
                module: clf_module.to_string(),
            },
        ]
    }

    /// Persist as a serde JSON blob
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RunForgeError::ArtifactLoadError(format!(
                "Artifact not found: {}",
                path.display()
            )));
        }
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(|e| {
            RunForgeError::ArtifactLoadError(format!(
                "Failed to load artifact '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

impl Classifier for Pipeline {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let scaled = self.scaler.fit_transform(x)?;
        self.clf.fit(&scaled, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.clf.predict(&self.scaler.transform(x)?)
    }

    fn classes(&self) -> &[f64] {
        self.clf.classes()
    }

    fn capabilities(&self) -> Capabilities {
        self.clf.capabilities()
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.clf.predict_proba(&self.scaler.transform(x)?)
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.clf.decision_function(&self.scaler.transform(x)?)
    }

    fn linear_coefficients(&self) -> Option<LinearCoefficients> {
        self.clf.linear_coefficients()
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.clf.feature_importances()
    }
}
