//! Structured run diagnostics
//!
//! Machine-readable records explaining why a run behaved the way it did,
//! e.g. rows dropped for missing values or an artifact that was skipped.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    MissingValuesDropped,
    LabelNotFound,
    LabelTypeInvalid,
    ZeroRows,
    ZeroFeatures,
    LabelOnlyDataset,
    FeatureImportanceUnsupportedModel,
    FeatureNamesUnavailable,
    LinearCoefficientsUnsupportedModel,
    CoefficientsMissingOnArtifact,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::MissingValuesDropped => "MISSING_VALUES_DROPPED",
            DiagnosticCode::LabelNotFound => "LABEL_NOT_FOUND",
            DiagnosticCode::LabelTypeInvalid => "LABEL_TYPE_INVALID",
            DiagnosticCode::ZeroRows => "ZERO_ROWS",
            DiagnosticCode::ZeroFeatures => "ZERO_FEATURES",
            DiagnosticCode::LabelOnlyDataset => "LABEL_ONLY_DATASET",
            DiagnosticCode::FeatureImportanceUnsupportedModel => "FEATURE_IMPORTANCE_UNSUPPORTED_MODEL",
            DiagnosticCode::FeatureNamesUnavailable => "FEATURE_NAMES_UNAVAILABLE",
            DiagnosticCode::LinearCoefficientsUnsupportedModel => "LINEAR_COEFFICIENTS_UNSUPPORTED_MODEL",
            DiagnosticCode::CoefficientsMissingOnArtifact => "COEFFICIENTS_MISSING_ON_ARTIFACT",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Outcome of an optional artifact extraction
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    Ready(T),
    Unavailable(Diagnostic),
}

impl<T> Extraction<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Extraction::Ready(value) => Some(value),
            Extraction::Unavailable(_) => None,
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Extraction::Ready(_) => None,
            Extraction::Unavailable(diagnostic) => Some(diagnostic),
        }
    }
}

/// Collects diagnostics in insertion order
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Recorded only when at least one row was dropped
    pub fn add_missing_values_dropped(&mut self, rows_dropped: usize) {
        if rows_dropped > 0 {
            self.add(
                Diagnostic::new(
                    DiagnosticCode::MissingValuesDropped,
                    Severity::Info,
                    format!("Dropped {} rows with missing values", rows_dropped),
                )
                .with_details(json!({ "rows_dropped": rows_dropped })),
            );
        }
    }

    pub fn add_label_not_found(&mut self, expected_label: &str, available_columns: &[String]) {
        self.add(
            Diagnostic::new(
                DiagnosticCode::LabelNotFound,
                Severity::Error,
                format!("Label column '{}' not found in dataset", expected_label),
            )
            .with_details(json!({
                "expected_label": expected_label,
                "available_columns": available_columns,
            })),
        );
    }

    pub fn add_label_type_invalid(&mut self, label_column: &str, found_type: &str, expected_types: &[&str]) {
        self.add(
            Diagnostic::new(
                DiagnosticCode::LabelTypeInvalid,
                Severity::Error,
                format!("Label column '{}' has invalid type: {}", label_column, found_type),
            )
            .with_details(json!({
                "label_column": label_column,
                "found_type": found_type,
                "expected_types": expected_types,
            })),
        );
    }

    pub fn add_zero_rows(&mut self) {
        self.add(Diagnostic::new(
            DiagnosticCode::ZeroRows,
            Severity::Error,
            "Dataset has zero rows after processing",
        ));
    }

    pub fn add_zero_features(&mut self) {
        self.add(Diagnostic::new(
            DiagnosticCode::ZeroFeatures,
            Severity::Error,
            "Dataset has zero features (only label column present)",
        ));
    }

    pub fn add_label_only_dataset(&mut self, label_column: &str) {
        self.add(
            Diagnostic::new(
                DiagnosticCode::LabelOnlyDataset,
                Severity::Error,
                "Dataset contains only the label column with no features",
            )
            .with_details(json!({ "label_column": label_column })),
        );
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }
}
