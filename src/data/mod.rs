//! Dataset loading and inspection
//!
//! CSV files are read line by line: the header names the columns, a `label`
//! column is required, rows with an empty cell are dropped and counted, and
//! every remaining cell must be numeric. Numeric coercion goes through
//! polars `Series` casts.

use crate::diagnostics::DiagnosticsCollector;
use crate::error::{Result, RunForgeError};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Label column name used by training runs
pub const LABEL_COLUMN: &str = "label";

/// SHA-256 of the raw file bytes, lowercase hex.
///
/// Any byte change, including line endings, changes the fingerprint.
pub fn compute_dataset_fingerprint(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn split_line(line: &str) -> Vec<String> {
    line.trim().split(',').map(|cell| cell.trim().to_string()).collect()
}

/// Check the header for a usable label column. Problems are recorded in
/// `diagnostics`.
pub fn check_columns(header: &[String], label_column: &str, diagnostics: &mut DiagnosticsCollector) {
    if !header.iter().any(|h| h == label_column) {
        diagnostics.add_label_not_found(label_column, header);
    } else if header.len() == 1 {
        diagnostics.add_label_only_dataset(label_column);
    }
}

/// Features and labels parsed from a CSV file
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    /// Header order, label excluded
    pub feature_names: Vec<String>,
    pub rows_dropped: usize,
    pub diagnostics: DiagnosticsCollector,
}

impl LoadedDataset {
    pub fn num_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }
}

/// Load a CSV with a `label` column into a feature matrix and label vector.
pub fn load_csv(path: &Path) -> Result<LoadedDataset> {
    load_csv_with_label(path, LABEL_COLUMN)
}

pub fn load_csv_with_label(path: &Path, label_column: &str) -> Result<LoadedDataset> {
    let content = std::fs::read_to_string(path)?;
    let mut lines = content.lines();

    let header = match lines.next() {
        Some(line) if !line.trim().is_empty() => split_line(line),
        _ => {
            return Err(RunForgeError::DataError(
                "CSV must have header row and at least one data row".to_string(),
            ))
        }
    };

    let mut diagnostics = DiagnosticsCollector::new();
    check_columns(&header, label_column, &mut diagnostics);
    if let Some(error) = diagnostics.all().iter().find(|d| d.is_error()) {
        return Err(RunForgeError::DataError(error.message.clone()));
    }

    // Per-column cells of the kept rows, plus each row's 1-based line number
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); header.len()];
    let mut line_numbers: Vec<usize> = Vec::new();
    let mut rows_dropped = 0;

    for (offset, line) in lines.enumerate() {
        let line_number = offset + 2;
        if line.trim().is_empty() {
            continue;
        }

        let parts = split_line(line);
        if parts.len() != header.len() {
            return Err(RunForgeError::DataError(format!(
                "Row {}: expected {} columns, got {}",
                line_number,
                header.len(),
                parts.len()
            )));
        }

        if parts.iter().any(|p| p.is_empty()) {
            rows_dropped += 1;
            continue;
        }

        for (column, value) in cells.iter_mut().zip(parts) {
            column.push(value);
        }
        line_numbers.push(line_number);
    }

    diagnostics.add_missing_values_dropped(rows_dropped);
    if rows_dropped > 0 {
        info!(rows_dropped, "Dropped rows with missing values");
    }

    if line_numbers.is_empty() {
        diagnostics.add_zero_rows();
        return Err(RunForgeError::DataError(
            "CSV has no valid data rows after dropping missing values".to_string(),
        ));
    }

    let mut numeric: Vec<Vec<f64>> = Vec::with_capacity(header.len());
    for (name, column) in header.iter().zip(&cells) {
        numeric.push(column_to_f64(name, column, &line_numbers)?);
    }

    let label_idx = header.iter().position(|h| h == label_column).unwrap_or(0);
    let feature_idx: Vec<usize> = (0..header.len()).filter(|&i| i != label_idx).collect();
    let feature_names: Vec<String> = feature_idx.iter().map(|&i| header[i].clone()).collect();

    let n_rows = line_numbers.len();
    let x = Array2::from_shape_fn((n_rows, feature_idx.len()), |(r, c)| numeric[feature_idx[c]][r]);
    let y = Array1::from_vec(numeric[label_idx].clone());

    debug!(
        path = %path.display(),
        samples = n_rows,
        features = feature_names.len(),
        "Loaded dataset"
    );

    Ok(LoadedDataset {
        x,
        y,
        feature_names,
        rows_dropped,
        diagnostics,
    })
}

/// Cast one string column to f64, naming the first cell that is not a number.
fn column_to_f64(name: &str, column: &[String], line_numbers: &[usize]) -> Result<Vec<f64>> {
    let raw: Vec<&str> = column.iter().map(String::as_str).collect();
    let series = Series::new(name.into(), raw.as_slice());
    let casted = series.cast(&DataType::Float64)?;

    let mut values = Vec::with_capacity(column.len());
    for (i, value) in casted.f64()?.into_iter().enumerate() {
        match value {
            Some(v) => values.push(v),
            None => {
                return Err(RunForgeError::DataError(format!(
                    "Non-numeric value in column '{}' at row {}",
                    name, line_numbers[i]
                )))
            }
        }
    }
    Ok(values)
}

/// Read-only summary of a dataset, produced without training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInspection {
    pub dataset_path: String,
    pub fingerprint_sha256: String,
    pub columns: Vec<String>,
    /// Non-empty lines after the header
    pub num_rows: usize,
    pub label_column: String,
    pub num_features_excluding_label: usize,
    pub label_present: bool,
}

/// Inspect a CSV without modifying or training on it.
pub fn inspect_dataset(path: &Path, label_column: &str) -> Result<DatasetInspection> {
    if !path.exists() {
        return Err(RunForgeError::DataError(format!(
            "Dataset not found: {}",
            path.display()
        )));
    }

    let fingerprint = compute_dataset_fingerprint(path)?;
    let content = std::fs::read_to_string(path)?;
    let mut lines = content.lines();

    let columns = match lines.next() {
        Some(line) => split_line(line),
        None => return Err(RunForgeError::DataError("CSV file is empty".to_string())),
    };
    let num_rows = lines.filter(|line| !line.trim().is_empty()).count();

    let label_present = columns.iter().any(|c| c == label_column);
    let num_features_excluding_label = if label_present {
        columns.len() - 1
    } else {
        columns.len()
    };

    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    Ok(DatasetInspection {
        dataset_path: resolved.display().to_string(),
        fingerprint_sha256: fingerprint,
        columns,
        num_rows,
        label_column: label_column.to_string(),
        num_features_excluding_label,
        label_present,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticCode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_csv_label_not_last() {
        let file = csv("label,a,b\n1,0.5,2\n0,1.5,3\n");
        let data = load_csv(file.path()).unwrap();

        assert_eq!(data.feature_names, vec!["a", "b"]);
        assert_eq!(data.y.to_vec(), vec![1.0, 0.0]);
        assert_eq!(data.x.row(1).to_vec(), vec![1.5, 3.0]);
        assert_eq!(data.rows_dropped, 0);
    }

    #[test]
    fn test_missing_values_dropped() {
        let file = csv("a,label\n1,0\n,1\n\n3,\n4,1\n");
        let data = load_csv(file.path()).unwrap();

        assert_eq!(data.num_samples(), 2);
        assert_eq!(data.rows_dropped, 2);
        assert_eq!(data.diagnostics.all()[0].code, DiagnosticCode::MissingValuesDropped);
    }

    #[test]
    fn test_missing_label_column() {
        let file = csv("a,b\n1,2\n");
        let err = load_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("Label column 'label' not found"));
    }

    #[test]
    fn test_non_numeric_value() {
        let file = csv("a,label\n1,0\nx,1\n");
        let err = load_csv(file.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Data error: Non-numeric value in column 'a' at row 3"
        );
    }

    #[test]
    fn test_column_count_mismatch() {
        let file = csv("a,label\n1,0,5\n");
        let err = load_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("Row 2: expected 2 columns, got 3"));
    }

    #[test]
    fn test_all_rows_dropped() {
        let file = csv("a,label\n,0\n");
        assert!(matches!(load_csv(file.path()), Err(RunForgeError::DataError(_))));
    }

    #[test]
    fn test_fingerprint_is_sha256_of_bytes() {
        let file = csv("abc");
        assert_eq!(
            compute_dataset_fingerprint(file.path()).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_inspect_dataset() {
        let file = csv("x1,x2,label\n1,2,0\n\n3,4,1\n");
        let result = inspect_dataset(file.path(), "label").unwrap();

        assert_eq!(result.columns, vec!["x1", "x2", "label"]);
        assert_eq!(result.num_rows, 2);
        assert!(result.label_present);
        assert_eq!(result.num_features_excluding_label, 2);
    }

    #[test]
    fn test_inspect_dataset_without_label() {
        let file = csv("x1,x2\n1,2\n");
        let result = inspect_dataset(file.path(), "target").unwrap();
        assert!(!result.label_present);
        assert_eq!(result.num_features_excluding_label, 2);
    }
}
