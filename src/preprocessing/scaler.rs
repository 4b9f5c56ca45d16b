//! Feature standardization

use crate::error::{Result, RunForgeError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Z-score scaling: `(x - mean) / std`, population std.
///
/// Constant columns get a scale of 1 so they map to zero instead of NaN.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(RunForgeError::DataError(
                "Cannot fit scaler on zero samples".to_string(),
            ));
        }

        let mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 && s.is_finite() { s } else { 1.0 });

        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(mean), Some(scale)) => (mean, scale),
            _ => return Err(RunForgeError::ModelNotFitted),
        };
        if x.ncols() != mean.len() {
            return Err(RunForgeError::ShapeError {
                expected: format!("{} features", mean.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok((x - mean) / scale)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [3.0, 10.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        assert_eq!(scaled, array![[-1.0, 0.0], [1.0, 0.0]]);
        assert_eq!(scaler.scale().unwrap()[1], 1.0);
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(RunForgeError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_feature_count_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0], [2.0, 3.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(RunForgeError::ShapeError { .. })
        ));
    }
}
