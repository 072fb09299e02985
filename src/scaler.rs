use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::{PipelineErr, Result};

/// Standardizes features by removing the mean and scaling to unit variance.
///
/// The parameters are learned once with `fit` and then applied unchanged by `transform`.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Array1<f32>,
    scale: Array1<f32>,
}

impl StandardScaler {
    /// Learns the per-feature mean and population standard deviation of `x`.
    ///
    /// Features with zero deviation get a scale of 1, so they are only centered.
    ///
    /// # Errors
    /// If `x` has no rows.
    pub fn fit(x: ArrayView2<f32>) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(PipelineErr::EmptyDataset);
        }

        let n = x.nrows() as f64;
        let mut mean = Array1::zeros(x.ncols());
        let mut scale = Array1::zeros(x.ncols());

        for (j, column) in x.axis_iter(Axis(1)).enumerate() {
            let mu = column.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
            let var = column
                .iter()
                .map(|&v| (f64::from(v) - mu).powi(2))
                .sum::<f64>()
                / n;

            let std = var.sqrt();
            mean[j] = mu as f32;
            scale[j] = if std > 0. { std as f32 } else { 1. };
        }

        debug!(features = x.ncols(), samples = x.nrows(); "fitted scaler");

        Ok(Self { mean, scale })
    }

    /// Rebuilds a scaler from its learned parameters.
    ///
    /// # Errors
    /// If the lengths differ or a scale isn't a positive finite number.
    pub fn from_parts(mean: Vec<f32>, scale: Vec<f32>) -> Result<Self> {
        if mean.len() != scale.len() {
            return Err(PipelineErr::FeatureMismatch {
                got: scale.len(),
                expected: mean.len(),
            });
        }

        if scale.iter().any(|&s| !(s.is_finite() && s > 0.)) {
            return Err(PipelineErr::ModelFile(
                "scaler scales must be positive".to_string(),
            ));
        }

        Ok(Self {
            mean: Array1::from(mean),
            scale: Array1::from(scale),
        })
    }

    /// Scales `x` with the learned parameters.
    ///
    /// # Errors
    /// If `x` doesn't have as many columns as the data the scaler was fitted on.
    pub fn transform(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.n_features() {
            return Err(PipelineErr::FeatureMismatch {
                got: x.ncols(),
                expected: self.n_features(),
            });
        }

        let mut out = x.to_owned();
        out -= &self.mean;
        out /= &self.scale;

        Ok(out)
    }

    /// Fits a scaler on `x` and returns it along with the scaled `x`.
    pub fn fit_transform(x: ArrayView2<f32>) -> Result<(Self, Array2<f32>)> {
        let scaler = Self::fit(x)?;
        let scaled = scaler.transform(x)?;
        Ok((scaler, scaled))
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> ArrayView1<'_, f32> {
        self.mean.view()
    }

    pub fn scale(&self) -> ArrayView1<'_, f32> {
        self.scale.view()
    }
}
