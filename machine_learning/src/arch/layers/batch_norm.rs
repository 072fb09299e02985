use ndarray::prelude::*;

use super::{ParamBlock, resize};
use crate::{MlErr, Result, arch::Mode};

/// Normalizes each feature of a batch and then scales and shifts it, `y = γ · x̂ + β`.
///
/// In `Mode::Train` the batch statistics are used and folded into the moving statistics, in
/// `Mode::Eval` the moving statistics are used instead. The moving statistics are not trained,
/// they're part of the layer's state.
#[derive(Clone, Debug)]
pub struct BatchNorm {
    dim: usize,
    momentum: f32,
    epsilon: f32,

    moving_mean: Array1<f32>,
    moving_variance: Array1<f32>,

    // Forward metadata
    mode: Mode,
    x_hat: Array2<f32>,
    inv_std: Array1<f32>,
    y: Array2<f32>,

    // Backward metadata
    d: Array2<f32>,
}

impl BatchNorm {
    /// Creates a new `BatchNorm` layer.
    ///
    /// # Arguments
    /// * `dim` - The amount of features to normalize.
    /// * `momentum` - How much of the moving statistics is kept on each training step.
    /// * `epsilon` - Added to the variance to avoid dividing by zero.
    ///
    /// # Returns
    /// A new `BatchNorm` or an error if `momentum` isn't in `[0, 1]` or `epsilon` isn't positive.
    pub fn new(dim: usize, momentum: f32, epsilon: f32) -> Result<Self> {
        if !(0. ..=1.).contains(&momentum) {
            return Err(MlErr::InvalidHyperparameter {
                name: "momentum",
                value: momentum,
            });
        }

        if epsilon.is_nan() || epsilon <= 0. {
            return Err(MlErr::InvalidHyperparameter {
                name: "epsilon",
                value: epsilon,
            });
        }

        let zeros = Array2::zeros((0, 0));

        Ok(Self {
            dim,
            momentum,
            epsilon,
            moving_mean: Array1::zeros(dim),
            moving_variance: Array1::ones(dim),
            mode: Mode::Eval,
            x_hat: zeros.clone(),
            inv_std: Array1::zeros(dim),
            y: zeros.clone(),
            d: zeros,
        })
    }

    pub fn size(&self) -> usize {
        2 * self.dim
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn momentum(&self) -> f32 {
        self.momentum
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn moving_mean(&self) -> ArrayView1<'_, f32> {
        self.moving_mean.view()
    }

    pub fn moving_variance(&self) -> ArrayView1<'_, f32> {
        self.moving_variance.view()
    }

    pub fn param_blocks(&self) -> Vec<ParamBlock> {
        vec![
            ParamBlock::new("gamma", vec![self.dim]),
            ParamBlock::new("beta", vec![self.dim]),
        ]
    }

    /// Overwrites one of the moving statistics.
    ///
    /// # Arguments
    /// * `name` - Either `moving_mean` or `moving_variance`.
    /// * `values` - The new values, one per feature.
    ///
    /// # Returns
    /// An error if the name is unknown or the amount of values doesn't match.
    pub fn set_state(&mut self, name: &str, values: &[f32]) -> Result<()> {
        if values.len() != self.dim {
            return Err(MlErr::SizeMismatch {
                what: "batch norm state",
                got: values.len(),
                expected: self.dim,
            });
        }

        let target = match name {
            "moving_mean" => &mut self.moving_mean,
            "moving_variance" => &mut self.moving_variance,
            other => {
                return Err(MlErr::InvalidSpec(format!(
                    "batch norm has no state named {other}"
                )));
            }
        };

        target.assign(&ArrayView1::from(values));
        Ok(())
    }

    pub fn forward<'a>(
        &'a mut self,
        params: &[f32],
        x: ArrayView2<'a, f32>,
        mode: Mode,
    ) -> Result<ArrayView2<'a, f32>> {
        if x.ncols() != self.dim {
            return Err(MlErr::SizeMismatch {
                what: "batch norm input features",
                got: x.ncols(),
                expected: self.dim,
            });
        }

        let (gamma, beta) = self.view_params(params)?;
        self.mode = mode;

        let (mean, variance) = match mode {
            Mode::Train => {
                let mean = x.mean_axis(Axis(0)).ok_or(MlErr::EmptyDataset)?;
                let variance = x.var_axis(Axis(0), 0.);

                let m = self.momentum;
                self.moving_mean *= m;
                self.moving_mean.scaled_add(1. - m, &mean);
                self.moving_variance *= m;
                self.moving_variance.scaled_add(1. - m, &variance);

                (mean, variance)
            }
            Mode::Eval => (self.moving_mean.clone(), self.moving_variance.clone()),
        };

        let eps = self.epsilon;
        self.inv_std = variance.mapv(|v| 1. / (v + eps).sqrt());

        resize(&mut self.x_hat, x.dim());
        self.x_hat.assign(&x);
        self.x_hat -= &mean;
        self.x_hat *= &self.inv_std;

        resize(&mut self.y, x.dim());
        self.y.assign(&self.x_hat);
        self.y *= &gamma;
        self.y += &beta;

        Ok(self.y.view())
    }

    pub fn backward<'a>(
        &'a mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayViewMut2<'a, f32>,
    ) -> Result<ArrayViewMut2<'a, f32>> {
        if d.dim() != self.x_hat.dim() {
            return Err(MlErr::SizeMismatch {
                what: "batch norm delta rows",
                got: d.nrows(),
                expected: self.x_hat.nrows(),
            });
        }

        let (gamma, _) = self.view_params(params)?;
        self.check_len("batch norm gradient", grad.len())?;
        let (dgamma, dbeta) = grad.split_at_mut(self.dim);

        let dy_x_hat = (&d * &self.x_hat).sum_axis(Axis(0));
        ArrayViewMut1::from(dgamma).assign(&dy_x_hat);
        ArrayViewMut1::from(dbeta).assign(&d.sum_axis(Axis(0)));

        let d_x_hat = &d * &gamma;
        resize(&mut self.d, d.dim());

        match self.mode {
            Mode::Train => {
                let n = d.nrows() as f32;
                let sum_d_x_hat = d_x_hat.sum_axis(Axis(0));
                let sum_d_x_hat_x_hat = (&d_x_hat * &self.x_hat).sum_axis(Axis(0));

                self.d.assign(&(&d_x_hat * n));
                self.d -= &sum_d_x_hat;
                self.d -= &(&self.x_hat * &sum_d_x_hat_x_hat);
                self.d *= &(&self.inv_std / n);
            }
            Mode::Eval => {
                self.d.assign(&d_x_hat);
                self.d *= &self.inv_std;
            }
        }

        Ok(self.d.view_mut())
    }

    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView1<'a, f32>, ArrayView1<'a, f32>)> {
        self.check_len("batch norm parameters", params.len())?;

        let (gamma, beta) = params.split_at(self.dim);
        Ok((ArrayView1::from(gamma), ArrayView1::from(beta)))
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        if got != self.size() {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected: self.size(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn identity_params(dim: usize) -> Vec<f32> {
        let mut params = vec![1.; dim];
        params.extend(vec![0.; dim]);
        params
    }

    #[test]
    fn train_mode_normalizes_the_batch() {
        let mut bn = BatchNorm::new(2, 0.99, 1e-3).unwrap();
        let params = identity_params(2);
        let x = array![[1., 10.], [2., 20.], [3., 30.], [4., 40.]];

        let y = bn.forward(&params, x.view(), Mode::Train).unwrap().to_owned();

        for col in y.columns() {
            let mean = col.mean().unwrap();
            let var = col.var(0.);
            assert!(mean.abs() < 1e-5);
            assert!((var - 1.).abs() < 1e-2);
        }
    }

    #[test]
    fn moving_statistics_follow_momentum() {
        let mut bn = BatchNorm::new(1, 0.9, 1e-3).unwrap();
        let params = identity_params(1);
        let x = array![[2.], [4.]];

        bn.forward(&params, x.view(), Mode::Train).unwrap();

        // mean 3, variance 1
        assert!((bn.moving_mean()[0] - 0.3).abs() < 1e-6);
        assert!((bn.moving_variance()[0] - 1.).abs() < 1e-6);
    }

    #[test]
    fn eval_mode_uses_moving_statistics() {
        let mut bn = BatchNorm::new(1, 0.9, 1e-3).unwrap();
        bn.set_state("moving_mean", &[5.]).unwrap();
        bn.set_state("moving_variance", &[4.]).unwrap();
        let params = [2., 1.];
        let x = array![[7.]];

        let y = bn.forward(&params, x.view(), Mode::Eval).unwrap();
        let expected = 2. * (7. - 5.) / (4f32 + 1e-3).sqrt() + 1.;
        assert!((y[[0, 0]] - expected).abs() < 1e-5);

        // eval leaves the moving statistics untouched
        assert_eq!(bn.moving_mean()[0], 5.);
    }

    #[test]
    fn backward_matches_finite_differences() {
        let x = array![[0.5, -1.], [1.5, 2.], [-0.3, 0.7]];
        let params = vec![1.3, 0.7, 0.1, -0.2];
        // loss = sum(w * y)
        let w = array![[1., 2.], [-1., 0.5], [0.3, -0.7]];

        let loss_at = |x: &Array2<f32>| {
            let mut bn = BatchNorm::new(2, 0.99, 1e-3).unwrap();
            let y = bn.forward(&params, x.view(), Mode::Train).unwrap();
            (&y * &w).sum()
        };

        let mut bn = BatchNorm::new(2, 0.99, 1e-3).unwrap();
        bn.forward(&params, x.view(), Mode::Train).unwrap();
        let mut grad = vec![0.; 4];
        let mut d = w.clone();
        let dx = bn.backward(&params, &mut grad, d.view_mut()).unwrap().to_owned();

        let h = 1e-2;
        for ((i, j), &analytic) in dx.indexed_iter() {
            let mut plus = x.clone();
            plus[[i, j]] += h;
            let mut minus = x.clone();
            minus[[i, j]] -= h;

            let numeric = (loss_at(&plus) - loss_at(&minus)) / (2. * h);
            assert!((numeric - analytic).abs() < 2e-2, "{numeric} vs {analytic}");
        }

        // dbeta is the column sum of the delta
        assert!((grad[2] - 0.3).abs() < 1e-5);
        assert!((grad[3] - 1.8).abs() < 1e-5);
    }

    #[test]
    fn rejects_invalid_momentum() {
        assert!(BatchNorm::new(3, 1.5, 1e-3).is_err());
        assert!(BatchNorm::new(3, 0.99, 0.).is_err());
    }

    #[test]
    fn unknown_state_is_an_error() {
        let mut bn = BatchNorm::new(1, 0.99, 1e-3).unwrap();
        assert!(bn.set_state("running_mean", &[0.]).is_err());
        assert!(bn.set_state("moving_mean", &[0., 1.]).is_err());
    }
}
