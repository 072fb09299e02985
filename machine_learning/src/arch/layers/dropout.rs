use ndarray::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::resize;
use crate::{MlErr, Result, arch::Mode};

/// Inverted dropout: while training each activation is zeroed with probability `rate` and the
/// survivors are scaled by `1 / (1 - rate)`. Outside of training it's the identity.
#[derive(Clone, Debug)]
pub struct Dropout {
    rate: f32,
    rng: StdRng,

    mode: Mode,
    mask: Array2<f32>,
    out: Array2<f32>,
}

impl Dropout {
    /// Creates a new `Dropout` layer.
    ///
    /// # Arguments
    /// * `rate` - The probability of dropping each activation, in `[0, 1)`.
    /// * `seed` - The seed of the layer's own random generator.
    ///
    /// # Returns
    /// A new `Dropout` or an error if `rate` is out of range.
    pub fn new(rate: f32, seed: u64) -> Result<Self> {
        if !(0. ..1.).contains(&rate) {
            return Err(MlErr::InvalidHyperparameter {
                name: "dropout rate",
                value: rate,
            });
        }

        Ok(Self {
            rate,
            rng: StdRng::seed_from_u64(seed),
            mode: Mode::Eval,
            mask: Array2::zeros((0, 0)),
            out: Array2::zeros((0, 0)),
        })
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn forward<'a>(
        &'a mut self,
        x: ArrayView2<'a, f32>,
        mode: Mode,
    ) -> Result<ArrayView2<'a, f32>> {
        self.mode = mode;

        if mode == Mode::Eval {
            return Ok(x);
        }

        let keep = 1. / (1. - self.rate);
        let rate = f64::from(self.rate);

        resize(&mut self.mask, x.dim());
        for m in self.mask.iter_mut() {
            *m = if self.rng.random_bool(rate) { 0. } else { keep };
        }

        resize(&mut self.out, x.dim());
        self.out.assign(&x);
        self.out *= &self.mask;

        Ok(self.out.view())
    }

    pub fn backward<'a>(
        &mut self,
        mut d: ArrayViewMut2<'a, f32>,
    ) -> Result<ArrayViewMut2<'a, f32>> {
        if self.mode == Mode::Eval {
            return Ok(d);
        }

        if d.dim() != self.mask.dim() {
            return Err(MlErr::SizeMismatch {
                what: "dropout delta rows",
                got: d.nrows(),
                expected: self.mask.nrows(),
            });
        }

        d *= &self.mask;
        Ok(d)
    }
}
