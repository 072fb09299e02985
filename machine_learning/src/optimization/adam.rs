use super::Optimizer;
use crate::{MlErr, Result};

/// The Adam optimizer, with bias correction and an optional time based learning rate decay,
/// `lr_t = lr / (1 + decay * t)` where `t` is the amount of updates made so far.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    decay: f32,
    step: u64,
    beta1_t: f32,
    beta2_t: f32,
    v: Box<[f32]>,
    s: Box<[f32]>,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    /// * `decay` - How fast the learning rate decays with each update, `0` disables it.
    ///
    /// # Returns
    /// A new `Adam` instance or an error if any hyperparameter is out of range.
    pub fn new(
        len: usize,
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
        decay: f32,
    ) -> Result<Self> {
        let checks = [
            ("learning rate", learning_rate, learning_rate > 0.),
            ("beta1", beta1, (0. ..1.).contains(&beta1)),
            ("beta2", beta2, (0. ..1.).contains(&beta2)),
            ("epsilon", epsilon, epsilon > 0.),
            ("decay", decay, decay >= 0.),
        ];

        if let Some(&(name, value, _)) = checks.iter().find(|(_, _, ok)| !ok) {
            return Err(MlErr::InvalidHyperparameter { name, value });
        }

        Ok(Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            decay,
            step: 0,
            beta1_t: 1.,
            beta2_t: 1.,
            v: vec![0.; len].into_boxed_slice(),
            s: vec![0.; len].into_boxed_slice(),
        })
    }

    /// The learning rate the next update will use.
    pub fn current_learning_rate(&self) -> f32 {
        self.learning_rate / (1. + self.decay * self.step as f32)
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        if grad.len() != params.len() || grad.len() != self.v.len() {
            return Err(MlErr::SizeMismatch {
                what: "gradient",
                got: grad.len(),
                expected: self.v.len(),
            });
        }

        let lr = self.current_learning_rate();
        let Self {
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        self.step += 1;
        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let bc1 = 1. - self.beta1_t;
        let bc2 = 1. - self.beta2_t;
        let step_size = lr * (bc2.sqrt() / bc1);

        params
            .iter_mut()
            .zip(grad)
            .zip(self.v.iter_mut())
            .zip(self.s.iter_mut())
            .for_each(|(((p, g), v), s)| {
                *v = b1 * *v + (1. - b1) * g;
                *s = b2 * *s + (1. - b2) * g.powi(2);
                *p -= step_size * *v / (s.sqrt() + eps);
            });

        Ok(())
    }
}
