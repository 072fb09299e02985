//! The fixed topology of the hyperglycemia classifier.

use std::num::NonZeroUsize;

use machine_learning::specs::{
    ActFnSpec, EarlyStoppingSpec, LayerSpec, LossFnSpec, ModelSpec, OptimizerSpec, TrainerSpec,
};
use serde::{Deserialize, Serialize};

/// The hyperparameters of the network and of its training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkParams {
    /// The width of the first hidden block, the next two are a half and a quarter of it.
    pub neurons: usize,
    pub dropout_rate: f32,
    pub learning_rate: f32,
    /// Time based decay of the learning rate, per update.
    pub decay_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    pub batch_norm_momentum: f32,
    pub batch_norm_epsilon: f32,
    pub epochs: usize,
    pub batch_size: usize,
    /// Epochs without improvement of the validation loss before stopping.
    pub patience: usize,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            neurons: 200,
            dropout_rate: 0.3,
            learning_rate: 0.001,
            decay_rate: 1e-6,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            batch_norm_momentum: 0.99,
            batch_norm_epsilon: 1e-3,
            epochs: 100,
            batch_size: 32,
            patience: 5,
        }
    }
}

impl NetworkParams {
    /// The widths of the three hidden blocks.
    pub fn widths(&self) -> [usize; 3] {
        [self.neurons, self.neurons / 2, self.neurons / 4]
    }

    /// The model: three `Dense(relu) → BatchNorm → Dropout` blocks and a sigmoid output.
    ///
    /// # Arguments
    /// * `n_features` - The amount of input features.
    pub fn model_spec(&self, n_features: usize) -> ModelSpec {
        let mut layers = Vec::with_capacity(10);
        let mut fan_in = n_features;

        for width in self.widths() {
            layers.push(LayerSpec::Dense {
                dim: (fan_in, width),
                act_fn: Some(ActFnSpec::Relu),
            });
            layers.push(LayerSpec::BatchNorm {
                dim: width,
                momentum: self.batch_norm_momentum,
                epsilon: self.batch_norm_epsilon,
            });
            layers.push(LayerSpec::Dropout {
                rate: self.dropout_rate,
            });

            fan_in = width;
        }

        layers.push(LayerSpec::Dense {
            dim: (fan_in, 1),
            act_fn: Some(ActFnSpec::Sigmoid { amp: 1. }),
        });

        ModelSpec::Sequential { layers }
    }

    /// The whole training setup: Adam, binary cross-entropy and early stopping on the
    /// validation loss restoring the best weights.
    ///
    /// # Arguments
    /// * `n_features` - The amount of input features.
    /// * `seed` - Seeds every random generator of the training.
    ///
    /// # Returns
    /// The `TrainerSpec`, or `None` if `epochs` or `batch_size` is zero.
    pub fn trainer_spec(&self, n_features: usize, seed: u64) -> Option<TrainerSpec> {
        Some(TrainerSpec {
            model: self.model_spec(n_features),
            optimizer: OptimizerSpec::Adam {
                learning_rate: self.learning_rate,
                beta1: self.beta1,
                beta2: self.beta2,
                epsilon: self.epsilon,
                decay: self.decay_rate,
            },
            loss: LossFnSpec::BinaryCrossEntropy,
            epochs: NonZeroUsize::new(self.epochs)?,
            batch_size: NonZeroUsize::new(self.batch_size)?,
            early_stopping: Some(EarlyStoppingSpec {
                patience: self.patience,
                min_delta: 0.,
                restore_best: true,
            }),
            seed: Some(seed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_topology_halves_the_widths() {
        let params = NetworkParams::default();
        let ModelSpec::Sequential { layers } = params.model_spec(12);

        assert_eq!(layers.len(), 10);

        let dense_dims: Vec<_> = layers
            .iter()
            .filter_map(|l| match l {
                LayerSpec::Dense { dim, .. } => Some(*dim),
                _ => None,
            })
            .collect();
        assert_eq!(dense_dims, [(12, 200), (200, 100), (100, 50), (50, 1)]);

        assert_eq!(
            layers[1],
            LayerSpec::BatchNorm {
                dim: 200,
                momentum: 0.99,
                epsilon: 1e-3
            }
        );
        assert_eq!(layers[2], LayerSpec::Dropout { rate: 0.3 });
        assert!(matches!(
            layers[9],
            LayerSpec::Dense {
                act_fn: Some(ActFnSpec::Sigmoid { .. }),
                ..
            }
        ));
    }

    #[test]
    fn trainer_spec_carries_the_hyperparameters() {
        let spec = NetworkParams::default().trainer_spec(4, 42).unwrap();

        assert_eq!(spec.epochs.get(), 100);
        assert_eq!(spec.batch_size.get(), 32);
        assert_eq!(spec.seed, Some(42));
        assert_eq!(spec.early_stopping.map(|es| es.patience), Some(5));
        assert!(matches!(
            spec.optimizer,
            OptimizerSpec::Adam { decay, .. } if decay == 1e-6
        ));
    }

    #[test]
    fn zero_epochs_has_no_spec() {
        let params = NetworkParams {
            epochs: 0,
            ..Default::default()
        };

        assert!(params.trainer_spec(4, 0).is_none());
    }
}
