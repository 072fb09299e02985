use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::arch::{Sequential, activations::ActFn, layers::Layer};

/// The specification for the `ActFn` enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnSpec {
    Relu,
    Sigmoid { amp: f32 },
}

/// The specification for the `Layer` enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Dense {
        dim: (usize, usize),
        act_fn: Option<ActFnSpec>,
    },
    BatchNorm {
        dim: usize,
        momentum: f32,
        epsilon: f32,
    },
    Dropout {
        rate: f32,
    },
}

/// The specification for the `Model` trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSpec {
    Sequential { layers: Vec<LayerSpec> },
}

/// The specification for the `Optimizer` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
        #[serde(default)]
        decay: f32,
    },
    GradientDescent {
        learning_rate: f32,
    },
}

/// The specification for the `LossFn` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossFnSpec {
    BinaryCrossEntropy,
    Mse,
}

/// The specification for the `EarlyStopping` struct.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarlyStoppingSpec {
    pub patience: usize,
    #[serde(default)]
    pub min_delta: f32,
    #[serde(default = "default_restore_best")]
    pub restore_best: bool,
}

fn default_restore_best() -> bool {
    true
}

/// The specification for the `ModelTrainer` struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerSpec {
    pub model: ModelSpec,
    pub optimizer: OptimizerSpec,
    pub loss: LossFnSpec,
    pub epochs: NonZeroUsize,
    pub batch_size: NonZeroUsize,
    pub early_stopping: Option<EarlyStoppingSpec>,
    pub seed: Option<u64>,
}

impl From<ActFn> for ActFnSpec {
    fn from(act_fn: ActFn) -> Self {
        match act_fn {
            ActFn::Relu(_) => Self::Relu,
            ActFn::Sigmoid(s) => Self::Sigmoid { amp: s.amp() },
        }
    }
}

impl From<&Layer> for LayerSpec {
    fn from(layer: &Layer) -> Self {
        match layer {
            Layer::Dense(l) => Self::Dense {
                dim: l.dim(),
                act_fn: l.act_fn().map(ActFnSpec::from),
            },
            Layer::BatchNorm(l) => Self::BatchNorm {
                dim: l.dim(),
                momentum: l.momentum(),
                epsilon: l.epsilon(),
            },
            Layer::Dropout(l) => Self::Dropout { rate: l.rate() },
        }
    }
}

impl From<&Sequential> for ModelSpec {
    fn from(model: &Sequential) -> Self {
        Self::Sequential {
            layers: model.layers().iter().map(LayerSpec::from).collect(),
        }
    }
}
