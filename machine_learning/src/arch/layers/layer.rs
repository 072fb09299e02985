use std::{cell::RefCell, rc::Rc};

use ndarray::{ArrayView1, ArrayView2, ArrayViewMut2};
use rand::Rng;

use super::{BatchNorm, Dense, Dropout, ParamBlock};
use crate::{
    MlErr, Result,
    arch::{Mode, activations::ActFn},
    initialization::{ConstParamGen, ParamGen, RandParamGen},
};

/// The layers a `Sequential` model can be made of.
#[derive(Clone, Debug)]
pub enum Layer {
    Dense(Dense),
    BatchNorm(BatchNorm),
    Dropout(Dropout),
}

impl Layer {
    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self::Dense(Dense::new(dim, act_fn))
    }

    pub fn batch_norm(dim: usize, momentum: f32, epsilon: f32) -> Result<Self> {
        Ok(Self::BatchNorm(BatchNorm::new(dim, momentum, epsilon)?))
    }

    pub fn dropout(rate: f32, seed: u64) -> Result<Self> {
        Ok(Self::Dropout(Dropout::new(rate, seed)?))
    }

    /// The amount of trainable parameters of this layer.
    pub fn size(&self) -> usize {
        match self {
            Self::Dense(l) => l.size(),
            Self::BatchNorm(l) => l.size(),
            Self::Dropout(_) => 0,
        }
    }

    /// The amount of features this layer expects, `None` if it takes any.
    pub fn input_dim(&self) -> Option<usize> {
        match self {
            Self::Dense(l) => Some(l.dim().0),
            Self::BatchNorm(l) => Some(l.dim()),
            Self::Dropout(_) => None,
        }
    }

    /// The amount of features this layer outputs, `None` if it's the same as its input.
    pub fn output_dim(&self) -> Option<usize> {
        match self {
            Self::Dense(l) => Some(l.dim().1),
            Self::BatchNorm(l) => Some(l.dim()),
            Self::Dropout(_) => None,
        }
    }

    pub fn forward<'a>(
        &'a mut self,
        params: &[f32],
        x: ArrayView2<'a, f32>,
        mode: Mode,
    ) -> Result<ArrayView2<'a, f32>> {
        match self {
            Self::Dense(l) => l.forward(params, x),
            Self::BatchNorm(l) => l.forward(params, x, mode),
            Self::Dropout(l) => l.forward(x, mode),
        }
    }

    pub fn backward<'a>(
        &'a mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayViewMut2<'a, f32>,
    ) -> Result<ArrayViewMut2<'a, f32>> {
        match self {
            Self::Dense(l) => l.backward(params, grad, d),
            Self::BatchNorm(l) => l.backward(params, grad, d),
            Self::Dropout(l) => l.backward(d),
        }
    }

    /// The named blocks this layer's parameters are split into.
    pub fn param_blocks(&self) -> Vec<ParamBlock> {
        match self {
            Self::Dense(l) => l.param_blocks(),
            Self::BatchNorm(l) => l.param_blocks(),
            Self::Dropout(_) => Vec::new(),
        }
    }

    /// The non-trainable buffers of this layer.
    pub fn state(&self) -> Vec<(&'static str, ArrayView1<'_, f32>)> {
        match self {
            Self::BatchNorm(l) => vec![
                ("moving_mean", l.moving_mean()),
                ("moving_variance", l.moving_variance()),
            ],
            Self::Dense(_) | Self::Dropout(_) => Vec::new(),
        }
    }

    pub fn set_state(&mut self, name: &str, values: &[f32]) -> Result<()> {
        match self {
            Self::BatchNorm(l) => l.set_state(name, values),
            Self::Dense(_) | Self::Dropout(_) => Err(MlErr::InvalidSpec(format!(
                "layer has no state named {name}"
            ))),
        }
    }

    /// The default initializers for this layer's parameters, in layout order.
    ///
    /// Dense kernels are Glorot-uniform and biases zeros, batch norm scales are ones and its
    /// shifts zeros.
    pub fn param_gens<R>(&self, rng: &Rc<RefCell<R>>) -> Result<Vec<Box<dyn ParamGen>>>
    where
        R: Rng + 'static,
    {
        let gens: Vec<Box<dyn ParamGen>> = match self {
            Self::Dense(l) => {
                let (n, m) = l.dim();
                let kernel = RandParamGen::xavier_uniform(rng.clone(), n * m, n, m)?;
                vec![Box::new(kernel), Box::new(ConstParamGen::new(0., m))]
            }
            Self::BatchNorm(l) => vec![
                Box::new(ConstParamGen::new(1., l.dim())),
                Box::new(ConstParamGen::new(0., l.dim())),
            ],
            Self::Dropout(_) => Vec::new(),
        };

        Ok(gens)
    }
}
