mod batch_norm;
mod dense;
mod dropout;
mod layer;

use ndarray::Array2;

pub use batch_norm::BatchNorm;
pub use dense::Dense;
pub use dropout::Dropout;
pub use layer::Layer;

/// A named, contiguous block of a layer's trainable parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBlock {
    pub name: &'static str,
    pub shape: Vec<usize>,
}

impl ParamBlock {
    pub fn new(name: &'static str, shape: Vec<usize>) -> Self {
        Self { name, shape }
    }

    /// The amount of parameters in this block.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reallocates `buf` only when its shape differs from `shape`.
fn resize(buf: &mut Array2<f32>, shape: (usize, usize)) {
    if buf.dim() != shape {
        *buf = Array2::zeros(shape);
    }
}
