use ndarray::{ArrayView2, Zip};
use rand::Rng;

use super::{Mode, loss::LossFn};
use crate::{Result, optimization::Optimizer};

/// The mean loss and accuracy of a pass over some data.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EpochStats {
    pub loss: f32,
    pub accuracy: f32,
}

/// A named non-trainable buffer of a layer, such as a batch norm's moving mean.
#[derive(Debug, Clone, PartialEq)]
pub struct StateBuffer {
    pub layer: usize,
    pub name: String,
    pub values: Vec<f32>,
}

pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Samples a fresh set of parameters for this model.
    ///
    /// # Arguments
    /// * `rng` - Seeds the generator the initializers draw from.
    ///
    /// # Returns
    /// The flat parameters, `size()` of them.
    fn init_params<R: Rng>(&self, rng: &mut R) -> Result<Vec<f32>>;

    /// Makes a forward pass through the model.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The input data, one sample per row.
    /// * `mode` - Whether this pass is part of training.
    ///
    /// # Returns
    /// The model's output or an error if the sizes don't match.
    fn forward<'a>(
        &'a mut self,
        params: &[f32],
        x: ArrayView2<'a, f32>,
        mode: Mode,
    ) -> Result<ArrayView2<'a, f32>>;

    /// Computes the gradient of the loss function with respect to the parameters of the model over
    /// the provided batches. **`params` gets updated** for each batch according to the
    /// optimization algorithm.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `grad` - A buffer for writing the computed gradient on each batch pass.
    /// * `loss_fn` - The loss function.
    /// * `optimizer` - The optimizer that dictates how to update the weights on each gradient calculation.
    /// * `batches` - The batches of data.
    ///
    /// # Returns
    /// The mean batch loss and accuracy of the epoch.
    fn backprop<'a, L, O, I>(
        &mut self,
        params: &mut [f32],
        grad: &mut [f32],
        loss_fn: &L,
        optimizer: &mut O,
        batches: I,
    ) -> Result<EpochStats>
    where
        L: LossFn,
        O: Optimizer,
        I: Iterator<Item = (ArrayView2<'a, f32>, ArrayView2<'a, f32>)>;

    /// Exports the model's non-trainable state.
    fn state(&self) -> Vec<StateBuffer>;

    /// Imports state previously exported with `state`.
    fn load_state(&mut self, state: &[StateBuffer]) -> Result<()>;

    /// Scores the model on some data without training it.
    fn evaluate<L: LossFn>(
        &mut self,
        params: &[f32],
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
        loss_fn: &L,
    ) -> Result<EpochStats> {
        let y_pred = self.forward(params, x, Mode::Eval)?;

        Ok(EpochStats {
            loss: loss_fn.loss(y_pred, y),
            accuracy: binary_accuracy(y_pred, y),
        })
    }
}

/// The fraction of outputs that land on the same side of `0.5` as their targets.
pub fn binary_accuracy(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
    if y.is_empty() {
        return 0.;
    }

    let hits = Zip::from(&y_pred)
        .and(&y)
        .fold(0usize, |acc, &p, &t| acc + usize::from((p > 0.5) == (t > 0.5)));

    hits as f32 / y.len() as f32
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn accuracy_counts_hits() {
        let y_pred = array![[0.9], [0.2], [0.6], [0.4]];
        let y = array![[1.], [0.], [0.], [0.]];

        assert_eq!(binary_accuracy(y_pred.view(), y.view()), 0.75);
    }
}
