use std::{cell::RefCell, rc::Rc};

use log::debug;
use ndarray::ArrayView2;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{
    EpochStats, Mode, Model, StateBuffer, binary_accuracy,
    layers::{Layer, ParamBlock},
    loss::LossFn,
};
use crate::{
    MlErr, Result,
    initialization::{ChainedParamGen, ParamGen},
    optimization::Optimizer,
};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// The model doesn't own its trainable parameters, every pass receives them as a flat slice that
/// is split into consecutive chunks, one per layer.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` or an error if two consecutive layers disagree on their dimensions.
    pub fn new<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<_> = layers.into_iter().collect();

        let mut prev: Option<usize> = None;
        for (i, layer) in layers.iter().enumerate() {
            if let (Some(out), Some(inp)) = (prev, layer.input_dim()) {
                if out != inp {
                    return Err(MlErr::InvalidSpec(format!(
                        "layer {i} expects {inp} inputs but the previous layer outputs {out}"
                    )));
                }
            }

            prev = layer.output_dim().or(prev);
        }

        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The amount of features the model expects, if any layer fixes it.
    pub fn input_dim(&self) -> Option<usize> {
        self.layers.iter().find_map(Layer::input_dim)
    }

    /// Every parameter block of the model paired with the index of its layer, in layout order.
    pub fn param_blocks(&self) -> Vec<(usize, ParamBlock)> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| layer.param_blocks().into_iter().map(move |b| (i, b)))
            .collect()
    }

    /// Builds the default initializer chain of this model.
    ///
    /// # Arguments
    /// * `rng` - The random generator shared by every random initializer.
    pub fn param_gen<R>(&self, rng: Rc<RefCell<R>>) -> Result<ChainedParamGen>
    where
        R: Rng + 'static,
    {
        let mut gens = Vec::new();
        for layer in &self.layers {
            gens.extend(layer.param_gens(&rng)?);
        }

        Ok(ChainedParamGen::new(gens))
    }

    /// Overwrites a single named state buffer.
    ///
    /// # Arguments
    /// * `layer` - The index of the layer.
    /// * `name` - The name of the buffer within the layer.
    /// * `values` - The new values.
    pub fn set_state(&mut self, layer: usize, name: &str, values: &[f32]) -> Result<()> {
        let nlayers = self.layers.len();
        let layer = self
            .layers
            .get_mut(layer)
            .ok_or(MlErr::SizeMismatch {
                what: "layers",
                got: layer,
                expected: nlayers,
            })?;

        layer.set_state(name, values)
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        let expected = self.size();
        if got != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(Layer::size).sum()
    }

    fn init_params<R: Rng>(&self, rng: &mut R) -> Result<Vec<f32>> {
        let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(rng.next_u64())));
        let size = self.size();

        let params = self.param_gen(rng)?.sample(size).unwrap_or_default();
        if params.len() != size {
            return Err(MlErr::SizeMismatch {
                what: "initial parameters",
                got: params.len(),
                expected: size,
            });
        }

        debug!(size = size; "initialized parameters");
        Ok(params)
    }

    fn forward<'a>(
        &'a mut self,
        params: &[f32],
        mut x: ArrayView2<'a, f32>,
        mode: Mode,
    ) -> Result<ArrayView2<'a, f32>> {
        self.check_len("parameters", params.len())?;

        let mut rest = params;
        for layer in self.layers.iter_mut() {
            let (front, back) = rest.split_at(layer.size());
            x = layer.forward(front, x, mode)?;
            rest = back;
        }

        Ok(x)
    }

    // NOTE: the epoch loss is the average of the batch losses, which is what gets reported while
    // training even if the last batch is short.
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
        I: Iterator<Item = (ArrayView2<'a, f32>, ArrayView2<'a, f32>)>,
    {
        self.check_len("gradient", grad.len())?;

        let mut total = EpochStats::default();
        let mut num_batches = 0;

        for (x, y) in batches {
            grad.fill(0.);

            let y_pred = self.forward(params, x, Mode::Train)?;
            total.loss += loss_fn.loss(y_pred, y);
            total.accuracy += binary_accuracy(y_pred, y);
            num_batches += 1;

            let mut d_last = loss_fn.loss_prime(y_pred, y);
            let mut d = d_last.view_mut();
            let mut end = params.len();

            for layer in self.layers.iter_mut().rev() {
                let start = end - layer.size();
                d = layer.backward(&params[start..end], &mut grad[start..end], d)?;
                end = start;
            }

            optimizer.update_params(grad, params)?;
        }

        if num_batches == 0 {
            return Err(MlErr::EmptyDataset);
        }

        let n = num_batches as f32;
        Ok(EpochStats {
            loss: total.loss / n,
            accuracy: total.accuracy / n,
        })
    }

    fn state(&self) -> Vec<StateBuffer> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| {
                layer
                    .state()
                    .into_iter()
                    .map(move |(name, values)| StateBuffer {
                        layer: i,
                        name: name.to_string(),
                        values: values.to_vec(),
                    })
            })
            .collect()
    }

    fn load_state(&mut self, state: &[StateBuffer]) -> Result<()> {
        for buf in state {
            self.set_state(buf.layer, &buf.name, &buf.values)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;
    use crate::{
        arch::{activations::ActFn, loss::BinaryCrossEntropy},
        optimization::GradientDescent,
    };

    fn small_model() -> Sequential {
        Sequential::new([
            Layer::dense((2, 4), Some(ActFn::relu())),
            Layer::batch_norm(4, 0.9, 1e-3).unwrap(),
            Layer::dropout(0.2, 1).unwrap(),
            Layer::dense((4, 1), Some(ActFn::sigmoid(1.))),
        ])
        .unwrap()
    }

    #[test]
    fn size_adds_up_layer_sizes() {
        let model = small_model();
        assert_eq!(model.size(), 12 + 8 + 0 + 5);
        assert_eq!(model.input_dim(), Some(2));
    }

    #[test]
    fn rejects_mismatched_layers() {
        let layers = [
            Layer::dense((2, 4), None),
            Layer::dropout(0.1, 0).unwrap(),
            Layer::dense((3, 1), None),
        ];

        assert!(Sequential::new(layers).is_err());
    }

    #[test]
    fn forward_rejects_wrong_param_count() {
        let mut model = small_model();
        let params = vec![0.; model.size() - 1];
        let x = Array2::zeros((3, 2));

        let result = model.forward(&params, x.view(), Mode::Eval);
        assert!(matches!(result, Err(MlErr::SizeMismatch { .. })));
    }

    #[test]
    fn init_params_follows_the_default_initializers() {
        let model = small_model();
        let params = model.init_params(&mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(params.len(), model.size());

        let range = (6f32 / 6.).sqrt();
        assert!(params[..8].iter().all(|w| w.abs() <= range));
        // biases, gamma and beta
        assert_eq!(params[8..12], [0.; 4]);
        assert_eq!(params[12..16], [1.; 4]);
        assert_eq!(params[16..20], [0.; 4]);
    }

    #[test]
    fn eval_outputs_are_probabilities() {
        let mut model = small_model();
        let params = model.init_params(&mut StdRng::seed_from_u64(1)).unwrap();
        let x = array![[10., -3.], [0.5, 0.2], [-100., 40.]];

        let y = model.forward(&params, x.view(), Mode::Eval).unwrap();
        assert!(y.iter().all(|p| (0. ..=1.).contains(p)));
    }

    #[test]
    fn state_round_trips_between_models() {
        let mut trained = small_model();
        let params = trained.init_params(&mut StdRng::seed_from_u64(3)).unwrap();
        let x = array![[1., 2.], [3., -1.], [0., 0.5]];
        trained.forward(&params, x.view(), Mode::Train).unwrap();

        let state = trained.state();
        assert_eq!(state.len(), 2);
        assert_eq!(state[0].layer, 1);
        assert_eq!(state[0].name, "moving_mean");

        let mut fresh = small_model();
        fresh.load_state(&state).unwrap();
        assert_eq!(fresh.state(), state);

        let a = trained.forward(&params, x.view(), Mode::Eval).unwrap().to_owned();
        let b = fresh.forward(&params, x.view(), Mode::Eval).unwrap().to_owned();
        assert_eq!(a, b);
    }

    #[test]
    fn backprop_lowers_the_loss() {
        let mut model = Sequential::new([
            Layer::dense((2, 8), Some(ActFn::relu())),
            Layer::dense((8, 1), Some(ActFn::sigmoid(1.))),
        ])
        .unwrap();

        let mut params = model.init_params(&mut StdRng::seed_from_u64(42)).unwrap();
        let mut grad = vec![0.; model.size()];
        let mut optimizer = GradientDescent::new(0.5);
        let loss_fn = BinaryCrossEntropy::new();

        // x0 > x1 => 1
        let x = array![[1., 0.], [0., 1.], [2., 0.5], [0.5, 2.], [1.5, -1.], [-1., 1.5]];
        let y = array![[1.], [0.], [1.], [0.], [1.], [0.]];

        let before = model
            .evaluate(&params, x.view(), y.view(), &loss_fn)
            .unwrap();

        for _ in 0..200 {
            let batches = std::iter::once((x.view(), y.view()));
            model
                .backprop(&mut params, &mut grad, &loss_fn, &mut optimizer, batches)
                .unwrap();
        }

        let after = model
            .evaluate(&params, x.view(), y.view(), &loss_fn)
            .unwrap();

        assert!(after.loss < before.loss);
        assert_eq!(after.accuracy, 1.);
    }

    #[test]
    fn backprop_without_batches_is_an_error() {
        let mut model = small_model();
        let mut params = vec![0.; model.size()];
        let mut grad = vec![0.; model.size()];
        let mut optimizer = GradientDescent::new(0.1);

        let result = model.backprop(
            &mut params,
            &mut grad,
            &BinaryCrossEntropy::new(),
            &mut optimizer,
            std::iter::empty(),
        );

        assert!(matches!(result, Err(MlErr::EmptyDataset)));
    }
}
