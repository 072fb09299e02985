use log::debug;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{EarlyStopping, ModelTrainer};
use crate::{
    MlErr, Result,
    arch::{
        Model, Sequential,
        activations::ActFn,
        layers::Layer,
        loss::{BinaryCrossEntropy, LossFn, Mse},
    },
    dataset::Dataset,
    optimization::{Adam, GradientDescent, Optimizer},
    specs::{
        ActFnSpec, EarlyStoppingSpec, LayerSpec, LossFnSpec, ModelSpec, OptimizerSpec, TrainerSpec,
    },
};

/// The trainer a `TrainerBuilder` yields.
pub type SequentialTrainer =
    ModelTrainer<Sequential, Box<dyn Optimizer>, Box<dyn LossFn>, StdRng>;

/// Builds `ModelTrainer`s given a specification.
#[derive(Default)]
pub struct TrainerBuilder;

impl TrainerBuilder {
    /// Creates a new `TrainerBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new trainer following a spec.
    ///
    /// # Arguments
    /// * `spec` - The specification for the trainer.
    /// * `dataset` - The data to train on.
    ///
    /// # Returns
    /// The trainer or an error if `spec` describes an invalid model or optimizer.
    pub fn build(&self, spec: &TrainerSpec, dataset: Dataset) -> Result<SequentialTrainer> {
        let mut rng = self.generate_rng(spec.seed);
        let model = self.resolve_model(&spec.model, &mut rng)?;

        if let Some(n) = model.input_dim() {
            if n != dataset.x_size() {
                return Err(MlErr::SizeMismatch {
                    what: "model inputs",
                    got: dataset.x_size(),
                    expected: n,
                });
            }
        }

        let optimizer = self.resolve_optimizer(spec.optimizer, model.size())?;
        let loss_fn = self.resolve_loss(spec.loss);
        let early_stopping = spec.early_stopping.map(|es| self.resolve_early_stopping(es));

        debug!(size = model.size(), samples = dataset.len(); "built trainer");

        Ok(ModelTrainer::new(
            model,
            optimizer,
            loss_fn,
            dataset,
            spec.epochs,
            spec.batch_size,
            early_stopping,
            rng,
        ))
    }

    /// Builds the model a spec describes.
    ///
    /// # Arguments
    /// * `spec` - The specification for the model.
    /// * `rng` - Seeds the dropout layers.
    pub fn resolve_model<R: Rng>(&self, spec: &ModelSpec, rng: &mut R) -> Result<Sequential> {
        match spec {
            ModelSpec::Sequential { layers } => {
                if layers.is_empty() {
                    return Err(MlErr::InvalidSpec("a model needs at least one layer".into()));
                }

                let layers = layers
                    .iter()
                    .map(|&spec| self.resolve_layer(spec, rng))
                    .collect::<Result<Vec<_>>>()?;

                Sequential::new(layers)
            }
        }
    }

    fn resolve_layer<R: Rng>(&self, spec: LayerSpec, rng: &mut R) -> Result<Layer> {
        match spec {
            LayerSpec::Dense { dim, act_fn } => {
                if dim.0 == 0 || dim.1 == 0 {
                    return Err(MlErr::InvalidSpec(format!("empty dense layer {dim:?}")));
                }

                Ok(Layer::dense(dim, act_fn.map(|a| self.resolve_act_fn(a))))
            }
            LayerSpec::BatchNorm {
                dim,
                momentum,
                epsilon,
            } => Layer::batch_norm(dim, momentum, epsilon),
            LayerSpec::Dropout { rate } => Layer::dropout(rate, rng.next_u64()),
        }
    }

    fn resolve_act_fn(&self, spec: ActFnSpec) -> ActFn {
        match spec {
            ActFnSpec::Relu => ActFn::relu(),
            ActFnSpec::Sigmoid { amp } => ActFn::sigmoid(amp),
        }
    }

    fn resolve_optimizer(&self, spec: OptimizerSpec, len: usize) -> Result<Box<dyn Optimizer>> {
        let optimizer: Box<dyn Optimizer> = match spec {
            OptimizerSpec::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
                decay,
            } => Box::new(Adam::new(
                len,
                learning_rate,
                beta1,
                beta2,
                epsilon,
                decay,
            )?),
            OptimizerSpec::GradientDescent { learning_rate } => {
                if learning_rate <= 0. || learning_rate.is_nan() {
                    return Err(MlErr::InvalidHyperparameter {
                        name: "learning rate",
                        value: learning_rate,
                    });
                }

                Box::new(GradientDescent::new(learning_rate))
            }
        };

        Ok(optimizer)
    }

    fn resolve_loss(&self, spec: LossFnSpec) -> Box<dyn LossFn> {
        match spec {
            LossFnSpec::BinaryCrossEntropy => Box::new(BinaryCrossEntropy::new()),
            LossFnSpec::Mse => Box::new(Mse::new()),
        }
    }

    fn resolve_early_stopping(&self, spec: EarlyStoppingSpec) -> EarlyStopping {
        EarlyStopping::new(spec.patience, spec.min_delta, spec.restore_best)
    }

    fn generate_rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
