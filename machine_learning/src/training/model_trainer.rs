use std::num::NonZeroUsize;

use log::{debug, info};
use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{EarlyStopping, History};
use crate::{
    Result,
    arch::{Mode, Model, loss::LossFn},
    dataset::Dataset,
    optimization::Optimizer,
};

/// A model trainer. Contains the relevant components needed for training a model,
/// including the model itself.
pub struct ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    model: M,
    optimizer: O,
    loss_fn: L,
    dataset: Dataset,
    early_stopping: Option<EarlyStopping>,

    epochs: NonZeroUsize,
    batch_size: NonZeroUsize,
    rng: R,
}

impl<M, O, L, R> ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    /// Returns a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `optimizer` - The optimizer that updates the parameters after every batch.
    /// * `loss_fn` - Measures the difference between a model's output and the expected one.
    /// * `dataset` - The dataset the model will be trained with.
    /// * `epochs` - The maximum amount of epochs per `fit` call.
    /// * `batch_size` - The amount of samples per batch.
    /// * `early_stopping` - Stops training once the monitored loss plateaus.
    /// * `rng` - A random number generator, used for shuffling and initialization.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: M,
        optimizer: O,
        loss_fn: L,
        dataset: Dataset,
        epochs: NonZeroUsize,
        batch_size: NonZeroUsize,
        early_stopping: Option<EarlyStopping>,
        rng: R,
    ) -> Self {
        Self {
            model,
            optimizer,
            loss_fn,
            dataset,
            early_stopping,
            epochs,
            batch_size,
            rng,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Gives up the trainer, keeping only the model.
    pub fn into_model(self) -> M {
        self.model
    }

    /// Samples the initial parameters of the model.
    pub fn init_params(&mut self) -> Result<Vec<f32>> {
        self.model.init_params(&mut self.rng)
    }

    /// Trains the model for up to `epochs` epochs.
    ///
    /// After each epoch the model is scored on `validation` in evaluation mode. The monitored loss
    /// for early stopping is the validation loss, or the training loss when there's no
    /// validation data. If early stopping restores the best weights, `params` and the model's
    /// state end up as they were at the best epoch.
    ///
    /// # Arguments
    /// * `params` - The model's parameters, updated in place.
    /// * `validation` - The `(x, y)` data to validate against after each epoch.
    ///
    /// # Returns
    /// The metrics of every epoch.
    pub fn fit(
        &mut self,
        params: &mut [f32],
        validation: Option<(ArrayView2<f32>, ArrayView2<f32>)>,
    ) -> Result<History> {
        let mut grad = vec![0.; self.model.size()];
        let mut history = History::default();

        if let Some(early_stopping) = &mut self.early_stopping {
            early_stopping.reset();
        }

        let epochs = self.epochs.get();
        let mut last_epoch = 0;

        for epoch in 0..epochs {
            last_epoch = epoch;

            self.dataset.shuffle(&mut self.rng);
            let batches = self.dataset.batches(self.batch_size);

            let train = self.model.backprop(
                params,
                &mut grad,
                &self.loss_fn,
                &mut self.optimizer,
                batches,
            )?;

            let val = match validation {
                Some((x, y)) => Some(self.model.evaluate(params, x, y, &self.loss_fn)?),
                None => None,
            };

            history.push(train, val);

            match val {
                Some(val) => info!(
                    epoch = epoch + 1, epochs = epochs;
                    "loss: {:.4} - accuracy: {:.4} - val_loss: {:.4} - val_accuracy: {:.4}",
                    train.loss, train.accuracy, val.loss, val.accuracy
                ),
                None => info!(
                    epoch = epoch + 1, epochs = epochs;
                    "loss: {:.4} - accuracy: {:.4}",
                    train.loss, train.accuracy
                ),
            }

            let monitored = val.map_or(train.loss, |val| val.loss);
            let Some(early_stopping) = &mut self.early_stopping else {
                continue;
            };

            if early_stopping.update(epoch, monitored, params, &self.model) {
                info!(epoch = epoch + 1; "early stopping, no improvement in the monitored loss");
                history.stopped_early = true;
                break;
            }
        }

        if let Some(early_stopping) = &mut self.early_stopping {
            history.best_epoch = early_stopping.best_epoch();

            if let Some(best) = early_stopping.take_best(last_epoch) {
                debug!(best_epoch = history.best_epoch.unwrap_or_default() + 1; "restoring best weights");
                params.copy_from_slice(&best.params);
                self.model.load_state(&best.state)?;
            }
        }

        Ok(history)
    }

    /// Makes an inference pass over `x`.
    ///
    /// # Returns
    /// The model's output, one row per sample.
    pub fn predict(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        Ok(self.model.forward(params, x, Mode::Eval)?.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Axis};
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        arch::{Sequential, activations::ActFn, layers::Layer, loss::BinaryCrossEntropy},
        optimization::GradientDescent,
    };

    fn trainer(
        early_stopping: Option<EarlyStopping>,
        epochs: usize,
    ) -> ModelTrainer<Sequential, GradientDescent, BinaryCrossEntropy, StdRng> {
        let model = Sequential::new([
            Layer::dense((2, 4), Some(ActFn::relu())),
            Layer::dense((4, 1), Some(ActFn::sigmoid(1.))),
        ])
        .unwrap();

        let x = Array2::from_shape_fn((40, 2), |(i, j)| ((i * 7 + j * 3) % 11) as f32 / 5. - 1.);
        let y = x.map_axis(Axis(1), |r| (r[0] + r[1] > 0.) as u8 as f32).insert_axis(Axis(1));
        let dataset = Dataset::from_arrays(x.view(), y.view()).unwrap();

        ModelTrainer::new(
            model,
            GradientDescent::new(0.1),
            BinaryCrossEntropy::new(),
            dataset,
            NonZeroUsize::new(epochs).unwrap(),
            NonZeroUsize::new(8).unwrap(),
            early_stopping,
            StdRng::seed_from_u64(42),
        )
    }

    #[test]
    fn runs_every_epoch_without_early_stopping() {
        let mut trainer = trainer(None, 7);
        let mut params = trainer.init_params().unwrap();

        let history = trainer.fit(&mut params, None).unwrap();

        assert_eq!(history.epochs(), 7);
        assert!(!history.has_validation());
        assert!(!history.stopped_early);
        assert_eq!(history.best_epoch, None);
    }

    #[test]
    fn stops_early_and_restores_the_best_epoch() {
        // every epoch after the first is stale with an impossible min_delta
        let early_stopping = EarlyStopping::new(3, 1e6, true);
        let mut trainer = trainer(Some(early_stopping), 50);
        let mut params = trainer.init_params().unwrap();

        let x = Array2::from_elem((4, 2), 0.5);
        let y = Array2::ones((4, 1));
        let history = trainer.fit(&mut params, Some((x.view(), y.view()))).unwrap();

        assert!(history.stopped_early);
        assert_eq!(history.epochs(), 4);
        assert_eq!(history.val_loss.len(), 4);
        assert_eq!(history.best_epoch, Some(0));

        // the restored parameters reproduce the first epoch's validation loss
        let stats = trainer
            .model
            .evaluate(&params, x.view(), y.view(), &BinaryCrossEntropy::new())
            .unwrap();
        assert!((stats.loss - history.val_loss[0]).abs() < 1e-6);
    }

    #[test]
    fn predictions_have_one_row_per_sample() {
        let mut trainer = trainer(None, 1);
        let params = trainer.init_params().unwrap();
        let x = Array2::zeros((5, 2));

        let y = trainer.predict(&params, x.view()).unwrap();
        assert_eq!(y.dim(), (5, 1));
    }
}
