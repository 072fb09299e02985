//! Trains a feed-forward classifier on tabular biosignal features and evaluates it.
//!
//! The pipeline runs top to bottom: load the CSV, split it keeping the class ratio, scale the
//! features, train the network, score the held-out rows and save the model.

pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod network;
pub mod persist;
pub mod plots;
pub mod scaler;

use std::path::PathBuf;

use log::info;
use machine_learning::{
    dataset::Dataset,
    training::{History, TrainerBuilder},
};
use ndarray::Array2;

pub use config::PipelineConfig;
pub use error::{PipelineErr, Result};

use crate::{
    data::{Table, stratified_split},
    metrics::Evaluation,
    persist::Classifier,
    scaler::StandardScaler,
};

/// What a pipeline run produced.
#[derive(Debug)]
pub struct Outcome {
    pub train_size: usize,
    pub test_size: usize,
    pub history: History,
    pub evaluation: Evaluation,
    pub model_path: PathBuf,
}

/// Runs the whole pipeline without drawing anything.
///
/// # Arguments
/// * `config` - Where the data is, how to train and where to save the model.
///
/// # Returns
/// The training history and the test set evaluation.
///
/// # Errors
/// Any failure of a stage stops the run.
pub fn run(config: &PipelineConfig) -> Result<Outcome> {
    config.validate()?;

    let table = Table::from_csv(&config.dataset, &config.label_column)?;
    let split = stratified_split(&table, config.test_size, config.seed)?;

    let (scaler, x_train) = StandardScaler::fit_transform(split.x_train.view())?;
    let x_test = scaler.transform(split.x_test.view())?;
    info!(features = scaler.n_features(); "scaled features");

    let spec = config
        .network
        .trainer_spec(table.n_features(), config.seed)
        .ok_or_else(|| {
            PipelineErr::InvalidConfig("epochs and batch_size must be positive".to_string())
        })?;

    let y_train = label_column(&split.y_train);
    let y_test = label_column(&split.y_test);
    let dataset = Dataset::from_arrays(x_train.view(), y_train.view())?;

    let mut trainer = TrainerBuilder::new().build(&spec, dataset)?;
    let mut params = trainer.init_params()?;

    info!(
        params = params.len(), epochs = spec.epochs.get(), batch_size = spec.batch_size.get();
        "training on {} rows", split.train_len()
    );
    let history = trainer.fit(&mut params, Some((x_test.view(), y_test.view())))?;
    info!(
        epochs = history.epochs(), stopped_early = history.stopped_early;
        "training done"
    );

    let probabilities = trainer.predict(&params, x_test.view())?.into_iter().collect();
    let evaluation = Evaluation::new(
        &split.y_test,
        probabilities,
        config.threshold,
        &config.class_names,
    )?;
    info!(
        accuracy = evaluation.accuracy, auc = evaluation.auc();
        "evaluated {} test rows", split.test_len()
    );

    let classifier = Classifier::new(
        scaler,
        trainer.into_model(),
        params,
        table.feature_names().to_vec(),
        table.label_column().to_string(),
        config.threshold,
    )?;
    persist::save(&config.model_path, &classifier)?;

    Ok(Outcome {
        train_size: split.train_len(),
        test_size: split.test_len(),
        history,
        evaluation,
        model_path: config.model_path.clone(),
    })
}

/// Labels as the single column target the network trains against.
fn label_column(y: &[u8]) -> Array2<f32> {
    Array2::from_shape_fn((y.len(), 1), |(i, _)| f32::from(y[i]))
}
