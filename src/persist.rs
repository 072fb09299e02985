//! The trained classifier and its model file.
//!
//! A model file is a `safetensors` file. Trainable parameters are stored one tensor per
//! parameter block as `layers.{i}.{block}`, batch norm moving statistics as
//! `layers.{i}.moving_mean` and `layers.{i}.moving_variance`, and the scaler as
//! `scaler.mean` and `scaler.scale`. The architecture and the preprocessing details live in
//! the string metadata.

use std::{collections::HashMap, fs, path::Path};

use log::info;
use machine_learning::{
    arch::{Mode, Model, Sequential},
    specs::ModelSpec,
    training::TrainerBuilder,
};
use ndarray::ArrayView2;
use rand::{SeedableRng, rngs::StdRng};
use safetensors::{Dtype, SafeTensors, tensor::TensorView};

use crate::{PipelineErr, Result, metrics, scaler::StandardScaler};

const MODEL_SPEC_KEY: &str = "model_spec";
const FEATURE_NAMES_KEY: &str = "feature_names";
const LABEL_COLUMN_KEY: &str = "label_column";
const THRESHOLD_KEY: &str = "threshold";

/// A trained model together with the preprocessing its inputs need.
#[derive(Debug, Clone)]
pub struct Classifier {
    scaler: StandardScaler,
    model: Sequential,
    params: Vec<f32>,
    feature_names: Vec<String>,
    label_column: String,
    threshold: f32,
}

impl Classifier {
    /// Creates a new `Classifier`.
    ///
    /// # Errors
    /// If the scaler, the feature names and the model disagree on the amount of features, or
    /// if `params` doesn't fit the model.
    pub fn new(
        scaler: StandardScaler,
        model: Sequential,
        params: Vec<f32>,
        feature_names: Vec<String>,
        label_column: String,
        threshold: f32,
    ) -> Result<Self> {
        if params.len() != model.size() {
            return Err(PipelineErr::Ml(machine_learning::MlErr::SizeMismatch {
                what: "params",
                got: params.len(),
                expected: model.size(),
            }));
        }

        if scaler.n_features() != feature_names.len() {
            return Err(PipelineErr::FeatureMismatch {
                got: scaler.n_features(),
                expected: feature_names.len(),
            });
        }

        if let Some(n) = model.input_dim() {
            if n != feature_names.len() {
                return Err(PipelineErr::FeatureMismatch {
                    got: feature_names.len(),
                    expected: n,
                });
            }
        }

        Ok(Self {
            scaler,
            model,
            params,
            feature_names,
            label_column,
            threshold,
        })
    }

    /// The probability of the positive class for every row of raw, unscaled features.
    pub fn predict_proba(&mut self, x: ArrayView2<f32>) -> Result<Vec<f32>> {
        let scaled = self.scaler.transform(x)?;
        let out = self.model.forward(&self.params, scaled.view(), Mode::Eval)?;
        Ok(out.iter().copied().collect())
    }

    /// The predicted label for every row of raw, unscaled features.
    pub fn predict(&mut self, x: ArrayView2<f32>) -> Result<Vec<u8>> {
        let probs = self.predict_proba(x)?;
        Ok(metrics::threshold(&probs, self.threshold))
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn model(&self) -> &Sequential {
        &self.model
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

/// Writes a classifier to a model file, replacing any existing one.
pub fn save<P: AsRef<Path>>(path: P, classifier: &Classifier) -> Result<()> {
    let path = path.as_ref();
    let mut buffers: Vec<(String, Vec<usize>, Vec<f32>)> = Vec::new();

    let mut offset = 0;
    for (i, block) in classifier.model.param_blocks() {
        let len = block.len();
        let values = classifier.params[offset..offset + len].to_vec();
        buffers.push((format!("layers.{i}.{}", block.name), block.shape, values));
        offset += len;
    }

    for buf in classifier.model.state() {
        let shape = vec![buf.values.len()];
        buffers.push((format!("layers.{}.{}", buf.layer, buf.name), shape, buf.values));
    }

    let n = classifier.scaler.n_features();
    buffers.push(("scaler.mean".into(), vec![n], classifier.scaler.mean().to_vec()));
    buffers.push(("scaler.scale".into(), vec![n], classifier.scaler.scale().to_vec()));

    let tensors = buffers
        .iter()
        .map(|(name, shape, values)| {
            let bytes = bytemuck::cast_slice(values.as_slice());
            Ok((name.as_str(), TensorView::new(Dtype::F32, shape.clone(), bytes)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let spec = ModelSpec::from(&classifier.model);
    let metadata = HashMap::from([
        (MODEL_SPEC_KEY.to_string(), serde_json::to_string(&spec)?),
        (
            FEATURE_NAMES_KEY.to_string(),
            serde_json::to_string(&classifier.feature_names)?,
        ),
        (LABEL_COLUMN_KEY.to_string(), classifier.label_column.clone()),
        (THRESHOLD_KEY.to_string(), classifier.threshold.to_string()),
    ]);

    safetensors::serialize_to_file(tensors, &Some(metadata), path)?;
    info!(tensors = buffers.len(); "saved model to {}", path.display());

    Ok(())
}

/// Reads a classifier back from a model file.
///
/// # Errors
/// If the file can't be read, isn't a `safetensors` file, or lacks a tensor or metadata entry
/// the model needs.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Classifier> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;

    let (_, header) = SafeTensors::read_metadata(&bytes)?;
    let metadata = header
        .metadata()
        .as_ref()
        .ok_or_else(|| PipelineErr::ModelFile("no metadata".to_string()))?;

    let entry = |key: &str| {
        metadata
            .get(key)
            .ok_or_else(|| PipelineErr::ModelFile(format!("missing metadata entry '{key}'")))
    };

    let spec: ModelSpec = serde_json::from_str(entry(MODEL_SPEC_KEY)?)?;
    let feature_names: Vec<String> = serde_json::from_str(entry(FEATURE_NAMES_KEY)?)?;
    let label_column = entry(LABEL_COLUMN_KEY)?.clone();
    let threshold = entry(THRESHOLD_KEY)?
        .parse::<f32>()
        .map_err(|e| PipelineErr::ModelFile(format!("threshold: {e}")))?;

    // the rng only seeds dropout, which is inactive at inference
    let mut rng = StdRng::seed_from_u64(0);
    let mut model = TrainerBuilder::new().resolve_model(&spec, &mut rng)?;

    let tensors = SafeTensors::deserialize(&bytes)?;
    let read = |name: &str, shape: &[usize]| read_tensor(&tensors, name, shape);

    let mut params = Vec::with_capacity(model.size());
    for (i, block) in model.param_blocks() {
        params.extend(read(&format!("layers.{i}.{}", block.name), &block.shape)?);
    }

    let state: Vec<_> = model
        .state()
        .into_iter()
        .map(|buf| (buf.layer, buf.name, buf.values.len()))
        .collect();

    for (layer, name, len) in state {
        let values = read(&format!("layers.{layer}.{name}"), &[len])?;
        model.set_state(layer, &name, &values)?;
    }

    let n = feature_names.len();
    let scaler = StandardScaler::from_parts(
        read("scaler.mean", &[n])?,
        read("scaler.scale", &[n])?,
    )?;

    info!(params = params.len(); "loaded model from {}", path.display());

    Classifier::new(scaler, model, params, feature_names, label_column, threshold)
}

fn read_tensor(tensors: &SafeTensors<'_>, name: &str, shape: &[usize]) -> Result<Vec<f32>> {
    let view = tensors.tensor(name)?;

    if view.dtype() != Dtype::F32 {
        return Err(PipelineErr::ModelFile(format!(
            "tensor '{name}' is {:?}, expected F32",
            view.dtype()
        )));
    }

    if view.shape() != shape {
        return Err(PipelineErr::ModelFile(format!(
            "tensor '{name}' has shape {:?}, expected {shape:?}",
            view.shape()
        )));
    }

    Ok(view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
