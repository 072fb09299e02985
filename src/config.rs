use std::{
    env, fs,
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{PipelineErr, Result, network::NetworkParams};

/// Names the JSON file to read the configuration from.
pub const CONFIG_ENV: &str = "GLYCEMIA_CONFIG";
/// Overrides the dataset path.
pub const DATASET_ENV: &str = "GLYCEMIA_DATASET";
/// Overrides the path the model gets saved to.
pub const MODEL_ENV: &str = "GLYCEMIA_MODEL";

/// Everything the pipeline can be configured with. Every field has a default, so an empty
/// JSON object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub seed: u64,
    pub dataset: PathBuf,
    pub label_column: String,
    /// The fraction of rows held out for testing.
    pub test_size: f32,
    pub network: NetworkParams,
    /// Probabilities at or above it are classified as positive.
    pub threshold: f32,
    /// Display names of the negative and the positive class.
    pub class_names: [String; 2],
    pub model_path: PathBuf,
    /// Whether to show the figures once training is done.
    pub plots: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            dataset: PathBuf::from("Large_Augmented_ECG_PPG_Data.csv"),
            label_column: "Result".to_string(),
            test_size: 0.2,
            network: NetworkParams::default(),
            threshold: 0.5,
            class_names: ["No Hyperglycemia".to_string(), "Hyperglycemia".to_string()],
            model_path: PathBuf::from("trained_hyperglycemia_model.safetensors"),
            plots: true,
        }
    }
}

impl PipelineConfig {
    /// Loads the configuration from the environment.
    ///
    /// The file named by `GLYCEMIA_CONFIG` is read when set, otherwise the defaults are used.
    /// `GLYCEMIA_DATASET` and `GLYCEMIA_MODEL` override the paths afterwards.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or parsed, or if the result is invalid.
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(dataset) = env::var_os(DATASET_ENV) {
            config.dataset = dataset.into();
        }

        if let Some(model_path) = env::var_os(MODEL_ENV) {
            config.model_path = model_path.into();
        }

        config.validate()?;
        Ok(config)
    }

    /// Reads the configuration from a JSON file, without validating it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("reading config from {}", path.display());

        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Checks that every value is within range.
    ///
    /// # Errors
    /// Returns `PipelineErr::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(PipelineErr::InvalidConfig(msg)) };
        let net = &self.network;

        if !(self.test_size > 0. && self.test_size < 1.) {
            return invalid(format!("test_size must be in (0, 1), got {}", self.test_size));
        }

        if !(0. ..=1.).contains(&self.threshold) {
            return invalid(format!("threshold must be in [0, 1], got {}", self.threshold));
        }

        if self.label_column.is_empty() {
            return invalid("label_column must not be empty".to_string());
        }

        if net.neurons < 4 {
            return invalid(format!("neurons must be at least 4, got {}", net.neurons));
        }

        if !(0. ..1.).contains(&net.dropout_rate) {
            return invalid(format!(
                "dropout_rate must be in [0, 1), got {}",
                net.dropout_rate
            ));
        }

        if net.epochs == 0 || net.batch_size == 0 {
            return invalid("epochs and batch_size must be positive".to_string());
        }

        if !(net.learning_rate > 0.) {
            return invalid(format!(
                "learning_rate must be positive, got {}",
                net.learning_rate
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_the_default() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_network_keeps_other_defaults() {
        let json = r#"{ "seed": 7, "network": { "neurons": 16, "epochs": 3 } }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.network.neurons, 16);
        assert_eq!(config.network.epochs, 3);
        assert_eq!(config.network.batch_size, 32);
        assert_eq!(config.label_column, "Result");
    }

    #[test]
    fn rejects_out_of_range_values() {
        let cases = [
            PipelineConfig {
                test_size: 1.,
                ..Default::default()
            },
            PipelineConfig {
                threshold: 1.5,
                ..Default::default()
            },
            PipelineConfig {
                network: NetworkParams {
                    neurons: 3,
                    ..Default::default()
                },
                ..Default::default()
            },
            PipelineConfig {
                network: NetworkParams {
                    dropout_rate: 1.,
                    ..Default::default()
                },
                ..Default::default()
            },
            PipelineConfig {
                network: NetworkParams {
                    batch_size: 0,
                    ..Default::default()
                },
                ..Default::default()
            },
        ];

        for config in cases {
            assert!(
                matches!(config.validate(), Err(PipelineErr::InvalidConfig(_))),
                "{config:?}"
            );
        }
    }

    #[test]
    fn reads_a_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"{ "dataset": "data.csv", "plots": false }"#).unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.dataset, PathBuf::from("data.csv"));
        assert!(!config.plots);
    }
}
