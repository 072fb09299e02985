use std::{fmt, io};

use machine_learning::MlErr;

/// The result type used across the pipeline.
pub type Result<T> = std::result::Result<T, PipelineErr>;

/// All errors that can occur while running the pipeline.
#[derive(Debug)]
pub enum PipelineErr {
    Io(io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Safetensors(safetensors::SafeTensorError),
    Ml(MlErr),
    /// The dataset has no column with the label's name.
    MissingColumn(String),
    /// A cell couldn't be parsed as a number. `row` counts data rows from 1.
    ParseCell {
        row: usize,
        column: String,
        value: String,
    },
    /// Every column of the dataset is the label.
    NoFeatures,
    /// A label other than 0 or 1.
    NonBinaryLabel { row: usize, value: String },
    EmptyDataset,
    /// The data has a different amount of features than expected.
    FeatureMismatch { got: usize, expected: usize },
    /// Two sequences that pair up element by element have different lengths.
    LengthMismatch { got: usize, expected: usize },
    /// The rows can't be split as requested.
    Split(String),
    /// A metric needs both classes to be present.
    SingleClass,
    /// A model file is readable but doesn't describe a model.
    ModelFile(String),
    /// Invalid configuration, caught before doing any work.
    InvalidConfig(String),
}

impl fmt::Display for PipelineErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Csv(e) => write!(f, "csv error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
            Self::Safetensors(e) => write!(f, "safetensors error: {e}"),
            Self::Ml(e) => write!(f, "model error: {e}"),
            Self::MissingColumn(name) => write!(f, "missing column '{name}'"),
            Self::ParseCell { row, column, value } => {
                write!(f, "row {row}, column '{column}': '{value}' is not a number")
            }
            Self::NonBinaryLabel { row, value } => {
                write!(f, "row {row}: label '{value}' is neither 0 nor 1")
            }
            Self::NoFeatures => write!(f, "the dataset has no feature columns"),
            Self::EmptyDataset => write!(f, "the dataset has no rows"),
            Self::FeatureMismatch { got, expected } => {
                write!(f, "got {got} features, expected {expected}")
            }
            Self::LengthMismatch { got, expected } => {
                write!(f, "got {got} values, expected {expected}")
            }
            Self::Split(msg) => write!(f, "cannot split dataset: {msg}"),
            Self::SingleClass => write!(f, "only one class present in the labels"),
            Self::ModelFile(msg) => write!(f, "invalid model file: {msg}"),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for PipelineErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Safetensors(e) => Some(e),
            Self::Ml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PipelineErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for PipelineErr {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<serde_json::Error> for PipelineErr {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<safetensors::SafeTensorError> for PipelineErr {
    fn from(e: safetensors::SafeTensorError) -> Self {
        Self::Safetensors(e)
    }
}

impl From<MlErr> for PipelineErr {
    fn from(e: MlErr) -> Self {
        Self::Ml(e)
    }
}

impl From<ndarray::ShapeError> for PipelineErr {
    fn from(e: ndarray::ShapeError) -> Self {
        Self::Ml(MlErr::from(e))
    }
}
