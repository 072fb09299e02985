//! Metrics of a binary classifier on held-out data.

mod confusion;
mod report;
mod roc;

use log::debug;

pub use confusion::ConfusionMatrix;
pub use report::{ClassMetrics, ClassificationReport};
pub use roc::RocCurve;

use crate::{PipelineErr, Result};

/// Turns probabilities into labels, `p >= t` being the positive class.
pub fn threshold(probs: &[f32], t: f32) -> Vec<u8> {
    probs.iter().map(|&p| u8::from(p >= t)).collect()
}

/// The fraction of predictions that match the truth, 0 when there are none.
pub fn accuracy(y_true: &[u8], y_pred: &[u8]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;

    if y_true.is_empty() {
        return Ok(0.);
    }

    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(hits as f64 / y_true.len() as f64)
}

fn check_lengths<A, B>(expected: &[A], got: &[B]) -> Result<()> {
    if expected.len() != got.len() {
        return Err(PipelineErr::LengthMismatch {
            got: got.len(),
            expected: expected.len(),
        });
    }

    Ok(())
}

/// Everything measured on the test set.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub probabilities: Vec<f32>,
    pub predictions: Vec<u8>,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
    pub roc: RocCurve,
    pub accuracy: f64,
}

impl Evaluation {
    /// Scores the predicted probabilities of a classifier against the truth.
    ///
    /// # Arguments
    /// * `y_true` - The actual labels.
    /// * `probabilities` - The probability of the positive class for every sample.
    /// * `t` - The decision threshold.
    /// * `class_names` - Names the negative and the positive class in the report.
    ///
    /// # Errors
    /// If the lengths differ or `y_true` holds a single class.
    pub fn new(
        y_true: &[u8],
        probabilities: Vec<f32>,
        t: f32,
        class_names: &[String; 2],
    ) -> Result<Self> {
        let predictions = threshold(&probabilities, t);
        let confusion = ConfusionMatrix::new(y_true, &predictions)?;
        let report = ClassificationReport::from_confusion(&confusion, class_names);
        let roc = RocCurve::new(y_true, &probabilities)?;
        let accuracy = accuracy(y_true, &predictions)?;

        debug!(accuracy = accuracy, auc = roc.auc(); "evaluated {} samples", y_true.len());

        Ok(Self {
            probabilities,
            predictions,
            confusion,
            report,
            roc,
            accuracy,
        })
    }

    pub fn auc(&self) -> f64 {
        self.roc.auc()
    }
}
