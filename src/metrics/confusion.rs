use super::check_lengths;
use crate::{PipelineErr, Result};

/// Counts of predictions against the truth for a binary classifier.
///
/// Rows are the actual class and columns the predicted one: `[[tn, fp], [fn, tp]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Creates a new `ConfusionMatrix`.
    ///
    /// # Errors
    /// If the lengths differ or a label isn't 0 or 1.
    pub fn new(y_true: &[u8], y_pred: &[u8]) -> Result<Self> {
        check_lengths(y_true, y_pred)?;

        let mut counts = [[0; 2]; 2];
        for (row, (&t, &p)) in y_true.iter().zip(y_pred).enumerate() {
            if t > 1 || p > 1 {
                return Err(PipelineErr::NonBinaryLabel {
                    row: row + 1,
                    value: format!("{}", t.max(p)),
                });
            }

            counts[t as usize][p as usize] += 1;
        }

        Ok(Self { counts })
    }

    /// The amount of samples of class `actual` predicted as `predicted`.
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        self.counts[actual][predicted]
    }

    pub fn counts(&self) -> [[usize; 2]; 2] {
        self.counts
    }

    pub fn tn(&self) -> usize {
        self.counts[0][0]
    }

    pub fn fp(&self) -> usize {
        self.counts[0][1]
    }

    pub fn fn_(&self) -> usize {
        self.counts[1][0]
    }

    pub fn tp(&self) -> usize {
        self.counts[1][1]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// The amount of samples whose actual class is `class`.
    pub fn support(&self, class: usize) -> usize {
        self.counts[class].iter().sum()
    }

    /// The amount of samples predicted as `class`.
    pub fn predicted(&self, class: usize) -> usize {
        self.counts[0][class] + self.counts[1][class]
    }

    /// The largest cell.
    pub fn max(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_every_sample_once() {
        let y_true = [0, 0, 0, 1, 1, 1, 1];
        let y_pred = [0, 1, 0, 1, 0, 1, 1];
        let cm = ConfusionMatrix::new(&y_true, &y_pred).unwrap();

        assert_eq!(cm.counts(), [[2, 1], [1, 3]]);
        assert_eq!(cm.total(), y_true.len());
        assert_eq!(cm.support(1), 4);
        assert_eq!(cm.predicted(1), 4);
        assert_eq!(cm.max(), 3);
    }

    #[test]
    fn rejects_mismatched_lengths() {
        assert!(matches!(
            ConfusionMatrix::new(&[0, 1], &[0]),
            Err(PipelineErr::LengthMismatch {
                got: 1,
                expected: 2
            })
        ));
    }

    #[test]
    fn rejects_non_binary_labels() {
        assert!(ConfusionMatrix::new(&[0, 2], &[0, 1]).is_err());
    }
}
