use std::fmt;

use super::ConfusionMatrix;
use crate::Result;

/// Precision, recall and F1 of a single class, or an average of them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// The per-class and averaged metrics of a binary classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    class_names: [String; 2],
    classes: [ClassMetrics; 2],
    accuracy: f64,
    macro_avg: ClassMetrics,
    weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Creates a new `ClassificationReport` from true and predicted labels.
    pub fn new(y_true: &[u8], y_pred: &[u8], class_names: &[String; 2]) -> Result<Self> {
        let cm = ConfusionMatrix::new(y_true, y_pred)?;
        Ok(Self::from_confusion(&cm, class_names))
    }

    /// Derives the report from a confusion matrix. Ratios with a zero denominator are 0.
    pub fn from_confusion(cm: &ConfusionMatrix, class_names: &[String; 2]) -> Self {
        let classes = [0, 1].map(|class| {
            let hits = cm.get(class, class);
            let precision = ratio(hits, cm.predicted(class));
            let recall = ratio(hits, cm.support(class));
            let f1 = if precision + recall > 0. {
                2. * precision * recall / (precision + recall)
            } else {
                0.
            };

            ClassMetrics {
                precision,
                recall,
                f1,
                support: cm.support(class),
            }
        });

        let total = cm.total();
        let average = |weights: [f64; 2]| {
            let mean = |f: fn(&ClassMetrics) -> f64| -> f64 {
                classes.iter().zip(weights).map(|(c, w)| f(c) * w).sum()
            };

            ClassMetrics {
                precision: mean(|c| c.precision),
                recall: mean(|c| c.recall),
                f1: mean(|c| c.f1),
                support: total,
            }
        };

        let macro_avg = average([0.5, 0.5]);
        let weighted_avg = average(classes.map(|c| ratio(c.support, total)));

        Self {
            class_names: class_names.clone(),
            classes,
            accuracy: ratio(cm.tn() + cm.tp(), total),
            macro_avg,
            weighted_avg,
        }
    }

    pub fn class(&self, class: usize) -> &ClassMetrics {
        &self.classes[class]
    }

    pub fn class_names(&self) -> &[String; 2] {
        &self.class_names
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn macro_avg(&self) -> &ClassMetrics {
        &self.macro_avg
    }

    pub fn weighted_avg(&self) -> &ClassMetrics {
        &self.weighted_avg
    }

    pub fn support(&self) -> usize {
        self.macro_avg.support
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const WEIGHTED: &str = "weighted avg";

        let width = self
            .class_names
            .iter()
            .map(|name| name.len())
            .chain([WEIGHTED.len()])
            .max()
            .unwrap_or(WEIGHTED.len());

        let row = |f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics| {
            writeln!(
                f,
                "{name:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.precision, m.recall, m.f1, m.support
            )
        };

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;

        for (name, metrics) in self.class_names.iter().zip(&self.classes) {
            row(f, name, metrics)?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.support()
        )?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, WEIGHTED, &self.weighted_avg)
    }
}
