use super::check_lengths;
use crate::{PipelineErr, Result};

/// The receiver operating characteristic of a scorer.
///
/// Points are ordered by decreasing threshold, the first one is `(0, 0)` with an infinite
/// threshold and the last one is `(1, 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RocCurve {
    fpr: Vec<f64>,
    tpr: Vec<f64>,
    thresholds: Vec<f64>,
}

impl RocCurve {
    /// Computes the curve of `scores` against binary labels.
    ///
    /// Every distinct score is a candidate threshold. Points lying on a straight line between
    /// their neighbours don't change the area and are dropped.
    ///
    /// # Errors
    /// If the lengths differ or `y_true` doesn't hold both classes.
    pub fn new(y_true: &[u8], scores: &[f32]) -> Result<Self> {
        check_lengths(y_true, scores)?;

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        // cumulative counts at the end of every run of equal scores
        let mut tps = Vec::new();
        let mut fps = Vec::new();
        let mut thresholds = Vec::new();
        let (mut tp, mut fp) = (0i64, 0i64);

        for (k, &i) in order.iter().enumerate() {
            if y_true[i] > 0 {
                tp += 1;
            } else {
                fp += 1;
            }

            let run_ends = order.get(k + 1).is_none_or(|&j| scores[j] != scores[i]);
            if run_ends {
                tps.push(tp);
                fps.push(fp);
                thresholds.push(f64::from(scores[i]));
            }
        }

        if tp == 0 || fp == 0 {
            return Err(PipelineErr::SingleClass);
        }

        let keep: Vec<usize> = (0..tps.len())
            .filter(|&k| {
                if k == 0 || k + 1 == tps.len() {
                    return true;
                }

                let bends = |c: &[i64]| c[k - 1] - 2 * c[k] + c[k + 1] != 0;
                bends(&fps) || bends(&tps)
            })
            .collect();

        let mut curve = Self {
            fpr: vec![0.],
            tpr: vec![0.],
            thresholds: vec![f64::INFINITY],
        };

        for k in keep {
            curve.fpr.push(fps[k] as f64 / fp as f64);
            curve.tpr.push(tps[k] as f64 / tp as f64);
            curve.thresholds.push(thresholds[k]);
        }

        Ok(curve)
    }

    pub fn fpr(&self) -> &[f64] {
        &self.fpr
    }

    pub fn tpr(&self) -> &[f64] {
        &self.tpr
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// The `(fpr, tpr)` points of the curve.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.fpr.iter().copied().zip(self.tpr.iter().copied()).collect()
    }

    /// The area under the curve, by the trapezoidal rule.
    pub fn auc(&self) -> f64 {
        self.points()
            .windows(2)
            .map(|w| (w[1].0 - w[0].0) * (w[1].1 + w[0].1) / 2.)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_ranking_has_unit_area() {
        let roc = RocCurve::new(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]).unwrap();

        assert_eq!(roc.auc(), 1.);
        assert_eq!(roc.fpr(), [0., 0., 0., 1.]);
        assert_eq!(roc.tpr(), [0., 0.5, 1., 1.]);
        assert_eq!(roc.thresholds()[0], f64::INFINITY);
    }

    #[test]
    fn reversed_ranking_has_zero_area() {
        let roc = RocCurve::new(&[1, 1, 0, 0], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert_eq!(roc.auc(), 0.);
    }

    #[test]
    fn ties_form_a_single_point() {
        let roc = RocCurve::new(&[0, 1, 0, 1], &[0.5; 4]).unwrap();

        assert_eq!(roc.points(), [(0., 0.), (1., 1.)]);
        assert_eq!(roc.auc(), 0.5);
    }

    #[test]
    fn mixed_ranking() {
        // descending: 0.9 (1), 0.7 (0), 0.6 (1), 0.2 (0)
        let roc = RocCurve::new(&[1, 0, 1, 0], &[0.9, 0.7, 0.6, 0.2]).unwrap();
        assert!((roc.auc() - 0.75).abs() < 1e-12);

        // thresholds decrease along the curve
        assert!(roc.thresholds().windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn single_class_is_an_error() {
        assert!(matches!(
            RocCurve::new(&[1, 1], &[0.3, 0.4]),
            Err(PipelineErr::SingleClass)
        ));
    }
}
