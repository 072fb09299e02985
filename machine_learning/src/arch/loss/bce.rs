use ndarray::{Array2, ArrayView2, Zip};

use super::LossFn;

/// Binary cross-entropy for outputs in `[0, 1]`.
///
/// Predictions are clipped to `[epsilon, 1 - epsilon]` before taking logarithms.
#[derive(Clone, Copy, Debug)]
pub struct BinaryCrossEntropy {
    epsilon: f32,
}

impl Default for BinaryCrossEntropy {
    fn default() -> Self {
        Self { epsilon: 1e-7 }
    }
}

impl BinaryCrossEntropy {
    /// Returns a new `BinaryCrossEntropy` with the default clipping of `1e-7`.
    pub fn new() -> Self {
        Self::default()
    }

    fn clip(&self, p: f32) -> f32 {
        p.clamp(self.epsilon, 1. - self.epsilon)
    }

    fn is_clipped(&self, p: f32) -> bool {
        p < self.epsilon || p > 1. - self.epsilon
    }
}

impl LossFn for BinaryCrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        if y_pred.is_empty() {
            return 0.;
        }

        let total = Zip::from(&y_pred).and(&y).fold(0., |acc, &p, &y| {
            let p = self.clip(p);
            acc - (y * p.ln() + (1. - y) * (1. - p).ln())
        });

        total / y_pred.len() as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.len().max(1) as f32;

        // the clipped region of the loss is flat
        Zip::from(&y_pred).and(&y).map_collect(|&p, &y| {
            if self.is_clipped(p) {
                return 0.;
            }

            (p - y) / (p * (1. - p)) / n
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn perfect_predictions_have_near_zero_loss() {
        let bce = BinaryCrossEntropy::new();
        let y = array![[0.], [1.], [1.]];

        assert!(bce.loss(y.view(), y.view()) < 1e-5);
    }

    #[test]
    fn matches_hand_computed_value() {
        let bce = BinaryCrossEntropy::new();
        let y_pred = array![[0.8], [0.4]];
        let y = array![[1.], [0.]];

        let expected = -(0.8f32.ln() + 0.6f32.ln()) / 2.;
        assert!((bce.loss(y_pred.view(), y.view()) - expected).abs() < 1e-6);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let bce = BinaryCrossEntropy::new();
        let y_pred = array![[0.3], [0.7], [0.55]];
        let y = array![[0.], [1.], [0.]];
        let grad = bce.loss_prime(y_pred.view(), y.view());
        let h = 1e-3;

        for i in 0..y_pred.nrows() {
            let mut plus = y_pred.clone();
            let mut minus = y_pred.clone();
            plus[[i, 0]] += h;
            minus[[i, 0]] -= h;

            let numeric = (bce.loss(plus.view(), y.view()) - bce.loss(minus.view(), y.view()))
                / (2. * h);
            assert!((numeric - grad[[i, 0]]).abs() < 1e-2, "{numeric} vs {}", grad[[i, 0]]);
        }
    }

    #[test]
    fn clipping_keeps_loss_finite() {
        let bce = BinaryCrossEntropy::new();
        let y_pred = array![[0.], [1.]];
        let y = array![[1.], [0.]];

        assert!(bce.loss(y_pred.view(), y.view()).is_finite());
        assert!(bce.loss_prime(y_pred.view(), y.view()).iter().all(|&g| g == 0.));
    }

    #[test]
    fn clipped_predictions_have_no_gradient() {
        let bce = BinaryCrossEntropy::new();
        let y_pred = array![[0.], [1.], [1e-9], [0.5]];
        let y = array![[1.], [0.], [1.], [1.]];
        let grad = bce.loss_prime(y_pred.view(), y.view());

        assert_eq!(grad[[0, 0]], 0.);
        assert_eq!(grad[[1, 0]], 0.);
        assert_eq!(grad[[2, 0]], 0.);
        // (0.5 - 1) / 0.25 / 4
        assert!((grad[[3, 0]] + 0.5).abs() < 1e-6);
    }
}
