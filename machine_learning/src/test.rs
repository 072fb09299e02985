#![cfg(test)]

use std::num::NonZeroUsize;

use ndarray::{Array2, Axis, array, concatenate};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    arch::binary_accuracy,
    dataset::Dataset,
    specs::{
        ActFnSpec, EarlyStoppingSpec, LayerSpec, LossFnSpec, ModelSpec, OptimizerSpec, TrainerSpec,
    },
    training::TrainerBuilder,
};

fn adam(learning_rate: f32) -> OptimizerSpec {
    OptimizerSpec::Adam {
        learning_rate,
        beta1: 0.9,
        beta2: 0.999,
        epsilon: 1e-7,
        decay: 0.,
    }
}

/// Two well separated clouds of points, labeled 0 and 1.
fn blobs(n: usize, features: usize, seed: u64) -> (Array2<f32>, Array2<f32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cloud = |center: f32| {
        Array2::from_shape_fn((n, features), |_| center + rng.random_range(-1.0..1.0))
    };

    let neg = cloud(-2.);
    let pos = cloud(2.);
    let x = concatenate(Axis(0), &[neg.view(), pos.view()]).unwrap();
    let y = Array2::from_shape_fn((2 * n, 1), |(i, _)| (i >= n) as u8 as f32);

    (x, y)
}

#[test]
fn logistic_regression_learns_the_and_gate() {
    let x = array![[0., 0.], [0., 1.], [1., 0.], [1., 1.]];
    let y = array![[0.], [0.], [0.], [1.]];

    let spec = TrainerSpec {
        model: ModelSpec::Sequential {
            layers: vec![LayerSpec::Dense {
                dim: (2, 1),
                act_fn: Some(ActFnSpec::Sigmoid { amp: 1. }),
            }],
        },
        optimizer: adam(0.1),
        loss: LossFnSpec::BinaryCrossEntropy,
        epochs: NonZeroUsize::new(500).unwrap(),
        batch_size: NonZeroUsize::new(4).unwrap(),
        early_stopping: None,
        seed: Some(42),
    };

    let dataset = Dataset::from_arrays(x.view(), y.view()).unwrap();
    let mut trainer = TrainerBuilder::new().build(&spec, dataset).unwrap();
    let mut params = trainer.init_params().unwrap();

    let history = trainer.fit(&mut params, None).unwrap();
    let y_pred = trainer.predict(&params, x.view()).unwrap();

    assert!(history.loss[499] < history.loss[0]);
    assert_eq!(binary_accuracy(y_pred.view(), y.view()), 1.);
}

#[test]
fn deep_network_separates_two_blobs() {
    let (x, y) = blobs(80, 4, 7);
    let (val_x, val_y) = blobs(20, 4, 8);

    let mut layers = Vec::new();
    for (n, m) in [(4, 16), (16, 8)] {
        layers.push(LayerSpec::Dense {
            dim: (n, m),
            act_fn: Some(ActFnSpec::Relu),
        });
        layers.push(LayerSpec::BatchNorm {
            dim: m,
            momentum: 0.9,
            epsilon: 1e-3,
        });
        layers.push(LayerSpec::Dropout { rate: 0.1 });
    }
    layers.push(LayerSpec::Dense {
        dim: (8, 1),
        act_fn: Some(ActFnSpec::Sigmoid { amp: 1. }),
    });

    let spec = TrainerSpec {
        model: ModelSpec::Sequential { layers },
        optimizer: adam(0.01),
        loss: LossFnSpec::BinaryCrossEntropy,
        epochs: NonZeroUsize::new(60).unwrap(),
        batch_size: NonZeroUsize::new(16).unwrap(),
        early_stopping: Some(EarlyStoppingSpec {
            patience: 5,
            min_delta: 0.,
            restore_best: true,
        }),
        seed: Some(42),
    };

    let dataset = Dataset::from_arrays(x.view(), y.view()).unwrap();
    let mut trainer = TrainerBuilder::new().build(&spec, dataset).unwrap();
    let mut params = trainer.init_params().unwrap();

    let history = trainer
        .fit(&mut params, Some((val_x.view(), val_y.view())))
        .unwrap();

    let y_pred = trainer.predict(&params, val_x.view()).unwrap();

    assert!(history.epochs() >= 1);
    assert!(y_pred.iter().all(|p| (0. ..=1.).contains(p)));
    assert!(binary_accuracy(y_pred.view(), val_y.view()) >= 0.95);
}
