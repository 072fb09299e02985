use crate::arch::{Model, StateBuffer};

/// The parameters and non-trainable state of a model at some epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub params: Vec<f32>,
    pub state: Vec<StateBuffer>,
}

/// Stops training once the monitored loss hasn't improved for `patience` consecutive epochs.
///
/// An epoch improves when its loss is lower than the best one so far by more than `min_delta`.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f32,
    restore_best: bool,

    best: f32,
    best_epoch: Option<usize>,
    wait: usize,
    snapshot: Option<Snapshot>,
}

impl EarlyStopping {
    /// Creates a new `EarlyStopping`.
    ///
    /// # Arguments
    /// * `patience` - How many epochs without improvement are tolerated.
    /// * `min_delta` - The minimum decrease of the loss that counts as an improvement.
    /// * `restore_best` - Whether to keep a snapshot of the best epoch to restore at the end.
    pub fn new(patience: usize, min_delta: f32, restore_best: bool) -> Self {
        Self {
            patience,
            min_delta: min_delta.abs(),
            restore_best,
            best: f32::INFINITY,
            best_epoch: None,
            wait: 0,
            snapshot: None,
        }
    }

    /// Forgets everything seen so far.
    pub fn reset(&mut self) {
        self.best = f32::INFINITY;
        self.best_epoch = None;
        self.wait = 0;
        self.snapshot = None;
    }

    pub fn best(&self) -> f32 {
        self.best
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    /// Records the loss of an epoch.
    ///
    /// # Arguments
    /// * `epoch` - The index of the epoch.
    /// * `loss` - The monitored loss of that epoch.
    /// * `params` - The parameters at the end of that epoch.
    /// * `model` - The model, for its non-trainable state.
    ///
    /// # Returns
    /// Whether training should stop.
    pub fn update<M: Model>(&mut self, epoch: usize, loss: f32, params: &[f32], model: &M) -> bool {
        if loss < self.best - self.min_delta {
            self.best = loss;
            self.best_epoch = Some(epoch);
            self.wait = 0;

            if self.restore_best {
                self.snapshot = Some(Snapshot {
                    params: params.to_vec(),
                    state: model.state(),
                });
            }

            return false;
        }

        self.wait += 1;
        self.wait >= self.patience
    }

    /// Takes the snapshot of the best epoch if it should replace the one that ran last.
    ///
    /// # Arguments
    /// * `last_epoch` - The index of the last epoch that ran.
    pub fn take_best(&mut self, last_epoch: usize) -> Option<Snapshot> {
        if self.best_epoch == Some(last_epoch) {
            return None;
        }

        self.snapshot.take()
    }
}
