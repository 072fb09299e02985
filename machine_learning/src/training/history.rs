use crate::arch::EpochStats;

/// The metrics of every epoch of a `ModelTrainer::fit` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    pub loss: Vec<f32>,
    pub accuracy: Vec<f32>,
    pub val_loss: Vec<f32>,
    pub val_accuracy: Vec<f32>,

    /// The epoch whose parameters were kept, if early stopping was used.
    pub best_epoch: Option<usize>,
    pub stopped_early: bool,
}

impl History {
    /// Records the metrics of one more epoch.
    pub fn push(&mut self, train: EpochStats, validation: Option<EpochStats>) {
        self.loss.push(train.loss);
        self.accuracy.push(train.accuracy);

        if let Some(val) = validation {
            self.val_loss.push(val.loss);
            self.val_accuracy.push(val.accuracy);
        }
    }

    /// The amount of epochs that ran.
    pub fn epochs(&self) -> usize {
        self.loss.len()
    }

    pub fn has_validation(&self) -> bool {
        !self.val_loss.is_empty()
    }
}
