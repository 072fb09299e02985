mod builder;
mod early_stopping;
mod history;
mod model_trainer;

pub use builder::{SequentialTrainer, TrainerBuilder};
pub use early_stopping::{EarlyStopping, Snapshot};
pub use history::History;
pub use model_trainer::ModelTrainer;
