pub mod activations;
pub mod layers;
pub mod loss;
mod mode;
mod model;
mod sequential;

pub use mode::Mode;
pub use model::{EpochStats, Model, StateBuffer, binary_accuracy};
pub use sequential::Sequential;
