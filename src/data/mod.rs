//! Dataset ingestion and the train/test split.

mod split;
mod table;

pub use split::{Split, stratified_split};
pub use table::Table;
