//! Terminal figures of the evaluation and of the training history.

mod charts;
mod theme;
mod viewer;

use std::io::{self, IsTerminal};

use log::{info, warn};
use machine_learning::training::History;

pub use charts::Figure;
pub use viewer::draw_page;

use crate::{Result, metrics::Evaluation};

/// The figures of a run: the confusion matrix, the ROC curve and the loss and accuracy curves.
pub fn figures<'a>(
    evaluation: &'a Evaluation,
    history: &'a History,
    class_names: &'a [String; 2],
) -> [Figure<'a>; 3] {
    [
        Figure::Confusion {
            matrix: &evaluation.confusion,
            class_names,
        },
        Figure::Roc(&evaluation.roc),
        Figure::Curves(history),
    ]
}

/// Shows the figures of a run in the terminal, one after another.
///
/// Nothing is shown when `enabled` is false or when stdout isn't a terminal.
pub fn show(
    evaluation: &Evaluation,
    history: &History,
    class_names: &[String; 2],
    enabled: bool,
) -> Result<()> {
    if !enabled {
        warn!("plots are disabled, skipping figures");
        return Ok(());
    }

    if !io::stdout().is_terminal() {
        warn!("stdout is not a terminal, skipping figures");
        return Ok(());
    }

    let figures = figures(evaluation, history, class_names);
    info!(figures = figures.len(); "showing figures");

    viewer::run(&figures)
}
