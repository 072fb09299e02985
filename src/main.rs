use anyhow::Context;
use env_logger::Env;
use glycemia::{PipelineConfig, plots};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = PipelineConfig::from_env().context("failed to load the configuration")?;
    let outcome = glycemia::run(&config)
        .with_context(|| format!("pipeline failed on {}", config.dataset.display()))?;

    let evaluation = &outcome.evaluation;
    println!("Classification Report:\n{}", evaluation.report);
    println!("Accuracy: {:.4}", evaluation.accuracy);
    println!("ROC AUC: {:.4}", evaluation.auc());

    plots::show(
        evaluation,
        &outcome.history,
        &config.class_names,
        config.plots,
    )
    .context("failed to show the figures")?;

    println!("Model saved to {}", outcome.model_path.display());
    Ok(())
}
