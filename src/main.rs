use anyhow::{Context, Result};
use signal_monitor::config::{Config, LoggingConfig};
use signal_monitor::logs;
use signal_monitor::pipeline::Pipeline;
use tracing_subscriber::EnvFilter;

/// The dashboard owns the terminal, so tracing only goes to a file, and only when one is
/// configured.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let Some(path) = &logging.file else {
        return Ok(());
    };
    let log_file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create log file: {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("signal_monitor=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = Config::path_from_env();
    let config = Config::load_or_default(&config_path)?;
    init_tracing(&config.logging)?;
    logs::route_panics_to_tracing();
    tracing::info!(config = %config_path.display(), "starting signal monitor");

    let (pipeline, feed) = Pipeline::from_config(&config)?;
    pipeline.run(&config.dashboard, feed).await?;

    tracing::debug!("shut down cleanly");
    Ok(())
}
