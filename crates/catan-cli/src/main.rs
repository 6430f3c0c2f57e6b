//! Terminal runner: plays a full four-bot game and logs the result.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod runner;

use config::CliConfig;
use runner::Runner;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CliConfig::from_env()?;
    info!(?config, "Starting Catan bot game...");

    let mut runner = Runner::new(&config);
    let game = runner.run()?;

    if let Some(path) = &config.snapshot {
        let json = serde_json::to_string_pretty(game)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing snapshot to {}", path.display()))?;
        info!("Snapshot written to {}", path.display());
    }

    Ok(())
}
