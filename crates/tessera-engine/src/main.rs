//! # Tessera
//!
//! Runs the world engine headless for a configured number of frames and
//! prints a JSON run summary.
//!
//! Usage: `tessera [CONFIG_PATH]` (defaults to `tessera.toml`).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::Result;
use tessera_engine::app;
use tessera_engine::config::EngineConfig;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("tessera=info".parse()?))
        .init();

    info!("Tessera starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };

    app::run(config)?;

    info!("Tessera shutdown complete");
    Ok(())
}
