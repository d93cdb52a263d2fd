//! Checkout service with wide event logging.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ trace ─▶ timeout ─▶ catch-panic ─▶ wide event boundary ─▶ /checkout
//!                                                            │      ▲
//!                                                 init slot  │      │ enrich
//!                                                            ▼      │
//!                                                   task-local RequestContext
//!                                                            │
//!                                       finalize on drop     ▼
//!                                                   flatten ─▶ sink (one entry)
//! ```

use std::path::PathBuf;

use clap::Parser;

use wide_events::config::{load_config, ServiceConfig};
use wide_events::lifecycle::startup;
use wide_events::observability::logging;

#[derive(Parser)]
#[command(name = "wide-events")]
#[command(about = "Checkout service emitting one wide event per request", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        service = %config.service.name,
        version = %config.service.version,
        environment = %config.service.environment,
        bind_address = %config.listener.bind_address,
        simulator = config.simulator.enabled,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
