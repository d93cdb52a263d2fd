//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize metrics when enabled
//! - Bind the listener
//! - Start background tasks (traffic simulator, signal handling)
//! - Serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: bind errors are fatal
//! - The simulator only starts once the listener is bound

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::simulator::TrafficSimulator;

/// Run the service with `config` until a termination signal arrives.
pub async fn run(config: ServiceConfig) -> Result<(), std::io::Error> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    if config.simulator.enabled {
        let simulator = TrafficSimulator::new(&config.simulator);
        let simulator_shutdown = shutdown.subscribe();
        tokio::spawn(simulator.run(simulator_shutdown));
    }

    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));

    HttpServer::new(config).run(listener, server_shutdown).await
}
