//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, panic catching, wide events)
//! - Build the wide event sink from configuration
//! - Bind server to listener and shut down gracefully

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::checkout::CheckoutService;
use crate::config::{ServiceConfig, SinkKind};
use crate::event::{Emitter, EventSink, JsonLineSink, TracingSink};
use crate::http::boundary::{wide_event_middleware, WideEventBoundary};
use crate::http::handlers;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub checkout: Arc<CheckoutService>,
}

/// HTTP server for the checkout service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

/// Sink selected by configuration.
pub fn build_sink(kind: SinkKind) -> Arc<dyn EventSink> {
    match kind {
        SinkKind::Tracing => Arc::new(TracingSink),
        SinkKind::Stdout => Arc::new(JsonLineSink::stdout()),
    }
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Self {
        let emitter = Emitter::new(build_sink(config.wide_event.sink), config.wide_event.marker.as_str());
        Self::with_emitter(config, emitter)
    }

    /// Create a server that emits wide events through `emitter`.
    pub fn with_emitter(config: ServiceConfig, emitter: Emitter) -> Self {
        let state = AppState {
            checkout: Arc::new(CheckoutService::new(&config.checkout)),
        };
        let boundary = WideEventBoundary::new(
            &config.wide_event,
            config.service.to_service_info(),
            emitter,
        );

        let router = Self::build_router(&config, state, boundary);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Order, outermost first: trace, timeout, panic catcher, wide events.
    /// The panic catcher sits outside the boundary so a re-raised panic is
    /// turned into a 500 only after the event was recorded.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState, boundary: WideEventBoundary) -> Router {
        Router::new()
            .route("/checkout", post(handlers::checkout))
            .route("/health", get(handlers::health))
            .with_state(state)
            .layer(middleware::from_fn_with_state(boundary, wide_event_middleware))
            .layer(CatchPanicLayer::new())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.config.service.name,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
