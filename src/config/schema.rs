//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::event::ServiceInfo;

/// Root configuration for the checkout service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Static service metadata stamped on every wide event.
    pub service: ServiceMetadata,

    /// Wide event emission settings.
    pub wide_event: WideEventConfig,

    /// Simulated checkout settings.
    pub checkout: CheckoutConfig,

    /// Synthetic traffic generator.
    pub simulator: SimulatorConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Service identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceMetadata {
    pub name: String,
    pub version: String,
    pub region: String,
    pub environment: String,
}

impl Default for ServiceMetadata {
    fn default() -> Self {
        Self {
            name: "checkout-service".to_string(),
            version: "1.0.0".to_string(),
            region: "us-east-1".to_string(),
            environment: "production".to_string(),
        }
    }
}

impl ServiceMetadata {
    pub fn to_service_info(&self) -> ServiceInfo {
        ServiceInfo {
            service: self.name.clone(),
            version: self.version.clone(),
            region: self.region.clone(),
            environment: self.environment.clone(),
        }
    }
}

/// Where finalized wide events are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// One `tracing` event per request. Only the identifying keys are
    /// top-level fields; the full map is one JSON-encoded value.
    Tracing,
    /// One JSON line per request on stdout, every key at the top level.
    #[default]
    Stdout,
}

/// Wide event configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WideEventConfig {
    /// Path prefixes that bypass the wide event boundary.
    pub excluded_paths: Vec<String>,

    /// Message attached to every wide event entry.
    pub marker: String,

    /// Sink receiving flattened events.
    pub sink: SinkKind,
}

impl Default for WideEventConfig {
    fn default() -> Self {
        Self {
            excluded_paths: vec![
                "/health".to_string(),
                "/actuator".to_string(),
                "/metrics".to_string(),
            ],
            marker: crate::event::DEFAULT_MARKER.to_string(),
            sink: SinkKind::default(),
        }
    }
}

/// Simulated checkout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Upper bound on the simulated payment wait in milliseconds.
    pub max_simulated_latency_ms: u64,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            max_simulated_latency_ms: 200,
        }
    }
}

/// Synthetic traffic generator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Enable the in-process traffic generator.
    pub enabled: bool,

    /// Requests fired per second.
    pub requests_per_second: u32,

    /// Checkout endpoint to call.
    pub target_url: String,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 5,
            target_url: "http://localhost:8080/checkout".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON.
    pub json_format: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_format: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
