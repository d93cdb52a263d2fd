//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response},
    middleware, Router,
};
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;

use wide_events::config::{ServiceConfig, WideEventConfig};
use wide_events::event::{Emitter, MemorySink, DEFAULT_MARKER};
use wide_events::http::{wide_event_middleware, WideEventBoundary};

/// Default config with a short simulated payment wait.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.service.environment = "test".into();
    config.checkout.max_simulated_latency_ms = 10;
    config
}

/// Emitter writing into `sink`.
pub fn memory_emitter(sink: &MemorySink) -> Emitter {
    Emitter::new(Arc::new(sink.clone()), DEFAULT_MARKER)
}

/// Wrap `router` in the wide event boundary, without a panic catcher.
pub fn with_boundary(router: Router, sink: &MemorySink) -> Router {
    with_emitter(router, memory_emitter(sink))
}

/// Wrap `router` in a boundary that emits through `emitter`.
pub fn with_emitter(router: Router, emitter: Emitter) -> Router {
    let boundary = WideEventBoundary::new(
        &WideEventConfig::default(),
        test_config().service.to_service_info(),
        emitter,
    );
    router.layer(middleware::from_fn_with_state(boundary, wide_event_middleware))
}

/// Wrap `router` the way the server does: boundary inside a panic catcher.
pub fn instrumented(router: Router, sink: &MemorySink) -> Router {
    with_boundary(router, sink).layer(CatchPanicLayer::new())
}

pub fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Send one request through `router`.
pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

/// Collect a response body as JSON.
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
