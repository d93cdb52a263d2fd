//! Wide event request boundary.
//!
//! # Responsibilities
//! - Generate request and trace ids
//! - Seed the request's wide event and install it as task-local context
//! - Record status, duration and outcome once the handler finishes
//! - Record panics and escaped `AppError`s, then let them continue upward
//! - Emit exactly one event per request and clear the context
//!
//! # Design Decisions
//! - Finalize, emit and clear live in `RequestGuard::drop`, so every exit
//!   path (return, panic, cancelled future) runs them exactly once
//! - Excluded paths skip the boundary entirely
//! - Unhandled failures always record status 500

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use futures_util::FutureExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::WideEventConfig;
use crate::event::{Emitter, EventSlot, RequestContext, ServiceInfo, WideEvent};
use crate::http::error::UnhandledFailure;
use crate::observability::{metrics, tracing::request_span};

/// Header carrying the request id back to the caller.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Error type recorded when a handler panics.
pub const PANIC_ERROR_TYPE: &str = "panic";

/// Identifiers assigned to a request at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIds {
    /// First 8 characters of a UUID v4.
    pub request_id: String,
    /// UUID v4 without separators.
    pub trace_id: String,
}

impl RequestIds {
    pub fn generate() -> Self {
        let mut request_id = Uuid::new_v4().to_string();
        request_id.truncate(8);
        Self {
            request_id,
            trace_id: Uuid::new_v4().simple().to_string(),
        }
    }
}

/// Shared boundary state.
#[derive(Debug, Clone)]
pub struct WideEventBoundary {
    excluded_paths: Arc<[String]>,
    service: ServiceInfo,
    emitter: Emitter,
}

impl WideEventBoundary {
    pub fn new(config: &WideEventConfig, service: ServiceInfo, emitter: Emitter) -> Self {
        Self {
            excluded_paths: config.excluded_paths.clone().into(),
            service,
            emitter,
        }
    }

    /// Whether `path` bypasses wide event handling.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_paths.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Seed a wide event for a new request and take ownership of its lifecycle.
    pub fn begin(&self, method: &str, path: &str) -> RequestGuard {
        let ids = RequestIds::generate();
        let mut builder = WideEvent::builder(&ids.request_id, &ids.trace_id, self.service.clone());
        builder.http_request(method, path);

        RequestGuard {
            slot: RequestContext::init(builder),
            emitter: self.emitter.clone(),
            ids,
            method: method.to_string(),
            start: Instant::now(),
        }
    }
}

/// Owns one request's wide event from `begin` until drop.
///
/// Dropping the guard finalizes the event, emits it and clears the context.
/// If no status was observed (for example the request future was cancelled)
/// the event is emitted with status 500.
pub struct RequestGuard {
    slot: EventSlot,
    emitter: Emitter,
    ids: RequestIds,
    method: String,
    start: Instant,
}

impl RequestGuard {
    pub fn slot(&self) -> EventSlot {
        self.slot.clone()
    }

    pub fn ids(&self) -> &RequestIds {
        &self.ids
    }

    /// Record the response produced by the handler.
    pub fn observe_response(&self, response: &Response) {
        let status = response.status().as_u16();
        let failure = response.extensions().get::<UnhandledFailure>();
        let _ = self.slot.with(|event| match failure {
            Some(failure) => {
                event.unhandled_failure(failure.kind, &failure.message);
            }
            None => {
                event.http_status(status);
            }
        });
    }

    /// Record a panic that escaped the handler.
    pub fn observe_panic(&self, message: &str) {
        let _ = self.slot.with(|event| {
            event.unhandled_failure(PANIC_ERROR_TYPE, message);
        });
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        let Some(builder) = self.slot.clear() else {
            return;
        };
        if !builder.has_status() {
            tracing::warn!(request_id = %self.ids.request_id, "Request ended without a response");
        }

        let duration_ms = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let event = builder.finish(duration_ms);
        let status = event.http.http_status.unwrap_or(500);
        metrics::record_request(&self.method, status, self.start);
        self.emitter.emit(&event);
    }
}

/// Best-effort message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Axum middleware wrapping every request in a wide event.
pub async fn wide_event_middleware(
    State(boundary): State<WideEventBoundary>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if boundary.is_excluded(request.uri().path()) {
        return next.run(request).await;
    }

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let guard = boundary.begin(&method, &path);
    let span = request_span(&guard.ids().request_id, &guard.ids().trace_id, &method, &path);

    let result = RequestContext::scope(guard.slot(), AssertUnwindSafe(next.run(request)).catch_unwind())
        .instrument(span)
        .await;

    match result {
        Ok(mut response) => {
            guard.observe_response(&response);
            if let Ok(value) = HeaderValue::from_str(&guard.ids().request_id) {
                response.headers_mut().insert(X_REQUEST_ID, value);
            }
            drop(guard);
            response
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(
                request_id = %guard.ids().request_id,
                error = %message,
                "Unhandled failure in request handler"
            );
            guard.observe_panic(&message);
            drop(guard);
            std::panic::resume_unwind(payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MemorySink;

    fn boundary(sink: &MemorySink) -> WideEventBoundary {
        WideEventBoundary::new(
            &WideEventConfig::default(),
            ServiceInfo {
                service: "checkout-service".into(),
                version: "1.0.0".into(),
                region: "us-east-1".into(),
                environment: "test".into(),
            },
            Emitter::new(Arc::new(sink.clone()), "wide_event"),
        )
    }

    #[test]
    fn test_request_ids_format() {
        let ids = RequestIds::generate();
        assert_eq!(ids.request_id.len(), 8);
        assert_eq!(ids.trace_id.len(), 32);
        assert!(ids.trace_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(RequestIds::generate(), ids);
    }

    #[test]
    fn test_excluded_prefixes() {
        let b = boundary(&MemorySink::new());
        assert!(b.is_excluded("/health"));
        assert!(b.is_excluded("/actuator/prometheus"));
        assert!(!b.is_excluded("/checkout"));
    }

    #[test]
    fn test_dropped_guard_emits_once_with_fallback_status() {
        let sink = MemorySink::new();
        let guard = boundary(&sink).begin("POST", "/checkout");
        let slot = guard.slot();
        slot.with(|e| {
            e.cart_id("cart_1");
        })
        .unwrap();
        drop(guard);

        assert!(!slot.is_active());
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].fields["http_status"], "500");
        assert_eq!(events[0].fields["outcome"], "error");
        assert_eq!(events[0].fields["cart_id"], "cart_1");
        assert_eq!(events[0].fields["http_path"], "/checkout");
        assert_eq!(events[0].fields["service"], "checkout-service");
    }

    #[test]
    fn test_observe_panic_records_failure() {
        let sink = MemorySink::new();
        let guard = boundary(&sink).begin("GET", "/boom");
        guard.observe_panic("kaboom");
        drop(guard);

        let fields = &sink.events()[0].fields;
        assert_eq!(fields["error_type"], "panic");
        assert_eq!(fields["error_message"], "kaboom");
        assert_eq!(fields["http_status"], "500");
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "handler panicked");
    }
}
