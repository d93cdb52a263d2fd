//! Request spans carrying correlation ids.
//!
//! Every log line produced while a request is handled inherits
//! `request_id` and `trace_id` from the span opened here.

use tracing::Span;

/// Span wrapping the handling of one request.
pub fn request_span(request_id: &str, trace_id: &str, method: &str, path: &str) -> Span {
    tracing::info_span!(
        "request",
        request_id = %request_id,
        trace_id = %trace_id,
        method = %method,
        path = %path,
    )
}
