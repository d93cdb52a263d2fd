//! Best-effort emission of finalized wide events.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::event::flatten::flatten;
use crate::event::record::WideEvent;
use crate::event::sink::{EventSink, JsonLineSink};
use crate::observability::metrics;

/// Default message attached to every wide event entry.
pub const DEFAULT_MARKER: &str = "wide_event";

/// Flattens records and hands them to the configured sink.
///
/// Emission never fails from the caller's point of view: flatten errors,
/// sink errors and sink panics are logged and swallowed.
#[derive(Clone)]
pub struct Emitter {
    sink: Arc<dyn EventSink>,
    marker: Arc<str>,
}

impl Emitter {
    pub fn new(sink: Arc<dyn EventSink>, marker: impl Into<Arc<str>>) -> Self {
        Self {
            sink,
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Emit `event` as a single sink entry. Returns whether it was written.
    pub fn emit(&self, event: &WideEvent) -> bool {
        let result = catch_unwind(AssertUnwindSafe(|| -> Result<(), String> {
            let fields = flatten(event).map_err(|e| e.to_string())?;
            self.sink
                .emit(&self.marker, &fields)
                .map_err(|e| e.to_string())
        }));

        let outcome = event.outcome.map(|o| o.as_str()).unwrap_or("unknown");
        match result {
            Ok(Ok(())) => {
                metrics::record_wide_event(outcome);
                true
            }
            Ok(Err(error)) => {
                tracing::error!(request_id = %event.request_id, error = %error, "Failed to emit wide event");
                metrics::record_emit_failure();
                false
            }
            Err(_) => {
                tracing::error!(request_id = %event.request_id, "Failed to emit wide event: sink panicked");
                metrics::record_emit_failure();
                false
            }
        }
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new(Arc::new(JsonLineSink::stdout()), DEFAULT_MARKER)
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter").field("marker", &self.marker).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::flatten::FlatFields;
    use crate::event::record::ServiceInfo;
    use crate::event::sink::{MemorySink, SinkError};

    struct FailingSink;

    impl EventSink for FailingSink {
        fn emit(&self, _marker: &str, _fields: &FlatFields) -> Result<(), SinkError> {
            Err(SinkError::Io(std::io::Error::other("disk full")))
        }
    }

    struct PanickingSink;

    impl EventSink for PanickingSink {
        fn emit(&self, _marker: &str, _fields: &FlatFields) -> Result<(), SinkError> {
            panic!("sink exploded");
        }
    }

    fn event() -> WideEvent {
        let mut builder = WideEvent::builder("req00001", "trace", ServiceInfo::default());
        builder.http_status(200);
        builder.finish(10)
    }

    #[test]
    fn test_emit_writes_single_entry_with_marker() {
        let sink = MemorySink::new();
        let emitter = Emitter::new(Arc::new(sink.clone()), "wide_event");

        assert!(emitter.emit(&event()));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].marker, "wide_event");
        assert_eq!(events[0].fields["outcome"], "success");
        assert_eq!(events[0].fields["http_status"], "200");
    }

    #[test]
    fn test_sink_error_is_swallowed() {
        let emitter = Emitter::new(Arc::new(FailingSink), DEFAULT_MARKER);
        assert!(!emitter.emit(&event()));
    }

    #[test]
    fn test_sink_panic_is_swallowed() {
        let emitter = Emitter::new(Arc::new(PanickingSink), DEFAULT_MARKER);
        assert!(!emitter.emit(&event()));
    }
}
