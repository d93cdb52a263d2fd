//! Log sinks for flattened wide events.
//!
//! A sink receives one call per request: the marker message plus every
//! field of that request. Implementations must write the whole call as a
//! single entry so that concurrent requests never interleave.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use crate::event::flatten::FlatFields;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Destination for finalized wide events.
pub trait EventSink: Send + Sync {
    /// Record `fields` as one log entry with `marker` as its message.
    fn emit(&self, marker: &str, fields: &FlatFields) -> Result<(), SinkError>;
}

/// Emits each wide event as one `tracing` event on the `wide_event` target.
///
/// The identifying keys are recorded as tracing fields. The complete flat
/// map is attached as one JSON-encoded `fields` value, since tracing field
/// names are fixed at compile time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, marker: &str, fields: &FlatFields) -> Result<(), SinkError> {
        let get = |key: &str| fields.get(key).map(String::as_str);
        let encoded = serde_json::to_string(fields)?;
        tracing::info!(
            target: "wide_event",
            request_id = get("request_id"),
            trace_id = get("trace_id"),
            outcome = get("outcome"),
            http_status = get("http_status"),
            fields = %encoded,
            "{}",
            marker
        );
        Ok(())
    }
}

/// Writes one JSON object per line: `{"message": <marker>, ...fields}`.
pub struct JsonLineSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JsonLineSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> EventSink for JsonLineSink<W> {
    fn emit(&self, marker: &str, fields: &FlatFields) -> Result<(), SinkError> {
        let mut entry = serde_json::Map::with_capacity(fields.len() + 1);
        entry.insert("message".to_string(), marker.into());
        for (key, value) in fields {
            entry.insert(key.clone(), value.as_str().into());
        }
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}

/// One entry captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedEvent {
    pub marker: String,
    pub fields: FlatFields,
}

/// Keeps every emitted event in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<EmittedEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn events(&self) -> Vec<EmittedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All events whose `request_id` field equals `request_id`.
    pub fn for_request(&self, request_id: &str) -> Vec<EmittedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.fields.get("request_id").map(String::as_str) == Some(request_id))
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, marker: &str, fields: &FlatFields) -> Result<(), SinkError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(EmittedEvent {
                marker: marker.to_string(),
                fields: fields.clone(),
            });
        Ok(())
    }
}
