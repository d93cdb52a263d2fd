//! Wide event subsystem.
//!
//! # Data Flow
//! ```text
//! request boundary
//!     → record.rs (builder seeded with ids + service metadata)
//!     → context.rs (task-local slot, enriched by business logic)
//!     → record.rs (finish: status, duration, outcome)
//!     → flatten.rs (nested record → flat String map)
//!     → emitter.rs → sink.rs (one entry per request)
//! ```
//!
//! # Design Decisions
//! - One record per request, frozen before it leaves the boundary
//! - Context follows the request task, never a global or thread-local
//! - Emission is best effort; failures are logged, never propagated

pub mod context;
pub mod emitter;
pub mod flatten;
pub mod record;
pub mod sink;

pub use context::{ContextError, EventSlot, RequestContext};
pub use emitter::{Emitter, DEFAULT_MARKER};
pub use flatten::{flatten, FlatFields, FlattenError};
pub use record::{Outcome, ServiceInfo, WideEvent, WideEventBuilder};
pub use sink::{EmittedEvent, EventSink, JsonLineSink, MemorySink, SinkError, TracingSink};
