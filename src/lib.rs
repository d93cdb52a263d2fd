//! Wide events for a checkout service.
//!
//! Every request accumulates one structured record (identity, HTTP metadata,
//! user, cart, payment, outcome) in a task-local context, and the request
//! boundary emits it exactly once as a flat set of key/value fields.

pub mod checkout;
pub mod config;
pub mod event;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod simulator;

pub use config::ServiceConfig;
pub use event::{RequestContext, WideEvent, WideEventBuilder};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
