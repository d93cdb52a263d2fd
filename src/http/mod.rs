//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → boundary.rs (ids, wide event context, finalize + emit)
//!     → handlers.rs (checkout business logic)
//!     → error.rs (unexpected failures → 500 + recorded failure)
//!     → Send to client
//! ```

pub mod boundary;
pub mod error;
pub mod handlers;
pub mod server;

pub use boundary::{wide_event_middleware, RequestIds, WideEventBoundary, X_REQUEST_ID};
pub use error::{AppError, UnhandledFailure};
pub use handlers::X_USER_ID;
pub use server::{AppState, HttpServer};
