//! Simulated checkout business logic.
//!
//! Stands in for a real checkout: every attribute it learns is written to
//! the request's wide event, and payment declines are reported as normal
//! results rather than errors.

pub mod service;
pub mod types;

pub use service::{random_user_id, CheckoutService};
pub use types::{CheckoutPlan, CheckoutResponse, PaymentErrorCode};
