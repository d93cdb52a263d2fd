//! Request handlers.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::checkout::CheckoutPlan;
use crate::http::error::AppError;
use crate::http::server::AppState;

/// Optional header identifying the caller.
pub const X_USER_ID: &str = "x-user-id";

/// `POST /checkout`: run a simulated checkout.
///
/// Completed payments answer `200`, declined payments `422`.
pub async fn checkout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let user_id = headers.get(X_USER_ID).and_then(|v| v.to_str().ok());
    let plan = {
        let mut rng = rand::thread_rng();
        CheckoutPlan::random(user_id, &mut rng)
    };

    let result = state.checkout.process(&plan).await?;
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(result)).into_response())
}

/// `GET /health`: liveness probe, never produces a wide event.
pub async fn health() -> &'static str {
    "ok"
}
