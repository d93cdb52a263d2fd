//! Handler errors and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::event::ContextError;

/// Failure that escaped a handler.
///
/// Attached to the 500 response as an extension so the wide event boundary
/// can record what went wrong without changing the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledFailure {
    /// Category name, e.g. `InternalError`.
    pub kind: &'static str,
    pub message: String,
}

/// Unexpected handler failure. Always surfaces as `500`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("request context unavailable: {0}")]
    Context(#[from] ContextError),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Category name recorded as `error_type`.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Context(_) => "ContextError",
            AppError::Internal(_) => "InternalError",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, kind = self.kind(), "Request handler failed");
        let failure = UnhandledFailure {
            kind: self.kind(),
            message: self.to_string(),
        };
        let body = Json(serde_json::json!({
            "success": false,
            "error": "internal_error",
        }));
        let mut response = (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
        response.extensions_mut().insert(failure);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_carries_failure_extension() {
        let response = AppError::Internal("inventory offline".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let failure = response.extensions().get::<UnhandledFailure>().unwrap();
        assert_eq!(failure.kind, "InternalError");
        assert_eq!(failure.message, "inventory offline");
    }

    #[test]
    fn test_context_error_kind() {
        let err = AppError::from(ContextError::Uninitialized);
        assert_eq!(err.kind(), "ContextError");
    }
}
