//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use session_cart_core::ActionError;
use thiserror::Error;

use crate::cart::DispatchError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart command could not be completed.
    #[error("Cart error: {0}")]
    Cart(#[from] DispatchError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Unknown or incomplete cart action.
    #[error("Invalid action: {0}")]
    Action(#[from] ActionError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Cart(DispatchError::SessionClosed { .. }) => StatusCode::CONFLICT,
            Self::Cart(DispatchError::DispatchFailure { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Cart(DispatchError::TimedOut { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Action(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.status().is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Cart(DispatchError::SessionClosed { .. }) => {
                "Cart has already been checked out".to_string()
            }
            Self::Cart(DispatchError::DispatchFailure { .. }) => {
                "Cart service unavailable, please try again".to_string()
            }
            Self::Cart(DispatchError::TimedOut { .. }) => "Cart did not respond in time".to_string(),
            Self::Session(_) => "Internal server error".to_string(),
            Self::Action(_) | Self::BadRequest(_) => self.to_string(),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use session_cart_core::SessionId;

    use super::*;

    fn session() -> SessionId {
        SessionId::new("session-test")
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");

        let err = AppError::from(ActionError::UnknownAction("refund".to_string()));
        assert_eq!(err.to_string(), "Invalid action: unknown cart action: refund");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::Cart(DispatchError::SessionClosed {
                session: session()
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Cart(DispatchError::DispatchFailure {
                session: session(),
                reason: "cart limit of 1 sessions reached".to_string(),
            })),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Cart(DispatchError::TimedOut {
                session: session(),
                after: Duration::from_secs(1),
            })),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Action(ActionError::MissingItem("add"))),
            StatusCode::BAD_REQUEST
        );
    }
}
