use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::gateway::GatewayError;
use crate::identity::IdentityError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Payment gateway error")]
    Gateway(#[from] GatewayError),

    #[error("Identity directory error")]
    Identity(#[from] IdentityError),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::FailedPrecondition(_) => StatusCode::PRECONDITION_FAILED,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Identity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::FailedPrecondition(_) => "FAILED_PRECONDITION",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Gateway(_) => "PAYMENT_GATEWAY_ERROR",
            AppError::Identity(_) => "IDENTITY_ERROR",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::Unauthenticated(msg)
            | AppError::PermissionDenied(msg)
            | AppError::InvalidArgument(msg)
            | AppError::NotFound(msg)
            | AppError::FailedPrecondition(msg)
            | AppError::Internal(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::Database(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::Gateway(e) => {
                // Provider diagnostics stay in the server log; the client
                // only ever sees the generic message.
                error!(
                    error_type = e.error_type.as_deref().unwrap_or("unknown"),
                    error_code = e.code.as_deref().unwrap_or("unknown"),
                    param = e.param.as_deref().unwrap_or(""),
                    message = %e.message,
                    "Payment gateway error"
                );
            }
            AppError::Identity(e) => {
                error!(error = ?e, "Identity directory error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level messages to the client
        let public_message = match &self {
            AppError::Unauthenticated(msg)
            | AppError::PermissionDenied(msg)
            | AppError::InvalidArgument(msg)
            | AppError::NotFound(msg)
            | AppError::FailedPrecondition(msg)
            | AppError::Internal(msg) => msg.clone(),
            AppError::Database(_) => "A database error occurred".to_string(),
            AppError::Gateway(_) => "Payment processing failed".to_string(),
            AppError::Identity(_) => "Account service is unavailable".to_string(),
        };

        error_response(code, public_message, None, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            AppError::Unauthenticated("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::PermissionDenied("not staff".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::InvalidArgument("quantity".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("event".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::FailedPrecondition("not published".into()).status_code(),
            StatusCode::PRECONDITION_FAILED
        );
    }

    #[test]
    fn gateway_errors_do_not_leak_provider_details() {
        let err = AppError::Gateway(GatewayError {
            message: "No such price: price_123".into(),
            error_type: Some("invalid_request_error".into()),
            code: Some("resource_missing".into()),
            param: Some("price".into()),
        });
        assert_eq!(err.code(), "PAYMENT_GATEWAY_ERROR");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
