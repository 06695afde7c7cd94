use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::database::StoreError;
use crate::domain::DomainError;
use crate::utils::error_codes;

/// Request-boundary error. Every handler returns `Result<_, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Too many requests, retry in {0} seconds")]
    RateLimited(u64),
    /// Detail is logged, never returned to the caller.
    #[error("Internal server error")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    code: i32,
    message: String,
}

impl AppError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        AppError::Internal(err.to_string())
    }

    fn status_and_code(&self) -> (StatusCode, i32) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
            AppError::Unauthenticated | AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED)
            }
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, error_codes::PERMISSION_DENIED),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
            AppError::Conflict(_) => (StatusCode::CONFLICT, error_codes::CONFLICT),
            AppError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, error_codes::RATE_LIMIT),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) = &self {
            tracing::error!("Internal error: {}", detail);
        }

        let (status, code) = self.status_and_code();
        let body = Json(ErrorResponse {
            code,
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        let message = err.to_string();
        match err {
            DomainError::Invalid(_) => AppError::Validation(message),
            DomainError::GroupNotFound => AppError::NotFound(message),
            DomainError::Unauthorized | DomainError::NotAMember => AppError::Forbidden(message),
            DomainError::CapacityExceeded
            | DomainError::AlreadyMember
            | DomainError::CreatorCannotLeave => AppError::Conflict(message),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AppError::Conflict(err.to_string()),
            other => AppError::internal(other),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let detail = errs
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .next()
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{} {}", field, detail)
            })
            .collect();
        fields.sort();
        AppError::Validation(fields.join(", "))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::internal(format!("password hashing failed: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::internal(format!("token signing failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_status_codes() {
        let cases = [
            (DomainError::CapacityExceeded, StatusCode::CONFLICT),
            (DomainError::AlreadyMember, StatusCode::CONFLICT),
            (DomainError::CreatorCannotLeave, StatusCode::CONFLICT),
            (DomainError::NotAMember, StatusCode::FORBIDDEN),
            (DomainError::Unauthorized, StatusCode::FORBIDDEN),
            (DomainError::GroupNotFound, StatusCode::NOT_FOUND),
            (DomainError::Invalid("x".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_and_code().0, status);
        }
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = AppError::internal("connection reset by peer");
        assert_eq!(err.to_string(), "Internal server error");
    }
}
