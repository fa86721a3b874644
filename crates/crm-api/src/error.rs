// ============================================================================
// CRM API - Error Mapping
// File: crates/crm-api/src/error.rs
// ============================================================================
//! HTTP error type. Domain errors are mapped by kind; infrastructure failures
//! are logged in full and answered with a generic message.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crm_core::error::{DomainError, ErrorKind};
use thiserror::Error;
use tracing::{error, warn};

use crate::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Tenant could not be resolved from the request")]
    UnknownTenant,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
                ErrorKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::UnknownTenant => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine code sent in the `error` field.
    pub fn code(&self) -> &'static str {
        match self.status() {
            StatusCode::NOT_FOUND => "NOT_FOUND",
            StatusCode::CONFLICT => "CONFLICT",
            StatusCode::UNPROCESSABLE_ENTITY => "VALIDATION_ERROR",
            StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
            StatusCode::FORBIDDEN => "FORBIDDEN",
            StatusCode::PAYMENT_REQUIRED => "PAYMENT_REQUIRED",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Domain(DomainError::from(errors))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                warn!("Request refused ({}): {}", status, self);
            }
            self.to_string()
        };
        ApiResponse::error(status, self.code(), &message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_kinds_map_to_status() {
        let cases = [
            (ApiError::from(DomainError::not_found("lead", "x")), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (ApiError::from(DomainError::SubdomainAlreadyExists("acme".into())), StatusCode::CONFLICT, "CONFLICT"),
            (ApiError::from(DomainError::PasswordTooWeak), StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            (ApiError::from(DomainError::InvalidCredentials), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (ApiError::from(DomainError::TenantNotActive), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (ApiError::from(DomainError::TenantAwaitingPayment), StatusCode::PAYMENT_REQUIRED, "PAYMENT_REQUIRED"),
            (ApiError::from(DomainError::DatabaseError("boom".into())), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ];
        for (error, status, code) in cases {
            assert_eq!(error.status(), status);
            assert_eq!(error.code(), code);
        }
    }

    #[tokio::test]
    async fn test_internal_detail_hidden() {
        let response = ApiError::from(DomainError::DatabaseError("password authentication failed".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["error"], "INTERNAL_ERROR");
    }
}
