//! API Response wrapper

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Envelope shared by every endpoint: `{ data, message, code }`, plus a
/// machine readable `error` on failures.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub message: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::with_status(StatusCode::OK, data, "OK")
    }

    pub fn success_with_message(data: T, message: &str) -> Self {
        Self::with_status(StatusCode::OK, data, message)
    }

    pub fn created(data: T, message: &str) -> Self {
        Self::with_status(StatusCode::CREATED, data, message)
    }

    fn with_status(status: StatusCode, data: T, message: &str) -> Self {
        Self {
            data: Some(data),
            message: message.to_string(),
            code: status.as_u16(),
            error: None,
            status,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            data: None,
            message: message.to_string(),
            code: status.as_u16(),
            error: Some(code.to_string()),
            status,
        }
    }

    /// Success without a payload, e.g. after a delete.
    pub fn message(message: &str) -> Self {
        Self {
            data: None,
            message: message.to_string(),
            code: StatusCode::OK.as_u16(),
            error: None,
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let body = serde_json::to_value(ApiResponse::created(vec![1, 2], "Lead created")).unwrap();
        assert_eq!(body["code"], 201);
        assert_eq!(body["message"], "Lead created");
        assert_eq!(body["data"], serde_json::json!([1, 2]));
        assert!(body.get("error").is_none());
    }

    #[test]
    fn test_error_envelope() {
        let body = serde_json::to_value(ApiResponse::error(StatusCode::CONFLICT, "CONFLICT", "taken")).unwrap();
        assert_eq!(body["code"], 409);
        assert_eq!(body["error"], "CONFLICT");
        assert!(body["data"].is_null());
    }
}
