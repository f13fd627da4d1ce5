//! The `Envelope` wrapper every API operation responds with, and the
//! `AppError` type that converts any domain error into one.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(request_id: impl Into<String>, order_id: Option<Uuid>, data: T) -> Self {
        Self {
            success: true,
            request_id: request_id.into(),
            order_id,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }
}

/// The application-wide error type. Every fallible domain error converts
/// into one of these at the transport boundary via `From` impls, mirroring
/// the status/code/message shape the rest of the system expects.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

impl AppError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn not_found(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }

    pub fn timeout(stage: &str) -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            "PROCESSING_TIMEOUT",
            "request did not complete before the coordinator timeout",
        )
        .with_details(serde_json::json!({ "stage": stage }))
    }

    pub fn internal(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Envelope::<()> {
            success: false,
            request_id: String::new(),
            order_id: None,
            data: None,
            error: Some(ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            }),
            timestamp: Utc::now(),
        };
        (self.status, Json(body)).into_response()
    }
}
