//! Fixed JSON response envelope shared by every endpoint

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Envelope wrapping every JSON response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// `"success"` or `"error"`
    pub status: &'static str,
    /// HTTP status code, repeated in the body
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
    /// Item count for list responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response carrying `data`
    pub fn success(code: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            code: code.as_u16(),
            message: message.into(),
            data: Some(data),
            count: None,
        }
    }

    /// Attach an item count
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

impl ApiResponse<()> {
    /// Successful response without a payload
    pub fn message(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: "success",
            code: code.as_u16(),
            message: message.into(),
            data: None,
            count: None,
        }
    }

    /// Error response without a payload
    pub fn error(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: "error",
            code: code.as_u16(),
            message: message.into(),
            data: None,
            count: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}
