use std::collections::HashMap;

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::codes::{ErrorCategory, ErrorCode};

/// 请求级错误 - 错误码 + 消息 + 结构化细节
///
/// Details carry the ids a terminal needs to react (which table, which
/// reservation blocked the booking) without parsing the message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<HashMap<String, Value>>,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.message())
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, message)
    }

    pub fn http_status(&self) -> http::StatusCode {
        self.code.http_status()
    }
}

/// 错误响应体
///
/// ```json
/// { "code": 7302, "message": "...", "details": { "conflicting_reservation_id": 12 } }
/// ```
///
/// Successful responses are the bare payload; only failures use this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl ApiResponse {
    pub fn error(err: &AppError) -> Self {
        Self {
            code: err.code.code(),
            message: err.message.clone(),
            details: err.details.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.code.category() == ErrorCategory::System {
            tracing::error!(code = %self.code, message = %self.message, "System error");
        } else {
            tracing::debug!(code = %self.code, message = %self.message, "Request refused");
        }
        (self.http_status(), Json(ApiResponse::error(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn default_message_comes_from_code() {
        let err = AppError::new(ErrorCode::TableNotFound);
        assert_eq!(err.message, "Table not found");
        assert_eq!(err.to_string(), "[7001] Table not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn details_accumulate() {
        let err = AppError::with_message(ErrorCode::ReservationConflict, "overlap")
            .with_detail("table_id", 42)
            .with_detail("conflicting_reservation_id", 7);
        let details = err.details.unwrap();
        assert_eq!(details["table_id"], 42);
        assert_eq!(details["conflicting_reservation_id"], 7);
    }

    #[test]
    fn error_body_shape() {
        let err = AppError::validation("party_size must be at least 1").with_detail("party_size", 0);
        let json = serde_json::to_value(ApiResponse::error(&err)).unwrap();
        assert_eq!(json["code"], 2);
        assert_eq!(json["message"], "party_size must be at least 1");
        assert_eq!(json["details"]["party_size"], 0);
    }

    #[test]
    fn response_status_follows_code() {
        let resp = AppError::new(ErrorCode::TableStateStale).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = AppError::database("Storage failure").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
