use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::queue::QueueStopped;
use crate::storage::StoreError;
use crate::types::{ApiErrorCode, ApiErrorResponse};

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Unauthorized(String),
    Store(StoreError),
    Unavailable(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<QueueStopped> for ApiError {
    fn from(err: QueueStopped) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Validation(message) => {
                (StatusCode::BAD_REQUEST, ApiErrorCode::Validation, message)
            }
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, ApiErrorCode::Unauthorized, message)
            }
            ApiError::Store(err) => {
                tracing::error!(%err, "storage error while serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorCode::Storage,
                    "storage error".to_string(),
                )
            }
            ApiError::Unavailable(message) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorCode::Unavailable,
                message,
            ),
        };

        (status, Json(ApiErrorResponse { code, message })).into_response()
    }
}
