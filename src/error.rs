//! API error responses.
//!
//! Every failing handler returns an [`ApiError`], which renders as a JSON
//! [`ErrorDetail`] body with the matching status code.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use log::{error, warn};
use thiserror::Error;

use crate::models::{ErrorCode, ErrorDetail, RequestId};
use crate::tools::ToolError;
use crate::twitter::TwitterError;

#[derive(Error, Debug)]
#[error("{reason}")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub reason: String,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            status,
            code,
            reason: reason.into(),
            request_id: None,
        }
    }

    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::InvalidParameter, reason)
    }

    pub fn missing_parameter(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::MissingParameter, reason)
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError, reason)
    }

    /// Attaches the request id assigned by the response header middleware, if any.
    pub fn with_request_id(mut self, request_id: Option<&RequestId>) -> Self {
        self.request_id = request_id.map(|id| id.0.clone());
        self
    }

    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            request_id: self.request_id.clone(),
            error_code: self.code,
            reason: self.reason.clone(),
            status_code: self.status.as_u16(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.detail())).into_response()
    }
}

impl From<ToolError> for ApiError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::Random(_) => {
                error!("Tool failed: {}", e);
                ApiError::internal("Failed to generate random data.")
            }
            e => ApiError::invalid_parameter(e.to_string()),
        }
    }
}

impl From<TwitterError> for ApiError {
    fn from(e: TwitterError) -> Self {
        if e.is_timeout() {
            warn!("Twitter request timed out or was cancelled: {}", e);
            return ApiError::new(
                StatusCode::REQUEST_TIMEOUT,
                ErrorCode::Timeout,
                "The request to Twitter timed out.",
            );
        }

        match e {
            TwitterError::InvalidArgument(reason) => ApiError::invalid_parameter(reason),
            TwitterError::Upstream { status, .. } => ApiError::new(
                StatusCode::BAD_GATEWAY,
                ErrorCode::UpstreamError,
                format!("Twitter returned HTTP status {}.", status),
            ),
            e => {
                error!("Failed to post to Twitter: {}", e);
                ApiError::internal("An internal error occurred.")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => ApiError::new(
                StatusCode::BAD_REQUEST,
                ErrorCode::NoRequestBody,
                "A JSON request body is required.",
            ),
            rejection => ApiError::invalid_parameter(rejection.body_text()),
        }
    }
}
