//! HTTP mapping for [`Error`]

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::Error;

/// Error returned from a handler
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            Error::StressAllocation { .. }
            | Error::AllocationFailed { .. }
            | Error::MemoryLimit { .. } => StatusCode::INSUFFICIENT_STORAGE,
            Error::InvalidDimension { .. } => StatusCode::BAD_REQUEST,
            Error::DeviceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self.0.format_for_log(), "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self.0.format_for_log(), "Request rejected");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.0.code().as_str(),
                message: self.0.to_string(),
                hint: self.0.suggestion(),
            },
        };

        (status, Json(body)).into_response()
    }
}
