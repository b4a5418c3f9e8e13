use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{Error, ServiceErrorKind};

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    Service(Error),
    BadRequest(String),
    NotFound(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Service(e)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

impl ApiError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Service(Error::Service { kind, message, .. }) => match kind {
                ServiceErrorKind::InvalidRequest => {
                    (StatusCode::BAD_REQUEST, kind.as_str(), message)
                }
                ServiceErrorKind::AllProvidersUnavailable => {
                    (StatusCode::SERVICE_UNAVAILABLE, kind.as_str(), message)
                }
            },
            ApiError::Service(other) => {
                tracing::error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "an internal error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        (
            status,
            Json(ErrorEnvelope {
                error: ErrorBody { code, message },
            }),
        )
            .into_response()
    }
}
