//! Maps `DomainError` onto HTTP responses.
//!
//! Every error body has the same shape:
//! `{"error": "<kind>", "message": "<text>", "field": "<name>"}` where
//! `field` only appears on validation errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::DomainError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The client's `Accept` header rules out every representation we have.
    #[error("none of the acceptable media types can be served")]
    NotAcceptable,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Domain(DomainError::BadRequest(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::Domain(err) => match err {
                DomainError::BadRequest(_) | DomainError::Validation { .. } => {
                    StatusCode::BAD_REQUEST
                }
                DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
                DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
                DomainError::Conflict(_) => StatusCode::CONFLICT,
                DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::NotAcceptable => ErrorBody {
                error: "not_acceptable",
                message: Self::NotAcceptable.to_string(),
                field: None,
            },
            Self::Domain(DomainError::Internal(detail)) => {
                error!(%detail, "request failed with an internal error");
                ErrorBody {
                    error: "internal",
                    message: "internal server error".into(),
                    field: None,
                }
            }
            Self::Domain(DomainError::Validation { field, message }) => ErrorBody {
                error: "validation",
                message,
                field: Some(field),
            },
            Self::Domain(err) => ErrorBody {
                error: err.kind(),
                message: match &err {
                    DomainError::BadRequest(msg)
                    | DomainError::Unauthorized(msg)
                    | DomainError::Forbidden(msg)
                    | DomainError::Conflict(msg) => msg.clone(),
                    other => other.to_string(),
                },
                field: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
