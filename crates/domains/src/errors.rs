//! # DomainError
//!
//! Centralized error handling for the Sellpoint workspace.
//! Adapters translate their infrastructure failures into these variants at
//! the boundary; the API layer maps each variant to exactly one HTTP status.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed request input (e.g. missing upload, unreadable body)
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A single field failed validation (e.g. title too long, wrong password)
    #[error("validation error on `{field}`: {message}")]
    Validation { field: String, message: String },

    /// Authentication failure, or an ad mutation attempted by a non-owner
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (e.g. touching another user's image)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (e.g. Ad, Image, FavoriteAd)
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    /// Resource already exists or is still referenced
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g. DB down, disk full)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    /// Short machine-readable kind, used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Validation { .. } => "validation",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }
}

/// A specialized Result type for Sellpoint domain logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = DomainError::not_found("Ad", 42);
        assert_eq!(err.to_string(), "Ad not found with ID 42");
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn validation_message_names_field() {
        let err = DomainError::validation("price", "must be at most 32767");
        assert_eq!(
            err.to_string(),
            "validation error on `price`: must be at most 32767"
        );
    }
}
