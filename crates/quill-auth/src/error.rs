//! Authentication error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quill_db::UserRole;
use serde_json::json;
use std::fmt;
use thiserror::Error;

use crate::store::StoreError;

/// Why a token failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    /// The token was genuine but its lifetime has elapsed
    Expired,
    /// The integrity tag does not match the token contents
    TamperedPayload,
    /// The token is not a well-formed token of the accepted algorithm
    MalformedToken,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationErrorKind::Expired => f.write_str("token expired"),
            ValidationErrorKind::TamperedPayload => f.write_str("token integrity check failed"),
            ValidationErrorKind::MalformedToken => f.write_str("malformed token"),
        }
    }
}

/// Token validation failure reported by [`TokenCodec`](crate::TokenCodec)
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Token validation failed: {kind}")]
pub struct ValidationError {
    kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ValidationErrorKind {
        self.kind
    }

    /// Only an expired token can be fixed by logging in again; tampered
    /// and malformed tokens are rejected outright.
    pub fn is_retryable(&self) -> bool {
        self.kind == ValidationErrorKind::Expired
    }
}

impl From<ValidationErrorKind> for ValidationError {
    fn from(kind: ValidationErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Why the identity gate rejected a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnauthenticatedReason {
    MissingCredential,
    TokenExpired,
    TokenTampered,
    TokenMalformed,
    SubjectGone,
}

impl UnauthenticatedReason {
    pub fn message(&self) -> &'static str {
        match self {
            UnauthenticatedReason::MissingCredential => "missing or malformed credential",
            UnauthenticatedReason::TokenExpired => "token expired",
            UnauthenticatedReason::TokenTampered => "token integrity check failed",
            UnauthenticatedReason::TokenMalformed => "malformed token",
            UnauthenticatedReason::SubjectGone => "subject no longer exists",
        }
    }

    /// Short label used for metrics
    pub fn as_label(&self) -> &'static str {
        match self {
            UnauthenticatedReason::MissingCredential => "missing_credential",
            UnauthenticatedReason::TokenExpired => "expired",
            UnauthenticatedReason::TokenTampered => "tampered",
            UnauthenticatedReason::TokenMalformed => "malformed",
            UnauthenticatedReason::SubjectGone => "subject_gone",
        }
    }
}

impl fmt::Display for UnauthenticatedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl From<ValidationErrorKind> for UnauthenticatedReason {
    fn from(kind: ValidationErrorKind) -> Self {
        match kind {
            ValidationErrorKind::Expired => UnauthenticatedReason::TokenExpired,
            ValidationErrorKind::TamperedPayload => UnauthenticatedReason::TokenTampered,
            ValidationErrorKind::MalformedToken => UnauthenticatedReason::TokenMalformed,
        }
    }
}

/// Why an authenticated caller was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    RoleRequired(UserRole),
    NotOwner,
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForbiddenReason::RoleRequired(role) => write!(f, "role '{}' required", role),
            ForbiddenReason::NotOwner => f.write_str("caller does not own this resource"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(UnauthenticatedReason),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(ForbiddenReason),

    #[error("Resource not found: {0}")]
    ResourceNotFound(i64),

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(#[from] StoreError),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Configuration(_) | AuthError::Encoding(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AuthError::Unauthenticated(_) | AuthError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AuthError::CollaboratorUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Configuration(_) | AuthError::Encoding(_) => "INTERNAL_ERROR",
            AuthError::Unauthenticated(_) => "UNAUTHENTICATED",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::Forbidden(_) => "FORBIDDEN",
            AuthError::ResourceNotFound(_) => "NOT_FOUND",
            AuthError::CollaboratorUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Message safe to show to the caller
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Configuration(_) | AuthError::Encoding(_) => "Internal error".to_string(),
            AuthError::Unauthenticated(reason) => reason.message().to_string(),
            AuthError::InvalidCredentials => "Invalid credentials".to_string(),
            AuthError::Forbidden(reason) => reason.to_string(),
            AuthError::ResourceNotFound(id) => format!("Resource not found: {}", id),
            AuthError::CollaboratorUnavailable(_) => {
                "Service temporarily unavailable".to_string()
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = axum::Json(json!({
            "error": {
                "code": self.code(),
                "message": self.public_message(),
            }
        }));

        (self.status_code(), body).into_response()
    }
}
