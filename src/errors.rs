use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::authz::{CatalogError, Denial};

pub type AppResult<T> = Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    #[error("ownership violation: {0}")]
    OwnershipViolation(String),
    #[error("restricted field set: cannot update {}", .0.join(", "))]
    RestrictedFieldViolation(Vec<String>),
    #[error("{0}")]
    TooManyRequests(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::TooManyRequests(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn token(err: impl Into<String>) -> Self {
        Self::Token(err.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::OwnershipViolation(_) => StatusCode::FORBIDDEN,
            AppError::RestrictedFieldViolation(_) => StatusCode::FORBIDDEN,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::BadRequest(_) => "bad_request",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::OwnershipViolation(_) => "ownership_violation",
            AppError::RestrictedFieldViolation(_) => "restricted_field_violation",
            AppError::TooManyRequests(_) => "rate_limited",
            AppError::Configuration(_) => "configuration",
            AppError::Token(_) => "token",
            AppError::Database(_) => "database",
            AppError::Internal(_) => "internal",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AppError::Database(err) = &self {
            tracing::error!(error = %err, "database error");
        }

        let fields = match &self {
            AppError::RestrictedFieldViolation(fields) => Some(fields.clone()),
            _ => None,
        };
        let payload = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            fields,
        };

        (status, Json(payload)).into_response()
    }
}

impl From<Denial> for AppError {
    fn from(value: Denial) -> Self {
        match value {
            Denial::Unauthenticated => Self::Unauthorized("authentication required".to_string()),
            Denial::Forbidden(reason) => Self::Forbidden(reason),
            Denial::InvalidTransition(reason) => Self::InvalidTransition(reason),
            Denial::OwnershipViolation(reason) => Self::OwnershipViolation(reason),
            Denial::RestrictedFieldViolation(fields) => Self::RestrictedFieldViolation(fields),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::AdminImmutable => Self::Forbidden(value.to_string()),
            CatalogError::StaleVersion { .. } => Self::Conflict(value.to_string()),
            CatalogError::MissingRole(_) | CatalogError::AdminNotFull => Self::BadRequest(value.to_string()),
            CatalogError::Malformed(_) => Self::Internal(value.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(value: JsonRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}
