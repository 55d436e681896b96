use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::storage::StoreError;

/// Every failure a handler can surface to the client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Only @{0} emails are allowed")]
    DomainNotAllowed(String),
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("Missing or malformed Authorization header")]
    MissingCredentials,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Access denied. Required role: {0}")]
    Forbidden(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Decision must be `approved` or `rejected`, got `{0}`")]
    InvalidDecision(String),
    #[error("Submission has already been reviewed")]
    AlreadyReviewed,
    #[error("{0}")]
    InvalidRequest(String),
    #[error("storage unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DuplicateEmail
            | AppError::DomainNotAllowed(_)
            | AppError::InvalidDecision(_)
            | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials
            | AppError::MissingCredentials
            | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyReviewed => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::StoreUnavailable(_) => "Storage is temporarily unavailable".into(),
            AppError::Internal(_) => "Internal server error".into(),
            other => other.to_string(),
        }
    }

    /// Map a storage failure, naming the kind of record for `NotFound`.
    pub fn from_store(err: StoreError, what: &'static str) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound(what),
            other => other.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("Record"),
            StoreError::DuplicateEmail => AppError::DuplicateEmail,
            StoreError::AlreadyReviewed => AppError::AlreadyReviewed,
            StoreError::Backend(e) => AppError::StoreUnavailable(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = ?self, "request failed");
        }
        (status, Json(ErrorBody { detail: self.public_message() })).into_response()
    }
}
