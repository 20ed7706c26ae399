use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use keyforge_db::error::StoreError;

/// Everything a route handler can fail with. Each variant carries the
/// client-facing message; only `Internal` hides its cause behind a
/// generic body (details go to the log, never to the wire).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid key")]
    InvalidKey,

    #[error("Key has expired")]
    KeyExpired,

    #[error("Device limit reached")]
    DeviceLimitReached,

    #[error("Insufficient credits")]
    InsufficientCredits,

    #[error("Invalid referral token")]
    InvalidToken,

    #[error("Key already exists")]
    DuplicateKey,

    #[error("Username or email already taken")]
    DuplicateAccount,

    #[error("You don't own this key")]
    NotOwner,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) | ApiError::NotOwner => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::InvalidKey => StatusCode::NOT_FOUND,
            ApiError::Validation(_)
            | ApiError::KeyExpired
            | ApiError::DeviceLimitReached
            | ApiError::InsufficientCredits
            | ApiError::InvalidToken
            | ApiError::DuplicateKey
            | ApiError::DuplicateAccount => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            tracing::error!("internal error: {err:#}");
        }
        let body = Json(json!({ "status": "error", "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Record"),
            StoreError::DuplicateKey => ApiError::DuplicateKey,
            StoreError::DuplicateAccount => ApiError::DuplicateAccount,
            StoreError::InvalidToken => ApiError::InvalidToken,
            StoreError::InsufficientCredits => ApiError::InsufficientCredits,
            StoreError::DeviceLimitReached => ApiError::DeviceLimitReached,
            StoreError::NotOwner => ApiError::NotOwner,
            StoreError::Database(e) => ApiError::Internal(e.into()),
        }
    }
}
