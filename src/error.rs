use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Failures a handler turns into an HTTP response.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("product {0:?} not found")]
    NotFound(String),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Store(StoreError),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AppError::NotFound(id),
            other => AppError::Store(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "product not found").into_response(),
            AppError::Encode(err) => {
                error!(error = %err, "response encoding failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
            AppError::Store(err) => {
                error!(error = %err, "store query failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}
