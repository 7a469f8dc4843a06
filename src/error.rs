use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::llm::UpstreamError;
use crate::models::ErrorBody;
use crate::summary::InputError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    InvalidInput(#[from] InputError),

    #[error("Malformed request body.")]
    MalformedPayload,

    #[error("Too many requests per minute. Please try again later.")]
    TooManyPerMinute,

    #[error("Too many requests per hour. Please try again later.")]
    TooManyPerHour,

    #[error("No data found to delete.")]
    NothingToDelete,

    #[error("An unexpected error occurred during deletion.")]
    DeletionFailed,

    #[error("API Error: {0}")]
    Upstream(#[from] UpstreamError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::InvalidInput(_) | AppError::MalformedPayload => StatusCode::BAD_REQUEST,
            AppError::TooManyPerMinute | AppError::TooManyPerHour => StatusCode::TOO_MANY_REQUESTS,
            AppError::NothingToDelete => StatusCode::NOT_FOUND,
            AppError::DeletionFailed | AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
