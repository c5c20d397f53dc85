use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

use crate::booking::Rejection;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error. Please try again later.")]
    StoreUnavailable(#[from] sqlx::Error),

    #[error("{0}")]
    ValidationFailed(Rejection),

    #[error("Booking not found.")]
    NotFound,

    #[error("Unauthorized action.")]
    Unauthorized,
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        AppError::ValidationFailed(rejection)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::StoreUnavailable(err) = self {
            log::error!("Store failure: {err}");
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
