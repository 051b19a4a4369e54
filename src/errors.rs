use axum::http::StatusCode;
use axum::response::IntoResponse;
use thiserror::Error;

use crate::external::quote_provider::QuoteProviderError;
use crate::store::StoreError;

pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch quotation data";
pub const PERSIST_FAILED_MESSAGE: &str = "Failed to save quotation to DB";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to fetch quotation data: {0}")]
    Fetch(#[from] QuoteProviderError),
    #[error("Failed to save quotation to DB: {0}")]
    Persist(#[from] StoreError),
}

// Callers only ever see which phase failed, never the underlying cause.
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::Fetch(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, FETCH_FAILED_MESSAGE).into_response()
            }
            AppError::Persist(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, PERSIST_FAILED_MESSAGE).into_response()
            }
        }
    }
}
