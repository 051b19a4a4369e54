use async_trait::async_trait;
use thiserror::Error;

use crate::deadline::{Deadline, Expiry};
use crate::models::Quotation;

#[derive(Debug, Error)]
pub enum QuoteProviderError {
    #[error("failed to create request: {0}")]
    RequestCreation(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("transport timeout: {0}")]
    TransportTimeout(String),

    #[error("upstream returned status {0}")]
    UpstreamStatus(String),

    #[error("failed to decode response body: {0}")]
    Decode(String),

    #[error("upstream fetch deadline exceeded")]
    DeadlineExceeded,

    #[error("upstream fetch cancelled")]
    Cancelled,
}

impl From<Expiry> for QuoteProviderError {
    fn from(value: Expiry) -> Self {
        match value {
            Expiry::DeadlineExceeded => QuoteProviderError::DeadlineExceeded,
            Expiry::Cancelled => QuoteProviderError::Cancelled,
        }
    }
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetches the latest quotation. Makes exactly one outbound attempt and
    /// gives up as soon as `deadline` fires.
    async fn fetch_latest(&self, deadline: &Deadline) -> Result<Quotation, QuoteProviderError>;
}
