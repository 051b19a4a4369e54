use axum::extract::State;
use axum::routing::get;
use axum::Router;
use tracing::info;

use crate::errors::AppError;
use crate::services::quotation_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_cotacao))
}

// A client disconnect drops this future, which drops the request deadline
// and cancels whatever is still bound to it.
pub async fn get_cotacao(State(state): State<AppState>) -> Result<String, AppError> {
    info!("GET /cotacao - Request initiated");
    let quotation = quotation_service::fetch_and_store(&state).await?;
    Ok(quotation.bid)
}
