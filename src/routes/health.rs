use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tracing::warn;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

/// Liveness plus a cheap read against the quotation store.
async fn health(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.store.count().await {
        Ok(_) => (StatusCode::OK, "OK"),
        Err(e) => {
            warn!(backend = state.store.backend(), "Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable")
        }
    }
}
