use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::models::state::AppState;

#[derive(Serialize)]
pub struct StatusPayload {
    status: &'static str,
    chain_id: u64,
    pools: usize,
    tokens: usize,
    max_splits: usize,
    max_hops: usize,
}

pub async fn status(State(state): State<AppState>) -> (StatusCode, Json<StatusPayload>) {
    let (status, status_code) = if state.is_ready() {
        ("ready", StatusCode::OK)
    } else {
        ("no_pools", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        status_code,
        Json(StatusPayload {
            status,
            chain_id: state.router.chain().chain_id,
            pools: state.total_pools(),
            tokens: state.tokens.len(),
            max_splits: state.default_search.max_splits,
            max_hops: state.default_search.max_hops,
        }),
    )
}
