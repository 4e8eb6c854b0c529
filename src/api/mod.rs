use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{readiness::status, route::post_route};
use crate::models::state::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/route", post(post_route))
        .route("/status", get(status))
        .with_state(app_state)
}
