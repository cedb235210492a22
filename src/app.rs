use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/click", post(handlers::click_form))
        .route("/api/counters", get(handlers::get_counters))
        .route("/api/click", post(handlers::click))
        .with_state(state)
}
