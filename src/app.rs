use crate::handlers;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/logo", get(handlers::logo))
        .route("/api/views", get(handlers::list_views))
        .route("/api/views/:view", get(handlers::get_view))
        .with_state(state)
}
