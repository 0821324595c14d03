use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/board", get(handlers::get_board))
        .route("/api/reload", post(handlers::reload))
        .route("/api/habits", post(handlers::create_habit))
        .route("/api/habits/:id", delete(handlers::delete_habit))
        .route("/api/habits/:id/value", put(handlers::record_value))
        .route("/api/habits/:id/history", post(handlers::toggle_history))
        .with_state(state)
}
