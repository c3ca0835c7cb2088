use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/document", get(handlers::document))
        .route("/api/refresh", post(handlers::refresh))
        .route("/api/orders/:id/open", post(handlers::open_order))
        .route("/api/modal/close", post(handlers::close_modal))
        .route("/api/users/:id/toggle", post(handlers::toggle_user))
        .route("/api/users/:id/delete", post(handlers::delete_user))
        .fallback(handlers::proxy)
        .with_state(state)
}
