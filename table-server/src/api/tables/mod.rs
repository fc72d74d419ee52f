//! Dining Table API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/tables", routes())
}

fn routes() -> Router<ServerState> {
    let read_routes = Router::new()
        .route("/stats", get(handler::stats))
        .route("/available", get(handler::available))
        .route("/{id}/session", get(handler::active_session))
        .route("/{id}/sessions", get(handler::sessions));

    let manage_routes = Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id).put(handler::update));

    let floor_routes = Router::new()
        .route("/{id}/seat", post(handler::seat))
        .route("/{id}/clear", post(handler::clear))
        .route("/{id}/ready", post(handler::ready))
        .route("/{id}/status", post(handler::set_status));

    read_routes.merge(manage_routes).merge(floor_routes)
}
