use crate::interface_adapters::net::{health_handler, reload_handler, ws_handler};
use crate::interface_adapters::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(state)
}
