use crate::interface_adapters::game_data::load_game_data;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::state::AppState;
use crate::use_cases::GameEvent;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, serde::Serialize)]
struct ReloadResponse {
    classes: usize,
    monsters: usize,
    skills: usize,
    items: usize,
    spawn_areas: usize,
}

#[derive(Debug, serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    connections: usize,
}

/// Re-reads game data and hands it to the world, which swaps it in between
/// ticks. Invalid data leaves the running set untouched.
pub async fn reload_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let data = match load_game_data(&state.game_data_path).await {
        Ok(data) => data,
        Err(err) => {
            warn!(error = %err, path = %state.game_data_path.display(), "game data reload failed");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response();
        }
    };

    let summary = ReloadResponse {
        classes: data.classes.len(),
        monsters: data.monsters.len(),
        skills: data.skills.len(),
        items: data.items.len(),
        spawn_areas: data.spawn_areas.len(),
    };

    if state
        .input_tx
        .send(GameEvent::ReloadGameData(Arc::new(data)))
        .await
        .is_err()
    {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "world loop is not running".to_string(),
            }),
        )
            .into_response();
    }

    info!(monsters = summary.monsters, skills = summary.skills, "game data reload queued");
    (StatusCode::ACCEPTED, Json(summary)).into_response()
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        connections: state.hub.session_count(),
    })
}
