use crate::interface_adapters::net::outbound::SessionHub;
use crate::use_cases::GameEvent;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct AppState {
    // Requests flowing from connections into the world loop.
    pub input_tx: mpsc::Sender<GameEvent>,
    // Outbound fan-out shared with the world loop.
    pub hub: Arc<SessionHub>,
    // Source of game data for hot reloads.
    pub game_data_path: PathBuf,
}
