// File-backed source of game data.

use crate::domain::{DataError, GameData};
use std::path::Path;
use tracing::info;

/// Reads and validates the TOML game data at `path`.
pub async fn load_game_data(path: &Path) -> Result<GameData, DataError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let data = GameData::from_toml_str(&raw)?;
    info!(
        path = %path.display(),
        classes = data.classes.len(),
        monsters = data.monsters.len(),
        skills = data.skills.len(),
        items = data.items.len(),
        "game data loaded"
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn when_file_is_missing_then_io_error() {
        let err = load_game_data(Path::new("does/not/exist.toml")).await.unwrap_err();

        assert!(matches!(err, DataError::Io(_)));
    }

    #[tokio::test]
    async fn when_bundled_world_is_loaded_then_it_validates() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/world.toml");

        let data = load_game_data(&path).await.unwrap();

        assert!(!data.classes.is_empty());
        assert!(!data.spawn_areas.is_empty());
    }
}
