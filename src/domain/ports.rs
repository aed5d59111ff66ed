use async_trait::async_trait;

use crate::domain::errors::StoreError;
use crate::domain::records::{CharacterRecord, InventoryRecord, MonsterRecord};

// Port for ground height lookups used to clamp entity Y and validate spawns.
pub trait TerrainQuery: Send + Sync {
    fn height_at(&self, x: f32, z: f32) -> f32;
    /// Ground slope in degrees.
    fn slope_at(&self, x: f32, z: f32) -> f32;

    fn is_valid_spawn(&self, x: f32, z: f32, max_slope: f32) -> bool {
        self.slope_at(x, z) <= max_slope
    }
}

// Port for the record store. Callers treat every method as best-effort.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn load_character(&self, name: &str) -> Result<Option<CharacterRecord>, StoreError>;
    async fn save_character(&self, record: &CharacterRecord) -> Result<(), StoreError>;
    async fn load_monster_instances(&self) -> Result<Vec<MonsterRecord>, StoreError>;
    async fn save_monster_instance(&self, record: &MonsterRecord) -> Result<(), StoreError>;
    async fn load_inventory(&self, character: &str) -> Result<Option<InventoryRecord>, StoreError>;
    async fn save_inventory(&self, record: &InventoryRecord) -> Result<(), StoreError>;
}

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}
