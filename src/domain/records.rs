// Persisted shapes of mutable entity state.

use crate::domain::combat::MonsterId;
use crate::domain::inventory::ItemStack;
use crate::domain::position::Position;
use crate::domain::templates::PrimaryStats;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub name: String,
    pub class: String,
    pub level: u32,
    pub experience: u64,
    pub stats: PrimaryStats,
    pub health: u32,
    pub mana: u32,
    pub position: Position,
    #[serde(default)]
    pub learned_skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub character: String,
    pub items: Vec<ItemStack>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterRecord {
    pub id: MonsterId,
    pub template_id: String,
    pub health: u32,
    pub position: Position,
    pub home: Position,
    #[serde(default)]
    pub spawn_area: Option<String>,
    pub alive: bool,
    pub respawn_seconds: f32,
    /// Time left on the respawn timer for dead monsters, in milliseconds.
    #[serde(default)]
    pub respawn_remaining_ms: Option<u64>,
}
