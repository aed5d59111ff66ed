// Domain layer: core simulation types and rules.

pub mod buff;
pub mod character;
pub mod combat;
pub mod cooldown;
pub mod errors;
pub mod inventory;
pub mod monster;
pub mod player;
pub mod ports;
pub mod position;
pub mod records;
pub mod spawn;
pub mod systems;
pub mod templates;
pub mod terrain;
pub mod tuning;

pub use buff::{ActiveBuff, Stat, StatModifiers};
pub use character::{Character, required_exp};
pub use combat::{CombatResult, EntityRef, Exchange, ExperienceGain, MonsterId, SessionId};
pub use cooldown::Millis;
pub use errors::{DataError, EntityError, RejectReason, StoreError};
pub use inventory::{Inventory, ItemStack};
pub use monster::{AiState, MonsterInstance};
pub use player::Player;
pub use position::Position;
pub use records::{CharacterRecord, InventoryRecord, MonsterRecord};
pub use templates::GameData;
