pub mod game;
pub mod monsters;
pub mod players;
mod skills;
pub mod types;
pub mod world;

#[cfg(test)]
pub(crate) mod test_support;

pub use game::{LoopConfig, LoopPorts, save_batch, world_task};
pub use monsters::MonsterRegistry;
pub use players::PlayerRegistry;
pub use types::{
    Broadcaster, CharacterDetails, GameEvent, MonsterSnapshot, Outbound, PlayerSnapshot,
    LoadRequest, SaveBatch, ServerEvent, SkillHit, WorldUpdate, dispatch,
};
pub use world::World;
