// Gameplay tuning. Runtime/server configuration lives in frameworks::config.

pub mod combat;
pub mod world;

pub use combat::CombatTuning;
pub use world::WorldTuning;
