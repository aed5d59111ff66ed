// Per-tick simulation rules. Pure over domain types; no I/O.

pub mod buffs;
pub mod combat;
pub mod monster_ai;
pub mod movement;

pub use buffs::BuffTracker;
