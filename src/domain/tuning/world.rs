use crate::domain::cooldown::Millis;

/// Movement and monster AI tuning.

#[derive(Debug, Clone, Copy)]
pub struct WorldTuning {
    /// Planar distance at which a moving player snaps onto its destination.
    pub player_stop_distance: f32,

    /// Planar distance at which a patrolling monster counts as arrived.
    pub monster_arrive_distance: f32,

    /// Aggro ends once the target is beyond this multiple of the aggro range.
    pub leash_multiplier: f32,

    /// Share of max health restored when a monster gives up a chase.
    pub leash_heal_fraction: f32,

    /// How often a chasing monster re-reads its target's position.
    pub chase_refresh_ms: Millis,

    /// A patrol leg that takes longer than this picks a new destination.
    pub move_timeout_ms: Millis,

    /// Idle pause between patrol legs, picked uniformly from this range.
    pub idle_min_ms: Millis,
    pub idle_max_ms: Millis,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            player_stop_distance: 0.1,
            monster_arrive_distance: 0.5,
            leash_multiplier: 1.5,
            leash_heal_fraction: 0.2,
            chase_refresh_ms: 500,
            move_timeout_ms: 15_000,
            idle_min_ms: 2_000,
            idle_max_ms: 6_000,
        }
    }
}
