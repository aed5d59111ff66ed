/// Balance constants for the combat resolver.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).

#[derive(Debug, Clone, Copy)]
pub struct CombatTuning {
    /// Maximum planar distance for a passive attack exchange.
    pub attack_range: f32,

    /// Hit chance before the hit/flee adjustment.
    pub base_hit_chance: f32,
    pub min_hit_chance: f32,
    pub max_hit_chance: f32,

    /// Raw damage multiplier on a critical strike.
    pub critical_multiplier: f32,

    /// Share of raw damage that ignores defense.
    pub guaranteed_fraction: f32,

    /// Floor of the defense-scaled portion, as a share of that portion.
    pub min_mitigated_fraction: f32,

    /// Constant in `defense / (defense + k)`.
    pub defense_constant: f32,

    /// Damage variance as +/- fraction of attack power.
    pub player_variance: f32,
    pub monster_variance: f32,

    pub monster_min_critical: f32,
    pub monster_max_critical: f32,
    /// Monster critical chance per level above the minimum.
    pub monster_critical_per_level: f32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            attack_range: 3.5,
            base_hit_chance: 0.80,
            min_hit_chance: 0.30,
            max_hit_chance: 0.95,
            critical_multiplier: 1.5,
            guaranteed_fraction: 0.10,
            min_mitigated_fraction: 0.10,
            defense_constant: 100.0,
            player_variance: 0.10,
            monster_variance: 0.05,
            monster_min_critical: 0.02,
            monster_max_critical: 0.15,
            monster_critical_per_level: 0.002,
        }
    }
}
