// Timed stat modifiers.

use crate::domain::combat::EntityRef;
use serde::Deserialize;

/// Stats a buff can modify. Magnitudes are flat additions; attack speed is in
/// seconds, so a negative magnitude makes the target attack faster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Attack,
    Defense,
    MoveSpeed,
    AttackSpeed,
    Hit,
    Flee,
    CriticalChance,
}

impl Stat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stat::Attack => "attack",
            Stat::Defense => "defense",
            Stat::MoveSpeed => "move_speed",
            Stat::AttackSpeed => "attack_speed",
            Stat::Hit => "hit",
            Stat::Flee => "flee",
            Stat::CriticalChance => "critical_chance",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveBuff {
    pub id: u64,
    pub skill_id: String,
    pub caster: EntityRef,
    pub target: EntityRef,
    pub stat: Stat,
    pub magnitude: f32,
    /// Seconds left; the buff is dropped on the tick this reaches <= 0.
    pub remaining: f32,
    pub active: bool,
}

/// Sum of every active buff on one target. Buffs on the same stat stack additively.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatModifiers {
    pub attack: f32,
    pub defense: f32,
    pub move_speed: f32,
    pub attack_speed: f32,
    pub hit: f32,
    pub flee: f32,
    pub critical_chance: f32,
}

impl StatModifiers {
    pub fn add(&mut self, stat: Stat, magnitude: f32) {
        let slot = match stat {
            Stat::Attack => &mut self.attack,
            Stat::Defense => &mut self.defense,
            Stat::MoveSpeed => &mut self.move_speed,
            Stat::AttackSpeed => &mut self.attack_speed,
            Stat::Hit => &mut self.hit,
            Stat::Flee => &mut self.flee,
            Stat::CriticalChance => &mut self.critical_chance,
        };
        *slot += magnitude;
    }
}
