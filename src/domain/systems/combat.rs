// Hit, critical and damage resolution for a single exchange.

use crate::domain::buff::StatModifiers;
use crate::domain::character::Character;
use crate::domain::combat::{CombatResult, EntityRef, Exchange, ExperienceGain};
use crate::domain::cooldown::Millis;
use crate::domain::monster::MonsterInstance;
use crate::domain::player::Player;
use crate::domain::templates::{ClassConfig, MonsterTemplate, StatScaling};
use crate::domain::tuning::CombatTuning;
use rand::Rng;

/// Derived combat stats of one side of an exchange, buffs included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combatant {
    pub level: u32,
    pub attack: f32,
    pub defense: f32,
    pub hit: f32,
    pub flee: f32,
    pub critical_chance: f32,
    /// Damage variance as +/- fraction.
    pub variance: f32,
}

impl Combatant {
    pub fn player(character: &Character, mods: &StatModifiers, tuning: &CombatTuning) -> Self {
        Self {
            level: character.level,
            attack: (character.attack + mods.attack).max(0.0),
            defense: (character.defense + mods.defense).max(0.0),
            hit: character.hit() + mods.hit,
            flee: character.flee() + mods.flee,
            critical_chance: (character.critical_chance() + mods.critical_chance).clamp(0.0, 1.0),
            variance: tuning.player_variance,
        }
    }

    pub fn monster(template: &MonsterTemplate, mods: &StatModifiers, tuning: &CombatTuning) -> Self {
        let level = template.level as f32;
        let critical = (tuning.monster_min_critical + tuning.monster_critical_per_level * level)
            .clamp(tuning.monster_min_critical, tuning.monster_max_critical);
        Self {
            level: template.level,
            attack: (template.attack + mods.attack).max(0.0),
            defense: (template.defense + mods.defense).max(0.0),
            hit: 175.0 + level + template.attack / 5.0 + mods.hit,
            flee: 100.0 + level + template.defense / 2.0 + mods.flee,
            critical_chance: (critical + mods.critical_chance).clamp(0.0, 1.0),
            variance: tuning.monster_variance,
        }
    }
}

/// Result of the hit/critical/damage rolls, before anything is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strike {
    pub critical: bool,
    /// Zero exactly when the strike missed.
    pub damage: u32,
}

pub fn hit_chance(attacker_hit: f32, defender_flee: f32, tuning: &CombatTuning) -> f32 {
    (tuning.base_hit_chance + (attacker_hit - defender_flee) / 100.0)
        .clamp(tuning.min_hit_chance, tuning.max_hit_chance)
}

/// Damage after defense. A fixed share of `raw` always lands; the rest is
/// reduced by `defense / (defense + k)` but never below its floor share.
pub fn mitigate(raw: f32, defense: f32, tuning: &CombatTuning) -> u32 {
    let guaranteed = raw * tuning.guaranteed_fraction;
    let portion = raw - guaranteed;
    let reduction = defense.max(0.0) / (defense.max(0.0) + tuning.defense_constant);
    let reduced = (portion * (1.0 - reduction)).max(portion * tuning.min_mitigated_fraction);
    ((guaranteed + reduced).floor() as u32).max(1)
}

/// Rolls hit, critical and variance for `power` against `defender`.
pub fn roll_strike(
    attacker: &Combatant,
    defender: &Combatant,
    power: f32,
    rng: &mut impl Rng,
    tuning: &CombatTuning,
) -> Strike {
    let chance = hit_chance(attacker.hit, defender.flee, tuning);
    if rng.random::<f32>() > chance {
        return Strike {
            critical: false,
            damage: 0,
        };
    }

    let critical = rng.random::<f32>() < attacker.critical_chance;
    let mut raw = power * (1.0 + rng.random_range(-attacker.variance..=attacker.variance));
    if critical {
        raw *= tuning.critical_multiplier;
    }

    Strike {
        critical,
        damage: mitigate(raw.max(0.0), defender.defense, tuning),
    }
}

/// Healing uses the same variance and critical shape as damage, without a
/// hit roll or defense.
pub fn roll_heal(caster: &Combatant, power: f32, rng: &mut impl Rng, tuning: &CombatTuning) -> (u32, bool) {
    let critical = rng.random::<f32>() < caster.critical_chance;
    let mut amount = power * (1.0 + rng.random_range(-caster.variance..=caster.variance));
    if critical {
        amount *= tuning.critical_multiplier;
    }
    ((amount.floor() as u32).max(1), critical)
}

/// Stat-scaled power of a skill effect.
pub fn skill_power(base: f32, scaling: &StatScaling, character: &Character) -> f32 {
    let s = &character.stats;
    base + s.strength as f32 * scaling.strength
        + s.intelligence as f32 * scaling.intelligence
        + s.dexterity as f32 * scaling.dexterity
        + s.vitality as f32 * scaling.vitality
        + character.level as f32 * scaling.level
}

/// Experience multiplier by `monster_level - player_level`.
pub fn exp_multiplier(level_difference: i64) -> f32 {
    match level_difference {
        d if d >= 10 => 2.0,
        5..=9 => 1.5,
        3..=4 => 1.2,
        1..=2 => 1.1,
        0 => 1.0,
        -2..=-1 => 0.9,
        -4..=-3 => 0.7,
        -9..=-5 => 0.3,
        _ => 0.05,
    }
}

pub fn kill_experience(template: &MonsterTemplate, player_level: u32) -> u64 {
    let difference = i64::from(template.level) - i64::from(player_level);
    (template.experience as f32 * exp_multiplier(difference)).floor() as u64
}

/// Everything a player-side resolution needs besides the two entities.
pub struct PlayerSide<'a> {
    pub mods: &'a StatModifiers,
    pub class: &'a ClassConfig,
    pub max_level: u32,
}

/// Applies a resolved strike from a player to a monster, awarding experience
/// on a killing blow.
pub fn apply_player_strike(
    player: &mut Player,
    side: &PlayerSide<'_>,
    monster: &mut MonsterInstance,
    template: &MonsterTemplate,
    strike: Strike,
    now: Millis,
) -> CombatResult {
    let target_health = if strike.damage > 0 {
        monster.take_damage(strike.damage, now)
    } else {
        monster.health
    };
    let target_died = strike.damage > 0 && !monster.alive;

    let experience = target_died.then(|| {
        let amount = kill_experience(template, player.character.level);
        let levels_gained = player
            .character
            .gain_experience(amount, side.class, side.max_level);
        ExperienceGain {
            amount,
            levels_gained,
            new_level: player.character.level,
        }
    });

    CombatResult {
        attacker: EntityRef::Player(player.session_id),
        target: EntityRef::Monster(monster.id),
        damage: strike.damage,
        critical: strike.critical,
        target_health,
        target_died,
        experience,
    }
}

/// One passive auto-attack from a player to a monster.
#[allow(clippy::too_many_arguments)]
pub fn player_attacks_monster(
    player: &mut Player,
    side: &PlayerSide<'_>,
    monster: &mut MonsterInstance,
    template: &MonsterTemplate,
    monster_mods: &StatModifiers,
    now: Millis,
    rng: &mut impl Rng,
    tuning: &CombatTuning,
) -> Exchange {
    let distance = player.position.planar_distance(&monster.position);
    if distance > tuning.attack_range {
        return Exchange::OutOfRange {
            distance,
            range: tuning.attack_range,
        };
    }

    let attacker = Combatant::player(&player.character, side.mods, tuning);
    let defender = Combatant::monster(template, monster_mods, tuning);
    let strike = roll_strike(&attacker, &defender, attacker.attack, rng, tuning);
    Exchange::Resolved(apply_player_strike(player, side, monster, template, strike, now))
}

/// One attack from a monster to a player. A killing blow clears the player's
/// intents.
pub fn monster_attacks_player(
    monster: &MonsterInstance,
    template: &MonsterTemplate,
    monster_mods: &StatModifiers,
    player: &mut Player,
    player_mods: &StatModifiers,
    rng: &mut impl Rng,
    tuning: &CombatTuning,
) -> Exchange {
    let distance = monster.position.planar_distance(&player.position);
    if distance > tuning.attack_range {
        return Exchange::OutOfRange {
            distance,
            range: tuning.attack_range,
        };
    }

    let attacker = Combatant::monster(template, monster_mods, tuning);
    let defender = Combatant::player(&player.character, player_mods, tuning);
    let strike = roll_strike(&attacker, &defender, attacker.attack, rng, tuning);

    let target_health = if strike.damage > 0 {
        player.character.take_damage(strike.damage)
    } else {
        player.character.health
    };
    let target_died = strike.damage > 0 && player.is_dead();
    if target_died {
        player.on_death();
    }

    Exchange::Resolved(CombatResult {
        attacker: EntityRef::Monster(monster.id),
        target: EntityRef::Player(player.session_id),
        damage: strike.damage,
        critical: strike.critical,
        target_health,
        target_died,
        experience: None,
    })
}
