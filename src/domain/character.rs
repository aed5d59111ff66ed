// Player characters: primary stats, derived combat stats and leveling.

use crate::domain::records::CharacterRecord;
use crate::domain::position::Position;
use crate::domain::templates::{ClassConfig, PrimaryStats};
use std::collections::BTreeSet;

/// Fastest auto-attack interval any amount of dexterity can reach.
const MIN_ATTACK_SPEED: f32 = 0.4;

/// Experience needed to advance from `level` to `level + 1`.
pub fn required_exp(level: u32) -> u64 {
    100 * u64::from(level) * u64::from(level)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub name: String,
    pub class: String,
    pub level: u32,
    /// Progress into the current level; always below `required_exp(level)`.
    pub experience: u64,
    pub stats: PrimaryStats,
    pub health: u32,
    pub max_health: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub attack: f32,
    pub defense: f32,
    /// Seconds between auto-attacks.
    pub attack_speed: f32,
    pub move_speed: f32,
    pub learned_skills: BTreeSet<String>,
}

impl Character {
    /// New level 1 character at full health and mana.
    pub fn create(name: &str, class_name: &str, class: &ClassConfig) -> Self {
        let mut character = Self {
            name: name.to_string(),
            class: class_name.to_string(),
            level: 1,
            experience: 0,
            stats: class.base_stats,
            health: 0,
            max_health: 0,
            mana: 0,
            max_mana: 0,
            attack: 0.0,
            defense: 0.0,
            attack_speed: class.attack_speed,
            move_speed: class.move_speed,
            learned_skills: class.starting_skills.iter().cloned().collect(),
        };
        character.recalculate(class);
        character.health = character.max_health;
        character.mana = character.max_mana;
        character
    }

    /// Rebuilds a stored character. Derived stats always come from the class so
    /// balance changes apply to existing characters.
    pub fn from_record(record: &CharacterRecord, class: &ClassConfig) -> Self {
        let mut character = Self {
            name: record.name.clone(),
            class: record.class.clone(),
            level: record.level.max(1),
            experience: record.experience,
            stats: record.stats,
            health: 0,
            max_health: 0,
            mana: 0,
            max_mana: 0,
            attack: 0.0,
            defense: 0.0,
            attack_speed: class.attack_speed,
            move_speed: class.move_speed,
            learned_skills: record.learned_skills.iter().cloned().collect(),
        };
        character.recalculate(class);
        character.health = record.health.min(character.max_health);
        character.mana = record.mana.min(character.max_mana);
        character
    }

    pub fn to_record(&self, position: Position) -> CharacterRecord {
        CharacterRecord {
            name: self.name.clone(),
            class: self.class.clone(),
            level: self.level,
            experience: self.experience,
            stats: self.stats,
            health: self.health,
            mana: self.mana,
            position,
            learned_skills: self.learned_skills.iter().cloned().collect(),
        }
    }

    pub fn recalculate(&mut self, class: &ClassConfig) {
        let levels = self.level.saturating_sub(1);
        self.max_health = class.base_health + class.health_per_level * levels + self.stats.vitality * 5;
        self.max_mana = class.base_mana + class.mana_per_level * levels + self.stats.intelligence * 5;
        self.attack = class.base_attack + self.stats.strength as f32 * 2.0 + self.level as f32;
        self.defense =
            class.base_defense + self.stats.vitality as f32 * 0.5 + self.level as f32 * 0.5;
        self.attack_speed =
            (class.attack_speed - self.stats.dexterity as f32 * 0.005).max(MIN_ATTACK_SPEED);
        self.move_speed = class.move_speed;
        self.health = self.health.min(self.max_health);
        self.mana = self.mana.min(self.max_mana);
    }

    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    pub fn hit(&self) -> f32 {
        175.0 + self.stats.dexterity as f32 + self.level as f32
    }

    pub fn flee(&self) -> f32 {
        100.0 + self.level as f32 + (self.stats.vitality / 2) as f32
    }

    pub fn critical_chance(&self) -> f32 {
        ((self.stats.dexterity as f32 * 0.3 + self.level as f32 * 0.1) / 100.0).clamp(0.01, 0.50)
    }

    /// Returns the health left after the hit.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        self.health = self.health.saturating_sub(amount);
        self.health
    }

    /// Returns the amount actually restored.
    pub fn restore_health(&mut self, amount: u32) -> u32 {
        let before = self.health;
        self.health = self.health.saturating_add(amount).min(self.max_health);
        self.health - before
    }

    pub fn restore_mana(&mut self, amount: u32) -> u32 {
        let before = self.mana;
        self.mana = self.mana.saturating_add(amount).min(self.max_mana);
        self.mana - before
    }

    /// Adds experience and applies every level-up it pays for.
    ///
    /// Each level-up carries the surplus over, grows primary stats and refills
    /// health and mana. At `max_level` the surplus is capped just below the
    /// requirement. Returns the number of levels gained.
    pub fn gain_experience(&mut self, amount: u64, class: &ClassConfig, max_level: u32) -> u32 {
        self.experience = self.experience.saturating_add(amount);
        let mut gained = 0;
        while self.experience >= required_exp(self.level) {
            if self.level >= max_level {
                self.experience = required_exp(self.level) - 1;
                break;
            }
            self.experience -= required_exp(self.level);
            self.level += 1;
            self.stats.grow(&class.growth);
            gained += 1;
        }

        if gained > 0 {
            self.recalculate(class);
            self.health = self.max_health;
            self.mana = self.max_mana;
        }
        gained
    }
}
