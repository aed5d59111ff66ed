// Connected player state owned by the simulation.

use crate::domain::character::Character;
use crate::domain::combat::{MonsterId, SessionId};
use crate::domain::cooldown::Millis;
use crate::domain::inventory::Inventory;
use crate::domain::position::Position;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementIntent {
    pub target: Option<Position>,
    pub moving: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatIntent {
    pub target: Option<MonsterId>,
    pub in_combat: bool,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub session_id: SessionId,
    pub character: Character,
    pub position: Position,
    pub movement: MovementIntent,
    pub combat: CombatIntent,
    pub last_attack_at: Option<Millis>,
    pub inventory: Inventory,
    /// Last cast time per skill id.
    pub skill_casts: HashMap<String, Millis>,
    /// Last use time per item id.
    pub item_uses: HashMap<String, Millis>,
}

impl Player {
    pub fn new(
        session_id: SessionId,
        character: Character,
        position: Position,
        inventory: Inventory,
    ) -> Self {
        Self {
            session_id,
            character,
            position,
            movement: MovementIntent::default(),
            combat: CombatIntent::default(),
            last_attack_at: None,
            inventory,
            skill_casts: HashMap::new(),
            item_uses: HashMap::new(),
        }
    }

    pub fn is_dead(&self) -> bool {
        self.character.is_dead()
    }

    /// Clicking the ground: replaces any destination and drops combat intent.
    pub fn request_move(&mut self, target: Position) {
        self.disengage();
        self.movement.target = Some(target);
        self.movement.moving = true;
    }

    pub fn engage(&mut self, monster_id: MonsterId) {
        self.combat.target = Some(monster_id);
        self.combat.in_combat = true;
    }

    pub fn disengage(&mut self) {
        self.combat.target = None;
        self.combat.in_combat = false;
    }

    pub fn halt(&mut self) {
        self.movement.moving = false;
        self.movement.target = None;
    }

    /// Clears every intent a dead character may not hold.
    pub fn on_death(&mut self) {
        self.disengage();
        self.halt();
    }

    pub fn revive(&mut self, at: Position) {
        self.on_death();
        self.position = at;
        self.character.health = self.character.max_health;
        self.character.mana = self.character.max_mana;
        self.last_attack_at = None;
    }
}
