// Monster instances: per-spawn mutable state over an immutable template.

use crate::domain::combat::{MonsterId, SessionId};
use crate::domain::cooldown::{Millis, seconds_to_millis};
use crate::domain::position::Position;
use crate::domain::records::MonsterRecord;
use crate::domain::templates::MonsterTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiState {
    /// Patrol-idle: waiting for the idle timer.
    Idle,
    /// Patrol-moving: walking to `destination` (also used when leashing home).
    Moving,
    /// Aggro: chasing or attacking `target`.
    Combat,
    Dead,
}

impl AiState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiState::Idle => "idle",
            AiState::Moving => "moving",
            AiState::Combat => "combat",
            AiState::Dead => "dead",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonsterInstance {
    pub id: MonsterId,
    pub template_id: String,
    pub health: u32,
    pub position: Position,
    /// Spawn position used for patrol offsets and leashing.
    pub home: Position,
    pub spawn_area: Option<String>,
    pub alive: bool,
    pub state: AiState,
    pub target: Option<SessionId>,
    pub last_attack_at: Option<Millis>,
    pub idle_until: Millis,
    pub destination: Option<Position>,
    pub moving_since: Millis,
    pub patrol_index: usize,
    /// Last known target position, refreshed at a bounded interval while chasing.
    pub chase_point: Option<Position>,
    pub chase_refreshed_at: Millis,
    pub respawn_seconds: f32,
    pub respawn_at: Option<Millis>,
}

impl MonsterInstance {
    pub fn spawn(
        id: MonsterId,
        template: &MonsterTemplate,
        position: Position,
        spawn_area: Option<String>,
        respawn_seconds: f32,
        now: Millis,
    ) -> Self {
        Self {
            id,
            template_id: template.id.clone(),
            health: template.max_health,
            position,
            home: position,
            spawn_area,
            alive: true,
            state: AiState::Idle,
            target: None,
            last_attack_at: None,
            idle_until: now,
            destination: None,
            moving_since: now,
            patrol_index: 0,
            chase_point: None,
            chase_refreshed_at: 0,
            respawn_seconds,
            respawn_at: None,
        }
    }

    pub fn from_record(record: &MonsterRecord, template: &MonsterTemplate, now: Millis) -> Self {
        let mut monster = Self::spawn(
            record.id,
            template,
            record.position,
            record.spawn_area.clone(),
            record.respawn_seconds,
            now,
        );
        monster.home = record.home;
        if record.alive && record.health > 0 {
            monster.health = record.health.min(template.max_health);
        } else {
            monster.health = 0;
            monster.alive = false;
            monster.state = AiState::Dead;
            monster.respawn_at = Some(now + record.respawn_remaining_ms.unwrap_or(0));
        }
        monster
    }

    pub fn to_record(&self, now: Millis) -> MonsterRecord {
        MonsterRecord {
            id: self.id,
            template_id: self.template_id.clone(),
            health: self.health,
            position: self.position,
            home: self.home,
            spawn_area: self.spawn_area.clone(),
            alive: self.alive,
            respawn_seconds: self.respawn_seconds,
            respawn_remaining_ms: self.respawn_at.map(|at| at.saturating_sub(now)),
        }
    }

    /// Applies damage; a killing blow moves the monster to `Dead` and records
    /// when it respawns. Returns the remaining health.
    pub fn take_damage(&mut self, amount: u32, now: Millis) -> u32 {
        if !self.alive {
            return 0;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            self.die(now);
        }
        self.health
    }

    pub fn die(&mut self, now: Millis) {
        self.health = 0;
        self.alive = false;
        self.state = AiState::Dead;
        self.clear_ai();
        self.respawn_at = Some(now + seconds_to_millis(self.respawn_seconds));
    }

    /// Revives a dead monster at `position` with full health. No-op when alive.
    pub fn respawn(&mut self, template: &MonsterTemplate, position: Position, now: Millis) -> bool {
        if self.alive {
            return false;
        }
        self.health = template.max_health;
        self.alive = true;
        self.position = position;
        self.home = position;
        self.state = AiState::Idle;
        self.clear_ai();
        self.last_attack_at = None;
        self.idle_until = now;
        self.moving_since = now;
        self.patrol_index = 0;
        self.respawn_at = None;
        true
    }

    /// Being hit pulls a non-combat monster onto its attacker.
    pub fn provoke(&mut self, attacker: SessionId, at: Position, now: Millis) {
        if !self.alive || self.state == AiState::Combat {
            return;
        }
        self.state = AiState::Combat;
        self.target = Some(attacker);
        self.destination = None;
        self.chase_point = Some(at);
        self.chase_refreshed_at = now;
    }

    pub fn heal(&mut self, amount: u32, max_health: u32) {
        if self.alive {
            self.health = self.health.saturating_add(amount).min(max_health);
        }
    }

    fn clear_ai(&mut self) {
        self.target = None;
        self.destination = None;
        self.chase_point = None;
    }
}
