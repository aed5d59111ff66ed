// Use-case level inputs/outputs for the world loop.

use crate::domain::templates::PrimaryStats;
use crate::domain::templates::MonsterTemplate;
use crate::domain::{
    ActiveBuff, AiState, CharacterRecord, CombatResult, EntityRef, GameData, InventoryRecord,
    ItemStack, Millis, MonsterId, MonsterInstance, MonsterRecord, Player, Position, RejectReason,
    SessionId, required_exp,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum GameEvent {
    /// Character selection from a connection. The world reserves the name and
    /// hands the lookup to the store worker.
    Select {
        session_id: SessionId,
        name: String,
        class: String,
    },
    /// A selection with its stored records, sent back by the store worker.
    Join {
        session_id: SessionId,
        name: String,
        class: String,
        stored: Option<CharacterRecord>,
        inventory: Option<InventoryRecord>,
    },
    /// The store worker could not load the selected character.
    SelectFailed {
        session_id: SessionId,
    },
    Leave {
        session_id: SessionId,
    },
    Move {
        session_id: SessionId,
        target: Position,
    },
    Attack {
        session_id: SessionId,
        monster_id: MonsterId,
    },
    StopAttack {
        session_id: SessionId,
    },
    CastSkill {
        session_id: SessionId,
        skill_id: String,
        target_id: Option<u64>,
    },
    UseItem {
        session_id: SessionId,
        item_id: String,
    },
    Respawn {
        session_id: SessionId,
    },
    ReloadGameData(Arc<GameData>),
}

impl GameEvent {
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            GameEvent::Select { session_id, .. }
            | GameEvent::Join { session_id, .. }
            | GameEvent::SelectFailed { session_id }
            | GameEvent::Leave { session_id }
            | GameEvent::Move { session_id, .. }
            | GameEvent::Attack { session_id, .. }
            | GameEvent::StopAttack { session_id }
            | GameEvent::CastSkill { session_id, .. }
            | GameEvent::UseItem { session_id, .. }
            | GameEvent::Respawn { session_id } => Some(*session_id),
            GameEvent::ReloadGameData(_) => None,
        }
    }

    /// Wire name of the request, echoed back in rejections.
    pub fn action(&self) -> &'static str {
        match self {
            GameEvent::Select { .. } | GameEvent::Join { .. } | GameEvent::SelectFailed { .. } => {
                "selectCharacter"
            }
            GameEvent::Leave { .. } => "leave",
            GameEvent::Move { .. } => "moveRequest",
            GameEvent::Attack { .. } => "attackMonster",
            GameEvent::StopAttack { .. } => "stopAttack",
            GameEvent::CastSkill { .. } => "castSkill",
            GameEvent::UseItem { .. } => "useItem",
            GameEvent::Respawn { .. } => "respawn",
            GameEvent::ReloadGameData(_) => "reload",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub session_id: SessionId,
    pub name: String,
    pub class: String,
    pub level: u32,
    pub health: u32,
    pub max_health: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub position: Position,
    pub moving: bool,
    pub in_combat: bool,
    pub target: Option<MonsterId>,
    pub dead: bool,
}

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            session_id: p.session_id,
            name: p.character.name.clone(),
            class: p.character.class.clone(),
            level: p.character.level,
            health: p.character.health,
            max_health: p.character.max_health,
            mana: p.character.mana,
            max_mana: p.character.max_mana,
            position: p.position,
            moving: p.movement.moving,
            in_combat: p.combat.in_combat,
            target: p.combat.target,
            dead: p.is_dead(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonsterSnapshot {
    pub id: MonsterId,
    pub template_id: String,
    pub name: String,
    pub level: u32,
    pub health: u32,
    pub max_health: u32,
    pub position: Position,
    pub alive: bool,
    pub state: AiState,
    pub target: Option<SessionId>,
}

impl MonsterSnapshot {
    /// A monster whose template went missing still shows up, with its own
    /// health standing in for the maximum.
    pub fn new(monster: &MonsterInstance, template: Option<&MonsterTemplate>) -> Self {
        Self {
            id: monster.id,
            template_id: monster.template_id.clone(),
            name: template.map_or_else(|| monster.template_id.clone(), |t| t.name.clone()),
            level: template.map_or(0, |t| t.level),
            health: monster.health,
            max_health: template.map_or(monster.health, |t| t.max_health),
            position: monster.position,
            alive: monster.alive,
            state: monster.state,
            target: monster.target,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldUpdate {
    pub tick: u64,
    pub timestamp: Millis,
    pub players: Vec<PlayerSnapshot>,
    pub monsters: Vec<MonsterSnapshot>,
}

/// Full character sheet sent to the owner on selection.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterDetails {
    pub session_id: SessionId,
    pub name: String,
    pub class: String,
    pub level: u32,
    pub experience: u64,
    pub next_level_exp: u64,
    pub stats: PrimaryStats,
    pub health: u32,
    pub max_health: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub attack: f32,
    pub defense: f32,
    pub attack_speed: f32,
    pub move_speed: f32,
    pub position: Position,
    pub skills: Vec<String>,
    pub inventory: Vec<ItemStack>,
}

impl From<&Player> for CharacterDetails {
    fn from(p: &Player) -> Self {
        let c = &p.character;
        Self {
            session_id: p.session_id,
            name: c.name.clone(),
            class: c.class.clone(),
            level: c.level,
            experience: c.experience,
            next_level_exp: required_exp(c.level),
            stats: c.stats,
            health: c.health,
            max_health: c.max_health,
            mana: c.mana,
            max_mana: c.max_mana,
            attack: c.attack,
            defense: c.defense,
            attack_speed: c.attack_speed,
            move_speed: c.move_speed,
            position: p.position,
            skills: c.learned_skills.iter().cloned().collect(),
            inventory: p.inventory.stacks().to_vec(),
        }
    }
}

/// Per-target effect of a skill.
#[derive(Debug, Clone, PartialEq)]
pub enum SkillHit {
    Damage(CombatResult),
    Heal {
        target: EntityRef,
        amount: u32,
        critical: bool,
        target_health: u32,
    },
    Buff {
        target: EntityRef,
        buff_id: u64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    CharacterSelected(CharacterDetails),
    WorldState(WorldUpdate),
    Combat(CombatResult),
    LevelUp {
        session_id: SessionId,
        level: u32,
        experience: u64,
        next_level_exp: u64,
        max_health: u32,
        max_mana: u32,
    },
    PlayerDeath {
        session_id: SessionId,
        killer: Option<EntityRef>,
    },
    PlayerRespawn {
        session_id: SessionId,
        position: Position,
        health: u32,
        mana: u32,
    },
    MonsterRespawn(MonsterSnapshot),
    SkillCast {
        caster: SessionId,
        skill_id: String,
        mana: u32,
        health: u32,
        hits: Vec<SkillHit>,
    },
    ItemUsed {
        item_id: String,
        health_restored: u32,
        mana_restored: u32,
        health: u32,
        mana: u32,
        remaining: u32,
    },
    BuffApplied(ActiveBuff),
    BuffExpired(ActiveBuff),
    Rejected {
        action: &'static str,
        reason: RejectReason,
    },
}

/// Where an event goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    All(ServerEvent),
    One(SessionId, ServerEvent),
}

/// Port for fanning world output out to connections.
pub trait Broadcaster: Send + Sync {
    fn send_to_all(&self, event: ServerEvent);
    fn send_to_one(&self, session_id: SessionId, event: ServerEvent);
}

pub fn dispatch(broadcaster: &dyn Broadcaster, outbound: Vec<Outbound>) {
    for message in outbound {
        match message {
            Outbound::All(event) => broadcaster.send_to_all(event),
            Outbound::One(session_id, event) => broadcaster.send_to_one(session_id, event),
        }
    }
}

/// A character lookup queued behind any saves issued before it.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub session_id: SessionId,
    pub name: String,
    pub class: String,
}

/// Records waiting to be written by the world loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveBatch {
    pub characters: Vec<CharacterRecord>,
    pub inventories: Vec<InventoryRecord>,
    pub monsters: Vec<MonsterRecord>,
}

impl SaveBatch {
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty() && self.inventories.is_empty() && self.monsters.is_empty()
    }

    pub fn append(&mut self, other: &mut SaveBatch) {
        self.characters.append(&mut other.characters);
        self.inventories.append(&mut other.inventories);
        self.monsters.append(&mut other.monsters);
    }
}
