// Wire protocol DTOs and conversions for public world server messages.
// Internal HTTP payloads live next to their handlers.

use crate::domain::templates::PrimaryStats;
use crate::domain::{ActiveBuff, CombatResult, EntityRef, ItemStack, Position, SessionId};
use crate::use_cases::{
    CharacterDetails, MonsterSnapshot, PlayerSnapshot, ServerEvent, SkillHit, WorldUpdate,
};
use serde::{Deserialize, Serialize};

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    SelectCharacter(SelectCharacterPayload),
    MoveRequest(MoveRequestPayload),
    AttackMonster(AttackMonsterPayload),
    StopAttack,
    CastSkill(CastSkillPayload),
    UseItem(UseItemPayload),
    Respawn,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectCharacterPayload {
    pub name: String,
    pub class_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequestPayload {
    pub target_position: Position,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackMonsterPayload {
    pub monster_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastSkillPayload {
    pub skill_id: String,
    #[serde(default)]
    pub target_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UseItemPayload {
    pub item_id: String,
}

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    // Assigned on connect, before character selection.
    Identity(IdentityDto),
    CharacterSelected(CharacterDto),
    WorldState(WorldStateDto),
    CombatResult(CombatResultDto),
    LevelUp(LevelUpDto),
    PlayerDeath(PlayerDeathDto),
    PlayerRespawn(PlayerRespawnDto),
    MonsterRespawn(MonsterDto),
    SkillCast(SkillCastDto),
    ItemUsed(ItemUsedDto),
    BuffApplied(BuffDto),
    BuffExpired(BuffDto),
    ActionRejected(ActionRejectedDto),
}

impl ServerMessage {
    pub fn identity(session_id: SessionId) -> Self {
        ServerMessage::Identity(IdentityDto { session_id })
    }

    pub fn rejected(action: &str, reason: &str) -> Self {
        ServerMessage::ActionRejected(ActionRejectedDto {
            action: action.to_string(),
            reason: reason.to_string(),
        })
    }
}

impl From<ServerEvent> for ServerMessage {
    fn from(event: ServerEvent) -> Self {
        match event {
            ServerEvent::CharacterSelected(details) => {
                ServerMessage::CharacterSelected(details.into())
            }
            ServerEvent::WorldState(update) => ServerMessage::WorldState(update.into()),
            ServerEvent::Combat(result) => ServerMessage::CombatResult((&result).into()),
            ServerEvent::LevelUp {
                session_id,
                level,
                experience,
                next_level_exp,
                max_health,
                max_mana,
            } => ServerMessage::LevelUp(LevelUpDto {
                session_id,
                level,
                experience,
                next_level_exp,
                max_health,
                max_mana,
            }),
            ServerEvent::PlayerDeath { session_id, killer } => {
                ServerMessage::PlayerDeath(PlayerDeathDto {
                    session_id,
                    killer: killer.map(EntityDto::from),
                })
            }
            ServerEvent::PlayerRespawn {
                session_id,
                position,
                health,
                mana,
            } => ServerMessage::PlayerRespawn(PlayerRespawnDto {
                session_id,
                position,
                health,
                mana,
            }),
            ServerEvent::MonsterRespawn(snapshot) => ServerMessage::MonsterRespawn((&snapshot).into()),
            ServerEvent::SkillCast {
                caster,
                skill_id,
                mana,
                health,
                hits,
            } => ServerMessage::SkillCast(SkillCastDto {
                caster_id: caster,
                skill_id,
                mana,
                health,
                results: hits.iter().map(SkillHitDto::from).collect(),
            }),
            ServerEvent::ItemUsed {
                item_id,
                health_restored,
                mana_restored,
                health,
                mana,
                remaining,
            } => ServerMessage::ItemUsed(ItemUsedDto {
                item_id,
                health_restored,
                mana_restored,
                health,
                mana,
                remaining,
            }),
            ServerEvent::BuffApplied(buff) => ServerMessage::BuffApplied((&buff).into()),
            ServerEvent::BuffExpired(buff) => ServerMessage::BuffExpired((&buff).into()),
            ServerEvent::Rejected { action, reason } => {
                ServerMessage::rejected(action, reason.code())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDto {
    pub session_id: SessionId,
}

/// A player or monster reference on the wire.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EntityDto {
    pub kind: &'static str,
    pub id: u64,
}

impl From<EntityRef> for EntityDto {
    fn from(entity: EntityRef) -> Self {
        Self {
            kind: entity.kind(),
            id: entity.id(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterDto {
    pub session_id: SessionId,
    pub name: String,
    pub class_name: String,
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

impl From<CharacterDetails> for CharacterDto {
    fn from(d: CharacterDetails) -> Self {
        Self {
            session_id: d.session_id,
            name: d.name,
            class_name: d.class,
            level: d.level,
            experience: d.experience,
            next_level_exp: d.next_level_exp,
            stats: d.stats,
            health: d.health,
            max_health: d.max_health,
            mana: d.mana,
            max_mana: d.max_mana,
            attack: d.attack,
            defense: d.defense,
            attack_speed: d.attack_speed,
            move_speed: d.move_speed,
            position: d.position,
            skills: d.skills,
            inventory: d.inventory,
        }
    }
}

/// Snapshot of the world sent to every client at the end of each tick.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldStateDto {
    pub timestamp: u64,
    pub tick: u64,
    pub players: Vec<PlayerDto>,
    pub monsters: Vec<MonsterDto>,
}

impl From<WorldUpdate> for WorldStateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            timestamp: update.timestamp,
            tick: update.tick,
            players: update.players.iter().map(PlayerDto::from).collect(),
            monsters: update.monsters.iter().map(MonsterDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub session_id: SessionId,
    pub name: String,
    pub class_name: String,
    pub level: u32,
    pub health: u32,
    pub max_health: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub position: Position,
    pub is_moving: bool,
    pub in_combat: bool,
    pub target_id: Option<u64>,
    pub is_dead: bool,
}

impl From<&PlayerSnapshot> for PlayerDto {
    fn from(p: &PlayerSnapshot) -> Self {
        Self {
            session_id: p.session_id,
            name: p.name.clone(),
            class_name: p.class.clone(),
            level: p.level,
            health: p.health,
            max_health: p.max_health,
            mana: p.mana,
            max_mana: p.max_mana,
            position: p.position,
            is_moving: p.moving,
            in_combat: p.in_combat,
            target_id: p.target,
            is_dead: p.dead,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterDto {
    pub id: u64,
    pub template_id: String,
    pub name: String,
    pub level: u32,
    pub health: u32,
    pub max_health: u32,
    pub position: Position,
    pub is_alive: bool,
    pub ai_state: &'static str,
    pub target_id: Option<SessionId>,
}

impl From<&MonsterSnapshot> for MonsterDto {
    fn from(m: &MonsterSnapshot) -> Self {
        Self {
            id: m.id,
            template_id: m.template_id.clone(),
            name: m.name.clone(),
            level: m.level,
            health: m.health,
            max_health: m.max_health,
            position: m.position,
            is_alive: m.alive,
            ai_state: m.state.as_str(),
            target_id: m.target,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceDto {
    pub amount: u64,
    pub levels_gained: u32,
    pub new_level: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatResultDto {
    pub attacker: EntityDto,
    pub target: EntityDto,
    pub damage: u32,
    pub is_critical: bool,
    pub is_miss: bool,
    pub target_health: u32,
    pub target_died: bool,
    pub experience: Option<ExperienceDto>,
}

impl From<&CombatResult> for CombatResultDto {
    fn from(r: &CombatResult) -> Self {
        Self {
            attacker: r.attacker.into(),
            target: r.target.into(),
            damage: r.damage,
            is_critical: r.critical,
            is_miss: r.is_miss(),
            target_health: r.target_health,
            target_died: r.target_died,
            experience: r.experience.map(|e| ExperienceDto {
                amount: e.amount,
                levels_gained: e.levels_gained,
                new_level: e.new_level,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUpDto {
    pub session_id: SessionId,
    pub level: u32,
    pub experience: u64,
    pub next_level_exp: u64,
    pub max_health: u32,
    pub max_mana: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDeathDto {
    pub session_id: SessionId,
    pub killer: Option<EntityDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRespawnDto {
    pub session_id: SessionId,
    pub position: Position,
    pub health: u32,
    pub mana: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "effect", rename_all = "camelCase")]
pub enum SkillHitDto {
    Damage(CombatResultDto),
    #[serde(rename_all = "camelCase")]
    Heal {
        target: EntityDto,
        amount: u32,
        is_critical: bool,
        target_health: u32,
    },
    #[serde(rename_all = "camelCase")]
    Buff { target: EntityDto, buff_id: u64 },
}

impl From<&SkillHit> for SkillHitDto {
    fn from(hit: &SkillHit) -> Self {
        match hit {
            SkillHit::Damage(result) => SkillHitDto::Damage(result.into()),
            SkillHit::Heal {
                target,
                amount,
                critical,
                target_health,
            } => SkillHitDto::Heal {
                target: (*target).into(),
                amount: *amount,
                is_critical: *critical,
                target_health: *target_health,
            },
            SkillHit::Buff { target, buff_id } => SkillHitDto::Buff {
                target: (*target).into(),
                buff_id: *buff_id,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillCastDto {
    pub caster_id: SessionId,
    pub skill_id: String,
    pub mana: u32,
    pub health: u32,
    pub results: Vec<SkillHitDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUsedDto {
    pub item_id: String,
    pub health_restored: u32,
    pub mana_restored: u32,
    pub health: u32,
    pub mana: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuffDto {
    pub buff_id: u64,
    pub skill_id: String,
    pub caster: EntityDto,
    pub target: EntityDto,
    pub stat: &'static str,
    pub magnitude: f32,
    pub remaining_seconds: f32,
}

impl From<&ActiveBuff> for BuffDto {
    fn from(b: &ActiveBuff) -> Self {
        Self {
            buff_id: b.id,
            skill_id: b.skill_id.clone(),
            caster: b.caster.into(),
            target: b.target.into(),
            stat: b.stat.as_str(),
            magnitude: b.magnitude,
            remaining_seconds: b.remaining.max(0.0),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRejectedDto {
    pub action: String,
    pub reason: String,
}
