// Domain-level errors for world workflows.

use thiserror::Error;

/// Why a client request was refused. Sent only to the requesting session; the
/// world is left untouched whenever one of these is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("no character selected for this session")]
    NotInWorld,
    #[error("character is already in the world")]
    CharacterInUse,
    #[error("unknown character class")]
    UnknownClass,
    #[error("invalid character name")]
    InvalidName,
    #[error("player is dead")]
    PlayerDead,
    #[error("player is not dead")]
    NotDead,
    #[error("target not found")]
    TargetNotFound,
    #[error("target is dead")]
    TargetDead,
    #[error("target out of range")]
    OutOfRange,
    #[error("invalid position")]
    InvalidPosition,
    #[error("unknown skill")]
    UnknownSkill,
    #[error("skill not learned")]
    SkillNotLearned,
    #[error("not enough mana")]
    InsufficientMana,
    #[error("not enough health")]
    InsufficientHealth,
    #[error("on cooldown")]
    OnCooldown,
    #[error("no valid targets")]
    NoValidTargets,
    #[error("unknown item")]
    UnknownItem,
    #[error("item not owned")]
    ItemNotOwned,
    #[error("item cannot be used")]
    ItemNotUsable,
    #[error("character storage unavailable")]
    StoreUnavailable,
}

impl RejectReason {
    /// Stable machine-readable code for the wire.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::NotInWorld => "NOT_IN_WORLD",
            RejectReason::CharacterInUse => "CHARACTER_IN_USE",
            RejectReason::UnknownClass => "UNKNOWN_CLASS",
            RejectReason::InvalidName => "INVALID_NAME",
            RejectReason::PlayerDead => "PLAYER_DEAD",
            RejectReason::NotDead => "NOT_DEAD",
            RejectReason::TargetNotFound => "TARGET_NOT_FOUND",
            RejectReason::TargetDead => "TARGET_DEAD",
            RejectReason::OutOfRange => "OUT_OF_RANGE",
            RejectReason::InvalidPosition => "INVALID_POSITION",
            RejectReason::UnknownSkill => "UNKNOWN_SKILL",
            RejectReason::SkillNotLearned => "SKILL_NOT_LEARNED",
            RejectReason::InsufficientMana => "INSUFFICIENT_MANA",
            RejectReason::InsufficientHealth => "INSUFFICIENT_HEALTH",
            RejectReason::OnCooldown => "ON_COOLDOWN",
            RejectReason::NoValidTargets => "NO_VALID_TARGETS",
            RejectReason::UnknownItem => "UNKNOWN_ITEM",
            RejectReason::ItemNotOwned => "ITEM_NOT_OWNED",
            RejectReason::ItemNotUsable => "ITEM_NOT_USABLE",
            RejectReason::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }
}

/// Failure isolated to a single entity's update; the tick carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    #[error("monster template {0} is not loaded")]
    TemplateMissing(String),
    #[error("class {0} is not loaded")]
    ClassMissing(String),
}

/// Record store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("key {0} cannot be stored")]
    InvalidKey(String),
}

/// Game data that cannot be loaded or does not hang together.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read game data: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse game data: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("duplicate {kind} id {id}")]
    Duplicate { kind: &'static str, id: String },
    #[error("spawn area {area} references unknown monster {monster}")]
    UnknownMonster { area: String, monster: String },
    #[error("class {class} references unknown {kind} {id}")]
    UnknownClassRef {
        class: String,
        kind: &'static str,
        id: String,
    },
    #[error("terrain grid dimensions do not match its samples")]
    InvalidTerrain,
}
