// Combat outcome records shared by passive attacks and skills.

/// Opaque per-connection identifier, stable for the connection's lifetime.
pub type SessionId = u64;
/// Monster instance identifier, unique for the life of the server.
pub type MonsterId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Player(SessionId),
    Monster(MonsterId),
}

impl EntityRef {
    pub fn id(&self) -> u64 {
        match self {
            EntityRef::Player(id) | EntityRef::Monster(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EntityRef::Player(_) => "player",
            EntityRef::Monster(_) => "monster",
        }
    }
}

/// Experience awarded for a killing blow on a monster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExperienceGain {
    pub amount: u64,
    pub levels_gained: u32,
    pub new_level: u32,
}

impl ExperienceGain {
    pub fn leveled_up(&self) -> bool {
        self.levels_gained > 0
    }
}

/// One resolved attacker -> target exchange. A miss is encoded as `damage == 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatResult {
    pub attacker: EntityRef,
    pub target: EntityRef,
    pub damage: u32,
    pub critical: bool,
    pub target_health: u32,
    pub target_died: bool,
    pub experience: Option<ExperienceGain>,
}

impl CombatResult {
    pub fn is_miss(&self) -> bool {
        self.damage == 0
    }
}

/// Outcome of asking the resolver for an exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Exchange {
    /// Target beyond attack range; nothing was rolled or applied.
    OutOfRange { distance: f32, range: f32 },
    Resolved(CombatResult),
}
