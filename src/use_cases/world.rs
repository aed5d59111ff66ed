// The world aggregate: every mutable entity, advanced by requests and ticks.

use super::monsters::{MonsterRegistry, MonsterStep};
use super::players::PlayerRegistry;
use super::types::{
    CharacterDetails, GameEvent, LoadRequest, Outbound, PlayerSnapshot, SaveBatch, ServerEvent,
    WorldUpdate,
};
use crate::domain::cooldown::cooldown_elapsed;
use crate::domain::systems::BuffTracker;
use crate::domain::systems::combat::{PlayerSide, player_attacks_monster};
use crate::domain::tuning::{CombatTuning, WorldTuning};
use crate::domain::{
    Character, CharacterRecord, CombatResult, EntityError, EntityRef, Exchange, GameData,
    Inventory, InventoryRecord, Millis, MonsterId, MonsterInstance, Player, Position,
    RejectReason, SessionId, required_exp,
};
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A name held for a session while its stored records are being loaded.
#[derive(Debug)]
struct Selection {
    name: String,
    // The connection left before the load came back.
    abandoned: bool,
}

pub struct World {
    pub(super) data: Arc<GameData>,
    pub(super) players: PlayerRegistry,
    pub(super) monsters: MonsterRegistry,
    pub(super) buffs: BuffTracker,
    pub(super) combat: CombatTuning,
    pub(super) tuning: WorldTuning,
    pub(super) rng: StdRng,
    tick: u64,
    pending: SaveBatch,
    loads: Vec<LoadRequest>,
    selecting: HashMap<SessionId, Selection>,
}

impl World {
    pub fn new(data: Arc<GameData>, monsters: MonsterRegistry, rng: StdRng) -> Self {
        Self {
            data,
            players: PlayerRegistry::new(),
            monsters,
            buffs: BuffTracker::new(),
            combat: CombatTuning::default(),
            tuning: WorldTuning::default(),
            rng,
            tick: 0,
            pending: SaveBatch::default(),
            loads: Vec::new(),
            selecting: HashMap::new(),
        }
    }

    pub fn with_tuning(mut self, combat: CombatTuning, tuning: WorldTuning) -> Self {
        self.combat = combat;
        self.tuning = tuning;
        self
    }

    pub fn data(&self) -> &Arc<GameData> {
        &self.data
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut PlayerRegistry {
        &mut self.players
    }

    pub fn monsters(&self) -> &MonsterRegistry {
        &self.monsters
    }

    pub fn monsters_mut(&mut self) -> &mut MonsterRegistry {
        &mut self.monsters
    }

    pub fn buffs(&self) -> &BuffTracker {
        &self.buffs
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Records produced since the last call (departures, respawns).
    pub fn take_pending_saves(&mut self) -> SaveBatch {
        std::mem::take(&mut self.pending)
    }

    /// Character lookups requested since the last call. They must reach the
    /// store after the saves taken alongside them.
    pub fn take_pending_loads(&mut self) -> Vec<LoadRequest> {
        std::mem::take(&mut self.loads)
    }

    /// Every mutable entity, for the periodic save pass.
    pub fn save_all(&self, now: Millis) -> SaveBatch {
        let mut batch = SaveBatch::default();
        for player in self.players.iter() {
            let (character, inventory) = player_records(player);
            batch.characters.push(character);
            batch.inventories.push(inventory);
        }
        batch.monsters = self.monsters.records(now);
        batch
    }

    pub fn snapshot(&self, now: Millis) -> WorldUpdate {
        WorldUpdate {
            tick: self.tick,
            timestamp: now,
            players: self.players.iter().map(PlayerSnapshot::from).collect(),
            monsters: self.monsters.snapshots(&self.data),
        }
    }

    /// Applies one client request. Refusals go back to the requester only and
    /// leave the world untouched.
    pub fn handle(&mut self, event: GameEvent, now: Millis) -> Vec<Outbound> {
        let action = event.action();
        let session_id = event.session_id();

        let result = match event {
            GameEvent::Select {
                session_id,
                name,
                class,
            } => self.select(session_id, name, class),
            GameEvent::Join {
                session_id,
                name,
                class,
                stored,
                inventory,
            } => self.join(session_id, &name, &class, stored, inventory),
            GameEvent::SelectFailed { session_id } => self.select_failed(session_id),
            GameEvent::Leave { session_id } => Ok(self.leave(session_id)),
            GameEvent::Move { session_id, target } => self.move_to(session_id, target),
            GameEvent::Attack {
                session_id,
                monster_id,
            } => self.attack(session_id, monster_id),
            GameEvent::StopAttack { session_id } => self.stop_attack(session_id),
            GameEvent::CastSkill {
                session_id,
                skill_id,
                target_id,
            } => self.cast_skill(session_id, &skill_id, target_id, now),
            GameEvent::UseItem {
                session_id,
                item_id,
            } => self.use_item(session_id, &item_id, now),
            GameEvent::Respawn { session_id } => self.respawn(session_id),
            GameEvent::ReloadGameData(data) => Ok(self.reload(data)),
        };

        match (result, session_id) {
            (Ok(out), _) => out,
            (Err(reason), Some(session_id)) => {
                debug!(session_id, action, reason = reason.code(), "request rejected");
                vec![Outbound::One(
                    session_id,
                    ServerEvent::Rejected { action, reason },
                )]
            }
            (Err(reason), None) => {
                warn!(action, reason = reason.code(), "request rejected");
                Vec::new()
            }
        }
    }

    /// One simulation step, in fixed order: movement, buffs, player
    /// auto-attacks, monster AI, snapshot.
    pub fn tick(&mut self, dt: f32, now: Millis) -> Vec<Outbound> {
        self.tick += 1;
        let data = Arc::clone(&self.data);
        let mut out = Vec::new();

        self.players.tick_movement(
            dt,
            &self.buffs,
            data.terrain.as_ref(),
            self.tuning.player_stop_distance,
        );

        for buff in self.buffs.tick(dt) {
            out.push(Outbound::All(ServerEvent::BuffExpired(buff)));
        }

        self.resolve_auto_attacks(&data, now, &mut out);

        let step = MonsterStep {
            data: &data,
            world: &self.tuning,
            combat: &self.combat,
            now,
            dt,
        };
        let mut respawned = self.monsters.tick(
            &step,
            &mut self.players,
            &mut self.buffs,
            &mut self.rng,
            &mut out,
        );
        self.pending.monsters.append(&mut respawned);

        out.push(Outbound::All(ServerEvent::WorldState(self.snapshot(now))));
        out
    }

    fn resolve_auto_attacks(&mut self, data: &GameData, now: Millis, out: &mut Vec<Outbound>) {
        for session_id in self.players.session_ids() {
            let Some(player) = self.players.get_mut(session_id) else {
                continue;
            };
            if !player.combat.in_combat {
                continue;
            }
            let Some(monster_id) = player.combat.target else {
                player.disengage();
                continue;
            };
            let Some(monster) = self.monsters.get_mut(monster_id).filter(|m| m.alive) else {
                debug!(session_id, monster_id, "combat target gone; disengaging");
                player.disengage();
                player.halt();
                continue;
            };

            // Out of reach: walk toward the monster instead of swinging.
            if player.position.planar_distance(&monster.position) > self.combat.attack_range {
                player.movement.target = Some(monster.position);
                player.movement.moving = true;
                continue;
            }
            player.movement.moving = false;

            let mods = self.buffs.modifiers(EntityRef::Player(session_id));
            let cooldown = (player.character.attack_speed + mods.attack_speed).max(0.0);
            if !cooldown_elapsed(player.last_attack_at, cooldown, now) {
                continue;
            }
            let Some(template) = data.monsters.get(&monster.template_id) else {
                let err = EntityError::TemplateMissing(monster.template_id.clone());
                warn!(session_id, monster_id, error = %err, "skipping auto-attack");
                continue;
            };
            let Some(class) = data.classes.get(&player.character.class) else {
                let err = EntityError::ClassMissing(player.character.class.clone());
                warn!(session_id, error = %err, "skipping auto-attack");
                continue;
            };

            let monster_mods = self.buffs.modifiers(EntityRef::Monster(monster_id));
            let side = PlayerSide {
                mods: &mods,
                class,
                max_level: data.world.max_level,
            };
            let exchange = player_attacks_monster(
                player,
                &side,
                monster,
                template,
                &monster_mods,
                now,
                &mut self.rng,
                &self.combat,
            );
            player.last_attack_at = Some(now);

            if let Exchange::Resolved(result) = exchange {
                let leash_range = template.aggro_range * self.tuning.leash_multiplier;
                let level_up =
                    settle_strike(&result, player, monster, leash_range, &mut self.buffs, now);
                out.push(Outbound::All(ServerEvent::Combat(result)));
                out.extend(level_up.map(Outbound::All));
            }
        }
    }

    fn spawn_point(&self) -> Position {
        let p = self.data.world.player_spawn;
        Position::new(p.x, self.data.terrain.height_at(p.x, p.z), p.z)
    }

    fn name_reserved(&self, name: &str, except: SessionId) -> bool {
        self.selecting
            .iter()
            .any(|(id, s)| *id != except && !s.abandoned && s.name.eq_ignore_ascii_case(name))
    }

    fn select(
        &mut self,
        session_id: SessionId,
        name: String,
        class: String,
    ) -> Result<Vec<Outbound>, RejectReason> {
        if self.players.contains(session_id)
            || self.selecting.contains_key(&session_id)
            || self.players.name_in_use(&name)
            || self.name_reserved(&name, session_id)
        {
            return Err(RejectReason::CharacterInUse);
        }

        debug!(session_id, name = %name, "character load queued");
        self.selecting.insert(
            session_id,
            Selection {
                name: name.clone(),
                abandoned: false,
            },
        );
        self.loads.push(LoadRequest {
            session_id,
            name,
            class,
        });
        Ok(Vec::new())
    }

    fn select_failed(&mut self, session_id: SessionId) -> Result<Vec<Outbound>, RejectReason> {
        match self.selecting.remove(&session_id) {
            Some(selection) if !selection.abandoned => Err(RejectReason::StoreUnavailable),
            _ => Ok(Vec::new()),
        }
    }

    fn join(
        &mut self,
        session_id: SessionId,
        name: &str,
        class_name: &str,
        stored: Option<CharacterRecord>,
        inventory: Option<InventoryRecord>,
    ) -> Result<Vec<Outbound>, RejectReason> {
        if let Some(selection) = self.selecting.remove(&session_id) {
            if selection.abandoned {
                debug!(session_id, name = %selection.name, "connection left during load; dropping");
                return Ok(Vec::new());
            }
        }
        if self.players.contains(session_id)
            || self.players.name_in_use(name)
            || self.name_reserved(name, session_id)
        {
            return Err(RejectReason::CharacterInUse);
        }

        let player = match stored {
            Some(record) => {
                let class = self
                    .data
                    .classes
                    .get(&record.class)
                    .ok_or(RejectReason::UnknownClass)?;
                let character = Character::from_record(&record, class);
                let inventory = inventory
                    .map(|r| Inventory::from_stacks(r.items))
                    .unwrap_or_default();
                let position = if record.position.is_finite() {
                    record.position
                } else {
                    self.spawn_point()
                };
                Player::new(session_id, character, position, inventory)
            }
            None => {
                let class = self
                    .data
                    .classes
                    .get(class_name)
                    .ok_or(RejectReason::UnknownClass)?;
                let character = Character::create(name, class_name, class);
                let mut inventory = Inventory::default();
                for item in &class.starting_items {
                    inventory.add(&item.item, item.quantity);
                }
                Player::new(session_id, character, self.spawn_point(), inventory)
            }
        };

        info!(
            session_id,
            name = %player.character.name,
            class = %player.character.class,
            level = player.character.level,
            "player joined"
        );
        let details = CharacterDetails::from(&player);
        self.players.insert(player);
        Ok(vec![Outbound::One(
            session_id,
            ServerEvent::CharacterSelected(details),
        )])
    }

    fn leave(&mut self, session_id: SessionId) -> Vec<Outbound> {
        if let Some(selection) = self.selecting.get_mut(&session_id) {
            selection.abandoned = true;
        }
        let Some(player) = self.players.remove(session_id) else {
            return Vec::new();
        };
        self.buffs.remove_target(EntityRef::Player(session_id));

        let (character, inventory) = player_records(&player);
        self.pending.characters.push(character);
        self.pending.inventories.push(inventory);
        info!(session_id, name = %player.character.name, "player left");
        Vec::new()
    }

    fn move_to(&mut self, session_id: SessionId, target: Position) -> Result<Vec<Outbound>, RejectReason> {
        let player = self
            .players
            .get_mut(session_id)
            .ok_or(RejectReason::NotInWorld)?;
        if player.is_dead() {
            return Err(RejectReason::PlayerDead);
        }
        if !target.is_finite() {
            return Err(RejectReason::InvalidPosition);
        }

        let y = self.data.terrain.height_at(target.x, target.z);
        player.request_move(Position::new(target.x, y, target.z));
        Ok(Vec::new())
    }

    fn attack(&mut self, session_id: SessionId, monster_id: MonsterId) -> Result<Vec<Outbound>, RejectReason> {
        let player = self
            .players
            .get_mut(session_id)
            .ok_or(RejectReason::NotInWorld)?;
        if player.is_dead() {
            return Err(RejectReason::PlayerDead);
        }
        let monster = self
            .monsters
            .get(monster_id)
            .ok_or(RejectReason::TargetNotFound)?;
        if !monster.alive {
            return Err(RejectReason::TargetDead);
        }

        player.engage(monster_id);
        Ok(Vec::new())
    }

    fn stop_attack(&mut self, session_id: SessionId) -> Result<Vec<Outbound>, RejectReason> {
        let player = self
            .players
            .get_mut(session_id)
            .ok_or(RejectReason::NotInWorld)?;
        if player.combat.in_combat {
            player.disengage();
            player.halt();
        }
        Ok(Vec::new())
    }

    fn respawn(&mut self, session_id: SessionId) -> Result<Vec<Outbound>, RejectReason> {
        let at = self.spawn_point();
        let player = self
            .players
            .get_mut(session_id)
            .ok_or(RejectReason::NotInWorld)?;
        if !player.is_dead() {
            return Err(RejectReason::NotDead);
        }

        player.revive(at);
        info!(session_id, "player respawned");
        Ok(vec![Outbound::All(ServerEvent::PlayerRespawn {
            session_id,
            position: player.position,
            health: player.character.health,
            mana: player.character.mana,
        })])
    }

    fn reload(&mut self, data: Arc<GameData>) -> Vec<Outbound> {
        info!(
            monsters = data.monsters.len(),
            skills = data.skills.len(),
            items = data.items.len(),
            classes = data.classes.len(),
            "game data reloaded"
        );
        self.data = data;
        Vec::new()
    }
}

fn player_records(player: &Player) -> (CharacterRecord, InventoryRecord) {
    (
        player.character.to_record(player.position),
        InventoryRecord {
            character: player.character.name.clone(),
            items: player.inventory.stacks().to_vec(),
        },
    )
}

/// Follow-up of a resolved player strike: provoke or clear the monster and
/// report a level-up. Attackers beyond `leash_range` do not provoke, since the
/// monster would give up on them at once.
pub(super) fn settle_strike(
    result: &CombatResult,
    player: &mut Player,
    monster: &mut MonsterInstance,
    leash_range: f32,
    buffs: &mut BuffTracker,
    now: Millis,
) -> Option<ServerEvent> {
    if result.target_died {
        buffs.remove_target(EntityRef::Monster(monster.id));
        if player.combat.target == Some(monster.id) {
            player.disengage();
            player.halt();
        }
        info!(session_id = player.session_id, monster_id = monster.id, "monster killed");
    } else if monster.position.planar_distance(&player.position) <= leash_range {
        monster.provoke(player.session_id, player.position, now);
    }

    let gain = result.experience.filter(|gain| gain.leveled_up())?;
    info!(
        session_id = player.session_id,
        level = gain.new_level,
        "player leveled up"
    );
    Some(ServerEvent::LevelUp {
        session_id: player.session_id,
        level: gain.new_level,
        experience: player.character.experience,
        next_level_exp: required_exp(player.character.level),
        max_health: player.character.max_health,
        max_mana: player.character.max_mana,
    })
}
