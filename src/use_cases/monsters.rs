// Monster instances keyed by id, plus the per-tick AI driver.

use super::players::PlayerRegistry;
use super::types::{MonsterSnapshot, Outbound, ServerEvent};
use crate::domain::systems::BuffTracker;
use crate::domain::systems::combat::monster_attacks_player;
use crate::domain::systems::monster_ai::{self, AiContext};
use crate::domain::tuning::{CombatTuning, WorldTuning};
use crate::domain::{
    EntityError, EntityRef, Exchange, GameData, Millis, MonsterId, MonsterInstance, MonsterRecord,
};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Shared inputs for one monster pass.
pub struct MonsterStep<'a> {
    pub data: &'a GameData,
    pub world: &'a WorldTuning,
    pub combat: &'a CombatTuning,
    pub now: Millis,
    pub dt: f32,
}

#[derive(Debug, Default)]
pub struct MonsterRegistry {
    monsters: BTreeMap<MonsterId, MonsterInstance>,
    next_id: MonsterId,
    // Monsters already reported as missing a template; logged once each.
    degraded: BTreeSet<MonsterId>,
}

impl MonsterRegistry {
    pub fn new() -> Self {
        Self {
            monsters: BTreeMap::new(),
            next_id: 1,
            degraded: BTreeSet::new(),
        }
    }

    /// Populates every spawn area from its population entries.
    pub fn spawn_from_areas(data: &GameData, rng: &mut impl Rng, now: Millis) -> Self {
        let mut registry = Self::new();
        let mut areas: Vec<_> = data.spawn_areas.iter().collect();
        areas.sort_by(|a, b| a.id.cmp(&b.id));

        for area in areas {
            for entry in &area.populations {
                let Some(template) = data.monsters.get(&entry.monster) else {
                    warn!(area = %area.id, monster = %entry.monster, "spawn entry has no template");
                    continue;
                };
                let respawn_seconds = entry.respawn_seconds.unwrap_or(template.respawn_seconds);
                for _ in 0..entry.count {
                    let position = area.random_point(rng, data.terrain.as_ref());
                    let id = registry.allocate_id();
                    registry.monsters.insert(
                        id,
                        MonsterInstance::spawn(
                            id,
                            template,
                            position,
                            Some(area.id.clone()),
                            respawn_seconds,
                            now,
                        ),
                    );
                }
            }
        }
        info!(count = registry.len(), "monsters spawned from areas");
        registry
    }

    /// Rebuilds monsters from stored records. Records naming an unknown
    /// template are dropped.
    pub fn restore(records: &[MonsterRecord], data: &GameData, now: Millis) -> Self {
        let mut registry = Self::new();
        for record in records {
            let Some(template) = data.monsters.get(&record.template_id) else {
                warn!(
                    monster_id = record.id,
                    template_id = %record.template_id,
                    "stored monster has no template; skipping"
                );
                continue;
            };
            registry
                .monsters
                .insert(record.id, MonsterInstance::from_record(record, template, now));
            registry.next_id = registry.next_id.max(record.id.saturating_add(1));
        }
        info!(count = registry.len(), "monsters restored from storage");
        registry
    }

    fn allocate_id(&mut self) -> MonsterId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    pub fn get(&self, id: MonsterId) -> Option<&MonsterInstance> {
        self.monsters.get(&id)
    }

    pub fn get_mut(&mut self, id: MonsterId) -> Option<&mut MonsterInstance> {
        self.monsters.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MonsterInstance> {
        self.monsters.values()
    }

    pub fn len(&self) -> usize {
        self.monsters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monsters.is_empty()
    }

    pub fn records(&self, now: Millis) -> Vec<MonsterRecord> {
        self.monsters.values().map(|m| m.to_record(now)).collect()
    }

    pub fn snapshots(&self, data: &GameData) -> Vec<MonsterSnapshot> {
        self.monsters
            .values()
            .map(|m| MonsterSnapshot::new(m, data.monsters.get(&m.template_id)))
            .collect()
    }

    /// Runs AI, monster attacks and respawns for every monster.
    ///
    /// A monster whose template is gone is skipped; the rest of the pass is
    /// unaffected. Respawned monsters are returned for persistence.
    pub fn tick(
        &mut self,
        step: &MonsterStep<'_>,
        players: &mut PlayerRegistry,
        buffs: &mut BuffTracker,
        rng: &mut impl Rng,
        out: &mut Vec<Outbound>,
    ) -> Vec<MonsterRecord> {
        let mut views = players.views();
        let mut respawned = Vec::new();

        for monster in self.monsters.values_mut() {
            let Some(template) = step.data.monsters.get(&monster.template_id) else {
                if self.degraded.insert(monster.id) {
                    let err = EntityError::TemplateMissing(monster.template_id.clone());
                    warn!(monster_id = monster.id, error = %err, "skipping monster update");
                }
                continue;
            };
            self.degraded.remove(&monster.id);

            let me = EntityRef::Monster(monster.id);
            let mods = buffs.modifiers(me);
            let area = monster
                .spawn_area
                .as_deref()
                .and_then(|id| step.data.spawn_areas.get(id));
            let ctx = AiContext {
                template,
                area,
                terrain: step.data.terrain.as_ref(),
                world: step.world,
                combat: step.combat,
                move_speed_bonus: mods.move_speed,
                attack_speed_bonus: mods.attack_speed,
                now: step.now,
                dt: step.dt,
            };

            let outcome = monster_ai::update(monster, &ctx, &views, rng);

            if let Some(session_id) = outcome.aggro {
                debug!(monster_id = monster.id, session_id, "monster aggro");
            }
            if let Some(healed) = outcome.leashed {
                debug!(monster_id = monster.id, healed, "monster leashed");
            }
            if outcome.respawned {
                debug!(monster_id = monster.id, "monster respawned");
                out.push(Outbound::All(ServerEvent::MonsterRespawn(MonsterSnapshot::new(
                    monster,
                    Some(template),
                ))));
                respawned.push(monster.to_record(step.now));
            }

            let Some(session_id) = outcome.attack else {
                continue;
            };
            let Some(player) = players.get_mut(session_id) else {
                continue;
            };
            if player.is_dead() {
                continue;
            }
            let player_mods = buffs.modifiers(EntityRef::Player(session_id));
            let exchange =
                monster_attacks_player(monster, template, &mods, player, &player_mods, rng, step.combat);
            let Exchange::Resolved(result) = exchange else {
                continue;
            };

            let died = result.target_died;
            out.push(Outbound::All(ServerEvent::Combat(result)));
            if died {
                info!(session_id, monster_id = monster.id, "player killed");
                if let Some(view) = views.iter_mut().find(|v| v.session_id == session_id) {
                    view.alive = false;
                }
                out.push(Outbound::All(ServerEvent::PlayerDeath {
                    session_id,
                    killer: Some(me),
                }));
            }
        }

        respawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::character::Character;
    use crate::domain::inventory::Inventory;
    use crate::domain::{AiState, Player, Position};
    use crate::use_cases::test_support::game_data;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn step<'a>(data: &'a GameData, world: &'a WorldTuning, combat: &'a CombatTuning, now: Millis) -> MonsterStep<'a> {
        MonsterStep {
            data,
            world,
            combat,
            now,
            dt: 0.05,
        }
    }

    #[test]
    fn when_areas_are_populated_then_each_entry_spawns_count_monsters_inside() {
        let data = game_data();
        let mut rng = StdRng::seed_from_u64(5);

        let registry = MonsterRegistry::spawn_from_areas(&data, &mut rng, 0);

        assert_eq!(registry.len(), 4);
        let area = data.spawn_areas.get("forest").unwrap();
        for m in registry.iter() {
            assert!(m.position.planar_distance(&area.center) <= 10.0 + 1e-3);
            assert_eq!(m.health, 100);
        }
        let ids: Vec<_> = registry.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn when_restoring_unknown_template_then_only_that_record_is_dropped() {
        let data = game_data();
        let mut rng = StdRng::seed_from_u64(5);
        let spawned = MonsterRegistry::spawn_from_areas(&data, &mut rng, 0);
        let mut records = spawned.records(0);
        records[0].template_id = "dragon".to_string();

        let restored = MonsterRegistry::restore(&records, &data, 0);

        assert_eq!(restored.len(), 3);
        assert!(restored.get(records[0].id).is_none());
    }

    #[test]
    fn when_template_vanishes_at_runtime_then_other_monsters_still_update() {
        let data = game_data();
        let mut rng = StdRng::seed_from_u64(5);
        let mut registry = MonsterRegistry::spawn_from_areas(&data, &mut rng, 0);
        registry.get_mut(1).unwrap().template_id = "ghost".to_string();
        for m in registry.monsters.values_mut() {
            m.position = Position::new(20.0, 0.0, 20.0);
        }
        let mut players = PlayerRegistry::new();
        let c = Character::create("Aria", "warrior", &data.classes["warrior"]);
        players.insert(Player::new(9, c, Position::new(23.0, 0.0, 20.0), Inventory::default()));
        let (world, combat) = (WorldTuning::default(), CombatTuning::default());
        let mut out = Vec::new();

        registry.tick(&step(&data, &world, &combat, 1_000), &mut players, &mut BuffTracker::new(), &mut rng, &mut out);

        assert_eq!(registry.get(1).unwrap().state, AiState::Idle);
        for id in 2..=4 {
            assert_eq!(registry.get(id).unwrap().target, Some(9));
        }
    }

    #[test]
    fn when_dead_monster_is_due_then_respawn_is_broadcast_and_returned_for_saving() {
        let data = game_data();
        let mut rng = StdRng::seed_from_u64(5);
        let mut registry = MonsterRegistry::spawn_from_areas(&data, &mut rng, 0);
        registry.get_mut(2).unwrap().die(0);
        let (world, combat) = (WorldTuning::default(), CombatTuning::default());
        let mut out = Vec::new();

        let saved = registry.tick(
            &step(&data, &world, &combat, 60_000),
            &mut PlayerRegistry::new(),
            &mut BuffTracker::new(),
            &mut rng,
            &mut out,
        );

        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, 2);
        assert!(saved[0].alive);
        assert!(out.iter().any(|o| matches!(
            o,
            Outbound::All(ServerEvent::MonsterRespawn(s)) if s.id == 2 && s.health == 100
        )));
    }
}
