// Skill casting and item use.

use super::types::{Outbound, ServerEvent, SkillHit};
use super::world::{World, settle_strike};
use crate::domain::cooldown::cooldown_elapsed;
use crate::domain::systems::combat::{
    Combatant, PlayerSide, apply_player_strike, roll_heal, roll_strike, skill_power,
};
use crate::domain::templates::{ItemKind, SkillEffect, SkillTarget, SkillTemplate};
use crate::domain::{EntityRef, Millis, Player, Position, RejectReason, SessionId};
use std::sync::Arc;
use tracing::debug;

impl World {
    /// Casts a skill. Every check runs before anything is spent.
    pub(super) fn cast_skill(
        &mut self,
        session_id: SessionId,
        skill_id: &str,
        target_id: Option<u64>,
        now: Millis,
    ) -> Result<Vec<Outbound>, RejectReason> {
        let data = Arc::clone(&self.data);
        let caster = self
            .players
            .get(session_id)
            .ok_or(RejectReason::NotInWorld)?;
        let skill = data.skills.get(skill_id).ok_or(RejectReason::UnknownSkill)?;

        if caster.is_dead() {
            return Err(RejectReason::PlayerDead);
        }
        if !caster.character.learned_skills.contains(skill_id) {
            return Err(RejectReason::SkillNotLearned);
        }
        if caster.character.mana < skill.mana_cost {
            return Err(RejectReason::InsufficientMana);
        }
        // Paying the health cost may not kill the caster.
        if skill.health_cost > 0 && caster.character.health <= skill.health_cost {
            return Err(RejectReason::InsufficientHealth);
        }
        let last_cast = caster.skill_casts.get(skill_id).copied();
        if !cooldown_elapsed(last_cast, skill.cooldown_seconds, now) {
            return Err(RejectReason::OnCooldown);
        }
        let targets = self.select_targets(caster, skill, target_id)?;
        let class = data
            .classes
            .get(&caster.character.class)
            .ok_or(RejectReason::UnknownClass)?;

        let Some(caster) = self.players.get_mut(session_id) else {
            return Err(RejectReason::NotInWorld);
        };
        caster.character.mana -= skill.mana_cost;
        caster.character.health -= skill.health_cost;
        caster.skill_casts.insert(skill_id.to_string(), now);

        let mut out = Vec::new();
        let mut hits = Vec::with_capacity(targets.len());
        let caster_ref = EntityRef::Player(session_id);
        let mods = self.buffs.modifiers(caster_ref);

        match &skill.effect {
            SkillEffect::Damage { base, scaling } => {
                for target in &targets {
                    let EntityRef::Monster(monster_id) = *target else {
                        continue;
                    };
                    let Some(monster) = self.monsters.get_mut(monster_id) else {
                        continue;
                    };
                    let Some(template) = data.monsters.get(&monster.template_id) else {
                        continue;
                    };
                    if !monster.alive {
                        continue;
                    }

                    let attacker = Combatant::player(&caster.character, &mods, &self.combat);
                    let defender = Combatant::monster(
                        template,
                        &self.buffs.modifiers(*target),
                        &self.combat,
                    );
                    let power = skill_power(*base, scaling, &caster.character);
                    let strike = roll_strike(&attacker, &defender, power, &mut self.rng, &self.combat);
                    let side = PlayerSide {
                        mods: &mods,
                        class,
                        max_level: data.world.max_level,
                    };
                    let result = apply_player_strike(caster, &side, monster, template, strike, now);
                    let leash_range = template.aggro_range * self.tuning.leash_multiplier;
                    let level_up =
                        settle_strike(&result, caster, monster, leash_range, &mut self.buffs, now);
                    hits.push(SkillHit::Damage(result));
                    out.extend(level_up.map(Outbound::All));
                }
            }
            SkillEffect::Heal { base, scaling } => {
                let healer = Combatant::player(&caster.character, &mods, &self.combat);
                let power = skill_power(*base, scaling, &caster.character);
                for target in &targets {
                    let (amount, critical) = roll_heal(&healer, power, &mut self.rng, &self.combat);
                    match *target {
                        EntityRef::Player(id) => {
                            let Some(player) = self.players.get_mut(id) else {
                                continue;
                            };
                            let restored = player.character.restore_health(amount);
                            hits.push(SkillHit::Heal {
                                target: *target,
                                amount: restored,
                                critical,
                                target_health: player.character.health,
                            });
                        }
                        EntityRef::Monster(id) => {
                            let Some(monster) = self.monsters.get_mut(id) else {
                                continue;
                            };
                            let Some(template) = data.monsters.get(&monster.template_id) else {
                                continue;
                            };
                            let before = monster.health;
                            monster.heal(amount, template.max_health);
                            hits.push(SkillHit::Heal {
                                target: *target,
                                amount: monster.health - before,
                                critical,
                                target_health: monster.health,
                            });
                        }
                    }
                }
            }
            SkillEffect::Buff {
                stat,
                magnitude,
                duration_seconds,
            } => {
                for target in &targets {
                    let buff = self.buffs.apply(
                        skill_id,
                        caster_ref,
                        *target,
                        *stat,
                        *magnitude,
                        *duration_seconds,
                    );
                    hits.push(SkillHit::Buff {
                        target: *target,
                        buff_id: buff.id,
                    });
                    out.push(Outbound::All(ServerEvent::BuffApplied(buff)));
                }
            }
        }

        let (mana, health) = self
            .players
            .get(session_id)
            .map_or((0, 0), |p| (p.character.mana, p.character.health));
        debug!(session_id, skill_id, targets = hits.len(), "skill cast");
        out.insert(
            0,
            Outbound::All(ServerEvent::SkillCast {
                caster: session_id,
                skill_id: skill_id.to_string(),
                mana,
                health,
                hits,
            }),
        );
        Ok(out)
    }

    /// Resolves who a skill lands on, in range order.
    fn select_targets(
        &self,
        caster: &Player,
        skill: &SkillTemplate,
        target_id: Option<u64>,
    ) -> Result<Vec<EntityRef>, RejectReason> {
        match skill.target {
            SkillTarget::Caster => Ok(vec![EntityRef::Player(caster.session_id)]),
            SkillTarget::Ally => match target_id {
                None => Ok(vec![EntityRef::Player(caster.session_id)]),
                Some(id) if id == caster.session_id => Ok(vec![EntityRef::Player(id)]),
                Some(id) => {
                    let ally = self.players.get(id).ok_or(RejectReason::TargetNotFound)?;
                    if ally.is_dead() {
                        return Err(RejectReason::TargetDead);
                    }
                    if caster.position.planar_distance(&ally.position) > skill.range {
                        return Err(RejectReason::OutOfRange);
                    }
                    Ok(vec![EntityRef::Player(id)])
                }
            },
            SkillTarget::Enemy => {
                let id = target_id.ok_or(RejectReason::TargetNotFound)?;
                self.enemy_in_range(caster, skill, id)?;
                Ok(vec![EntityRef::Monster(id)])
            }
            SkillTarget::EnemyArea {
                radius,
                max_targets,
            } => {
                let center = match target_id {
                    Some(id) => self.enemy_in_range(caster, skill, id)?,
                    None => caster.position,
                };
                let mut in_radius: Vec<_> = self
                    .monsters
                    .iter()
                    .filter(|m| m.alive)
                    .map(|m| (m.position.planar_distance(&center), m.id))
                    .filter(|(d, _)| *d <= radius)
                    .collect();
                in_radius.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                if let Some(max) = max_targets {
                    in_radius.truncate(max);
                }
                if in_radius.is_empty() {
                    return Err(RejectReason::NoValidTargets);
                }
                Ok(in_radius
                    .into_iter()
                    .map(|(_, id)| EntityRef::Monster(id))
                    .collect())
            }
        }
    }

    fn enemy_in_range(
        &self,
        caster: &Player,
        skill: &SkillTemplate,
        monster_id: u64,
    ) -> Result<Position, RejectReason> {
        let monster = self
            .monsters
            .get(monster_id)
            .ok_or(RejectReason::TargetNotFound)?;
        if !monster.alive {
            return Err(RejectReason::TargetDead);
        }
        if caster.position.planar_distance(&monster.position) > skill.range {
            return Err(RejectReason::OutOfRange);
        }
        Ok(monster.position)
    }

    /// Uses one unit of a consumable. A second use inside the item's cooldown
    /// is refused.
    pub(super) fn use_item(
        &mut self,
        session_id: SessionId,
        item_id: &str,
        now: Millis,
    ) -> Result<Vec<Outbound>, RejectReason> {
        let data = Arc::clone(&self.data);
        let player = self
            .players
            .get_mut(session_id)
            .ok_or(RejectReason::NotInWorld)?;
        let item = data.items.get(item_id).ok_or(RejectReason::UnknownItem)?;

        if player.is_dead() {
            return Err(RejectReason::PlayerDead);
        }
        if player.inventory.quantity(item_id) == 0 {
            return Err(RejectReason::ItemNotOwned);
        }
        let ItemKind::Consumable {
            heal_health,
            heal_mana,
            cooldown_seconds,
        } = item.kind
        else {
            return Err(RejectReason::ItemNotUsable);
        };
        if !cooldown_elapsed(player.item_uses.get(item_id).copied(), cooldown_seconds, now) {
            return Err(RejectReason::OnCooldown);
        }

        let remaining = player
            .inventory
            .take_one(item_id)
            .ok_or(RejectReason::ItemNotOwned)?;
        player.item_uses.insert(item_id.to_string(), now);
        let health_restored = player.character.restore_health(heal_health);
        let mana_restored = player.character.restore_mana(heal_mana);
        debug!(session_id, item_id, health_restored, mana_restored, "item used");

        Ok(vec![Outbound::One(
            session_id,
            ServerEvent::ItemUsed {
                item_id: item_id.to_string(),
                health_restored,
                mana_restored,
                health: player.character.health,
                mana: player.character.mana,
                remaining,
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AiState;
    use crate::use_cases::monsters::MonsterRegistry;
    use crate::use_cases::test_support::game_data;
    use crate::use_cases::types::GameEvent;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn world_with_player() -> World {
        let data = Arc::new(game_data());
        let mut rng = StdRng::seed_from_u64(3);
        let monsters = MonsterRegistry::spawn_from_areas(&data, &mut rng, 0);
        let mut world = World::new(data, monsters, rng);
        world.handle(
            GameEvent::Join {
                session_id: 1,
                name: "Aria".into(),
                class: "warrior".into(),
                stored: None,
                inventory: None,
            },
            0,
        );
        world
    }

    fn cast(world: &mut World, skill: &str, target_id: Option<u64>, now: Millis) -> Vec<Outbound> {
        world.handle(
            GameEvent::CastSkill {
                session_id: 1,
                skill_id: skill.into(),
                target_id,
            },
            now,
        )
    }

    fn rejection(out: &[Outbound]) -> Option<&'static str> {
        out.iter().find_map(|o| match o {
            Outbound::One(_, ServerEvent::Rejected { reason, .. }) => Some(reason.code()),
            _ => None,
        })
    }

    /// Puts monster `id` next to the player and everything else far away.
    fn line_up(world: &mut World, near: &[(u64, f32)]) {
        let ids: Vec<_> = world.monsters().iter().map(|m| m.id).collect();
        for id in ids {
            let m = world.monsters_mut().get_mut(id).unwrap();
            m.position = Position::new(300.0 + id as f32 * 20.0, 0.0, 300.0);
        }
        for (id, x) in near {
            world.monsters_mut().get_mut(*id).unwrap().position = Position::new(*x, 0.0, 0.0);
        }
    }

    #[test]
    fn when_skill_is_unknown_then_unknown_skill() {
        let mut w = world_with_player();

        assert_eq!(rejection(&cast(&mut w, "meteor", None, 0)), Some("UNKNOWN_SKILL"));
    }

    #[test]
    fn when_skill_is_not_learned_then_rejected_before_resources() {
        let mut w = world_with_player();
        w.players_mut().get_mut(1).unwrap().character.mana = 0;

        assert_eq!(rejection(&cast(&mut w, "fireball", Some(1), 0)), Some("SKILL_NOT_LEARNED"));
    }

    #[test]
    fn when_caster_is_dead_then_player_dead_comes_before_learned_check() {
        let mut w = world_with_player();
        w.players_mut().get_mut(1).unwrap().character.take_damage(u32::MAX);

        assert_eq!(rejection(&cast(&mut w, "fireball", Some(1), 0)), Some("PLAYER_DEAD"));
    }

    #[test]
    fn when_mana_is_short_then_insufficient_mana_and_nothing_spent() {
        let mut w = world_with_player();
        line_up(&mut w, &[(1, 2.0)]);
        w.players_mut().get_mut(1).unwrap().character.mana = 4;

        let out = cast(&mut w, "bash", Some(1), 0);

        assert_eq!(rejection(&out), Some("INSUFFICIENT_MANA"));
        assert_eq!(w.players().get(1).unwrap().character.mana, 4);
        assert_eq!(w.monsters().get(1).unwrap().health, 100);
    }

    #[test]
    fn when_health_cost_would_kill_then_insufficient_health() {
        let mut w = world_with_player();
        line_up(&mut w, &[(1, 2.0)]);
        w.players_mut().get_mut(1).unwrap().character.health = 10;

        assert_eq!(rejection(&cast(&mut w, "cleave", None, 0)), Some("INSUFFICIENT_HEALTH"));
    }

    #[test]
    fn when_enemy_skill_has_no_target_id_then_target_not_found() {
        let mut w = world_with_player();

        assert_eq!(rejection(&cast(&mut w, "bash", None, 0)), Some("TARGET_NOT_FOUND"));
    }

    #[test]
    fn when_enemy_is_beyond_skill_range_then_out_of_range_and_no_cost() {
        let mut w = world_with_player();
        line_up(&mut w, &[(1, 5.0)]);
        let mana = w.players().get(1).unwrap().character.mana;

        let out = cast(&mut w, "bash", Some(1), 0);

        assert_eq!(rejection(&out), Some("OUT_OF_RANGE"));
        assert_eq!(w.players().get(1).unwrap().character.mana, mana);
        assert!(w.players().get(1).unwrap().skill_casts.is_empty());
    }

    #[test]
    fn when_skill_is_cast_twice_inside_cooldown_then_second_is_on_cooldown() {
        let mut w = world_with_player();
        line_up(&mut w, &[(1, 2.0)]);

        let first = cast(&mut w, "bash", Some(1), 1_000);
        let second = cast(&mut w, "bash", Some(1), 3_000);

        assert!(rejection(&first).is_none());
        assert_eq!(rejection(&second), Some("ON_COOLDOWN"));
        let p = w.players().get(1).unwrap();
        assert_eq!(p.character.mana, p.character.max_mana - 5);
    }

    #[test]
    fn when_monster_is_shot_from_beyond_leash_range_then_it_does_not_heal_back() {
        let mut w = world_with_player();
        line_up(&mut w, &[(1, 15.0)]);
        let p = w.players_mut().get_mut(1).unwrap();
        p.character.learned_skills.insert("aimed_shot".into());

        for round in 0..4u64 {
            let now = 1_000 + round * 2_000;
            w.monsters_mut().get_mut(1).unwrap().health = 100;
            let out = cast(&mut w, "aimed_shot", Some(1), now);
            assert!(rejection(&out).is_none(), "cast {round} rejected: {out:?}");
            let after_hit = w.monsters().get(1).unwrap().health;

            w.tick(0.05, now + 50);

            let wolf = w.monsters().get(1).unwrap();
            assert!(wolf.health <= after_hit, "wolf healed {after_hit} -> {}", wolf.health);
            assert_ne!(wolf.state, AiState::Combat);
        }
    }

    #[test]
    fn when_monster_is_hit_inside_leash_range_then_it_turns_on_the_caster() {
        let mut w = world_with_player();
        line_up(&mut w, &[(1, 10.0)]);
        let p = w.players_mut().get_mut(1).unwrap();
        p.character.learned_skills.insert("aimed_shot".into());

        let out = cast(&mut w, "aimed_shot", Some(1), 1_000);

        assert!(rejection(&out).is_none());
        let wolf = w.monsters().get(1).unwrap();
        assert_eq!(wolf.state, AiState::Combat);
        assert_eq!(wolf.target, Some(1));
    }

    #[test]
    fn when_area_skill_hits_then_nearest_targets_up_to_cap_are_chosen() {
        let mut w = world_with_player();
        line_up(&mut w, &[(1, 4.0), (2, 1.0), (3, 2.0)]);

        let out = cast(&mut w, "cleave", None, 0);

        let Some(Outbound::All(ServerEvent::SkillCast { hits, health, .. })) = out.first() else {
            panic!("expected skill cast first, got {out:?}");
        };
        let targets: Vec<_> = hits
            .iter()
            .map(|h| match h {
                SkillHit::Damage(r) => r.target,
                other => panic!("unexpected hit {other:?}"),
            })
            .collect();
        assert_eq!(targets, vec![EntityRef::Monster(2), EntityRef::Monster(3)]);
        let max = w.players().get(1).unwrap().character.max_health;
        assert_eq!(*health, max - 10);
    }

    #[test]
    fn when_area_has_no_monsters_then_no_valid_targets() {
        let mut w = world_with_player();
        line_up(&mut w, &[]);

        assert_eq!(rejection(&cast(&mut w, "cleave", None, 0)), Some("NO_VALID_TARGETS"));
    }

    #[test]
    fn when_caster_buffs_self_then_buff_is_tracked_and_announced() {
        let mut w = world_with_player();

        let out = cast(&mut w, "war_cry", None, 0);

        assert!(out.iter().any(|o| matches!(
            o,
            Outbound::All(ServerEvent::BuffApplied(b)) if b.target == EntityRef::Player(1)
        )));
        assert_eq!(w.buffs().modifiers(EntityRef::Player(1)).attack, 10.0);
    }

    #[test]
    fn when_ally_heal_targets_self_then_health_is_restored_up_to_max() {
        let mut w = world_with_player();
        w.players_mut().get_mut(1).unwrap().character.health = 10;

        let out = cast(&mut w, "second_wind", None, 0);

        let p = w.players().get(1).unwrap();
        assert!(p.character.health > 10);
        assert!(p.character.health <= p.character.max_health);
        assert!(matches!(out.first(), Some(Outbound::All(ServerEvent::SkillCast { .. }))));
    }

    #[test]
    fn when_potion_is_used_twice_inside_cooldown_then_second_is_rejected_and_heal_applies_once() {
        let mut w = world_with_player();
        w.players_mut().get_mut(1).unwrap().character.health = 20;
        let use_potion = |w: &mut World, now| {
            w.handle(
                GameEvent::UseItem {
                    session_id: 1,
                    item_id: "potion".into(),
                },
                now,
            )
        };

        let first = use_potion(&mut w, 1_000);
        let second = use_potion(&mut w, 1_010);

        assert!(rejection(&first).is_none());
        assert_eq!(rejection(&second), Some("ON_COOLDOWN"));
        let p = w.players().get(1).unwrap();
        assert_eq!(p.character.health, 70);
        assert_eq!(p.inventory.quantity("potion"), 2);
    }

    #[test]
    fn when_item_is_material_then_not_usable() {
        let mut w = world_with_player();

        let out = w.handle(
            GameEvent::UseItem {
                session_id: 1,
                item_id: "herb".into(),
            },
            0,
        );

        assert_eq!(rejection(&out), Some("ITEM_NOT_USABLE"));
    }

    #[test]
    fn when_item_is_not_held_then_not_owned() {
        let mut w = world_with_player();
        w.players_mut().get_mut(1).unwrap().inventory = Default::default();

        let out = w.handle(
            GameEvent::UseItem {
                session_id: 1,
                item_id: "potion".into(),
            },
            0,
        );

        assert_eq!(rejection(&out), Some("ITEM_NOT_OWNED"));
    }
}
