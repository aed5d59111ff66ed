// Connected players keyed by session id.

use crate::domain::ports::TerrainQuery;
use crate::domain::systems::BuffTracker;
use crate::domain::systems::monster_ai::PlayerView;
use crate::domain::systems::movement;
use crate::domain::{EntityRef, Player, SessionId};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: BTreeMap<SessionId, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, player: Player) {
        self.players.insert(player.session_id, player);
    }

    pub fn remove(&mut self, session_id: SessionId) -> Option<Player> {
        self.players.remove(&session_id)
    }

    pub fn get(&self, session_id: SessionId) -> Option<&Player> {
        self.players.get(&session_id)
    }

    pub fn get_mut(&mut self, session_id: SessionId) -> Option<&mut Player> {
        self.players.get_mut(&session_id)
    }

    pub fn contains(&self, session_id: SessionId) -> bool {
        self.players.contains_key(&session_id)
    }

    /// Character names are unique across the world; lookup is case-insensitive.
    pub fn name_in_use(&self, name: &str) -> bool {
        self.players
            .values()
            .any(|p| p.character.name.eq_ignore_ascii_case(name))
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.players.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// What monsters can see of every player this tick.
    pub fn views(&self) -> Vec<PlayerView> {
        self.players
            .values()
            .map(|p| PlayerView {
                session_id: p.session_id,
                position: p.position,
                alive: !p.is_dead(),
            })
            .collect()
    }

    /// Advances every moving player, including buffed move speed.
    pub fn tick_movement(
        &mut self,
        dt: f32,
        buffs: &BuffTracker,
        terrain: &dyn TerrainQuery,
        stop_distance: f32,
    ) {
        for player in self.players.values_mut() {
            let bonus = buffs.modifiers(EntityRef::Player(player.session_id)).move_speed;
            let speed = player.character.move_speed + bonus;
            movement::tick_player(player, speed, dt, stop_distance, terrain);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::buff::Stat;
    use crate::domain::character::Character;
    use crate::domain::character::tests::warrior;
    use crate::domain::inventory::Inventory;
    use crate::domain::position::Position;
    use crate::domain::terrain::FlatTerrain;

    fn player(session_id: SessionId, name: &str) -> Player {
        let c = Character::create(name, "warrior", &warrior());
        Player::new(session_id, c, Position::default(), Inventory::default())
    }

    #[test]
    fn when_name_differs_only_by_case_then_it_is_in_use() {
        let mut registry = PlayerRegistry::new();
        registry.insert(player(1, "Aria"));

        assert!(registry.name_in_use("aria"));
        assert!(!registry.name_in_use("Bryn"));
    }

    #[test]
    fn when_player_has_move_speed_buff_then_it_moves_faster() {
        let mut registry = PlayerRegistry::new();
        registry.insert(player(1, "Aria"));
        registry
            .get_mut(1)
            .unwrap()
            .request_move(Position::new(100.0, 0.0, 0.0));
        let mut buffs = BuffTracker::new();
        buffs.apply("haste", EntityRef::Player(1), EntityRef::Player(1), Stat::MoveSpeed, 5.0, 10.0);

        registry.tick_movement(1.0, &buffs, &FlatTerrain::default(), 0.1);

        assert_eq!(registry.get(1).unwrap().position.x, 10.0);
    }

    #[test]
    fn when_player_is_removed_then_lookup_misses() {
        let mut registry = PlayerRegistry::new();
        registry.insert(player(1, "Aria"));

        assert!(registry.remove(1).is_some());
        assert!(registry.get(1).is_none());
        assert!(registry.is_empty());
    }
}
