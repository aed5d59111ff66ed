use crate::domain::player::Player;
use crate::domain::ports::TerrainQuery;
use crate::domain::position::Position;

/// Moves `position` toward `target` at `speed` for `dt` seconds and drops it
/// onto the terrain. Returns true when the target was reached.
pub fn advance(
    position: &mut Position,
    target: &Position,
    speed: f32,
    dt: f32,
    terrain: &dyn TerrainQuery,
) -> bool {
    let arrived = position.step_towards(target, speed.max(0.0) * dt);
    position.y = terrain.height_at(position.x, position.z);
    arrived
}

/// Advances one player toward its movement target.
///
/// Within `stop_distance` the player snaps onto the destination and stops.
/// The destination survives arrival only while the player is in combat, since
/// the auto-attack step keeps re-targeting it at the monster.
pub fn tick_player(
    player: &mut Player,
    speed: f32,
    dt: f32,
    stop_distance: f32,
    terrain: &dyn TerrainQuery,
) {
    if player.is_dead() || !player.movement.moving {
        return;
    }
    let Some(target) = player.movement.target else {
        player.movement.moving = false;
        return;
    };

    if player.position.planar_distance(&target) < stop_distance
        || advance(&mut player.position, &target, speed, dt, terrain)
    {
        player.position.x = target.x;
        player.position.z = target.z;
        player.position.y = terrain.height_at(target.x, target.z);
        player.movement.moving = false;
        if !player.combat.in_combat {
            player.movement.target = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::character::Character;
    use crate::domain::character::tests::warrior;
    use crate::domain::inventory::Inventory;
    use crate::domain::terrain::FlatTerrain;

    struct Ramp;

    impl TerrainQuery for Ramp {
        fn height_at(&self, x: f32, _z: f32) -> f32 {
            x * 0.5
        }

        fn slope_at(&self, _x: f32, _z: f32) -> f32 {
            26.6
        }
    }

    fn player_at(x: f32, z: f32) -> Player {
        let c = Character::create("Aria", "warrior", &warrior());
        Player::new(1, c, Position::new(x, 0.0, z), Inventory::default())
    }

    #[test]
    fn when_target_is_far_then_player_advances_speed_times_dt_and_follows_terrain() {
        let mut p = player_at(0.0, 0.0);
        p.request_move(Position::new(10.0, 0.0, 0.0));

        tick_player(&mut p, 5.0, 0.5, 0.1, &Ramp);

        assert!((p.position.x - 2.5).abs() < 1e-5);
        assert!((p.position.y - 1.25).abs() < 1e-5);
        assert!(p.movement.moving);
    }

    #[test]
    fn when_within_stop_distance_then_player_snaps_and_clears_destination() {
        let mut p = player_at(0.0, 0.0);
        p.request_move(Position::new(0.05, 0.0, 0.0));

        tick_player(&mut p, 5.0, 0.05, 0.1, &FlatTerrain::default());

        assert_eq!(p.position.x, 0.05);
        assert!(!p.movement.moving);
        assert!(p.movement.target.is_none());
    }

    #[test]
    fn when_in_combat_on_arrival_then_destination_is_kept() {
        let mut p = player_at(0.0, 0.0);
        p.movement.target = Some(Position::new(0.2, 0.0, 0.0));
        p.movement.moving = true;
        p.engage(9);

        tick_player(&mut p, 5.0, 0.05, 0.1, &FlatTerrain::default());

        assert!(!p.movement.moving);
        assert_eq!(p.movement.target, Some(Position::new(0.2, 0.0, 0.0)));
    }

    #[test]
    fn when_step_would_overshoot_then_player_stops_on_target() {
        let mut p = player_at(0.0, 0.0);
        p.request_move(Position::new(1.0, 0.0, 0.0));

        tick_player(&mut p, 100.0, 1.0, 0.1, &FlatTerrain::default());

        assert_eq!(p.position.x, 1.0);
        assert!(!p.movement.moving);
    }
}
