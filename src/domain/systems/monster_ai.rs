// Monster AI: patrol, aggro, leash and respawn transitions for one monster.
//
// Attacks are only decided here; the caller resolves the exchange against the
// live player so a kill is visible to every monster updated after it.

use crate::domain::combat::SessionId;
use crate::domain::cooldown::{Millis, cooldown_elapsed};
use crate::domain::monster::{AiState, MonsterInstance};
use crate::domain::ports::TerrainQuery;
use crate::domain::position::Position;
use crate::domain::spawn::{SpawnArea, random_point_in_circle};
use crate::domain::systems::movement::advance;
use crate::domain::templates::{MonsterTemplate, PatrolBehavior};
use crate::domain::tuning::{CombatTuning, WorldTuning};
use rand::Rng;

/// Slope limit for wander points of monsters without a spawn area.
const DEFAULT_MAX_SLOPE: f32 = 35.0;
const WANDER_ATTEMPTS: usize = 10;

/// What the AI sees of a player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerView {
    pub session_id: SessionId,
    pub position: Position,
    pub alive: bool,
}

/// Read-only inputs for one monster's update.
pub struct AiContext<'a> {
    pub template: &'a MonsterTemplate,
    pub area: Option<&'a SpawnArea>,
    pub terrain: &'a dyn TerrainQuery,
    pub world: &'a WorldTuning,
    pub combat: &'a CombatTuning,
    /// Buff adjustments to move speed and attack speed.
    pub move_speed_bonus: f32,
    pub attack_speed_bonus: f32,
    pub now: Millis,
    pub dt: f32,
}

/// Transitions taken during one update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiOutcome {
    pub aggro: Option<SessionId>,
    /// Health restored when the chase was abandoned.
    pub leashed: Option<u32>,
    /// The monster swings at this player this tick.
    pub attack: Option<SessionId>,
    pub respawned: bool,
}

pub fn update(
    monster: &mut MonsterInstance,
    ctx: &AiContext<'_>,
    players: &[PlayerView],
    rng: &mut impl Rng,
) -> AiOutcome {
    let mut outcome = AiOutcome::default();

    if !monster.alive {
        if monster.respawn_at.is_some_and(|at| ctx.now >= at) {
            let position = respawn_point(monster, ctx, rng);
            outcome.respawned = monster.respawn(ctx.template, position, ctx.now);
            monster.idle_until = ctx.now + idle_duration(ctx.world, rng);
        }
        return outcome;
    }

    if monster.state != AiState::Combat {
        if let Some(target) = nearest_in_range(monster, players, ctx.template.aggro_range) {
            monster.state = AiState::Combat;
            monster.target = Some(target.session_id);
            monster.destination = None;
            monster.chase_point = Some(target.position);
            monster.chase_refreshed_at = ctx.now;
            outcome.aggro = Some(target.session_id);
        }
    }

    match monster.state {
        AiState::Combat => combat(monster, ctx, players, &mut outcome),
        AiState::Idle => {
            if ctx.now >= monster.idle_until {
                let destination = patrol_destination(monster, ctx, rng);
                start_moving(monster, destination, ctx.now);
            }
        }
        AiState::Moving => patrol_move(monster, ctx, rng),
        AiState::Dead => {}
    }
    outcome
}

fn combat(
    monster: &mut MonsterInstance,
    ctx: &AiContext<'_>,
    players: &[PlayerView],
    outcome: &mut AiOutcome,
) {
    let leash_range = ctx.template.aggro_range * ctx.world.leash_multiplier;
    let target = monster
        .target
        .and_then(|id| players.iter().find(|p| p.session_id == id))
        .filter(|p| p.alive && monster.position.planar_distance(&p.position) <= leash_range)
        .copied();

    let Some(target) = target else {
        outcome.leashed = Some(leash(monster, ctx));
        return;
    };

    let distance = monster.position.planar_distance(&target.position);
    if distance <= ctx.combat.attack_range {
        let cooldown = (ctx.template.attack_speed + ctx.attack_speed_bonus).max(0.0);
        if cooldown_elapsed(monster.last_attack_at, cooldown, ctx.now) {
            monster.last_attack_at = Some(ctx.now);
            outcome.attack = Some(target.session_id);
        }
        return;
    }

    if monster.chase_point.is_none()
        || ctx.now.saturating_sub(monster.chase_refreshed_at) >= ctx.world.chase_refresh_ms
    {
        monster.chase_point = Some(target.position);
        monster.chase_refreshed_at = ctx.now;
    }
    if let Some(point) = monster.chase_point {
        let speed = ctx.template.move_speed + ctx.move_speed_bonus;
        advance(&mut monster.position, &point, speed, ctx.dt, ctx.terrain);
    }
}

/// Gives up the chase: heal a share of max health and walk home.
fn leash(monster: &mut MonsterInstance, ctx: &AiContext<'_>) -> u32 {
    let max = ctx.template.max_health;
    let before = monster.health;
    let amount = (max as f32 * ctx.world.leash_heal_fraction).round() as u32;
    monster.heal(amount, max);

    monster.target = None;
    monster.chase_point = None;
    let center = ctx.area.map_or(monster.home, |a| a.center);
    let home = Position::new(center.x, ctx.terrain.height_at(center.x, center.z), center.z);
    start_moving(monster, home, ctx.now);
    monster.health - before
}

fn patrol_move(monster: &mut MonsterInstance, ctx: &AiContext<'_>, rng: &mut impl Rng) {
    let Some(destination) = monster.destination else {
        go_idle(monster, ctx, rng);
        return;
    };

    let speed = ctx.template.move_speed + ctx.move_speed_bonus;
    advance(&mut monster.position, &destination, speed, ctx.dt, ctx.terrain);

    if monster.position.planar_distance(&destination) < ctx.world.monster_arrive_distance {
        go_idle(monster, ctx, rng);
    } else if ctx.now.saturating_sub(monster.moving_since) >= ctx.world.move_timeout_ms {
        let destination = patrol_destination(monster, ctx, rng);
        start_moving(monster, destination, ctx.now);
    }
}

fn go_idle(monster: &mut MonsterInstance, ctx: &AiContext<'_>, rng: &mut impl Rng) {
    monster.state = AiState::Idle;
    monster.destination = None;
    monster.idle_until = ctx.now + idle_duration(ctx.world, rng);
}

fn start_moving(monster: &mut MonsterInstance, destination: Position, now: Millis) {
    monster.state = AiState::Moving;
    monster.destination = Some(destination);
    monster.moving_since = now;
}

fn idle_duration(world: &WorldTuning, rng: &mut impl Rng) -> Millis {
    if world.idle_max_ms <= world.idle_min_ms {
        return world.idle_min_ms;
    }
    rng.random_range(world.idle_min_ms..=world.idle_max_ms)
}

fn nearest_in_range(
    monster: &MonsterInstance,
    players: &[PlayerView],
    range: f32,
) -> Option<PlayerView> {
    players
        .iter()
        .filter(|p| p.alive)
        .map(|p| (monster.position.planar_distance(&p.position), p))
        .filter(|(d, _)| *d <= range)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, p)| *p)
}

/// Next patrol point for the template's behavior.
pub fn patrol_destination(
    monster: &mut MonsterInstance,
    ctx: &AiContext<'_>,
    rng: &mut impl Rng,
) -> Position {
    let home = monster.home;
    let (x, z) = match ctx.template.patrol {
        PatrolBehavior::Stationary => (home.x, home.z),
        PatrolBehavior::Wander { radius } => {
            let max_slope = ctx.area.map_or(DEFAULT_MAX_SLOPE, |a| a.max_slope);
            (0..WANDER_ATTEMPTS)
                .map(|_| random_point_in_circle(home.x, home.z, radius, rng))
                .find(|(x, z)| ctx.terrain.is_valid_spawn(*x, *z, max_slope))
                .unwrap_or((home.x, home.z))
        }
        PatrolBehavior::Patrol { distance } => {
            let offsets = [(distance, 0.0), (0.0, distance), (-distance, 0.0), (0.0, -distance)];
            let (dx, dz) = offsets[monster.patrol_index % offsets.len()];
            monster.patrol_index = monster.patrol_index.wrapping_add(1);
            (home.x + dx, home.z + dz)
        }
    };
    Position::new(x, ctx.terrain.height_at(x, z), z)
}

fn respawn_point(monster: &MonsterInstance, ctx: &AiContext<'_>, rng: &mut impl Rng) -> Position {
    match ctx.area {
        Some(area) => area.random_point(rng, ctx.terrain),
        None => {
            let home = monster.home;
            Position::new(home.x, ctx.terrain.height_at(home.x, home.z), home.z)
        }
    }
}
