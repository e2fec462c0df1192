//! Think and act dispatch shared by the behavior ladders.
//!
//! `think` runs on the scheduler's cadence and picks the state; `act` runs
//! every heartbeat and turns the current state into movement.

use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use mobsim_world::{BlockSource, ChunkPos};
use rand::rngs::StdRng;
use rand::Rng;

use crate::actor::CombatSink;
use crate::ai::brain::BrainState;
use crate::ai::footprint::probe_footprint;
use crate::ai::movement::{
    drop_ahead, emergency_step_down, face_point, face_yaw, move_respecting_voxels, settle, MoveIntent,
};
use crate::ai::navigator::Navigator;
use crate::ai::spatial::{flat, horizontal_distance, ActorIndex};
use crate::ai::{hostile, passive};
use crate::config::{AiConfig, MovementConfig};
use crate::game_world::GameEvent;
use crate::mob::Mob;
use crate::mob_registry::MobCategory;

/// Wander targets count as reached inside this horizontal distance.
pub(crate) const WANDER_ARRIVE_DISTANCE: f32 = 0.75;

const WANDER_ATTEMPTS: usize = 6;

/// Everything a think step may read or emit.
pub struct ThinkContext<'a> {
    pub world: &'a dyn BlockSource,
    pub actors: &'a ActorIndex<'a>,
    pub config: &'a AiConfig,
    pub now: f64,
    pub rng: &'a mut StdRng,
    pub events: &'a mut Vec<GameEvent>,
    pub combat: &'a mut dyn CombatSink,
}

/// Re-ground, then run the ladder for the mob's category.
pub fn think(mob: &mut Mob, ctx: &mut ThinkContext) {
    settle(mob, ctx.world);
    match mob.category() {
        MobCategory::Passive => passive::think(mob, ctx),
        MobCategory::Hostile => hostile::think(mob, ctx),
        MobCategory::Stationary => {}
    }
}

/// Idle, graze and wander: the bottom of every mobile ladder.
pub(crate) fn roam(mob: &mut Mob, ctx: &mut ThinkContext, nav: &Navigator, can_graze: bool) {
    let now = ctx.now;
    match mob.brain.state {
        BrainState::Idle {
            until,
            next_look_at,
            ..
        } if now < until => {
            if now >= next_look_at {
                let (look_yaw, next_look_at) = next_look(ctx);
                mob.brain.state = BrainState::Idle {
                    until,
                    look_yaw,
                    next_look_at,
                };
            }
            return;
        }
        BrainState::Graze {
            until,
            next_look_at,
            ..
        } if now < until => {
            if now >= next_look_at {
                let (look_yaw, next_look_at) = next_look(ctx);
                mob.brain.state = BrainState::Graze {
                    until,
                    look_yaw,
                    next_look_at,
                };
            }
            return;
        }
        BrainState::Wander { target, give_up_at } => {
            let arrived = horizontal_distance(mob.position, target) <= WANDER_ARRIVE_DISTANCE;
            if !arrived {
                if now < give_up_at && mob.nav.is_following() {
                    return;
                }
                // blocked, stuck or timed out: rest before trying elsewhere
                mob.nav.clear();
                rest(mob, ctx, 1.0, 3.0);
                return;
            }
        }
        _ => {}
    }
    choose_next(mob, ctx, nav, can_graze);
}

/// A fresh look direction and when to pick the one after it.
fn next_look(ctx: &mut ThinkContext) -> (f32, f64) {
    let yaw = ctx.rng.gen_range(0.0..360.0);
    (yaw, ctx.now + ctx.rng.gen_range(1.5..4.0))
}

fn rest(mob: &mut Mob, ctx: &mut ThinkContext, min: f64, max: f64) {
    let now = ctx.now;
    mob.brain.state = BrainState::Idle {
        until: now + ctx.rng.gen_range(min..max),
        look_yaw: mob.yaw,
        next_look_at: now + ctx.rng.gen_range(1.0..3.0),
    };
}

fn choose_next(mob: &mut Mob, ctx: &mut ThinkContext, nav: &Navigator, can_graze: bool) {
    let now = ctx.now;
    let roll: f32 = ctx.rng.gen();
    if roll < 0.4 {
        rest(mob, ctx, 2.0, 6.0);
    } else if roll < 0.65 && can_graze {
        mob.brain.state = BrainState::Graze {
            until: now + ctx.rng.gen_range(3.0..8.0),
            look_yaw: mob.yaw,
            next_look_at: now + ctx.rng.gen_range(1.0..3.0),
        };
    } else if !start_wander(mob, ctx, nav) {
        rest(mob, ctx, 1.0, 3.0);
    }
}

/// Pick a standable point near the anchor and plan to it.
pub(crate) fn start_wander(mob: &mut Mob, ctx: &mut ThinkContext, nav: &Navigator) -> bool {
    let radius = mob.def.wander_radius;
    if radius <= 0.0 || mob.def.walk_speed <= 0.0 {
        return false;
    }
    let now = ctx.now;
    for _ in 0..WANDER_ATTEMPTS {
        let angle = ctx.rng.gen_range(0.0..TAU);
        let dist = ctx.rng.gen_range(radius * 0.25..=radius);
        let x = mob.anchor.x + angle.cos() * dist;
        let z = mob.anchor.z + angle.sin() * dist;
        if !ctx.world.is_chunk_loaded(ChunkPos::of_world(x, z)) {
            continue;
        }
        let Some(f) = probe_footprint(ctx.world, x, z, mob.position.y) else {
            continue;
        };
        let target = Vec3::new(x, f.ground_y, z);
        let range = ctx.config.navigation.max_range_blocks;
        if nav.move_to_position(mob, ctx.world, target, mob.def.walk_speed, range, now) {
            let travel = horizontal_distance(mob.position, target) / mob.def.walk_speed;
            mob.brain.state = BrainState::Wander {
                target,
                give_up_at: now + f64::from(travel) * 2.5 + 4.0,
            };
            return true;
        }
    }
    false
}

/// Unit vector pointing from `threat` to `pos`, falling back to `fallback`.
pub(crate) fn away_from(pos: Vec3, threat: Vec3, fallback: Vec3) -> Vec3 {
    let d = flat(pos - threat);
    if d.length_squared() > 1e-6 {
        d.normalize()
    } else {
        fallback
    }
}

/// Run along `direction`, turning aside at cliffs and reversing when blocked.
/// Returns the direction to keep using.
fn run_along(
    mob: &mut Mob,
    world: &dyn BlockSource,
    direction: Vec3,
    speed: f32,
    dt: f32,
    rng: &mut StdRng,
    config: &MovementConfig,
) -> (Vec3, bool) {
    let mut dir = direction;
    if drop_ahead(mob, world, dir, config) {
        dir = safe_turn(mob, world, dir, rng, config);
    }
    let moved = move_respecting_voxels(mob, world, &MoveIntent::toward(dir, speed), dt, config);
    if !moved {
        let jitter: f32 = rng.gen_range(-60.0..60.0);
        dir = Quat::from_rotation_y((180.0 + jitter).to_radians()) * dir;
    }
    (dir, moved)
}

fn safe_turn(mob: &Mob, world: &dyn BlockSource, dir: Vec3, rng: &mut StdRng, config: &MovementConfig) -> Vec3 {
    let sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
    for angle in [90.0_f32, -90.0, 135.0, -135.0, 180.0] {
        let turned = Quat::from_rotation_y((angle * sign).to_radians()) * dir;
        if !drop_ahead(mob, world, turned, config) {
            return turned;
        }
    }
    -dir
}

/// Turn the current state into movement for one heartbeat.
/// Returns whether the mob moved.
pub fn act(mob: &mut Mob, world: &dyn BlockSource, dt: f32, now: f64, rng: &mut StdRng, config: &AiConfig) -> bool {
    let nav = Navigator::new(config);
    let mv = &config.movement;
    let stop = MoveIntent::stop();
    match mob.brain.state.clone() {
        BrainState::Idle { look_yaw, .. } => {
            let moved = move_respecting_voxels(mob, world, &stop, dt, mv);
            face_yaw(mob, look_yaw, dt);
            moved
        }
        BrainState::Graze { look_yaw, .. } => {
            let moved = move_respecting_voxels(mob, world, &stop, dt, mv);
            face_yaw(mob, look_yaw, dt);
            moved
        }
        BrainState::Wander { .. } => nav.tick(mob, world, dt, now),
        BrainState::Tempted { last_seen, .. } => {
            if mob.nav.is_following() {
                nav.tick(mob, world, dt, now)
            } else {
                let moved = move_respecting_voxels(mob, world, &stop, dt, mv);
                face_point(mob, last_seen, dt);
                moved
            }
        }
        BrainState::Chase { last_seen, .. } => {
            if mob.nav.is_following() {
                return nav.tick(mob, world, dt, now);
            }
            // no usable path: close in directly
            let dir = flat(last_seen - mob.position);
            let intent = MoveIntent {
                direction: dir,
                speed: mob.def.run_speed,
                arrive_at: Some(last_seen),
            };
            if move_respecting_voxels(mob, world, &intent, dt, mv) {
                return true;
            }
            last_seen.y < mob.position.y - 1.0 && emergency_step_down(mob, world, dir, mv)
        }
        BrainState::Attack { last_seen, .. } => {
            let moved = move_respecting_voxels(mob, world, &stop, dt, mv);
            face_point(mob, last_seen, dt);
            moved
        }
        BrainState::Panic { until, direction } => {
            let (direction, moved) = run_along(mob, world, direction, mob.def.run_speed, dt, rng, mv);
            mob.brain.state = BrainState::Panic { until, direction };
            moved
        }
        BrainState::Flee { actor, away } => {
            let (away, moved) = run_along(mob, world, away, mob.def.run_speed, dt, rng, mv);
            mob.brain.state = BrainState::Flee { actor, away };
            moved
        }
        BrainState::Stationary => false,
    }
}
