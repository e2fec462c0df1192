//! Voxel-respecting movement integration.
//!
//! All horizontal displacement of a mob goes through this module, and every
//! committed position is re-grounded by the footprint prober.

use glam::{Quat, Vec3};
use mobsim_world::BlockSource;

use crate::ai::footprint::{probe_footprint, step_allowed};
use crate::ai::spatial::{flat, horizontal_distance};
use crate::config::MovementConfig;
use crate::mob::Mob;

/// Desired travel for one sub-step.
#[derive(Debug, Clone, Copy)]
pub struct MoveIntent {
    /// Horizontal heading; need not be normalized. Zero means "stop".
    pub direction: Vec3,
    /// Desired speed in blocks/s.
    pub speed: f32,
    /// When set, speed ramps down approaching this point.
    pub arrive_at: Option<Vec3>,
}

impl MoveIntent {
    pub fn toward(direction: Vec3, speed: f32) -> Self {
        Self {
            direction,
            speed,
            arrive_at: None,
        }
    }

    pub fn stop() -> Self {
        Self::toward(Vec3::ZERO, 0.0)
    }
}

/// Yaw in degrees facing from one position toward another.
///
/// Convention: 0 = +Z, 90 = -X, 180 = -Z, 270 = +X.
pub fn yaw_toward(from_x: f32, from_z: f32, to_x: f32, to_z: f32) -> f32 {
    let dx = to_x - from_x;
    let dz = to_z - from_z;
    wrap_yaw((-dx).atan2(dz).to_degrees())
}

/// Normalize a yaw into `[0, 360)`.
pub fn wrap_yaw(yaw: f32) -> f32 {
    let wrapped = yaw.rem_euclid(360.0);
    // tiny negatives round up to exactly 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Unit heading for a yaw, inverse of [`yaw_toward`].
pub fn heading_of(yaw: f32) -> Vec3 {
    let r = yaw.to_radians();
    Vec3::new(-r.sin(), 0.0, r.cos())
}

/// Signed shortest angular difference `to - from`, in `-180..=180`.
pub fn angle_delta(from: f32, to: f32) -> f32 {
    let d = (to - from).rem_euclid(360.0);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Turn `current` toward `target` by at most `max_step` degrees.
pub fn rotate_toward(current: f32, target: f32, max_step: f32) -> f32 {
    let delta = angle_delta(current, target);
    let step = delta.clamp(-max_step, max_step);
    wrap_yaw(current + step)
}

fn face_heading(mob: &mut Mob, sx: f32, sz: f32, dt: f32) {
    let target = yaw_toward(0.0, 0.0, sx, sz);
    mob.yaw = rotate_toward(mob.yaw, target, mob.def.turn_rate * dt);
}

/// Turn toward a fixed yaw without moving.
pub fn face_yaw(mob: &mut Mob, yaw: f32, dt: f32) {
    mob.yaw = rotate_toward(mob.yaw, yaw, mob.def.turn_rate * dt);
}

/// Turn toward a point without moving.
pub fn face_point(mob: &mut Mob, point: Vec3, dt: f32) {
    let target = yaw_toward(mob.position.x, mob.position.z, point.x, point.z);
    face_yaw(mob, target, dt);
}

/// Probe the destination column and commit the move when it is a legal step.
fn try_commit(mob: &mut Mob, world: &dyn BlockSource, nx: f32, nz: f32, max_down: i32) -> bool {
    let Some(footing) = probe_footprint(world, nx, nz, mob.position.y) else {
        return false;
    };
    if !step_allowed(mob.ground_block_y, footing.ground_block_y, max_down) {
        return false;
    }
    mob.apply_footing(nx, nz, footing);
    true
}

/// Move one sub-step toward the intent, respecting voxel constraints.
///
/// Tries the full step, then X-only, then Z-only. Returns false and zeroes
/// horizontal velocity when every option is blocked.
pub fn move_respecting_voxels(
    mob: &mut Mob,
    world: &dyn BlockSource,
    intent: &MoveIntent,
    dt: f32,
    config: &MovementConfig,
) -> bool {
    let heading = flat(intent.direction);
    let mut speed = intent.speed.max(0.0);
    let dir = if heading.length_squared() > 1e-8 {
        heading.normalize()
    } else {
        speed = 0.0;
        Vec3::ZERO
    };

    let mut remaining = f32::INFINITY;
    if let Some(goal) = intent.arrive_at {
        let d = horizontal_distance(mob.position, goal);
        remaining = d;
        if d < config.arrive_radius && config.arrive_radius > 0.0 {
            speed *= (d / config.arrive_radius).max(config.min_arrive_fraction);
        }
    }

    let desired = dir * speed;
    let current = flat(mob.velocity);
    let delta = desired - current;
    let max_dv = config.acceleration * dt;
    let velocity = if delta.length() > max_dv {
        current + delta.normalize() * max_dv
    } else {
        desired
    };
    mob.velocity.x = velocity.x;
    mob.velocity.z = velocity.z;

    let mut step = velocity * dt;
    let len = step.length();
    if len < 1e-6 {
        return false;
    }
    // never step past an arrive target
    if len > remaining {
        step *= remaining / len;
    }

    let (x, z) = (mob.position.x, mob.position.z);
    let max_down = config.max_step_down_blocks;
    if try_commit(mob, world, x + step.x, z + step.z, max_down) {
        face_heading(mob, step.x, step.z, dt);
        return true;
    }
    if step.x.abs() > 1e-6 && try_commit(mob, world, x + step.x, z, max_down) {
        mob.velocity.z = 0.0;
        face_heading(mob, step.x, 0.0, dt);
        return true;
    }
    if step.z.abs() > 1e-6 && try_commit(mob, world, x, z + step.z, max_down) {
        mob.velocity.x = 0.0;
        face_heading(mob, 0.0, step.z, dt);
        return true;
    }
    mob.velocity.x = 0.0;
    mob.velocity.z = 0.0;
    false
}

/// Displace a mob by a small horizontal offset if the result is a legal step.
/// Used for crowd separation; does not change velocity or facing.
pub fn try_displace(mob: &mut Mob, world: &dyn BlockSource, dx: f32, dz: f32, config: &MovementConfig) -> bool {
    if dx.abs() < 1e-6 && dz.abs() < 1e-6 {
        return false;
    }
    let (x, z) = (mob.position.x, mob.position.z);
    try_commit(mob, world, x + dx, z + dz, config.max_step_down_blocks)
}

/// Whether walking along `direction` would meet a drop deeper than allowed.
///
/// Samples straight ahead and at ±35°. The way is unsafe when the forward
/// sample is unsafe, or both side samples are.
pub fn drop_ahead(mob: &Mob, world: &dyn BlockSource, direction: Vec3, config: &MovementConfig) -> bool {
    let dir = flat(direction);
    if dir.length_squared() < 1e-8 {
        return false;
    }
    let dir = dir.normalize();
    let unsafe_at = |angle: f32| {
        let d = Quat::from_rotation_y(angle.to_radians()) * dir;
        let p = mob.position + d * config.cliff_probe_distance;
        match probe_footprint(world, p.x, p.z, mob.position.y) {
            Some(f) => mob.ground_block_y - f.ground_block_y > config.max_step_down_blocks,
            None => true,
        }
    };
    unsafe_at(0.0) || (unsafe_at(35.0) && unsafe_at(-35.0))
}

/// Step down a ledge deeper than ordinary movement allows, when a mob has no
/// other way forward. The landing must still be within the emergency limit.
pub fn emergency_step_down(mob: &mut Mob, world: &dyn BlockSource, direction: Vec3, config: &MovementConfig) -> bool {
    let dir = flat(direction);
    if dir.length_squared() < 1e-8 {
        return false;
    }
    let p = mob.position + dir.normalize() * 0.6;
    let Some(f) = probe_footprint(world, p.x, p.z, mob.position.y) else {
        return false;
    };
    let drop = mob.ground_block_y - f.ground_block_y;
    if drop <= 0 || drop > config.emergency_step_down_blocks {
        return false;
    }
    mob.apply_footing(p.x, p.z, f);
    true
}

/// Re-ground a mob in place after the world changed under it. Upward
/// corrections are limited to one block; falling is always accepted.
pub fn settle(mob: &mut Mob, world: &dyn BlockSource) -> bool {
    let (x, z) = (mob.position.x, mob.position.z);
    let Some(f) = probe_footprint(world, x, z, mob.position.y) else {
        return false;
    };
    if f.ground_block_y == mob.ground_block_y && (f.ground_y - mob.ground_y).abs() < 1e-6 {
        return false;
    }
    if f.ground_block_y - mob.ground_block_y > 1 {
        return false;
    }
    mob.apply_footing(x, z, f);
    true
}
