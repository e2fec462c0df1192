//! Crowd separation.
//!
//! Overlapping mobs in the same or adjacent chunks receive opposite velocity
//! nudges proportional to how much they overlap. All nudges are computed from
//! one snapshot and applied afterwards, so the result does not depend on the
//! order mobs are visited in.

use std::collections::BTreeMap;

use glam::Vec3;
use mobsim_world::BlockSource;

use crate::ai::movement::try_displace;
use crate::config::{MovementConfig, SeparationConfig};
use crate::mob::MobId;
use crate::mob_registry::MobCategory;
use crate::registry::EntityRegistry;

/// Velocity nudge for each overlapping mob.
pub fn compute_nudges(registry: &EntityRegistry, config: &SeparationConfig) -> BTreeMap<MobId, Vec3> {
    let mut nudges: BTreeMap<MobId, Vec3> = BTreeMap::new();
    for chunk in registry.occupied_chunks() {
        for a_id in registry.in_chunk(chunk) {
            let Some(a) = registry.get(a_id) else {
                continue;
            };
            if a.category() == MobCategory::Stationary {
                continue;
            }
            for neighbor in chunk.neighborhood() {
                for b_id in registry.in_chunk(neighbor) {
                    // each pair once
                    if b_id <= a_id {
                        continue;
                    }
                    let Some(b) = registry.get(b_id) else {
                        continue;
                    };
                    if b.category() == MobCategory::Stationary {
                        continue;
                    }
                    let reach = a.def.collision_radius + b.def.collision_radius;
                    let offset = Vec3::new(b.position.x - a.position.x, 0.0, b.position.z - a.position.z);
                    let dist = offset.length();
                    if dist >= reach || reach <= 0.0 {
                        continue;
                    }
                    let normal = if dist > 1e-4 {
                        offset / dist
                    } else {
                        coincident_axis(a_id, b_id)
                    };
                    let overlap = (reach - dist) / reach;
                    let push = (overlap * config.separation_strength).min(config.max_push_rate);
                    *nudges.entry(a_id).or_insert(Vec3::ZERO) -= normal * push;
                    *nudges.entry(b_id).or_insert(Vec3::ZERO) += normal * push;
                }
            }
        }
    }
    for v in nudges.values_mut() {
        *v = v.clamp_length_max(config.max_push_rate);
    }
    nudges
}

/// Separation axis for two mobs that share a position, derived from their ids.
fn coincident_axis(a: MobId, b: MobId) -> Vec3 {
    let angle = ((a.0.wrapping_mul(31) ^ b.0) % 360) as f32;
    let r = angle.to_radians();
    Vec3::new(r.cos(), 0.0, r.sin())
}

/// Compute and apply one heartbeat of separation. Returns the number of
/// mobs nudged.
pub fn separate(
    registry: &mut EntityRegistry,
    world: &dyn BlockSource,
    dt: f32,
    config: &SeparationConfig,
    movement: &MovementConfig,
) -> usize {
    let nudges = compute_nudges(registry, config);
    for (&id, &nudge) in &nudges {
        registry.update(id, |mob| {
            mob.velocity += nudge;
            let shift = nudge * dt;
            try_displace(mob, world, shift.x, shift.z, movement);
        });
    }
    nudges.len()
}
