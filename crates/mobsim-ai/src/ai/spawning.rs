//! Natural mob spawning and far despawning.
//!
//! Both passes only plan; the world context applies the result so every
//! spawn goes through the same validated path as an explicit one.

use std::f32::consts::TAU;
use std::sync::Arc;

use glam::Vec3;
use mobsim_world::{BlockSource, ChunkPos};
use rand::Rng;

use crate::actor::Actor;
use crate::ai::footprint::probe_footprint;
use crate::ai::spatial::ActorIndex;
use crate::config::SpawnConfig;
use crate::mob::MobId;
use crate::mob_registry::{MobCategory, MobDefinition, MobRegistry};
use crate::registry::EntityRegistry;

/// Spawn candidates are probed from this far above the chosen actor's feet.
const SPAWN_PROBE_HEADROOM: f32 = 16.0;

/// A grounded position chosen for a natural spawn.
#[derive(Debug, Clone)]
pub struct SpawnPlan {
    pub def: Arc<MobDefinition>,
    pub position: Vec3,
}

/// Interval gates for the spawn and despawn passes.
#[derive(Debug, Clone)]
pub struct SpawnTimers {
    next_spawn_at: f64,
    next_despawn_at: f64,
}

impl SpawnTimers {
    /// Neither pass fires on the first heartbeat.
    pub fn new(now: f64, config: &SpawnConfig) -> Self {
        Self {
            next_spawn_at: now + config.spawn_interval,
            next_despawn_at: now + config.despawn_interval,
        }
    }

    pub fn spawn_due(&mut self, now: f64, config: &SpawnConfig) -> bool {
        if now < self.next_spawn_at {
            return false;
        }
        self.next_spawn_at = now + config.spawn_interval;
        true
    }

    pub fn despawn_due(&mut self, now: f64, config: &SpawnConfig) -> bool {
        if now < self.next_despawn_at {
            return false;
        }
        self.next_despawn_at = now + config.despawn_interval;
        true
    }
}

/// Count living mobs by category: (hostile, passive).
fn count_by_category(registry: &EntityRegistry) -> (usize, usize) {
    registry.iter().fold((0, 0), |(h, p), mob| match mob.category() {
        MobCategory::Hostile => (h + 1, p),
        MobCategory::Passive => (h, p + 1),
        MobCategory::Stationary => (h, p),
    })
}

/// Pick at most one hostile and one passive spawn near random actors.
pub fn plan_natural_spawns(
    registry: &EntityRegistry,
    defs: &MobRegistry,
    actors: &[Actor],
    world: &dyn BlockSource,
    config: &SpawnConfig,
    rng: &mut impl Rng,
) -> Vec<SpawnPlan> {
    let alive: Vec<&Actor> = actors.iter().filter(|a| a.is_alive()).collect();
    if alive.is_empty() {
        return Vec::new();
    }
    let (hostile, passive) = count_by_category(registry);
    let mut plans = Vec::new();
    for (category, count, cap) in [
        (MobCategory::Hostile, hostile, config.hostile_cap),
        (MobCategory::Passive, passive, config.passive_cap),
    ] {
        if count >= cap {
            continue;
        }
        let candidates: Vec<&Arc<MobDefinition>> = defs.of_category(category).collect();
        if candidates.is_empty() {
            continue;
        }
        let actor = alive[rng.gen_range(0..alive.len())];
        let (x, z) = random_spawn_position(rng, actor.position, config.min_distance, config.max_distance);
        if !world.is_chunk_loaded(ChunkPos::of_world(x, z)) {
            continue;
        }
        let Some(footing) = probe_footprint(world, x, z, actor.position.y + SPAWN_PROBE_HEADROOM) else {
            continue;
        };
        let def = candidates[rng.gen_range(0..candidates.len())].clone();
        plans.push(SpawnPlan {
            def,
            position: Vec3::new(x, footing.ground_y, z),
        });
    }
    plans
}

/// Horizontal point on a ring between `min_dist` and `max_dist` of `center`.
fn random_spawn_position(rng: &mut impl Rng, center: Vec3, min_dist: f32, max_dist: f32) -> (f32, f32) {
    let angle: f32 = rng.gen_range(0.0..TAU);
    let dist: f32 = if max_dist > min_dist {
        rng.gen_range(min_dist..max_dist)
    } else {
        min_dist
    };
    (center.x + angle.cos() * dist, center.z + angle.sin() * dist)
}

/// Unpinned mobs farther than `despawn_distance` from every actor.
/// Nothing is despawned while no actor is present.
pub fn far_mobs(registry: &EntityRegistry, actors: &ActorIndex, config: &SpawnConfig) -> Vec<MobId> {
    if actors.is_empty() {
        return Vec::new();
    }
    registry
        .iter()
        .filter(|mob| !mob.pinned)
        .filter(|mob| {
            actors
                .nearest_distance(mob.position)
                .map_or(true, |d| d > config.despawn_distance)
        })
        .map(|mob| mob.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::spatial::horizontal_distance;
    use crate::mob::test_support::{builtin, flat_world};
    use mobsim_world::flat_generator::FlatLayers;
    use mobsim_world::VoxelGrid;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn put(reg: &mut EntityRegistry, world: &VoxelGrid, type_id: &str, x: f32) -> MobId {
        let mut mob = builtin(world, type_id, x, 0.5);
        mob.id = reg.allocate_id();
        let id = mob.id;
        reg.insert(mob);
        id
    }

    fn small_ring() -> SpawnConfig {
        SpawnConfig {
            enabled: true,
            min_distance: 8.0,
            max_distance: 16.0,
            ..SpawnConfig::default()
        }
    }

    #[test]
    fn spawns_on_ring_around_actor() {
        let world = VoxelGrid::flat(3, &FlatLayers::default());
        let reg = EntityRegistry::new();
        let defs = MobRegistry::new();
        let actor = Actor::new(1, Vec3::new(0.5, 4.01, 0.5));
        let config = small_ring();
        let mut rng = StdRng::seed_from_u64(8);
        let mut seen = 0;
        for _ in 0..20 {
            for plan in plan_natural_spawns(&reg, &defs, std::slice::from_ref(&actor), &world, &config, &mut rng) {
                let d = horizontal_distance(plan.position, actor.position);
                assert!((8.0..=16.0).contains(&d), "distance {d}");
                assert!((plan.position.y - 4.01).abs() < 1e-4);
                assert_ne!(plan.def.category, MobCategory::Stationary);
                seen += 1;
            }
        }
        assert!(seen > 0);
    }

    #[test]
    fn caps_are_respected() {
        let world = flat_world();
        let mut reg = EntityRegistry::new();
        put(&mut reg, &world, "mobsim:zombie", 0.5);
        put(&mut reg, &world, "mobsim:cow", 2.5);
        let defs = MobRegistry::new();
        let actor = Actor::new(1, Vec3::new(0.5, 4.01, 0.5));
        let config = SpawnConfig {
            hostile_cap: 1,
            passive_cap: 1,
            ..small_ring()
        };
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..10 {
            assert!(plan_natural_spawns(&reg, &defs, std::slice::from_ref(&actor), &world, &config, &mut rng).is_empty());
        }
    }

    #[test]
    fn no_actors_no_spawns() {
        let world = flat_world();
        let reg = EntityRegistry::new();
        let mut rng = StdRng::seed_from_u64(10);
        assert!(plan_natural_spawns(&reg, &MobRegistry::new(), &[], &world, &small_ring(), &mut rng).is_empty());
    }

    #[test]
    fn far_unpinned_mobs_are_selected() {
        let world = VoxelGrid::flat(4, &FlatLayers::default());
        let mut reg = EntityRegistry::new();
        let near = put(&mut reg, &world, "mobsim:cow", 2.5);
        let far = put(&mut reg, &world, "mobsim:cow", 60.5);
        let pinned = put(&mut reg, &world, "mobsim:cow", 62.5);
        reg.update(pinned, |m| m.pinned = true);
        let actors = vec![Actor::new(1, Vec3::new(0.5, 4.01, 0.5))];
        let index = ActorIndex::build(&actors);
        let config = SpawnConfig {
            despawn_distance: 32.0,
            ..SpawnConfig::default()
        };
        let ids = far_mobs(&reg, &index, &config);
        assert_eq!(ids, vec![far]);
        assert!(!ids.contains(&near));

        let empty = ActorIndex::build(&[]);
        assert!(far_mobs(&reg, &empty, &config).is_empty());
    }

    #[test]
    fn timers_skip_first_heartbeat() {
        let config = SpawnConfig::default();
        let mut timers = SpawnTimers::new(0.0, &config);
        assert!(!timers.spawn_due(0.0, &config));
        assert!(timers.spawn_due(config.spawn_interval, &config));
        assert!(!timers.spawn_due(config.spawn_interval + 1.0, &config));
        assert!(timers.despawn_due(config.despawn_interval, &config));
    }
}
