//! Spatial actor index and geometric helpers used during the AI heartbeat.

use std::collections::HashMap;

use glam::Vec3;
use mobsim_world::{BlockPos, BlockSource};

use crate::actor::{Actor, ActorId};

/// Cell size in blocks (matches chunk size for simplicity).
const CELL_SIZE: f32 = 16.0;

/// Spacing of line-of-sight samples, in blocks.
const SIGHT_STEP: f32 = 0.25;

/// Drop the vertical component.
pub fn flat(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Distance between two positions in the XZ plane.
pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = b.x - a.x;
    let dz = b.z - a.z;
    (dx * dx + dz * dz).sqrt()
}

/// Whether the segment between two eye points is free of solid blocks.
pub fn line_of_sight(world: &dyn BlockSource, from: Vec3, to: Vec3) -> bool {
    let delta = to - from;
    let samples = (delta.length() / SIGHT_STEP).ceil() as usize;
    (1..samples).all(|i| {
        let p = from + delta * (i as f32 / samples as f32);
        !world.is_solid(BlockPos::containing(p.x, p.y, p.z))
    })
}

fn cell_key(x: f32, z: f32) -> (i32, i32) {
    ((x / CELL_SIZE).floor() as i32, (z / CELL_SIZE).floor() as i32)
}

/// Result of a nearest-actor query.
#[derive(Debug, Clone, Copy)]
pub struct Nearest<'a> {
    pub actor: &'a Actor,
    /// Horizontal distance.
    pub distance: f32,
}

/// A spatial hash of this heartbeat's living actors.
#[derive(Default)]
pub struct ActorIndex<'a> {
    cells: HashMap<(i32, i32), Vec<&'a Actor>>,
    by_id: HashMap<ActorId, &'a Actor>,
}

impl<'a> ActorIndex<'a> {
    pub fn build(actors: &'a [Actor]) -> Self {
        let mut index = Self::default();
        for actor in actors.iter().filter(|a| a.is_alive()) {
            let key = cell_key(actor.position.x, actor.position.z);
            index.cells.entry(key).or_default().push(actor);
            index.by_id.insert(actor.id, actor);
        }
        index
    }

    pub fn get(&self, id: ActorId) -> Option<&'a Actor> {
        self.by_id.get(&id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Nearest actor matching `filter` within `max_dist` of `pos`.
    /// Ties go to the lower actor id.
    pub fn nearest_where(
        &self,
        pos: Vec3,
        max_dist: f32,
        filter: impl Fn(&Actor) -> bool,
    ) -> Option<Nearest<'a>> {
        if max_dist <= 0.0 {
            return None;
        }
        let radius = (max_dist / CELL_SIZE).ceil() as i32;
        let (cx, cz) = cell_key(pos.x, pos.z);
        let mut best: Option<Nearest<'a>> = None;
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                let Some(entries) = self.cells.get(&(cx + dx, cz + dz)) else {
                    continue;
                };
                for &actor in entries {
                    let distance = horizontal_distance(pos, actor.position);
                    if distance > max_dist || !filter(actor) {
                        continue;
                    }
                    let better = best.map_or(true, |b| {
                        distance < b.distance || (distance == b.distance && actor.id < b.actor.id)
                    });
                    if better {
                        best = Some(Nearest { actor, distance });
                    }
                }
            }
        }
        best
    }

    pub fn nearest(&self, pos: Vec3, max_dist: f32) -> Option<Nearest<'a>> {
        self.nearest_where(pos, max_dist, |_| true)
    }

    /// Distance to the closest actor anywhere, for activation checks.
    pub fn nearest_distance(&self, pos: Vec3) -> Option<f32> {
        self.by_id
            .values()
            .map(|a| horizontal_distance(pos, a.position))
            .min_by(f32::total_cmp)
    }

    /// Nearest actor whose eyes are visible from `eye`.
    pub fn nearest_visible(
        &self,
        world: &dyn BlockSource,
        pos: Vec3,
        eye: Vec3,
        max_dist: f32,
    ) -> Option<Nearest<'a>> {
        self.nearest_where(pos, max_dist, |a| line_of_sight(world, eye, a.eye()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mobsim_world::block_registry::STONE;
    use mobsim_world::flat_generator::FlatLayers;
    use mobsim_world::VoxelGrid;

    #[test]
    fn horizontal_distance_ignores_y() {
        let d = horizontal_distance(Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 50.0, 4.0));
        assert!((d - 5.0).abs() < 1e-5);
    }

    #[test]
    fn nearest_across_cells() {
        let actors = vec![
            Actor::new(1, Vec3::new(30.0, 4.0, 0.0)),
            Actor::new(2, Vec3::new(-10.0, 4.0, 0.0)),
        ];
        let index = ActorIndex::build(&actors);
        let n = index.nearest(Vec3::new(0.0, 4.0, 0.0), 40.0).unwrap();
        assert_eq!(n.actor.id, ActorId(2));
        assert!((n.distance - 10.0).abs() < 1e-5);
        assert!(index.nearest(Vec3::ZERO, 5.0).is_none());
    }

    #[test]
    fn dead_actors_are_skipped() {
        let mut dead = Actor::new(1, Vec3::ZERO);
        dead.health = 0.0;
        let actors = vec![dead, Actor::new(2, Vec3::new(5.0, 0.0, 0.0))];
        let index = ActorIndex::build(&actors);
        assert_eq!(index.nearest(Vec3::ZERO, 10.0).unwrap().actor.id, ActorId(2));
        assert!(index.get(ActorId(1)).is_none());
    }

    #[test]
    fn ties_prefer_lower_id() {
        let actors = vec![
            Actor::new(9, Vec3::new(3.0, 0.0, 0.0)),
            Actor::new(4, Vec3::new(-3.0, 0.0, 0.0)),
        ];
        let index = ActorIndex::build(&actors);
        assert_eq!(index.nearest(Vec3::ZERO, 10.0).unwrap().actor.id, ActorId(4));
    }

    #[test]
    fn walls_block_sight() {
        let mut grid = VoxelGrid::flat(1, &FlatLayers::default());
        let from = Vec3::new(0.5, 5.5, 0.5);
        let to = Vec3::new(6.5, 5.5, 0.5);
        assert!(line_of_sight(&grid, from, to));
        grid.fill(BlockPos::new(3, 4, -1), BlockPos::new(3, 7, 1), STONE)
            .unwrap();
        assert!(!line_of_sight(&grid, from, to));
    }

    #[test]
    fn nearest_visible_skips_hidden() {
        let mut grid = VoxelGrid::flat(1, &FlatLayers::default());
        grid.fill(BlockPos::new(3, 4, -1), BlockPos::new(3, 7, 1), STONE)
            .unwrap();
        let actors = vec![
            Actor::new(1, Vec3::new(5.5, 4.01, 0.5)),
            Actor::new(2, Vec3::new(-8.5, 4.01, 0.5)),
        ];
        let index = ActorIndex::build(&actors);
        let pos = Vec3::new(0.5, 4.01, 0.5);
        let eye = pos + Vec3::Y * 1.5;
        let n = index.nearest_visible(&grid, pos, eye, 16.0).unwrap();
        assert_eq!(n.actor.id, ActorId(2));
    }
}
