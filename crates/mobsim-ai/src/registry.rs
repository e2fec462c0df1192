//! Live mob storage with a per-chunk index.
//!
//! Mobs are kept in id order so every pass over the registry is
//! deterministic. The chunk index is re-synced whenever a mob is mutated
//! through [`EntityRegistry::update`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use mobsim_world::ChunkPos;

use crate::mob::{Mob, MobId};

#[derive(Debug, Default)]
pub struct EntityRegistry {
    mobs: BTreeMap<MobId, Mob>,
    chunks: HashMap<ChunkPos, BTreeSet<MobId>>,
    next_id: u64,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Reserve a fresh id. Ids are never reused.
    pub fn allocate_id(&mut self) -> MobId {
        let id = MobId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        id
    }

    pub fn insert(&mut self, mut mob: Mob) {
        if let Some(old) = self.mobs.remove(&mob.id) {
            self.unfile(old.id, old.bucket);
        }
        self.next_id = self.next_id.max(mob.id.0 + 1);
        mob.bucket = mob.chunk();
        self.chunks.entry(mob.bucket).or_default().insert(mob.id);
        self.mobs.insert(mob.id, mob);
    }

    pub fn remove(&mut self, id: MobId) -> Option<Mob> {
        let mob = self.mobs.remove(&id)?;
        self.unfile(id, mob.bucket);
        Some(mob)
    }

    fn unfile(&mut self, id: MobId, chunk: ChunkPos) {
        if let Some(set) = self.chunks.get_mut(&chunk) {
            set.remove(&id);
            if set.is_empty() {
                self.chunks.remove(&chunk);
            }
        }
    }

    pub fn get(&self, id: MobId) -> Option<&Mob> {
        self.mobs.get(&id)
    }

    /// Mutate one mob, then refile it if it crossed a chunk border.
    pub fn update<R>(&mut self, id: MobId, f: impl FnOnce(&mut Mob) -> R) -> Option<R> {
        let mob = self.mobs.get_mut(&id)?;
        let result = f(mob);
        let chunk = mob.chunk();
        let old = mob.bucket;
        if chunk != old {
            mob.bucket = chunk;
            self.unfile(id, old);
            self.chunks.entry(chunk).or_default().insert(id);
        }
        Some(result)
    }

    pub fn ids(&self) -> Vec<MobId> {
        self.mobs.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mob> {
        self.mobs.values()
    }

    /// Ids filed under a chunk, in id order.
    pub fn in_chunk(&self, chunk: ChunkPos) -> impl Iterator<Item = MobId> + '_ {
        self.chunks.get(&chunk).into_iter().flatten().copied()
    }

    /// Chunks that currently hold at least one mob, sorted.
    pub fn occupied_chunks(&self) -> Vec<ChunkPos> {
        let mut chunks: Vec<ChunkPos> = self.chunks.keys().copied().collect();
        chunks.sort_by_key(|c| (c.x, c.z));
        chunks
    }

    pub fn len(&self) -> usize {
        self.mobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mob::test_support::{flat_world, mob_at};

    fn spawn(reg: &mut EntityRegistry, world: &mobsim_world::VoxelGrid, x: f32, z: f32) -> MobId {
        let mut mob = mob_at(world, x, z, 2.0);
        mob.id = reg.allocate_id();
        let id = mob.id;
        reg.insert(mob);
        id
    }

    #[test]
    fn ids_are_unique_and_ordered() {
        let world = flat_world();
        let mut reg = EntityRegistry::new();
        let a = spawn(&mut reg, &world, 0.5, 0.5);
        let b = spawn(&mut reg, &world, 1.5, 0.5);
        reg.remove(a);
        let c = spawn(&mut reg, &world, 2.5, 0.5);
        assert!(a < b && b < c);
        assert_eq!(reg.ids(), vec![b, c]);
    }

    #[test]
    fn update_refiles_across_chunks() {
        let world = flat_world();
        let mut reg = EntityRegistry::new();
        let id = spawn(&mut reg, &world, 15.5, 0.5);
        assert_eq!(reg.in_chunk(ChunkPos::new(0, 0)).collect::<Vec<_>>(), vec![id]);
        reg.update(id, |m| m.position.x = 16.5);
        assert_eq!(reg.in_chunk(ChunkPos::new(0, 0)).count(), 0);
        assert_eq!(reg.in_chunk(ChunkPos::new(1, 0)).collect::<Vec<_>>(), vec![id]);
        assert_eq!(reg.occupied_chunks(), vec![ChunkPos::new(1, 0)]);
    }

    #[test]
    fn remove_clears_index() {
        let world = flat_world();
        let mut reg = EntityRegistry::new();
        let id = spawn(&mut reg, &world, 0.5, 0.5);
        assert!(reg.remove(id).is_some());
        assert!(reg.remove(id).is_none());
        assert!(reg.occupied_chunks().is_empty());
        assert!(reg.is_empty());
        assert!(reg.update(id, |_| ()).is_none());
    }
}
