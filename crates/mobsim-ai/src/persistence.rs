//! Persisted mob records, written when a chunk unloads and read back when it
//! loads again.

use std::collections::HashMap;

use glam::Vec3;
use mobsim_world::ChunkPos;
use serde::{Deserialize, Serialize};

use crate::error::AiError;
use crate::mob::Mob;

/// The subset of a mob that survives an unload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobRecord {
    pub type_id: String,
    pub position: [f32; 3],
    pub yaw: f32,
    pub health: f32,
    pub anchor: [f32; 3],
    #[serde(default)]
    pub storage: u32,
}

impl MobRecord {
    pub fn of(mob: &Mob) -> Self {
        Self {
            type_id: mob.type_id().to_string(),
            position: mob.position.to_array(),
            yaw: mob.yaw,
            health: mob.health,
            anchor: mob.anchor.to_array(),
            storage: mob.storage,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn anchor(&self) -> Vec3 {
        Vec3::from_array(self.anchor)
    }
}

/// Storage for records of unloaded chunks.
pub trait PersistenceSink {
    /// Append records for `chunk`.
    fn store(&mut self, chunk: ChunkPos, records: Vec<MobRecord>) -> Result<(), AiError>;

    /// Remove and return every record stored for `chunk`.
    fn take(&mut self, chunk: ChunkPos) -> Result<Vec<MobRecord>, AiError>;
}

/// In-memory sink, used by tests and embedders without disk storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    chunks: HashMap<ChunkPos, Vec<MobRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self, chunk: ChunkPos) -> usize {
        self.chunks.get(&chunk).map_or(0, Vec::len)
    }
}

impl PersistenceSink for MemoryStore {
    fn store(&mut self, chunk: ChunkPos, records: Vec<MobRecord>) -> Result<(), AiError> {
        if !records.is_empty() {
            self.chunks.entry(chunk).or_default().extend(records);
        }
        Ok(())
    }

    fn take(&mut self, chunk: ChunkPos) -> Result<Vec<MobRecord>, AiError> {
        Ok(self.chunks.remove(&chunk).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(type_id: &str) -> MobRecord {
        MobRecord {
            type_id: type_id.into(),
            position: [1.5, 4.01, 2.5],
            yaw: 90.0,
            health: 7.0,
            anchor: [0.5, 4.01, 0.5],
            storage: 0,
        }
    }

    #[test]
    fn memory_store_take_empties_chunk() {
        let mut store = MemoryStore::new();
        let chunk = ChunkPos::new(0, 0);
        store.store(chunk, vec![record("mobsim:cow")]).unwrap();
        store.store(chunk, vec![record("mobsim:pig")]).unwrap();
        assert_eq!(store.stored(chunk), 2);

        let taken = store.take(chunk).unwrap();
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[1].type_id, "mobsim:pig");
        assert!(store.take(chunk).unwrap().is_empty());
    }

    #[test]
    fn record_json_shape() {
        let json = serde_json::to_string(&record("mobsim:cow")).unwrap();
        let back: MobRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record("mobsim:cow"));

        // storage is optional in older files
        let legacy = r#"{"type_id":"mobsim:cow","position":[0.5,4.01,0.5],"yaw":0.0,"health":10.0,"anchor":[0.5,4.01,0.5]}"#;
        let parsed: MobRecord = serde_json::from_str(legacy).unwrap();
        assert_eq!(parsed.storage, 0);
        assert_eq!(parsed.position(), Vec3::new(0.5, 4.01, 0.5));
    }
}
