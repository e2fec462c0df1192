//! Mob entities.

use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use mobsim_world::ChunkPos;
use serde::{Deserialize, Serialize};

use crate::ai::brain::{Brain, BrainState};
use crate::ai::footprint::Footing;
use crate::ai::navigator::Navigation;
use crate::mob_registry::{MobCategory, MobDefinition};

/// Unique, never reused identifier of a mob within one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MobId(pub u64);

impl fmt::Display for MobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mob#{}", self.0)
    }
}

/// A simulated mob.
///
/// `ground_y` and `ground_block_y` only change through [`Mob::apply_footing`],
/// so a mob can only ever rest on a validated footing.
#[derive(Debug, Clone)]
pub struct Mob {
    pub id: MobId,
    pub def: Arc<MobDefinition>,
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub(crate) ground_y: f32,
    pub(crate) ground_block_y: i32,
    pub health: f32,
    /// Home point for wandering and the center of a stationary footprint.
    pub anchor: Vec3,
    pub brain: Brain,
    pub nav: Navigation,
    /// Items collected by stationary automation.
    pub storage: u32,
    /// Pinned mobs are exempt from far despawn and chunk unload removal.
    pub pinned: bool,
    pub(crate) last_damage_at: Option<f64>,
    /// Chunk bucket the registry currently files this mob under.
    pub(crate) bucket: ChunkPos,
}

impl Mob {
    pub(crate) fn new(id: MobId, def: Arc<MobDefinition>, x: f32, z: f32, footing: Footing, now: f64) -> Self {
        let state = match def.category {
            MobCategory::Stationary => BrainState::Stationary,
            _ => BrainState::expired_idle(now, 0.0),
        };
        let position = Vec3::new(x, footing.ground_y, z);
        Self {
            id,
            health: def.max_health,
            def,
            position,
            velocity: Vec3::ZERO,
            yaw: 0.0,
            ground_y: footing.ground_y,
            ground_block_y: footing.ground_block_y,
            anchor: position,
            brain: Brain::new(state, now),
            nav: Navigation::default(),
            storage: 0,
            pinned: false,
            last_damage_at: None,
            bucket: ChunkPos::of_world(x, z),
        }
    }

    pub fn category(&self) -> MobCategory {
        self.def.category
    }

    pub fn type_id(&self) -> &str {
        &self.def.type_id
    }

    pub fn ground_y(&self) -> f32 {
        self.ground_y
    }

    pub fn ground_block_y(&self) -> i32 {
        self.ground_block_y
    }

    pub fn chunk(&self) -> ChunkPos {
        ChunkPos::of_world(self.position.x, self.position.z)
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn state_name(&self) -> &'static str {
        self.brain.state.name()
    }

    pub fn eye(&self) -> Vec3 {
        self.position + Vec3::Y * (self.def.height * 0.85)
    }

    /// Commit a horizontal position grounded on a probed footing.
    pub(crate) fn apply_footing(&mut self, x: f32, z: f32, footing: Footing) {
        self.position = Vec3::new(x, footing.ground_y, z);
        self.ground_y = footing.ground_y;
        self.ground_block_y = footing.ground_block_y;
    }
}
