//! Mob simulation: voxel-aware pathfinding, navigation and AI scheduling.

pub mod actor;
pub mod ai;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod game_world;
pub mod mob;
pub mod mob_registry;
pub mod persistence;
pub mod registry;

pub use actor::{Actor, ActorDirectory, ActorId, CombatSink, DamageLog};
pub use broadcast::{DeltaBatcher, EntityDelta};
pub use config::AiConfig;
pub use error::AiError;
pub use game_world::{DamageOutcome, Despawn, GameEvent, MobWorld, SpawnOptions};
pub use mob::{Mob, MobId};
pub use mob_registry::{MobCategory, MobDefinition, MobRegistry};
pub use persistence::{MemoryStore, MobRecord, PersistenceSink};
