//! Errors surfaced by the mob simulation.
//!
//! Ordinary negative outcomes (no footing, no path, blocked movement, stuck
//! navigation) are plain return values and never appear here.

use mobsim_world::WorldError;
use thiserror::Error;

use crate::mob::MobId;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("unknown mob type: {0}")]
    UnknownMobType(String),

    #[error("no standable ground at ({x:.2}, {y:.2}, {z:.2})")]
    NoSupport { x: f32, y: f32, z: f32 },

    #[error("unknown mob id: {0}")]
    UnknownMob(MobId),

    #[error("world unavailable: {0}")]
    World(#[from] WorldError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}
