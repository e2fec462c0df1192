//! World access errors.

use thiserror::Error;

use crate::chunk::{BlockPos, ChunkPos};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("chunk ({}, {}) is not loaded", .0.x, .0.z)]
    ChunkNotLoaded(ChunkPos),

    #[error("block position ({}, {}, {}) is outside the world height", .0.x, .0.y, .0.z)]
    OutOfBounds(BlockPos),

    #[error("unknown block name: {0}")]
    UnknownBlock(String),
}
