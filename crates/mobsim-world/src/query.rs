//! World query traits consumed by the mob simulation.

use crate::block_registry::{BlockId, BlockShape};
use crate::chunk::{BlockPos, ChunkPos};
use crate::error::WorldError;

/// Read access to the block grid.
///
/// Reads never fail: positions in unloaded chunks or outside the world height
/// read as air. Callers that need to distinguish "not loaded" from "empty"
/// check [`BlockSource::is_chunk_loaded`] first.
pub trait BlockSource {
    fn block(&self, pos: BlockPos) -> BlockId;

    fn block_metadata(&self, pos: BlockPos) -> u8;

    fn is_chunk_loaded(&self, chunk: ChunkPos) -> bool;

    /// Shape classification of a block ID.
    fn shape(&self, block: BlockId) -> BlockShape;

    fn is_solid(&self, pos: BlockPos) -> bool {
        self.shape(self.block(pos)).is_solid()
    }

    fn is_passable(&self, pos: BlockPos) -> bool {
        self.shape(self.block(pos)).is_passable()
    }

    /// Whether a crop at `pos` is fully grown.
    fn is_mature(&self, _pos: BlockPos) -> bool {
        false
    }

    fn require_loaded(&self, chunk: ChunkPos) -> Result<(), WorldError> {
        if self.is_chunk_loaded(chunk) {
            Ok(())
        } else {
            Err(WorldError::ChunkNotLoaded(chunk))
        }
    }
}

/// Write access, used only by stationary automation.
pub trait BlockSink: BlockSource {
    fn set_block(&mut self, pos: BlockPos, block: BlockId, metadata: u8) -> Result<(), WorldError>;
}
