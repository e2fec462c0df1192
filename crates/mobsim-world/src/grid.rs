//! In-memory voxel world: a map of loaded chunk columns.

use std::collections::HashMap;

use tracing::debug;

use crate::block_registry::{BlockId, BlockRegistry, BlockShape, AIR};
use crate::chunk::{BlockPos, ChunkColumn, ChunkPos};
use crate::error::WorldError;
use crate::flat_generator::{generate_flat_chunk, FlatLayers};
use crate::query::{BlockSink, BlockSource};
use crate::{MAX_BLOCK_Y, MIN_BLOCK_Y};

/// Loaded chunk columns plus the block registry used to classify them.
#[derive(Default)]
pub struct VoxelGrid {
    chunks: HashMap<ChunkPos, ChunkColumn>,
    registry: BlockRegistry,
}

impl VoxelGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// A square of flat chunks from `-radius..=radius` on both axes.
    pub fn flat(radius: i32, layers: &FlatLayers) -> Self {
        let mut grid = Self::new();
        for cx in -radius..=radius {
            for cz in -radius..=radius {
                let pos = ChunkPos::new(cx, cz);
                grid.load_chunk(generate_flat_chunk(pos, layers));
            }
        }
        grid
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Insert or replace a chunk column.
    pub fn load_chunk(&mut self, column: ChunkColumn) {
        self.chunks.insert(column.pos, column);
    }

    pub fn unload_chunk(&mut self, pos: ChunkPos) -> Option<ChunkColumn> {
        let removed = self.chunks.remove(&pos);
        if removed.is_some() {
            debug!("Unloaded chunk ({}, {})", pos.x, pos.z);
        }
        removed
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn loaded_chunks(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.chunks.keys().copied()
    }

    /// Fill the inclusive box `min..=max` with one block.
    pub fn fill(&mut self, min: BlockPos, max: BlockPos, block: BlockId) -> Result<(), WorldError> {
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                for z in min.z..=max.z {
                    self.set_block(BlockPos::new(x, y, z), block, 0)?;
                }
            }
        }
        Ok(())
    }

    fn local(pos: BlockPos) -> (ChunkPos, i32, i32) {
        let chunk = pos.chunk();
        let (ox, oz) = chunk.origin();
        (chunk, pos.x - ox, pos.z - oz)
    }
}

impl BlockSource for VoxelGrid {
    fn block(&self, pos: BlockPos) -> BlockId {
        let (chunk, lx, lz) = Self::local(pos);
        self.chunks
            .get(&chunk)
            .map(|col| col.block(lx, pos.y, lz))
            .unwrap_or(AIR)
    }

    fn block_metadata(&self, pos: BlockPos) -> u8 {
        let (chunk, lx, lz) = Self::local(pos);
        self.chunks
            .get(&chunk)
            .map(|col| col.metadata(lx, pos.y, lz))
            .unwrap_or(0)
    }

    fn is_chunk_loaded(&self, chunk: ChunkPos) -> bool {
        self.chunks.contains_key(&chunk)
    }

    fn shape(&self, block: BlockId) -> BlockShape {
        self.registry.shape(block)
    }

    fn is_mature(&self, pos: BlockPos) -> bool {
        self.registry
            .is_mature(self.block(pos), self.block_metadata(pos))
    }
}

impl BlockSink for VoxelGrid {
    fn set_block(&mut self, pos: BlockPos, block: BlockId, metadata: u8) -> Result<(), WorldError> {
        if !(MIN_BLOCK_Y..=MAX_BLOCK_Y).contains(&pos.y) {
            return Err(WorldError::OutOfBounds(pos));
        }
        let (chunk, lx, lz) = Self::local(pos);
        let col = self
            .chunks
            .get_mut(&chunk)
            .ok_or(WorldError::ChunkNotLoaded(chunk))?;
        if col.set_block(lx, pos.y, lz, block, metadata) {
            Ok(())
        } else {
            Err(WorldError::OutOfBounds(pos))
        }
    }
}
