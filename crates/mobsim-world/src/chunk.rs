//! Block coordinates, chunk coordinates, and palette-compressed chunk storage.

use serde::{Deserialize, Serialize};

use crate::block_registry::{BlockId, AIR};
use crate::{CHUNK_SIZE, MAX_BLOCK_Y, MIN_BLOCK_Y};

/// Sections per column: Y range [0, 255] = 256 blocks / 16.
pub const SECTION_COUNT: usize = 16;

/// Integer position of a single block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Block containing a world-space point.
    pub fn containing(x: f32, y: f32, z: f32) -> Self {
        Self::new(x.floor() as i32, y.floor() as i32, z.floor() as i32)
    }

    pub const fn above(self, n: i32) -> Self {
        Self::new(self.x, self.y + n, self.z)
    }

    pub const fn below(self, n: i32) -> Self {
        Self::new(self.x, self.y - n, self.z)
    }

    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub const fn chunk(self) -> ChunkPos {
        ChunkPos::of_block(self.x, self.z)
    }
}

/// Horizontal coordinate of a chunk column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing the block column `(bx, bz)`.
    pub const fn of_block(bx: i32, bz: i32) -> Self {
        Self::new(bx.div_euclid(CHUNK_SIZE), bz.div_euclid(CHUNK_SIZE))
    }

    /// Chunk containing a world-space point.
    pub fn of_world(x: f32, z: f32) -> Self {
        Self::of_block(x.floor() as i32, z.floor() as i32)
    }

    /// This chunk and its eight neighbours.
    pub fn neighborhood(self) -> impl Iterator<Item = ChunkPos> {
        (-1..=1).flat_map(move |dx| (-1..=1).map(move |dz| ChunkPos::new(self.x + dx, self.z + dz)))
    }

    /// World-space block coordinate of the chunk's minimum corner.
    pub const fn origin(self) -> (i32, i32) {
        (self.x * CHUNK_SIZE, self.z * CHUNK_SIZE)
    }
}

/// A 16x16x16 section with a single block storage layer plus per-block metadata.
#[derive(Clone)]
pub struct Section {
    /// Palette indices for each block, stored in XZY order: `(x*16 + z)*16 + y`.
    blocks: Box<[u16; 4096]>,
    /// Palette of block IDs.
    palette: Vec<BlockId>,
    metadata: Box<[u8; 4096]>,
}

impl Section {
    /// Create a section filled entirely with a single block.
    pub fn new_single(block: BlockId) -> Self {
        Self {
            blocks: Box::new([0; 4096]),
            palette: vec![block],
            metadata: Box::new([0; 4096]),
        }
    }

    const fn index(x: usize, y: usize, z: usize) -> usize {
        (x * 16 + z) * 16 + y
    }

    /// Set a block at local coordinates. `x`, `y`, `z` must each be in `[0, 15]`.
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: BlockId, metadata: u8) {
        debug_assert!(x < 16 && y < 16 && z < 16);
        let palette_index = match self.palette.iter().position(|&id| id == block) {
            Some(idx) => idx,
            None => {
                self.palette.push(block);
                self.palette.len() - 1
            }
        };
        let i = Self::index(x, y, z);
        self.blocks[i] = palette_index as u16;
        self.metadata[i] = metadata;
    }

    pub fn get_block(&self, x: usize, y: usize, z: usize) -> BlockId {
        let palette_index = self.blocks[Self::index(x, y, z)] as usize;
        self.palette.get(palette_index).copied().unwrap_or(AIR)
    }

    pub fn get_metadata(&self, x: usize, y: usize, z: usize) -> u8 {
        self.metadata[Self::index(x, y, z)]
    }

    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }
}

/// A full chunk column (16x256x16).
#[derive(Clone)]
pub struct ChunkColumn {
    pub pos: ChunkPos,
    sections: Vec<Section>,
}

impl ChunkColumn {
    /// An all-air column.
    pub fn empty(pos: ChunkPos) -> Self {
        Self {
            pos,
            sections: (0..SECTION_COUNT).map(|_| Section::new_single(AIR)).collect(),
        }
    }

    fn locate(lx: i32, y: i32, lz: i32) -> Option<(usize, usize, usize, usize)> {
        if !(MIN_BLOCK_Y..=MAX_BLOCK_Y).contains(&y)
            || !(0..CHUNK_SIZE).contains(&lx)
            || !(0..CHUNK_SIZE).contains(&lz)
        {
            return None;
        }
        let yy = (y - MIN_BLOCK_Y) as usize;
        Some((yy / 16, lx as usize, yy % 16, lz as usize))
    }

    /// Block at local `(lx, lz)` and absolute `y`. Out-of-range reads are air.
    pub fn block(&self, lx: i32, y: i32, lz: i32) -> BlockId {
        Self::locate(lx, y, lz)
            .and_then(|(s, x, y, z)| self.sections.get(s).map(|sec| sec.get_block(x, y, z)))
            .unwrap_or(AIR)
    }

    pub fn metadata(&self, lx: i32, y: i32, lz: i32) -> u8 {
        Self::locate(lx, y, lz)
            .and_then(|(s, x, y, z)| self.sections.get(s).map(|sec| sec.get_metadata(x, y, z)))
            .unwrap_or(0)
    }

    /// Returns `false` if the coordinates fall outside the column.
    pub fn set_block(&mut self, lx: i32, y: i32, lz: i32, block: BlockId, metadata: u8) -> bool {
        match Self::locate(lx, y, lz) {
            Some((s, x, y, z)) => match self.sections.get_mut(s) {
                Some(sec) => {
                    sec.set_block(x, y, z, block, metadata);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
}
