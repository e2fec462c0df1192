//! Flat terrain chunk generator.
//!
//! Default layout:
//! - Y = 0: Bedrock
//! - Y = 1-2: Dirt
//! - Y = 3: Grass Block
//! - Y = 4+: Air

use crate::block_registry::{BlockId, BEDROCK, DIRT, GRASS_BLOCK};
use crate::chunk::{ChunkColumn, ChunkPos};
use crate::{CHUNK_SIZE, MIN_BLOCK_Y};

/// Bottom-up list of `(block, thickness)` layers.
#[derive(Debug, Clone)]
pub struct FlatLayers(pub Vec<(BlockId, u8)>);

impl Default for FlatLayers {
    fn default() -> Self {
        Self(vec![(BEDROCK, 1), (DIRT, 2), (GRASS_BLOCK, 1)])
    }
}

impl FlatLayers {
    /// Y of the first air block above the layers (where mobs' feet rest).
    pub fn surface_y(&self) -> i32 {
        MIN_BLOCK_Y + self.0.iter().map(|&(_, t)| i32::from(t)).sum::<i32>()
    }
}

/// Generate a flat chunk column at the given chunk coordinates.
pub fn generate_flat_chunk(pos: ChunkPos, layers: &FlatLayers) -> ChunkColumn {
    let mut col = ChunkColumn::empty(pos);
    let mut y = MIN_BLOCK_Y;
    for &(block, thickness) in &layers.0 {
        for _ in 0..thickness {
            for x in 0..CHUNK_SIZE {
                for z in 0..CHUNK_SIZE {
                    col.set_block(x, y, z, block, 0);
                }
            }
            y += 1;
        }
    }
    col
}
