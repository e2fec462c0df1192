//! Voxel world access: block classification, chunk storage, and the query
//! traits consumed by the mob simulation.

pub mod block_registry;
pub mod chunk;
pub mod error;
pub mod flat_generator;
pub mod grid;
pub mod query;

pub use block_registry::{BlockId, BlockInfo, BlockRegistry, BlockShape};
pub use chunk::{BlockPos, ChunkColumn, ChunkPos};
pub use error::WorldError;
pub use grid::VoxelGrid;
pub use query::{BlockSink, BlockSource};

/// Edge length of one block in world units.
pub const BLOCK_SIZE: f32 = 1.0;

/// Lowest block Y coordinate stored in a chunk column.
pub const MIN_BLOCK_Y: i32 = 0;

/// Highest block Y coordinate stored in a chunk column.
pub const MAX_BLOCK_Y: i32 = 255;

/// Blocks per chunk edge on the X and Z axes.
pub const CHUNK_SIZE: i32 = 16;
