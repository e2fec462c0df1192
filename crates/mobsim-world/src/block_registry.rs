//! Block property registry mapping compact block IDs to their shape.
//!
//! The shape is the only material property the mob simulation cares about:
//! it decides whether a block can be stood on and whether a body fits through
//! it. Unknown IDs default to a full cube so that unexpected data never lets a
//! mob walk through a wall.

use std::collections::HashMap;

/// Compact block identifier (index into the block table).
pub type BlockId = u16;

/// Collision shape of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockShape {
    /// Nothing there (air, structure void).
    Empty,
    /// A full collision cube.
    Cube,
    /// Cross-shaped plant model: rendered, but walk-through.
    Cross,
    /// Fluid: walk-through, never standable.
    Liquid,
}

impl BlockShape {
    /// Whether a mob can stand on top of this block.
    pub const fn is_solid(self) -> bool {
        matches!(self, Self::Cube)
    }

    /// Whether a mob's body can occupy this block.
    pub const fn is_passable(self) -> bool {
        !self.is_solid()
    }
}

/// Properties for a single block type.
#[derive(Debug, Clone)]
pub struct BlockInfo {
    /// Namespaced block identifier, e.g. `"mobsim:stone"`.
    pub name: &'static str,
    pub shape: BlockShape,
    /// Metadata value at which a crop counts as fully grown, if harvestable.
    pub mature_metadata: Option<u8>,
}

pub const AIR: BlockId = 0;
pub const BEDROCK: BlockId = 1;
pub const STONE: BlockId = 2;
pub const DIRT: BlockId = 3;
pub const GRASS_BLOCK: BlockId = 4;
pub const COBBLESTONE: BlockId = 5;
pub const OAK_PLANKS: BlockId = 6;
pub const OAK_LOG: BlockId = 7;
pub const FARMLAND: BlockId = 8;
pub const SAND: BlockId = 9;
pub const GLASS: BlockId = 10;
pub const TALL_GRASS: BlockId = 11;
pub const FLOWER: BlockId = 12;
pub const SAPLING: BlockId = 13;
pub const WHEAT: BlockId = 14;
pub const CARROTS: BlockId = 15;
pub const WATER: BlockId = 16;
pub const STRUCTURE_VOID: BlockId = 17;

/// Registry mapping block IDs and names to block info.
pub struct BlockRegistry {
    by_name: HashMap<&'static str, BlockId>,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockRegistry {
    /// Build the name index over the static block table.
    pub fn new() -> Self {
        let by_name = BLOCK_DATA
            .iter()
            .enumerate()
            .map(|(id, info)| (info.name, id as BlockId))
            .collect();
        Self { by_name }
    }

    /// Look up block info by ID.
    pub fn get(&self, id: BlockId) -> Option<&'static BlockInfo> {
        BLOCK_DATA.get(id as usize)
    }

    /// Look up a block ID by its namespaced name.
    pub fn id_of(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    /// Shape of a block. Defaults to [`BlockShape::Cube`] for unknown IDs.
    pub fn shape(&self, id: BlockId) -> BlockShape {
        self.get(id).map(|info| info.shape).unwrap_or(BlockShape::Cube)
    }

    /// Whether the block is a crop that is ready to harvest at `metadata`.
    pub fn is_mature(&self, id: BlockId, metadata: u8) -> bool {
        self.get(id)
            .and_then(|info| info.mature_metadata)
            .is_some_and(|mature| metadata >= mature)
    }

    /// Number of known block types.
    pub fn len(&self) -> usize {
        BLOCK_DATA.len()
    }

    pub fn is_empty(&self) -> bool {
        BLOCK_DATA.is_empty()
    }
}

macro_rules! block {
    ($name:expr, $shape:ident) => {
        BlockInfo {
            name: $name,
            shape: BlockShape::$shape,
            mature_metadata: None,
        }
    };
    ($name:expr, $shape:ident, mature = $m:expr) => {
        BlockInfo {
            name: $name,
            shape: BlockShape::$shape,
            mature_metadata: Some($m),
        }
    };
}

/// Indexed by [`BlockId`]; order must match the constants above.
static BLOCK_DATA: &[BlockInfo] = &[
    block!("mobsim:air", Empty),
    block!("mobsim:bedrock", Cube),
    block!("mobsim:stone", Cube),
    block!("mobsim:dirt", Cube),
    block!("mobsim:grass_block", Cube),
    block!("mobsim:cobblestone", Cube),
    block!("mobsim:oak_planks", Cube),
    block!("mobsim:oak_log", Cube),
    block!("mobsim:farmland", Cube),
    block!("mobsim:sand", Cube),
    block!("mobsim:glass", Cube),
    block!("mobsim:tall_grass", Cross),
    block!("mobsim:flower", Cross),
    block!("mobsim:sapling", Cross),
    block!("mobsim:wheat", Cross, mature = 7),
    block!("mobsim:carrots", Cross, mature = 7),
    block!("mobsim:water", Liquid),
    block!("mobsim:structure_void", Empty),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_match_table() {
        let reg = BlockRegistry::new();
        assert_eq!(reg.id_of("mobsim:air"), Some(AIR));
        assert_eq!(reg.id_of("mobsim:grass_block"), Some(GRASS_BLOCK));
        assert_eq!(reg.id_of("mobsim:wheat"), Some(WHEAT));
        assert_eq!(reg.id_of("mobsim:structure_void"), Some(STRUCTURE_VOID));
        assert_eq!(reg.len(), 18);
    }

    #[test]
    fn cube_is_solid_not_passable() {
        let reg = BlockRegistry::new();
        assert!(reg.shape(STONE).is_solid());
        assert!(!reg.shape(STONE).is_passable());
    }

    #[test]
    fn cross_and_liquid_are_passable() {
        let reg = BlockRegistry::new();
        assert!(reg.shape(TALL_GRASS).is_passable());
        assert!(!reg.shape(TALL_GRASS).is_solid());
        assert!(reg.shape(WATER).is_passable());
        assert!(!reg.shape(WATER).is_solid());
    }

    #[test]
    fn unknown_defaults_to_cube() {
        let reg = BlockRegistry::new();
        assert_eq!(reg.shape(9999), BlockShape::Cube);
        assert!(reg.get(9999).is_none());
    }

    #[test]
    fn crop_maturity() {
        let reg = BlockRegistry::new();
        assert!(!reg.is_mature(WHEAT, 3));
        assert!(reg.is_mature(WHEAT, 7));
        assert!(!reg.is_mature(STONE, 15));
    }
}
