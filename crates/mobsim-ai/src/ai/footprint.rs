//! Standable-ground probing.
//!
//! A column is standable at block Y `g` when `g` is solid and the two blocks
//! above it are passable. Every grounded position in the crate comes from
//! [`probe_footprint`].

use mobsim_world::{BlockPos, BlockSource, BLOCK_SIZE, MAX_BLOCK_Y, MIN_BLOCK_Y};

/// Feet rest this far above the top face of the ground block.
pub const GROUND_EPSILON: f32 = 0.01;

/// Clearance (in blocks) a mob needs above its ground block.
pub const BODY_HEIGHT_BLOCKS: i32 = 2;

/// Ground found under a horizontal position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footing {
    /// World Y where feet rest.
    pub ground_y: f32,
    /// Block Y of the supporting block.
    pub ground_block_y: i32,
}

impl Footing {
    pub fn at_block(ground_block_y: i32) -> Self {
        Self {
            ground_y: (ground_block_y + 1) as f32 * BLOCK_SIZE + GROUND_EPSILON,
            ground_block_y,
        }
    }
}

pub(crate) fn block_coord(v: f32) -> i32 {
    (v / BLOCK_SIZE).floor() as i32
}

fn fits_above(world: &dyn BlockSource, x: i32, y: i32, z: i32) -> bool {
    (1..=BODY_HEIGHT_BLOCKS).all(|dy| world.is_passable(BlockPos::new(x, y + dy, z)))
}

/// Find the standable ground in the column under `(x, z)` nearest to `ref_y`.
///
/// The scan starts two blocks above the reference feet block so a one- or
/// two-block rise ahead is reported (and can then be rejected by
/// [`step_allowed`]). When the body already fits at the reference height the
/// scan starts at the feet block instead, so a low ceiling is never mistaken
/// for ground.
pub fn probe_footprint(world: &dyn BlockSource, x: f32, z: f32, ref_y: f32) -> Option<Footing> {
    let bx = block_coord(x);
    let bz = block_coord(z);
    let feet = block_coord(ref_y).clamp(MIN_BLOCK_Y, MAX_BLOCK_Y);

    let body_open = fits_above(world, bx, feet - 1, bz);
    let top = if body_open { feet } else { feet + 2 }.min(MAX_BLOCK_Y);

    (MIN_BLOCK_Y..=top)
        .rev()
        .find(|&y| world.is_solid(BlockPos::new(bx, y, bz)) && fits_above(world, bx, y, bz))
        .map(Footing::at_block)
}

/// Probe the center of a block column.
pub fn probe_column(world: &dyn BlockSource, bx: i32, bz: i32, ref_y: f32) -> Option<Footing> {
    let half = BLOCK_SIZE * 0.5;
    probe_footprint(
        world,
        bx as f32 * BLOCK_SIZE + half,
        bz as f32 * BLOCK_SIZE + half,
        ref_y,
    )
}

/// One step may rise at most one block and drop at most `max_step_down`.
pub fn step_allowed(from_block_y: i32, to_block_y: i32, max_step_down: i32) -> bool {
    let rise = to_block_y - from_block_y;
    rise <= 1 && -rise <= max_step_down
}
