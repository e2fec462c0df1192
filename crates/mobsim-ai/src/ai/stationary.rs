//! Stationary automation: units that never move but harvest or place blocks
//! in a square footprint around their anchor.

use std::collections::HashSet;

use mobsim_world::block_registry::AIR;
use mobsim_world::{BlockId, BlockPos, BlockSink};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, warn};

use crate::ai::footprint::block_coord;
use crate::game_world::GameEvent;
use crate::mob::Mob;
use crate::mob_registry::AutomationDef;

/// What one automation cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationAction {
    Harvested(BlockPos),
    Placed(BlockPos),
}

/// Run one automation cycle if the mob's action timer has elapsed.
///
/// Cells already in `claims` belong to another unit this pass. At most one
/// block is changed per call.
pub fn run_cycle(
    mob: &mut Mob,
    world: &mut dyn BlockSink,
    claims: &mut HashSet<BlockPos>,
    now: f64,
    rng: &mut StdRng,
    events: &mut Vec<GameEvent>,
) -> Option<AutomationAction> {
    let def = mob.def.clone();
    let auto = def.automation.as_ref()?;
    if now < mob.brain.next_action_at {
        return None;
    }
    mob.brain.next_action_at = now + interval(auto, rng);

    let (action, block) = select(mob, world, claims, auto)?;
    let pos = match action {
        AutomationAction::Harvested(pos) | AutomationAction::Placed(pos) => pos,
    };
    claims.insert(pos);
    if let Err(e) = world.set_block(pos, block, 0) {
        warn!(mob = %mob.id, "Automation failed at ({}, {}, {}): {e}", pos.x, pos.y, pos.z);
        return None;
    }
    if let AutomationAction::Harvested(_) = action {
        mob.storage += 1;
    }
    debug!(mob = %mob.id, ?action, storage = mob.storage, "Automation action");
    events.push(GameEvent::BlockChanged {
        id: mob.id,
        pos,
        block,
    });
    Some(action)
}

fn interval(auto: &AutomationDef, rng: &mut StdRng) -> f64 {
    if auto.interval_max > auto.interval_min {
        rng.gen_range(auto.interval_min..=auto.interval_max)
    } else {
        auto.interval_min
    }
}

/// First actionable cell in scan order: harvesting beats placing.
fn select(
    mob: &Mob,
    world: &dyn BlockSink,
    claims: &HashSet<BlockPos>,
    auto: &AutomationDef,
) -> Option<(AutomationAction, BlockId)> {
    let cells = footprint_cells(mob, auto.footprint_radius);
    let usable = |pos: &BlockPos| !claims.contains(pos) && world.is_chunk_loaded(pos.chunk());

    if mob.storage < auto.storage_capacity {
        let ripe = cells
            .iter()
            .filter(|p| usable(p))
            .find(|&&p| world.block(p) == auto.harvest_block && world.is_mature(p));
        if let Some(&pos) = ripe {
            return Some((AutomationAction::Harvested(pos), AIR));
        }
    }
    if auto.place_block == AIR {
        return None;
    }
    cells
        .iter()
        .filter(|p| usable(p))
        .find(|&&p| world.block(p) == AIR && world.is_solid(p.below(1)))
        .map(|&pos| (AutomationAction::Placed(pos), auto.place_block))
}

/// Feet-level cells of the square footprint, row by row, without the unit's
/// own cell.
fn footprint_cells(mob: &Mob, radius: i32) -> Vec<BlockPos> {
    let cx = block_coord(mob.anchor.x);
    let cz = block_coord(mob.anchor.z);
    let y = mob.ground_block_y() + 1;
    let mut cells = Vec::new();
    for dz in -radius..=radius {
        for dx in -radius..=radius {
            if dx == 0 && dz == 0 {
                continue;
            }
            cells.push(BlockPos::new(cx + dx, y, cz + dz));
        }
    }
    cells
}
