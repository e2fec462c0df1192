//! Grid pathfinding over standable block columns.
//!
//! A query first tries a sampled straight line and only falls back to a
//! bounded A* search when the line is not walkable. Both honour the same step
//! rules as the movement integrator, so a returned path is always walkable.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::f32::consts::SQRT_2;

use glam::Vec3;
use mobsim_world::{BlockSource, BLOCK_SIZE};
use tracing::trace;

use crate::ai::footprint::{block_coord, probe_column, probe_footprint, step_allowed, Footing};
use crate::config::{MovementConfig, NavigationConfig};

/// Spacing of straight-line samples, in blocks.
pub const DIRECT_SAMPLE_STEP: f32 = 0.25;

/// N, E, S, W, then NE, SE, SW, NW. North is -Z.
const NEIGHBORS: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

/// Limits and costs for one path query.
#[derive(Debug, Clone)]
pub struct PathQuery {
    pub max_nodes: usize,
    /// Manhattan block distance beyond which the query fails immediately.
    pub max_range: f32,
    pub max_step_down: i32,
    pub step_up_penalty: f32,
    pub step_down_penalty: f32,
}

impl PathQuery {
    pub fn new(nav: &NavigationConfig, movement: &MovementConfig, max_range: f32) -> Self {
        Self {
            max_nodes: nav.max_path_nodes,
            max_range,
            max_step_down: movement.max_step_down_blocks,
            step_up_penalty: nav.step_up_penalty,
            step_down_penalty: nav.step_down_penalty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Straight line, a single waypoint at the goal.
    Direct,
    /// A* result through column centers.
    Searched { nodes_visited: usize },
}

/// A waypoint list with a cursor. The start position is never a waypoint.
#[derive(Debug, Clone)]
pub struct Path {
    waypoints: Vec<Vec3>,
    cursor: usize,
    kind: PathKind,
}

impl Path {
    fn direct(goal: Vec3) -> Self {
        Self {
            waypoints: vec![goal],
            cursor: 0,
            kind: PathKind::Direct,
        }
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    pub fn current(&self) -> Option<Vec3> {
        self.waypoints.get(self.cursor).copied()
    }

    pub fn is_last(&self) -> bool {
        self.cursor + 1 >= self.waypoints.len()
    }

    /// Move to the next waypoint. Returns false once the path is exhausted.
    pub fn advance(&mut self) -> bool {
        self.cursor += 1;
        self.cursor < self.waypoints.len()
    }

    pub fn remaining(&self) -> usize {
        self.waypoints.len().saturating_sub(self.cursor)
    }

    pub fn goal(&self) -> Option<Vec3> {
        self.waypoints.last().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Column {
    x: i32,
    z: i32,
}

impl Column {
    fn of(p: Vec3) -> Self {
        Self {
            x: block_coord(p.x),
            z: block_coord(p.z),
        }
    }

    fn manhattan(self, other: Column) -> i32 {
        (self.x - other.x).abs() + (self.z - other.z).abs()
    }

    fn center(self, ground_y: f32) -> Vec3 {
        let half = BLOCK_SIZE * 0.5;
        Vec3::new(
            self.x as f32 * BLOCK_SIZE + half,
            ground_y,
            self.z as f32 * BLOCK_SIZE + half,
        )
    }
}

/// Open-set entry. Lowest f first, then lowest h, then earliest insertion.
#[derive(Debug)]
struct OpenNode {
    f: f32,
    h: f32,
    seq: u64,
    col: Column,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.h.total_cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

struct NodeInfo {
    g: f32,
    parent: Option<Column>,
    footing: Footing,
    closed: bool,
}

/// Find a walkable path from `start` to `goal`.
///
/// Returns `None` when either end has no standable ground, the goal is out of
/// range, or the search budget runs out.
pub fn find_path(
    world: &dyn BlockSource,
    start: Vec3,
    goal: Vec3,
    query: &PathQuery,
) -> Option<Path> {
    let start_foot = probe_footprint(world, start.x, start.z, start.y)?;
    let goal_foot = probe_footprint(world, goal.x, goal.z, goal.y)?;
    let start_col = Column::of(start);
    let goal_col = Column::of(goal);

    if start_col.manhattan(goal_col) as f32 > query.max_range {
        trace!("Path goal out of range");
        return None;
    }

    let goal_point = Vec3::new(goal.x, goal_foot.ground_y, goal.z);
    if start_col == goal_col {
        if !step_allowed(start_foot.ground_block_y, goal_foot.ground_block_y, query.max_step_down) {
            return None;
        }
        return Some(Path::direct(goal_point));
    }
    // The straight line may reach the goal column on another level, e.g. the
    // floor under an overhang the goal stands on.
    let reached = direct_walkable(world, start, start_foot, goal, query);
    if reached.is_some_and(|f| f.ground_block_y == goal_foot.ground_block_y) {
        return Some(Path::direct(goal_point));
    }

    search(world, start_col, start_foot, goal_col, goal_foot, goal_point, query)
}

/// Sample the straight segment and accept it only when every consecutive pair
/// of samples is a legal step, no sample rises more than one block above the
/// start, and no diagonal column change cuts a blocked corner. Returns the
/// footing reached in the goal column.
fn direct_walkable(
    world: &dyn BlockSource,
    start: Vec3,
    start_foot: Footing,
    goal: Vec3,
    query: &PathQuery,
) -> Option<Footing> {
    let delta = Vec3::new(goal.x - start.x, 0.0, goal.z - start.z);
    let samples = (delta.length() / DIRECT_SAMPLE_STEP).ceil().max(1.0) as usize;

    let mut prev_col = Column::of(start);
    let mut prev = start_foot;
    for i in 1..=samples {
        let p = start + delta * (i as f32 / samples as f32);
        let col = Column::of(p);
        if col == prev_col {
            continue;
        }
        if col.x != prev_col.x && col.z != prev_col.z {
            let corners = [(col.x, prev_col.z), (prev_col.x, col.z)];
            let clear = corners.iter().all(|&(cx, cz)| {
                probe_column(world, cx, cz, prev.ground_y)
                    .is_some_and(|f| step_allowed(prev.ground_block_y, f.ground_block_y, query.max_step_down))
            });
            if !clear {
                return None;
            }
        }
        let next = probe_footprint(world, p.x, p.z, prev.ground_y)?;
        if !step_allowed(prev.ground_block_y, next.ground_block_y, query.max_step_down)
            || next.ground_block_y - start_foot.ground_block_y > 1
        {
            return None;
        }
        prev_col = col;
        prev = next;
    }
    Some(prev)
}

fn search(
    world: &dyn BlockSource,
    start: Column,
    start_foot: Footing,
    goal: Column,
    goal_foot: Footing,
    goal_point: Vec3,
    query: &PathQuery,
) -> Option<Path> {
    let mut open = BinaryHeap::new();
    let mut nodes: HashMap<Column, NodeInfo> = HashMap::new();
    let mut seq = 0u64;
    let mut expanded = 0usize;

    nodes.insert(
        start,
        NodeInfo {
            g: 0.0,
            parent: None,
            footing: start_foot,
            closed: false,
        },
    );
    let h0 = start.manhattan(goal) as f32;
    open.push(OpenNode {
        f: h0,
        h: h0,
        seq,
        col: start,
    });

    while let Some(node) = open.pop() {
        let Some(info) = nodes.get_mut(&node.col) else {
            continue;
        };
        if info.closed {
            continue;
        }
        info.closed = true;
        let current = node.col;
        let current_g = info.g;
        let current_foot = info.footing;

        if current == goal {
            trace!(expanded, "Path found");
            return Some(rebuild(&nodes, goal, goal_point, expanded));
        }
        if expanded >= query.max_nodes {
            trace!(expanded, "Path search budget exhausted");
            return None;
        }
        expanded += 1;

        for (i, &(dx, dz)) in NEIGHBORS.iter().enumerate() {
            let next = Column {
                x: current.x + dx,
                z: current.z + dz,
            };
            if nodes.get(&next).is_some_and(|n| n.closed) {
                continue;
            }
            if start.manhattan(next) as f32 > query.max_range {
                continue;
            }
            // the goal column is only entered on the goal's own level
            let foot = if next == goal {
                goal_foot
            } else {
                let Some(foot) = probe_column(world, next.x, next.z, current_foot.ground_y) else {
                    continue;
                };
                foot
            };
            if !step_allowed(current_foot.ground_block_y, foot.ground_block_y, query.max_step_down) {
                continue;
            }
            let diagonal = i >= 4;
            if diagonal && !corners_clear(world, current, current_foot, dx, dz, query) {
                continue;
            }

            let rise = foot.ground_block_y - current_foot.ground_block_y;
            let mut cost = if diagonal { SQRT_2 } else { 1.0 };
            if rise > 0 {
                cost += query.step_up_penalty * rise as f32;
            } else if rise < 0 {
                cost += query.step_down_penalty * (-rise) as f32;
            }
            let g = current_g + cost;
            if nodes.get(&next).is_some_and(|n| n.g <= g) {
                continue;
            }
            nodes.insert(
                next,
                NodeInfo {
                    g,
                    parent: Some(current),
                    footing: foot,
                    closed: false,
                },
            );
            let h = next.manhattan(goal) as f32;
            seq += 1;
            open.push(OpenNode {
                f: g + h,
                h,
                seq,
                col: next,
            });
        }
    }
    None
}

/// Both orthogonal neighbors of a diagonal move must be walkable from here.
fn corners_clear(
    world: &dyn BlockSource,
    from: Column,
    from_foot: Footing,
    dx: i32,
    dz: i32,
    query: &PathQuery,
) -> bool {
    [(from.x + dx, from.z), (from.x, from.z + dz)]
        .iter()
        .all(|&(cx, cz)| {
            probe_column(world, cx, cz, from_foot.ground_y).is_some_and(|f| {
                step_allowed(from_foot.ground_block_y, f.ground_block_y, query.max_step_down)
            })
        })
}

fn rebuild(nodes: &HashMap<Column, NodeInfo>, goal: Column, goal_point: Vec3, nodes_visited: usize) -> Path {
    let mut waypoints = Vec::new();
    let mut cursor = Some(goal);
    while let Some(col) = cursor {
        let Some(info) = nodes.get(&col) else {
            break;
        };
        // the start column has no parent and is not a waypoint
        if info.parent.is_none() {
            break;
        }
        waypoints.push(col.center(info.footing.ground_y));
        cursor = info.parent;
    }
    waypoints.reverse();
    if let Some(last) = waypoints.last_mut() {
        *last = goal_point;
    }
    Path {
        waypoints,
        cursor: 0,
        kind: PathKind::Searched { nodes_visited },
    }
}

/// Nearest standable point to `goal` within `radius` blocks, searched in
/// growing square rings.
pub fn nearest_walkable(world: &dyn BlockSource, goal: Vec3, radius: i32) -> Option<Vec3> {
    let gx = block_coord(goal.x);
    let gz = block_coord(goal.z);
    if let Some(f) = probe_footprint(world, goal.x, goal.z, goal.y) {
        return Some(Vec3::new(goal.x, f.ground_y, goal.z));
    }
    for r in 1..=radius {
        let mut best: Option<(f32, Vec3)> = None;
        for dx in -r..=r {
            for dz in -r..=r {
                if dx.abs() != r && dz.abs() != r {
                    continue;
                }
                let col = Column {
                    x: gx + dx,
                    z: gz + dz,
                };
                let Some(f) = probe_column(world, col.x, col.z, goal.y) else {
                    continue;
                };
                let p = col.center(f.ground_y);
                let d = Vec3::new(p.x - goal.x, 0.0, p.z - goal.z).length_squared();
                if best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, p));
                }
            }
        }
        if let Some((_, p)) = best {
            return Some(p);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use mobsim_world::block_registry::{AIR, STONE};
    use mobsim_world::flat_generator::FlatLayers;
    use mobsim_world::{BlockPos, VoxelGrid};

    fn flat() -> VoxelGrid {
        VoxelGrid::flat(2, &FlatLayers::default())
    }

    fn query() -> PathQuery {
        PathQuery::new(&NavigationConfig::default(), &MovementConfig::default(), 48.0)
    }

    fn at(x: f32, z: f32) -> Vec3 {
        Vec3::new(x, 4.01, z)
    }

    /// Walk the waypoints and check every hop against the step rules.
    fn assert_walkable(world: &VoxelGrid, start: Vec3, path: &Path) {
        let mut prev = probe_footprint(world, start.x, start.z, start.y).unwrap();
        let mut prev_col = Column::of(start);
        for wp in path.waypoints() {
            let col = Column::of(*wp);
            assert!(
                (col.x - prev_col.x).abs() <= 1 && (col.z - prev_col.z).abs() <= 1
                    || path.kind() == PathKind::Direct,
                "waypoints must be adjacent"
            );
            let f = probe_footprint(world, wp.x, wp.z, prev.ground_y).unwrap();
            assert!(step_allowed(prev.ground_block_y, f.ground_block_y, 3));
            if col.x != prev_col.x && col.z != prev_col.z {
                for (cx, cz) in [(col.x, prev_col.z), (prev_col.x, col.z)] {
                    let c = probe_column(world, cx, cz, prev.ground_y).unwrap();
                    assert!(step_allowed(prev.ground_block_y, c.ground_block_y, 3));
                }
            }
            prev = f;
            prev_col = col;
        }
    }

    #[test]
    fn flat_corridor_is_direct() {
        let grid = flat();
        let path = find_path(&grid, at(0.5, 0.5), at(10.5, 0.5), &query()).unwrap();
        assert_eq!(path.kind(), PathKind::Direct);
        assert_eq!(path.waypoints().len(), 1);
        let goal = path.goal().unwrap();
        assert!((goal.x - 10.5).abs() < 1e-5);
        assert!((goal.y - 4.01).abs() < 1e-5);
    }

    #[test]
    fn same_column_is_direct() {
        let grid = flat();
        let path = find_path(&grid, at(0.2, 0.2), at(0.8, 0.7), &query()).unwrap();
        assert_eq!(path.kind(), PathKind::Direct);
    }

    #[test]
    fn wall_forces_search_around() {
        let mut grid = flat();
        grid.fill(BlockPos::new(4, 4, -3), BlockPos::new(4, 5, 3), STONE)
            .unwrap();
        let start = at(0.5, 0.5);
        let path = find_path(&grid, start, at(8.5, 0.5), &query()).unwrap();
        assert!(matches!(path.kind(), PathKind::Searched { nodes_visited } if nodes_visited > 0));
        for wp in path.waypoints() {
            let col = Column::of(*wp);
            assert!(!(col.x == 4 && (-3..=3).contains(&col.z)), "walked through wall");
        }
        assert_walkable(&grid, start, &path);
    }

    #[test]
    fn one_block_steps_are_climbed() {
        let mut grid = flat();
        // staircase along +X
        for (i, x) in (2..6).enumerate() {
            grid.fill(
                BlockPos::new(x, 4, -1),
                BlockPos::new(x, 4 + i as i32, 1),
                STONE,
            )
            .unwrap();
        }
        let start = at(0.5, 0.5);
        let goal = Vec3::new(5.5, 8.01, 0.5);
        let path = find_path(&grid, start, goal, &query()).unwrap();
        assert_walkable(&grid, start, &path);
        assert_eq!(Column::of(path.goal().unwrap()), Column { x: 5, z: 0 });
    }

    #[test]
    fn two_block_ledge_is_unreachable() {
        let mut grid = flat();
        // plateau two blocks high, surrounded by flat ground
        grid.fill(BlockPos::new(5, 4, -5), BlockPos::new(9, 5, 5), STONE)
            .unwrap();
        let goal = Vec3::new(7.5, 6.01, 0.5);
        assert!(find_path(&grid, at(0.5, 0.5), goal, &query()).is_none());
    }

    #[test]
    fn overhang_goal_needs_a_legal_climb() {
        let mut grid = flat();
        // floating slab two blocks above the floor; nothing climbs onto it
        grid.fill(BlockPos::new(6, 6, 0), BlockPos::new(6, 6, 0), STONE)
            .unwrap();
        let start = at(0.5, 0.5);
        let on_top = Vec3::new(6.5, 7.01, 0.5);
        assert!(find_path(&grid, start, on_top, &query()).is_none());

        // the floor under the slab stays reachable
        let under = find_path(&grid, start, at(6.5, 0.5), &query()).unwrap();
        assert_eq!(under.kind(), PathKind::Direct);
        assert!((under.goal().unwrap().y - 4.01).abs() < 1e-5);
    }

    #[test]
    fn deep_drop_is_not_taken() {
        let mut grid = flat();
        // raised start platform four blocks above a pit floor
        grid.fill(BlockPos::new(-2, 4, -2), BlockPos::new(0, 7, 2), STONE)
            .unwrap();
        let start = Vec3::new(-0.5, 8.01, 0.5);
        // one step east lands four blocks lower
        let result = find_path(&grid, start, at(2.5, 0.5), &query());
        assert!(result.is_none());
    }

    #[test]
    fn no_corner_cutting() {
        let mut grid = flat();
        // a pillar next to the diagonal
        grid.fill(BlockPos::new(1, 4, 0), BlockPos::new(1, 5, 0), STONE)
            .unwrap();
        let start = at(0.5, 0.5);
        let path = find_path(&grid, start, at(2.5, 2.5), &query()).unwrap();
        assert_walkable(&grid, start, &path);
    }

    #[test]
    fn diagonal_gap_between_pillars_is_refused() {
        let mut grid = flat();
        grid.fill(BlockPos::new(1, 4, 0), BlockPos::new(1, 5, 0), STONE)
            .unwrap();
        grid.fill(BlockPos::new(0, 4, 1), BlockPos::new(0, 5, 1), STONE)
            .unwrap();
        let start = at(0.5, 0.5);
        let path = find_path(&grid, start, at(1.5, 1.5), &query()).unwrap();
        // must go around, never straight through the pinch
        assert!(path.waypoints().len() > 1);
        assert_walkable(&grid, start, &path);
    }

    #[test]
    fn out_of_range_fails_fast() {
        let grid = flat();
        let mut q = query();
        q.max_range = 5.0;
        assert!(find_path(&grid, at(0.5, 0.5), at(20.5, 0.5), &q).is_none());
    }

    #[test]
    fn node_budget_bounds_search() {
        let mut grid = flat();
        // a box around the goal with no entrance
        grid.fill(BlockPos::new(8, 4, -4), BlockPos::new(16, 6, 4), STONE)
            .unwrap();
        grid.fill(BlockPos::new(9, 4, -3), BlockPos::new(15, 6, 3), AIR)
            .unwrap();
        let mut q = query();
        q.max_nodes = 30;
        assert!(find_path(&grid, at(0.5, 0.5), at(12.5, 0.5), &q).is_none());
    }

    #[test]
    fn goal_without_ground_fails() {
        let mut grid = flat();
        grid.fill(BlockPos::new(6, 0, 0), BlockPos::new(6, 3, 0), AIR)
            .unwrap();
        assert!(find_path(&grid, at(0.5, 0.5), at(6.5, 0.5), &query()).is_none());
    }

    #[test]
    fn nearest_walkable_substitutes() {
        let mut grid = flat();
        grid.fill(BlockPos::new(6, 0, 0), BlockPos::new(6, 3, 0), AIR)
            .unwrap();
        let sub = nearest_walkable(&grid, at(6.5, 0.5), 3).unwrap();
        let col = Column::of(sub);
        assert!((col.x - 6).abs() <= 1 && (col.z).abs() <= 1);
        assert!(!(col.x == 6 && col.z == 0));
        assert!(find_path(&grid, at(0.5, 0.5), sub, &query()).is_some());
    }

    #[test]
    fn search_is_deterministic() {
        let mut grid = flat();
        grid.fill(BlockPos::new(4, 4, -3), BlockPos::new(4, 5, 3), STONE)
            .unwrap();
        let a = find_path(&grid, at(0.5, 0.5), at(8.5, 0.5), &query()).unwrap();
        let b = find_path(&grid, at(0.5, 0.5), at(8.5, 0.5), &query()).unwrap();
        assert_eq!(a.waypoints(), b.waypoints());
    }

    #[test]
    fn cursor_walks_waypoints() {
        let mut path = Path::direct(Vec3::ONE);
        assert!(path.is_last());
        assert_eq!(path.remaining(), 1);
        assert!(!path.advance());
        assert!(path.current().is_none());
    }
}
