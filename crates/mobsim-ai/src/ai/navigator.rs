//! Per-mob path following with re-planning and stuck detection.

use glam::Vec3;
use mobsim_world::BlockSource;
use tracing::debug;

use crate::ai::movement::{move_respecting_voxels, MoveIntent};
use crate::ai::pathfinding::{find_path, nearest_walkable, Path, PathQuery};
use crate::ai::spatial::horizontal_distance;
use crate::config::{AiConfig, MovementConfig, NavigationConfig};
use crate::mob::Mob;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    NoPath,
    Following,
    Stuck,
}

/// Navigation state carried by each mob.
#[derive(Debug, Clone)]
pub struct Navigation {
    state: NavState,
    path: Option<Path>,
    /// The goal as requested, before any substitution.
    goal: Vec3,
    speed: f32,
    max_range: f32,
    repath_at: f64,
    progress_anchor: Vec3,
    progress_at: f64,
    stuck_replanned: bool,
}

impl Default for Navigation {
    fn default() -> Self {
        Self {
            state: NavState::NoPath,
            path: None,
            goal: Vec3::ZERO,
            speed: 0.0,
            max_range: 0.0,
            repath_at: 0.0,
            progress_anchor: Vec3::ZERO,
            progress_at: 0.0,
            stuck_replanned: false,
        }
    }
}

impl Navigation {
    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    pub fn goal(&self) -> Option<Vec3> {
        (self.state == NavState::Following).then_some(self.goal)
    }

    pub fn is_following(&self) -> bool {
        self.state == NavState::Following
    }

    /// Drop the current path. A stuck report is cleared as well.
    pub fn clear(&mut self) {
        self.path = None;
        self.state = NavState::NoPath;
        self.stuck_replanned = false;
    }
}

/// Drives [`Navigation`] using the shared navigation and movement settings.
pub struct Navigator<'a> {
    nav: &'a NavigationConfig,
    movement: &'a MovementConfig,
}

impl<'a> Navigator<'a> {
    pub fn new(config: &'a AiConfig) -> Self {
        Self {
            nav: &config.navigation,
            movement: &config.movement,
        }
    }

    /// Request travel to `goal`. Keeps the current path when the goal moved
    /// less than the re-path tolerance and no re-plan is due.
    pub fn move_to_position(
        &self,
        mob: &mut Mob,
        world: &dyn BlockSource,
        goal: Vec3,
        speed: f32,
        max_range: f32,
        now: f64,
    ) -> bool {
        let nav = &mut mob.nav;
        nav.speed = speed;
        nav.max_range = max_range;
        if nav.state == NavState::Following
            && nav.path.is_some()
            && horizontal_distance(nav.goal, goal) <= self.nav.repath_tolerance
            && now < nav.repath_at
        {
            return true;
        }
        if nav.state != NavState::Following {
            nav.stuck_replanned = false;
        }
        self.plan(mob, world, goal, now)
    }

    pub fn clear_path(&self, mob: &mut Mob) {
        mob.nav.clear();
    }

    fn plan(&self, mob: &mut Mob, world: &dyn BlockSource, goal: Vec3, now: f64) -> bool {
        let target = nearest_walkable(world, goal, self.nav.goal_search_radius);
        let query = PathQuery::new(self.nav, self.movement, mob.nav.max_range);
        let path = target.and_then(|t| find_path(world, mob.position, t, &query));

        let nav = &mut mob.nav;
        nav.goal = goal;
        match path {
            Some(path) => {
                nav.path = Some(path);
                nav.state = NavState::Following;
                nav.repath_at = now + self.nav.repath_interval;
                nav.progress_anchor = mob.position;
                nav.progress_at = now;
                true
            }
            None => {
                debug!(mob = %mob.id, "No path to ({:.1}, {:.1}, {:.1})", goal.x, goal.y, goal.z);
                nav.path = None;
                nav.state = NavState::NoPath;
                false
            }
        }
    }

    /// Advance along the path for one sub-step. Returns whether the mob moved.
    pub fn tick(&self, mob: &mut Mob, world: &dyn BlockSource, dt: f32, now: f64) -> bool {
        if mob.nav.state != NavState::Following {
            return false;
        }
        if now >= mob.nav.repath_at {
            let goal = mob.nav.goal;
            if !self.plan(mob, world, goal, now) {
                return false;
            }
        }

        let (waypoint, last) = {
            let Some(path) = mob.nav.path.as_mut() else {
                mob.nav.state = NavState::NoPath;
                return false;
            };
            loop {
                let Some(wp) = path.current() else {
                    break (None, true);
                };
                let last = path.is_last();
                let radius = if last {
                    self.nav.final_arrival_radius
                } else {
                    self.nav.arrival_radius
                };
                if horizontal_distance(mob.position, wp) > radius {
                    break (Some(wp), last);
                }
                if !path.advance() {
                    break (None, true);
                }
                mob.nav.stuck_replanned = false;
            }
        };

        let Some(waypoint) = waypoint else {
            let nav = &mut mob.nav;
            nav.path = None;
            nav.state = NavState::NoPath;
            nav.stuck_replanned = false;
            return false;
        };

        let intent = MoveIntent {
            direction: waypoint - mob.position,
            speed: mob.nav.speed,
            arrive_at: last.then_some(waypoint),
        };
        let moved = move_respecting_voxels(mob, world, &intent, dt, self.movement);

        let nav = &mut mob.nav;
        if horizontal_distance(mob.position, nav.progress_anchor) >= self.nav.stuck_progress_epsilon {
            nav.progress_anchor = mob.position;
            nav.progress_at = now;
        } else if now - nav.progress_at >= self.nav.stuck_duration {
            return self.handle_stuck(mob, world, now);
        }
        moved
    }

    /// First stall re-plans once; a second stall before reaching a waypoint
    /// reports `Stuck` and drops the path.
    fn handle_stuck(&self, mob: &mut Mob, world: &dyn BlockSource, now: f64) -> bool {
        if !mob.nav.stuck_replanned {
            mob.nav.stuck_replanned = true;
            let goal = mob.nav.goal;
            if self.plan(mob, world, goal, now) {
                debug!(mob = %mob.id, "Re-planned after stall");
                return false;
            }
        }
        debug!(mob = %mob.id, "Navigation stuck");
        mob.nav.path = None;
        mob.nav.state = NavState::Stuck;
        mob.velocity.x = 0.0;
        mob.velocity.z = 0.0;
        false
    }
}
