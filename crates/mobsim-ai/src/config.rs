//! Tunables for navigation, movement, scheduling, separation, broadcast,
//! natural spawning and damage. Every section deserializes with defaults, so
//! a config file only needs to name the values it changes.

use serde::Deserialize;

use crate::error::AiError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub navigation: NavigationConfig,
    pub movement: MovementConfig,
    pub scheduler: SchedulerConfig,
    pub separation: SeparationConfig,
    pub broadcast: BroadcastConfig,
    pub spawning: SpawnConfig,
    pub damage: DamageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Horizontal distance at which an intermediate waypoint counts as reached.
    pub arrival_radius: f32,
    /// Horizontal distance at which the final waypoint counts as reached.
    pub final_arrival_radius: f32,
    /// Seconds without progress before a path is considered stuck.
    pub stuck_duration: f64,
    /// Minimum displacement (blocks) that counts as progress.
    pub stuck_progress_epsilon: f32,
    /// Seconds between forced re-plans of an active path.
    pub repath_interval: f64,
    /// How far (blocks) a goal may drift before the path is rebuilt.
    pub repath_tolerance: f32,
    /// Hard cap on A* node expansions per query.
    pub max_path_nodes: usize,
    /// Default search range (Manhattan blocks) when a caller has no opinion.
    pub max_range_blocks: f32,
    /// Ring radius searched for a standable substitute goal.
    pub goal_search_radius: i32,
    pub step_up_penalty: f32,
    pub step_down_penalty: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            arrival_radius: 0.5,
            final_arrival_radius: 0.2,
            stuck_duration: 1.5,
            stuck_progress_epsilon: 0.15,
            repath_interval: 2.5,
            repath_tolerance: 1.5,
            max_path_nodes: 400,
            max_range_blocks: 48.0,
            goal_search_radius: 4,
            step_up_penalty: 0.5,
            step_down_penalty: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Horizontal acceleration limit in blocks/s².
    pub acceleration: f32,
    /// Distance from an arrive target inside which speed ramps down.
    pub arrive_radius: f32,
    /// Lowest speed fraction used while arriving, so mobs never crawl forever.
    pub min_arrive_fraction: f32,
    /// Largest drop (blocks) accepted for ordinary movement.
    pub max_step_down_blocks: i32,
    /// Largest drop accepted by an emergency step-down.
    pub emergency_step_down_blocks: i32,
    /// How far ahead (blocks) cliff probes sample.
    pub cliff_probe_distance: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            acceleration: 24.0,
            arrive_radius: 1.0,
            min_arrive_fraction: 0.3,
            max_step_down_blocks: 3,
            emergency_step_down_blocks: 6,
            cliff_probe_distance: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// A mob becomes active inside this distance of any actor.
    pub active_distance: f32,
    /// An active mob becomes inactive only beyond this distance.
    pub inactive_distance: f32,
    pub active_think_min: f64,
    pub active_think_max: f64,
    pub inactive_think_min: f64,
    pub inactive_think_max: f64,
    /// Seconds between stationary automation passes.
    pub automation_interval: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            active_distance: 48.0,
            inactive_distance: 64.0,
            active_think_min: 0.125,
            active_think_max: 0.2,
            inactive_think_min: 0.9,
            inactive_think_max: 1.43,
            automation_interval: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeparationConfig {
    /// Velocity nudge per unit of overlap fraction (blocks/s).
    pub separation_strength: f32,
    /// Cap on the velocity nudge applied to one mob in one heartbeat.
    pub max_push_rate: f32,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            separation_strength: 4.0,
            max_push_rate: 1.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Seconds between delta batches.
    pub interval: f64,
    /// Deltas beyond this count are dropped for the batch.
    pub max_deltas_per_batch: usize,
    pub min_position_delta: f32,
    pub min_yaw_delta: f32,
    /// Distance at which proximity stops contributing to priority.
    pub relevance_distance: f32,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            interval: 0.1,
            max_deltas_per_batch: 64,
            min_position_delta: 0.05,
            min_yaw_delta: 2.0,
            relevance_distance: 96.0,
        }
    }
}

/// Configuration for natural mob spawning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub enabled: bool,
    /// Maximum hostile mobs in the world.
    pub hostile_cap: usize,
    /// Maximum passive mobs in the world.
    pub passive_cap: usize,
    /// Minimum distance from the chosen actor to spawn (blocks).
    pub min_distance: f32,
    /// Maximum distance from the chosen actor to spawn (blocks).
    pub max_distance: f32,
    /// Seconds between spawn attempts.
    pub spawn_interval: f64,
    /// Seconds between despawn checks.
    pub despawn_interval: f64,
    /// Distance beyond which unpinned mobs are despawned.
    pub despawn_distance: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            hostile_cap: 20,
            passive_cap: 10,
            min_distance: 24.0,
            max_distance: 64.0,
            spawn_interval: 5.0,
            despawn_interval: 10.0,
            despawn_distance: 128.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DamageConfig {
    /// Damage taken within this many seconds of the last hit is ignored.
    pub invulnerable_secs: f64,
}

impl Default for DamageConfig {
    fn default() -> Self {
        Self {
            invulnerable_secs: 0.5,
        }
    }
}

impl AiConfig {
    /// Reject settings that would break hysteresis or scheduling.
    pub fn validate(&self) -> Result<(), AiError> {
        let s = &self.scheduler;
        if s.inactive_distance <= s.active_distance {
            return Err(AiError::InvalidConfig(format!(
                "inactive_distance ({}) must exceed active_distance ({})",
                s.inactive_distance, s.active_distance
            )));
        }
        if s.active_think_min <= 0.0 || s.active_think_min > s.active_think_max {
            return Err(AiError::InvalidConfig(
                "active think range must be positive and ordered".into(),
            ));
        }
        if s.inactive_think_min <= 0.0 || s.inactive_think_min > s.inactive_think_max {
            return Err(AiError::InvalidConfig(
                "inactive think range must be positive and ordered".into(),
            ));
        }
        if s.automation_interval <= 0.0 || self.broadcast.interval <= 0.0 {
            return Err(AiError::InvalidConfig("intervals must be positive".into()));
        }
        if self.damage.invulnerable_secs < 0.0 {
            return Err(AiError::InvalidConfig(
                "invulnerable_secs must not be negative".into(),
            ));
        }
        if self.navigation.max_path_nodes == 0 {
            return Err(AiError::InvalidConfig("max_path_nodes must be at least 1".into()));
        }
        if self.movement.max_step_down_blocks < 1 {
            return Err(AiError::InvalidConfig(
                "max_step_down_blocks must be at least 1".into(),
            ));
        }
        let sp = &self.spawning;
        if sp.enabled && sp.min_distance >= sp.max_distance {
            return Err(AiError::InvalidConfig(
                "spawning min_distance must be below max_distance".into(),
            ));
        }
        Ok(())
    }
}
