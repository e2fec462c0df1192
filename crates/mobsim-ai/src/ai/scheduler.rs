//! Activation and think scheduling.
//!
//! Mobs near an actor are active and think often; mobs far away think at a
//! slow jittered cadence. The enter and exit distances differ so a mob at the
//! border does not flap between the two.

use rand::Rng;

use crate::ai::brain::Brain;
use crate::config::SchedulerConfig;

/// Recompute `is_active` from the distance to the nearest actor.
/// Returns true when the flag changed.
pub fn update_activation(brain: &mut Brain, nearest_actor: Option<f32>, now: f64, config: &SchedulerConfig) -> bool {
    let was_active = brain.is_active;
    brain.is_active = match nearest_actor {
        Some(d) if was_active => d <= config.inactive_distance,
        Some(d) => d <= config.active_distance,
        None => false,
    };
    if brain.is_active && !was_active {
        // react promptly when an actor arrives
        brain.next_think_at = brain.next_think_at.min(now);
    }
    was_active != brain.is_active
}

pub fn think_due(brain: &Brain, now: f64) -> bool {
    now >= brain.next_think_at
}

/// Jittered delay until the next think.
pub fn think_interval(active: bool, rng: &mut impl Rng, config: &SchedulerConfig) -> f64 {
    let (lo, hi) = if active {
        (config.active_think_min, config.active_think_max)
    } else {
        (config.inactive_think_min, config.inactive_think_max)
    };
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

pub fn schedule_next_think(brain: &mut Brain, now: f64, rng: &mut impl Rng, config: &SchedulerConfig) {
    brain.next_think_at = now + think_interval(brain.is_active, rng, config);
}

/// Fixed-cadence gate for stationary automation passes.
#[derive(Debug, Clone)]
pub struct AutomationGate {
    next_at: f64,
}

impl AutomationGate {
    pub fn new(now: f64) -> Self {
        Self { next_at: now }
    }

    /// Whether a pass is due; arms the next one when it is.
    pub fn due(&mut self, now: f64, config: &SchedulerConfig) -> bool {
        if now < self.next_at {
            return false;
        }
        self.next_at = now + config.automation_interval;
        true
    }
}
