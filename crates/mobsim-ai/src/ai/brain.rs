//! Per-mob behavior state.
//!
//! Each mob is in exactly one [`BrainState`] at a time. States carry their own
//! data, so leaving a state drops everything that belonged to it.

use glam::Vec3;

use crate::actor::ActorId;

#[derive(Debug, Clone, PartialEq)]
pub enum BrainState {
    /// Standing still, occasionally turning to a new look direction.
    Idle {
        until: f64,
        look_yaw: f32,
        next_look_at: f64,
    },
    /// Standing still with the head down, turning now and then like `Idle`.
    Graze {
        until: f64,
        look_yaw: f32,
        next_look_at: f64,
    },
    Wander { target: Vec3, give_up_at: f64 },
    /// Running directly away from an actor.
    Flee { actor: ActorId, away: Vec3 },
    /// Running in a fixed direction after being hurt.
    Panic { until: f64, direction: Vec3 },
    /// Following an actor holding an attractant item.
    Tempted { actor: ActorId, last_seen: Vec3 },
    Chase { target: ActorId, last_seen: Vec3 },
    /// Holding position near a target and striking on cooldown.
    Attack { target: ActorId, last_seen: Vec3 },
    /// Stationary units never move; automation drives them.
    Stationary,
}

impl BrainState {
    /// An idle state that has already expired, so the next think picks anew.
    pub fn expired_idle(now: f64, yaw: f32) -> Self {
        BrainState::Idle {
            until: now,
            look_yaw: yaw,
            next_look_at: now,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BrainState::Idle { .. } => "idle",
            BrainState::Graze { .. } => "graze",
            BrainState::Wander { .. } => "wander",
            BrainState::Flee { .. } => "flee",
            BrainState::Panic { .. } => "panic",
            BrainState::Tempted { .. } => "tempted",
            BrainState::Chase { .. } => "chase",
            BrainState::Attack { .. } => "attack",
            BrainState::Stationary => "stationary",
        }
    }

    /// The actor this state is tracking, if any.
    pub fn target(&self) -> Option<ActorId> {
        match *self {
            BrainState::Flee { actor, .. } | BrainState::Tempted { actor, .. } => Some(actor),
            BrainState::Chase { target, .. } | BrainState::Attack { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// Scheduling and combat bookkeeping around the current state.
#[derive(Debug, Clone)]
pub struct Brain {
    pub state: BrainState,
    pub is_active: bool,
    pub next_think_at: f64,
    pub last_attack_at: Option<f64>,
    /// Next stationary automation action.
    pub next_action_at: f64,
}

impl Brain {
    pub fn new(state: BrainState, now: f64) -> Self {
        Self {
            state,
            is_active: false,
            next_think_at: now,
            last_attack_at: None,
            next_action_at: now,
        }
    }

    pub fn attack_ready(&self, now: f64, cooldown: f64) -> bool {
        self.last_attack_at.map_or(true, |t| now - t >= cooldown)
    }
}
