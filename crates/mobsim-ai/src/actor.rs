//! Actors (players and similar) that mobs react to, and the combat sink that
//! receives mob attacks.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Eye offset above an actor's feet.
pub const ACTOR_EYE_HEIGHT: f32 = 1.62;

/// Identity of an actor owned by another subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Snapshot of one actor for this heartbeat.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: ActorId,
    /// Feet position.
    pub position: Vec3,
    /// Item identifier currently held, used for temptation.
    pub held_item: Option<String>,
    pub health: f32,
}

impl Actor {
    pub fn new(id: u64, position: Vec3) -> Self {
        Self {
            id: ActorId(id),
            position,
            held_item: None,
            health: 20.0,
        }
    }

    pub fn holding(mut self, item: &str) -> Self {
        self.held_item = Some(item.to_string());
        self
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn eye(&self) -> Vec3 {
        self.position + Vec3::Y * ACTOR_EYE_HEIGHT
    }
}

/// Enumerates the actors relevant to this world.
pub trait ActorDirectory {
    fn actors(&self) -> &[Actor];
}

impl ActorDirectory for [Actor] {
    fn actors(&self) -> &[Actor] {
        self
    }
}

impl ActorDirectory for Vec<Actor> {
    fn actors(&self) -> &[Actor] {
        self
    }
}

/// Receives damage dealt by hostile mobs.
pub trait CombatSink {
    fn apply_damage(&mut self, actor: ActorId, amount: f32);
}

/// A sink that records every hit, in order.
#[derive(Debug, Default)]
pub struct DamageLog {
    pub hits: Vec<(ActorId, f32)>,
}

impl CombatSink for DamageLog {
    fn apply_damage(&mut self, actor: ActorId, amount: f32) {
        self.hits.push((actor, amount));
    }
}

impl DamageLog {
    pub fn total_for(&self, actor: ActorId) -> f32 {
        self.hits
            .iter()
            .filter(|(a, _)| *a == actor)
            .map(|(_, d)| d)
            .sum()
    }
}
