//! Throttled, prioritized mob state deltas for observers.
//!
//! A batch holds at most `max_deltas_per_batch` entries. Deltas that miss the
//! cut are not queued: their mobs keep their last-sent snapshot and compete
//! again in the next batch.

use std::collections::HashMap;

use glam::Vec3;
use serde::Serialize;

use crate::ai::movement::angle_delta;
use crate::ai::spatial::ActorIndex;
use crate::config::BroadcastConfig;
use crate::mob::{Mob, MobId};

const PROXIMITY_WEIGHT: f32 = 4.0;
const SPEED_WEIGHT: f32 = 1.0;
const STATE_CHANGE_WEIGHT: f32 = 2.0;
const HEALTH_CHANGE_WEIGHT: f32 = 3.0;
const FIRST_SIGHT_WEIGHT: f32 = 5.0;
/// Speeds at or above this count fully towards priority.
const SPEED_CAP: f32 = 4.0;

/// One mob's published state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDelta {
    pub id: MobId,
    pub type_id: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub state: &'static str,
    pub health: f32,
}

#[derive(Debug, Clone, Copy)]
struct Sent {
    position: Vec3,
    yaw: f32,
    state: &'static str,
    health: f32,
}

#[derive(Debug, Default)]
pub struct DeltaBatcher {
    last_sent: HashMap<MobId, Sent>,
    next_at: f64,
}

impl DeltaBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a batch is due; arms the next interval when it is.
    pub fn due(&mut self, now: f64, config: &BroadcastConfig) -> bool {
        if now < self.next_at {
            return false;
        }
        self.next_at = now + config.interval;
        true
    }

    /// Drop the snapshot of a removed mob.
    pub fn forget(&mut self, id: MobId) {
        self.last_sent.remove(&id);
    }

    /// Build the next batch, highest priority first.
    pub fn collect<'m>(
        &mut self,
        mobs: impl IntoIterator<Item = &'m Mob>,
        actors: &ActorIndex,
        config: &BroadcastConfig,
    ) -> Vec<EntityDelta> {
        let mut scored: Vec<(f32, EntityDelta)> = Vec::new();
        for mob in mobs {
            let state = mob.state_name();
            let previous = self.last_sent.get(&mob.id);
            let mut priority = match previous {
                None => FIRST_SIGHT_WEIGHT,
                Some(prev) => {
                    let moved = prev.position.distance(mob.position) >= config.min_position_delta;
                    let turned = angle_delta(prev.yaw, mob.yaw).abs() >= config.min_yaw_delta;
                    let state_changed = prev.state != state;
                    let hurt = (prev.health - mob.health).abs() > f32::EPSILON;
                    if !(moved || turned || state_changed || hurt) {
                        continue;
                    }
                    let mut p = 0.0;
                    if state_changed {
                        p += STATE_CHANGE_WEIGHT;
                    }
                    if hurt {
                        p += HEALTH_CHANGE_WEIGHT;
                    }
                    p
                }
            };
            if let Some(d) = actors.nearest_distance(mob.position) {
                if config.relevance_distance > 0.0 {
                    priority += PROXIMITY_WEIGHT * (1.0 - d / config.relevance_distance).max(0.0);
                }
            }
            let speed = Vec3::new(mob.velocity.x, 0.0, mob.velocity.z).length();
            priority += SPEED_WEIGHT * (speed / SPEED_CAP).min(1.0);

            scored.push((
                priority,
                EntityDelta {
                    id: mob.id,
                    type_id: mob.type_id().to_string(),
                    position: mob.position,
                    velocity: mob.velocity,
                    yaw: mob.yaw,
                    state,
                    health: mob.health,
                },
            ));
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.id.cmp(&b.1.id)));
        scored.truncate(config.max_deltas_per_batch);

        scored
            .into_iter()
            .map(|(_, delta)| {
                self.last_sent.insert(
                    delta.id,
                    Sent {
                        position: delta.position,
                        yaw: delta.yaw,
                        state: delta.state,
                        health: delta.health,
                    },
                );
                delta
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::ai::brain::BrainState;
    use crate::mob::test_support::{flat_world, mob_at};

    fn herd(n: u64) -> Vec<Mob> {
        let world = flat_world();
        (0..n)
            .map(|i| {
                let mut mob = mob_at(&world, 0.5 + i as f32 * 2.0, 0.5, 2.0);
                mob.id = MobId(i + 1);
                mob
            })
            .collect()
    }

    #[test]
    fn unchanged_mobs_are_not_resent() {
        let mut mobs = herd(3);
        let mut batcher = DeltaBatcher::new();
        let index = ActorIndex::build(&[]);
        let cfg = BroadcastConfig::default();

        assert_eq!(batcher.collect(&mobs, &index, &cfg).len(), 3);
        assert!(batcher.collect(&mobs, &index, &cfg).is_empty());

        // sub-threshold jitter is ignored
        mobs[0].position.x += cfg.min_position_delta * 0.5;
        assert!(batcher.collect(&mobs, &index, &cfg).is_empty());

        mobs[1].position.x += 1.0;
        let batch = batcher.collect(&mobs, &index, &cfg);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, MobId(2));
    }

    #[test]
    fn state_and_health_changes_are_sent() {
        let mut mobs = herd(2);
        let mut batcher = DeltaBatcher::new();
        let index = ActorIndex::build(&[]);
        let cfg = BroadcastConfig::default();
        batcher.collect(&mobs, &index, &cfg);

        mobs[0].brain.state = BrainState::Panic {
            until: 5.0,
            direction: Vec3::X,
        };
        mobs[1].health -= 1.0;
        let batch = batcher.collect(&mobs, &index, &cfg);
        assert_eq!(batch.len(), 2);
        // health outranks state
        assert_eq!(batch[0].id, MobId(2));
        assert_eq!(batch[1].state, "panic");
    }

    #[test]
    fn cutoff_keeps_nearest_and_defers_rest() {
        let mobs = herd(5);
        let mut batcher = DeltaBatcher::new();
        // observer next to the last mob
        let actors = vec![Actor::new(1, Vec3::new(9.0, 4.01, 0.5))];
        let index = ActorIndex::build(&actors);
        let cfg = BroadcastConfig {
            max_deltas_per_batch: 2,
            ..BroadcastConfig::default()
        };

        let first = batcher.collect(&mobs, &index, &cfg);
        let ids: Vec<MobId> = first.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![MobId(5), MobId(4)]);

        // dropped deltas were not marked as sent
        let second = batcher.collect(&mobs, &index, &cfg);
        let ids: Vec<MobId> = second.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![MobId(3), MobId(2)]);
        assert_eq!(batcher.collect(&mobs, &index, &cfg).len(), 1);
        assert!(batcher.collect(&mobs, &index, &cfg).is_empty());
    }

    #[test]
    fn forget_resends_on_return() {
        let mobs = herd(1);
        let mut batcher = DeltaBatcher::new();
        let index = ActorIndex::build(&[]);
        let cfg = BroadcastConfig::default();
        batcher.collect(&mobs, &index, &cfg);
        batcher.forget(MobId(1));
        assert_eq!(batcher.collect(&mobs, &index, &cfg).len(), 1);
    }

    #[test]
    fn cadence() {
        let cfg = BroadcastConfig::default();
        let mut batcher = DeltaBatcher::new();
        assert!(batcher.due(0.0, &cfg));
        assert!(!batcher.due(0.05, &cfg));
        assert!(batcher.due(0.1, &cfg));
    }

    #[test]
    fn delta_serializes() {
        let mobs = herd(1);
        let mut batcher = DeltaBatcher::new();
        let batch = batcher.collect(&mobs, &ActorIndex::build(&[]), &BroadcastConfig::default());
        let json = serde_json::to_string(&batch[0]).unwrap();
        assert!(json.contains("\"state\":\"idle\""));
        assert!(json.contains("\"type_id\":\"test:walker\""));
    }
}
