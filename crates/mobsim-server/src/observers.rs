//! Simulated observers standing in for connected players.
//!
//! Each observer walks towards a random point inside the loaded area, picks a
//! new one on arrival and respawns at the origin after being killed.

use glam::Vec3;
use mobsim_ai::{Actor, ActorDirectory, ActorId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

const ARRIVE_DISTANCE: f32 = 0.5;
const RESPAWN_SECS: f32 = 5.0;
const MAX_HEALTH: f32 = 20.0;

struct Walker {
    target: Vec3,
    dead_for: f32,
}

pub struct Observers {
    actors: Vec<Actor>,
    walkers: Vec<Walker>,
    /// Half extent of the walkable square around the origin.
    half_extent: f32,
    feet_y: f32,
    speed: f32,
    rng: StdRng,
}

impl Observers {
    pub fn new(count: usize, half_extent: f32, feet_y: f32, speed: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut actors = Vec::with_capacity(count);
        let mut walkers = Vec::with_capacity(count);
        for i in 0..count {
            let start = random_point(&mut rng, half_extent, feet_y);
            actors.push(Actor::new(i as u64 + 1, start));
            walkers.push(Walker {
                target: random_point(&mut rng, half_extent, feet_y),
                dead_for: 0.0,
            });
        }
        Self {
            actors,
            walkers,
            half_extent,
            feet_y,
            speed,
            rng,
        }
    }

    /// Advance every observer by `dt` seconds.
    pub fn wander(&mut self, dt: f32) {
        for (actor, walker) in self.actors.iter_mut().zip(&mut self.walkers) {
            if !actor.is_alive() {
                walker.dead_for += dt;
                if walker.dead_for >= RESPAWN_SECS {
                    walker.dead_for = 0.0;
                    actor.health = MAX_HEALTH;
                    actor.position = Vec3::new(0.5, self.feet_y, 0.5);
                    info!("{} respawned", actor.id);
                }
                continue;
            }
            let to_target = walker.target - actor.position;
            let distance = to_target.length();
            if distance <= ARRIVE_DISTANCE {
                walker.target = random_point(&mut self.rng, self.half_extent, self.feet_y);
                continue;
            }
            let step = (self.speed * dt).min(distance);
            actor.position += to_target / distance * step;
        }
    }

    /// Apply a hit from a mob.
    pub fn hurt(&mut self, id: ActorId, amount: f32) {
        let Some(actor) = self.actors.iter_mut().find(|a| a.id == id) else {
            return;
        };
        if !actor.is_alive() {
            return;
        }
        actor.health = (actor.health - amount).max(0.0);
        if !actor.is_alive() {
            info!("{id} was killed");
        }
    }
}

impl ActorDirectory for Observers {
    fn actors(&self) -> &[Actor] {
        &self.actors
    }
}

fn random_point(rng: &mut StdRng, half_extent: f32, feet_y: f32) -> Vec3 {
    if half_extent <= 0.0 {
        return Vec3::new(0.5, feet_y, 0.5);
    }
    Vec3::new(
        rng.gen_range(-half_extent..half_extent),
        feet_y,
        rng.gen_range(-half_extent..half_extent),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observers_stay_inside_the_area() {
        let mut observers = Observers::new(3, 8.0, 4.01, 4.0, 7);
        assert_eq!(observers.actors().len(), 3);
        for _ in 0..500 {
            observers.wander(0.05);
            for actor in observers.actors() {
                assert!(actor.position.x.abs() <= 8.0 && actor.position.z.abs() <= 8.0);
                assert!((actor.position.y - 4.01).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn walking_speed_is_bounded() {
        let mut observers = Observers::new(1, 16.0, 4.01, 2.0, 3);
        let before = observers.actors()[0].position;
        observers.wander(0.5);
        let after = observers.actors()[0].position;
        assert!(before.distance(after) <= 1.0 + 1e-4);
    }

    #[test]
    fn killed_observer_respawns() {
        let mut observers = Observers::new(1, 8.0, 4.01, 2.0, 1);
        let id = observers.actors()[0].id;
        observers.hurt(id, 25.0);
        assert!(!observers.actors()[0].is_alive());
        let frozen = observers.actors()[0].position;
        observers.wander(1.0);
        assert_eq!(observers.actors()[0].position, frozen);

        observers.wander(RESPAWN_SECS);
        let actor = &observers.actors()[0];
        assert!(actor.is_alive());
        assert_eq!(actor.health, MAX_HEALTH);
        assert_eq!(actor.position, Vec3::new(0.5, 4.01, 0.5));
    }

    #[test]
    fn unknown_observer_hit_is_ignored() {
        let mut observers = Observers::new(1, 8.0, 4.01, 2.0, 1);
        observers.hurt(ActorId(99), 5.0);
        assert_eq!(observers.actors()[0].health, MAX_HEALTH);
    }
}
