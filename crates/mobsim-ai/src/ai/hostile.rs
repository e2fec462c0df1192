//! Hostile mob ladder: chase and attack the nearest visible actor, otherwise
//! roam.

use tracing::debug;

use crate::ai::behavior::{roam, ThinkContext};
use crate::ai::brain::BrainState;
use crate::ai::navigator::Navigator;
use crate::ai::spatial::{horizontal_distance, line_of_sight, Nearest};
use crate::game_world::GameEvent;
use crate::mob::Mob;

/// Attacks only land when the target is within this many blocks vertically.
const MAX_ATTACK_RISE: f32 = 2.0;

pub fn think(mob: &mut Mob, ctx: &mut ThinkContext) {
    let now = ctx.now;
    let nav = Navigator::new(ctx.config);
    let def = mob.def.clone();

    let Some(target) = acquire(mob, ctx) else {
        if matches!(
            mob.brain.state,
            BrainState::Chase { .. } | BrainState::Attack { .. }
        ) {
            debug!(mob = %mob.id, "Lost target");
            mob.nav.clear();
            mob.brain.state = BrainState::expired_idle(now, mob.yaw);
        }
        roam(mob, ctx, &nav, false);
        return;
    };

    let actor = target.actor;
    if target.distance <= def.melee_hold_distance {
        mob.nav.clear();
        mob.brain.state = BrainState::Attack {
            target: actor.id,
            last_seen: actor.position,
        };
    } else {
        if !nav.move_to_position(mob, ctx.world, actor.position, def.run_speed, def.aggro_range * 2.0, now) {
            debug!(mob = %mob.id, target = %actor.id, "No chase path, closing in directly");
        }
        mob.brain.state = BrainState::Chase {
            target: actor.id,
            last_seen: actor.position,
        };
    }

    let rise = (actor.position.y - mob.position.y).abs();
    if target.distance <= def.attack_range
        && rise <= MAX_ATTACK_RISE
        && mob.brain.attack_ready(now, def.attack_cooldown)
    {
        ctx.combat.apply_damage(actor.id, def.attack_damage);
        mob.brain.last_attack_at = Some(now);
        ctx.events.push(GameEvent::MobAttack {
            id: mob.id,
            target: actor.id,
            damage: def.attack_damage,
        });
    }
}

/// Keep the current target while it stays visible inside aggro range;
/// otherwise take the nearest visible actor.
fn acquire<'a>(mob: &Mob, ctx: &ThinkContext<'a>) -> Option<Nearest<'a>> {
    let range = mob.def.aggro_range;
    if range <= 0.0 {
        return None;
    }
    let eye = mob.eye();
    if let Some(current) = mob.brain.state.target().and_then(|id| ctx.actors.get(id)) {
        let distance = horizontal_distance(mob.position, current.position);
        if distance <= range && line_of_sight(ctx.world, eye, current.eye()) {
            return Some(Nearest {
                actor: current,
                distance,
            });
        }
    }
    ctx.actors.nearest_visible(ctx.world, mob.position, eye, range)
}
