//! Passive mob ladder: panic, tempted, flee, then idle/graze/wander.

use crate::ai::behavior::{away_from, roam, ThinkContext};
use crate::ai::brain::BrainState;
use crate::ai::movement::heading_of;
use crate::ai::navigator::Navigator;
use crate::ai::spatial::{horizontal_distance, line_of_sight};
use crate::mob::Mob;

pub fn think(mob: &mut Mob, ctx: &mut ThinkContext) {
    let now = ctx.now;
    let nav = Navigator::new(ctx.config);

    if let BrainState::Panic { until, .. } = mob.brain.state {
        if now < until {
            return;
        }
        mob.brain.state = BrainState::expired_idle(now, mob.yaw);
    }
    if tempt(mob, ctx, &nav) {
        return;
    }
    if flee(mob, ctx) {
        return;
    }
    roam(mob, ctx, &nav, true);
}

/// Follow the nearest visible actor holding an attractant item.
fn tempt(mob: &mut Mob, ctx: &mut ThinkContext, nav: &Navigator) -> bool {
    let def = mob.def.clone();
    if def.tempt_items.is_empty() || def.tempt_range <= 0.0 {
        return false;
    }
    let eye = mob.eye();
    let world = ctx.world;
    let found = ctx.actors.nearest_where(mob.position, def.tempt_range, |a| {
        a.held_item.as_deref().is_some_and(|item| def.tempted_by(item))
            && line_of_sight(world, eye, a.eye())
    });
    let Some(found) = found else {
        if matches!(mob.brain.state, BrainState::Tempted { .. }) {
            mob.nav.clear();
            mob.brain.state = BrainState::expired_idle(ctx.now, mob.yaw);
        }
        return false;
    };

    let actor = found.actor;
    if found.distance <= def.tempt_stop_distance {
        mob.nav.clear();
    } else {
        nav.move_to_position(mob, world, actor.position, def.walk_speed, def.tempt_range * 2.0, ctx.now);
    }
    mob.brain.state = BrainState::Tempted {
        actor: actor.id,
        last_seen: actor.position,
    };
    true
}

/// Flee starts inside the enter distance and lasts until the threat is
/// beyond the wider exit distance.
fn flee(mob: &mut Mob, ctx: &mut ThinkContext) -> bool {
    let def = mob.def.clone();
    if def.flee_enter_distance <= 0.0 {
        return false;
    }
    let fallback = heading_of(mob.yaw);

    if let BrainState::Flee { actor, .. } = mob.brain.state {
        let threat = ctx
            .actors
            .get(actor)
            .filter(|a| horizontal_distance(mob.position, a.position) <= def.flee_exit_distance);
        if let Some(threat) = threat {
            mob.brain.state = BrainState::Flee {
                actor,
                away: away_from(mob.position, threat.position, fallback),
            };
            return true;
        }
        mob.brain.state = BrainState::expired_idle(ctx.now, mob.yaw);
        return false;
    }

    let Some(threat) = ctx.actors.nearest(mob.position, def.flee_enter_distance) else {
        return false;
    };
    mob.nav.clear();
    mob.brain.state = BrainState::Flee {
        actor: threat.actor.id,
        away: away_from(mob.position, threat.actor.position, fallback),
    };
    true
}
