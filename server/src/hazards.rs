//! Contact, timed and moving trap behaviours.
//!
//! The step only runs while the round is live. Traps never hurt builders, so
//! only living attackers are considered targets. Moving traps update their
//! own position and hitbox; the caller mirrors that into the collision world.

use crate::traps::{FireCycle, Trap, TrapBoard, TrapRuntime};
use shared::{Aabb, ClientId, EntityId, MatchRules, Role, TrapBehaviour, Vec2};
use std::collections::HashSet;

/// A player as the hazard and bot steps see it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intruder {
    pub id: ClientId,
    pub role: Role,
    pub bounds: Aabb,
    pub alive: bool,
}

impl Intruder {
    fn is_target(&self) -> bool {
        self.alive && self.role == Role::Attacker
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HazardEffect {
    Damage {
        target: ClientId,
        amount: i32,
        trap: EntityId,
    },
    /// A projectile to spawn on the trap's behalf.
    Launch {
        trap: EntityId,
        origin: Vec2,
        direction: Vec2,
        speed: f32,
        damage: i32,
        lifetime: f32,
    },
}

pub fn step_hazards(
    board: &mut TrapBoard,
    rules: &MatchRules,
    intruders: &[Intruder],
    now: f64,
    dt: f32,
) -> Vec<HazardEffect> {
    let mut effects = Vec::new();
    for trap in board.iter_mut() {
        let Some(def) = rules.trap(trap.kind) else {
            continue;
        };
        match def.behaviour {
            TrapBehaviour::Spikes {
                damage,
                hit_cooldown,
            } => spikes(trap, intruders, now, damage, hit_cooldown, &mut effects),
            TrapBehaviour::ArrowLauncher {
                cooldown,
                projectile_speed,
                damage,
                lifetime,
            } => {
                let TrapRuntime::ArrowLauncher { next_fire } = &mut trap.runtime else {
                    continue;
                };
                let due = *next_fire.get_or_insert(now + cooldown as f64);
                if now >= due {
                    *next_fire = Some(now + cooldown as f64);
                    let direction = trap.facing();
                    effects.push(HazardEffect::Launch {
                        trap: trap.id,
                        origin: trap.position + direction * (def.size.y * 0.5),
                        direction,
                        speed: projectile_speed,
                        damage,
                        lifetime,
                    });
                }
            }
            TrapBehaviour::Firetrap {
                activation_delay,
                active_time,
                damage_per_second,
            } => firetrap(
                trap,
                intruders,
                now,
                dt,
                (activation_delay, active_time, damage_per_second),
                &mut effects,
            ),
            TrapBehaviour::Spikehead {
                speed,
                range,
                check_delay,
                damage,
            } => spikehead(
                trap,
                intruders,
                dt,
                (speed, range, check_delay, damage),
                &mut effects,
            ),
            TrapBehaviour::Saw {
                movement_distance,
                speed,
                damage,
            } => saw(
                trap,
                intruders,
                dt,
                (movement_distance, speed, damage),
                &mut effects,
            ),
            TrapBehaviour::Inert | TrapBehaviour::Defender(_) => {}
        }
    }
    effects
}

fn touching<'a>(trap: &'a Trap, intruders: &'a [Intruder]) -> impl Iterator<Item = &'a Intruder> {
    intruders
        .iter()
        .filter(move |i| i.is_target() && i.bounds.intersects(&trap.bounds))
}

fn spikes(
    trap: &mut Trap,
    intruders: &[Intruder],
    now: f64,
    damage: i32,
    hit_cooldown: f32,
    effects: &mut Vec<HazardEffect>,
) {
    let hits: Vec<ClientId> = touching(trap, intruders).map(|i| i.id).collect();
    let TrapRuntime::Spikes { last_hit } = &mut trap.runtime else {
        return;
    };
    for target in hits {
        let ready = last_hit
            .get(&target)
            .map_or(true, |last| now - last >= hit_cooldown as f64);
        if ready {
            last_hit.insert(target, now);
            effects.push(HazardEffect::Damage {
                target,
                amount: damage,
                trap: trap.id,
            });
        }
    }
}

fn firetrap(
    trap: &mut Trap,
    intruders: &[Intruder],
    now: f64,
    dt: f32,
    (activation_delay, active_time, damage_per_second): (f32, f32, f32),
    effects: &mut Vec<HazardEffect>,
) {
    let inside: Vec<ClientId> = touching(trap, intruders).map(|i| i.id).collect();
    let trap_id = trap.id;
    let TrapRuntime::Firetrap { cycle, carry } = &mut trap.runtime else {
        return;
    };

    *cycle = match *cycle {
        FireCycle::Idle if !inside.is_empty() => FireCycle::Arming {
            active_at: now + activation_delay as f64,
        },
        FireCycle::Arming { active_at } if now >= active_at => FireCycle::Active {
            until: active_at + active_time as f64,
        },
        FireCycle::Active { until } if now >= until => {
            *carry = 0.0;
            FireCycle::Idle
        }
        other => other,
    };

    if !matches!(cycle, FireCycle::Active { .. }) {
        return;
    }
    if inside.is_empty() {
        *carry = 0.0;
        return;
    }

    *carry += damage_per_second * dt;
    let whole = carry.floor();
    if whole >= 1.0 {
        *carry -= whole;
        for target in inside {
            effects.push(HazardEffect::Damage {
                target,
                amount: whole as i32,
                trap: trap_id,
            });
        }
    }
}

/// Box a trap's centre may occupy while its hitbox stays in `arena`.
fn centre_limit(arena: Aabb, bounds: &Aabb) -> Aabb {
    let half = bounds.size() * 0.5;
    Aabb::new(arena.min + half, arena.max - half)
}

/// Idle, it looks along its four local axes every `check_delay` seconds.
/// Once an attacker is in line it charges that way until it reaches the
/// room wall or runs into an attacker, which takes one hit.
fn spikehead(
    trap: &mut Trap,
    intruders: &[Intruder],
    dt: f32,
    (speed, range, check_delay, damage): (f32, f32, f32, i32),
    effects: &mut Vec<HazardEffect>,
) {
    let axes = [trap.side(), -trap.side(), trap.facing(), -trap.facing()];
    let origin = trap.position;
    let bounds = trap.bounds;
    let TrapRuntime::Spikehead {
        arena,
        check_timer,
        charge,
    } = &mut trap.runtime
    else {
        return;
    };

    let Some(direction) = *charge else {
        *check_timer += dt;
        if *check_timer > check_delay {
            *check_timer = 0.0;
            *charge = axes.into_iter().find(|axis| {
                intruders
                    .iter()
                    .any(|i| i.is_target() && i.bounds.ray_hit(origin, *axis, range).is_some())
            });
        }
        return;
    };

    let wanted = origin + direction * (speed * dt);
    let next = centre_limit(*arena, &bounds).closest_point(wanted);
    if next.distance(wanted) > 1e-4 {
        *charge = None;
    }
    trap.move_to(next);

    let hits: Vec<ClientId> = touching(trap, intruders).map(|i| i.id).collect();
    if hits.is_empty() {
        return;
    }
    for target in hits {
        effects.push(HazardEffect::Damage {
            target,
            amount: damage,
            trap: trap.id,
        });
    }
    if let TrapRuntime::Spikehead { charge, check_timer, .. } = &mut trap.runtime {
        *charge = None;
        *check_timer = 0.0;
    }
}

/// Slides `movement_distance` either side of where it was placed. An
/// attacker is hurt once each time it comes into contact.
fn saw(
    trap: &mut Trap,
    intruders: &[Intruder],
    dt: f32,
    (movement_distance, speed, damage): (f32, f32, i32),
    effects: &mut Vec<HazardEffect>,
) {
    let axis = trap.side();
    let bounds = trap.bounds;
    let TrapRuntime::Saw {
        arena,
        home,
        travel,
        backwards,
        ..
    } = &mut trap.runtime
    else {
        return;
    };

    let reach = movement_distance.max(0.0);
    let step = speed * dt;
    if *backwards {
        *travel = (*travel - step).max(-reach);
        if *travel <= -reach {
            *backwards = false;
        }
    } else {
        *travel = (*travel + step).min(reach);
        if *travel >= reach {
            *backwards = true;
        }
    }
    // Never pushed off the spot it was mounted on, only kept off the walls.
    let limit = centre_limit(*arena, &bounds);
    let limit = Aabb::new(
        Vec2::new(limit.min.x.min(home.x), limit.min.y.min(home.y)),
        Vec2::new(limit.max.x.max(home.x), limit.max.y.max(home.y)),
    );
    let next = limit.closest_point(*home + axis * *travel);
    trap.move_to(next);

    let now_touching: HashSet<ClientId> = touching(trap, intruders).map(|i| i.id).collect();
    let trap_id = trap.id;
    let TrapRuntime::Saw { touching, .. } = &mut trap.runtime else {
        return;
    };
    let mut entered: Vec<ClientId> = now_touching.difference(touching).copied().collect();
    entered.sort_unstable();
    for target in entered {
        effects.push(HazardEffect::Damage {
            target,
            amount: damage.max(1),
            trap: trap_id,
        });
    }
    *touching = now_touching;
}
