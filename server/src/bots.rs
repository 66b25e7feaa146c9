//! Defender bots spawned by interior traps. They fight for the builder,
//! have their own health and are removed rather than respawned.

use crate::combat::{DeathPolicy, Health};
use crate::hazards::Intruder;
use crate::spatial::{ColliderId, Layer, LayerMask, Owner, SpatialIndex, SpatialQuery};
use log::debug;
use rand::Rng;
use shared::{Aabb, BotState, ClientId, DefenderDef, EntityId, Role, Vec2};
use std::collections::BTreeMap;

/// How long to wait before re-checking a shot whose line of fire was blocked.
const BLOCKED_RETRY: f64 = 0.15;

/// Delay between a bot dying and its removal.
pub const BOT_REMOVAL_DELAY: f32 = 0.6;

#[derive(Debug, Clone)]
pub struct Bot {
    pub id: EntityId,
    pub trap: EntityId,
    pub position: Vec2,
    pub facing_left: bool,
    pub health: Health,
    pub collider: ColliderId,
    def: DefenderDef,
    left_x: f32,
    right_x: f32,
    patrol_dir: f32,
    next_shot: f64,
}

impl Bot {
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_size(self.position, self.def.size)
    }

    pub fn state(&self) -> BotState {
        BotState {
            id: self.id,
            position: self.position,
            facing_left: self.facing_left,
            hp: self.health.current(),
        }
    }

    fn muzzle(&self) -> Vec2 {
        let side = if self.facing_left { -1.0 } else { 1.0 };
        self.position + Vec2::new(side * (self.def.size.x * 0.5 + 0.1), 0.2)
    }

    fn patrol(&mut self, dt: f32) {
        if self.patrol_dir > 0.0 && self.position.x >= self.right_x {
            self.patrol_dir = -1.0;
        }
        if self.patrol_dir < 0.0 && self.position.x <= self.left_x {
            self.patrol_dir = 1.0;
        }
        self.facing_left = self.patrol_dir < 0.0;
        self.position.x = (self.position.x + self.patrol_dir * self.def.patrol_speed * dt)
            .clamp(self.left_x, self.right_x);
    }
}

/// A projectile a bot wants fired this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotShot {
    pub bot: EntityId,
    pub origin: Vec2,
    pub direction: Vec2,
    pub speed: f32,
    pub damage: i32,
    pub lifetime: f32,
}

#[derive(Debug, Default)]
pub struct BotRoster {
    bots: BTreeMap<EntityId, Bot>,
}

impl BotRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bot at `position`, patrolling inside `interior`.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn<R: Rng>(
        &mut self,
        id: EntityId,
        trap: EntityId,
        position: Vec2,
        def: &DefenderDef,
        interior: Aabb,
        world: &mut SpatialIndex,
        now: f64,
        rng: &mut R,
    ) -> &Bot {
        let half = def.size.x * 0.5;
        let left_x = (position.x - def.patrol_distance).max(interior.min.x + half);
        let right_x = (position.x + def.patrol_distance).min(interior.max.x - half);
        let patrol_dir = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };

        let collider = world.insert(
            Aabb::from_center_size(position, def.size),
            Layer::Player,
            Owner::Bot(id),
        );
        debug!("Bot {} spawned for trap {}", id, trap);

        self.bots.entry(id).or_insert(Bot {
            id,
            trap,
            position,
            facing_left: patrol_dir < 0.0,
            health: Health::new(def.max_hp, DeathPolicy::Destroy {
                delay: BOT_REMOVAL_DELAY,
            }),
            collider,
            def: def.clone(),
            left_x: left_x.min(right_x),
            right_x: right_x.max(left_x),
            patrol_dir,
            next_shot: now + rng.gen_range(0.0..0.5),
        })
    }

    pub fn get(&self, id: EntityId) -> Option<&Bot> {
        self.bots.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Bot> {
        self.bots.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bot> {
        self.bots.values()
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }

    pub fn remove(&mut self, id: EntityId, world: &mut SpatialIndex) -> Option<Bot> {
        let bot = self.bots.remove(&id)?;
        world.remove(bot.collider);
        Some(bot)
    }

    /// Moves living bots and returns the shots they take. Targets are the
    /// nearest visible living attacker within detection range.
    pub fn step(
        &mut self,
        world: &mut SpatialIndex,
        intruders: &[Intruder],
        now: f64,
        dt: f32,
    ) -> Vec<BotShot> {
        let mut shots = Vec::new();
        for bot in self.bots.values_mut() {
            if bot.health.is_dead() {
                continue;
            }

            match find_target(world, bot, intruders) {
                Some((_, target)) => {
                    let to_target = target - bot.position;
                    if to_target.length_squared() <= 0.001 {
                        continue;
                    }
                    bot.facing_left = to_target.x < 0.0;

                    if now >= bot.next_shot {
                        let origin = bot.muzzle();
                        if world.line_of_sight(origin, target, LayerMask::STRUCTURE) {
                            shots.push(BotShot {
                                bot: bot.id,
                                origin,
                                direction: (target - origin).normalize_or(Vec2::RIGHT),
                                speed: bot.def.projectile_speed,
                                damage: bot.def.damage,
                                lifetime: bot.def.projectile_lifetime,
                            });
                            bot.next_shot = now + bot.def.shoot_cooldown as f64;
                        } else {
                            bot.next_shot = now + BLOCKED_RETRY;
                        }
                    }
                }
                None => {
                    bot.patrol(dt);
                    world.set_aabb(bot.collider, bot.bounds());
                }
            }
        }
        shots
    }
}

fn find_target(world: &SpatialIndex, bot: &Bot, intruders: &[Intruder]) -> Option<(ClientId, Vec2)> {
    let range_sq = bot.def.detection_range * bot.def.detection_range;
    intruders
        .iter()
        .filter(|i| i.alive && i.role == Role::Attacker)
        .map(|i| (i.id, i.bounds.center()))
        .filter(|(_, center)| (*center - bot.position).length_squared() <= range_sq)
        .filter(|(_, center)| world.line_of_sight(bot.position, *center, LayerMask::STRUCTURE))
        .min_by(|a, b| {
            let da = (a.1 - bot.position).length_squared();
            let db = (b.1 - bot.position).length_squared();
            da.total_cmp(&db)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn interior() -> Aabb {
        Aabb::new(Vec2::new(-12.0, -5.0), Vec2::new(12.0, 5.0))
    }

    fn attacker(id: ClientId, center: Vec2) -> Intruder {
        Intruder {
            id,
            role: Role::Attacker,
            bounds: Aabb::from_center_size(center, Vec2::new(1.0, 1.8)),
            alive: true,
        }
    }

    fn roster_with_bot(world: &mut SpatialIndex) -> BotRoster {
        let mut roster = BotRoster::new();
        let mut rng = StdRng::seed_from_u64(7);
        roster.spawn(
            5,
            4,
            Vec2::new(0.0, -4.0),
            &DefenderDef::default(),
            interior(),
            world,
            0.0,
            &mut rng,
        );
        roster
    }

    #[test]
    fn test_patrol_stays_in_bounds() {
        let mut world = SpatialIndex::new();
        let mut roster = roster_with_bot(&mut world);

        for step in 0..600 {
            roster.step(&mut world, &[], step as f64 / 60.0, 1.0 / 60.0);
            let x = roster.get(5).unwrap().position.x;
            assert!((-4.0..=4.0).contains(&x), "bot wandered to {}", x);
        }
    }

    #[test]
    fn test_shoots_visible_attacker_with_cooldown() {
        let mut world = SpatialIndex::new();
        let mut roster = roster_with_bot(&mut world);
        let target = [attacker(2, Vec2::new(4.0, -4.0))];

        let shots = roster.step(&mut world, &target, 1.0, 0.016);
        assert_eq!(shots.len(), 1);
        assert!(shots[0].direction.x > 0.9);
        assert!(!roster.get(5).unwrap().facing_left);

        assert!(roster.step(&mut world, &target, 1.5, 0.016).is_empty());
        assert_eq!(roster.step(&mut world, &target, 2.0, 0.016).len(), 1);
    }

    #[test]
    fn test_ignores_hidden_or_distant_attackers() {
        let mut world = SpatialIndex::new();
        let mut roster = roster_with_bot(&mut world);
        world.insert(
            Aabb::new(Vec2::new(1.5, -6.0), Vec2::new(2.0, 6.0)),
            Layer::Wall,
            Owner::Room(1),
        );

        let behind_wall = [attacker(2, Vec2::new(4.0, -4.0))];
        assert!(roster.step(&mut world, &behind_wall, 1.0, 0.016).is_empty());

        let far_away = [attacker(3, Vec2::new(-9.0, -4.0))];
        assert!(roster.step(&mut world, &far_away, 1.0, 0.016).is_empty());
    }

    #[test]
    fn test_remove_drops_collider() {
        let mut world = SpatialIndex::new();
        let mut roster = roster_with_bot(&mut world);
        assert_eq!(world.len(), 1);
        assert!(roster.remove(5, &mut world).is_some());
        assert!(world.is_empty());
        assert!(roster.is_empty());
    }
}
