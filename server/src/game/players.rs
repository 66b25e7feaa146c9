//! Connected participants and their movement.

use crate::combat::{DeathPolicy, Health};
use crate::spatial::{ColliderId, LayerMask, SpatialIndex, SpatialQuery};
use shared::{Aabb, ClientId, FireLimiter, MatchRules, PlayerState, Role, Vec2};

/// Held direction keys from the latest input packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl MoveIntent {
    pub fn direction(&self) -> Vec2 {
        let axis = |neg: bool, pos: bool| match (neg, pos) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
        Vec2::new(axis(self.left, self.right), axis(self.down, self.up))
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: ClientId,
    pub role: Role,
    pub position: Vec2,
    pub size: Vec2,
    pub intent: MoveIntent,
    pub last_input: u32,
    pub health: Health,
    pub collider: ColliderId,
    /// Where the player comes back after dying.
    pub respawn_point: Vec2,
    pub limiter: FireLimiter,
}

impl Player {
    pub fn new(id: ClientId, role: Role, position: Vec2, rules: &MatchRules, collider: ColliderId) -> Self {
        let combat = &rules.combat;
        Self {
            id,
            role,
            position,
            size: combat.player_size,
            intent: MoveIntent::default(),
            last_input: 0,
            health: Health::new(
                combat.max_hp(role),
                DeathPolicy::Respawn {
                    delay: combat.respawn_delay,
                },
            ),
            collider,
            respawn_point: position,
            limiter: FireLimiter::new(&combat.weapon),
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_size(self.position, self.size)
    }

    pub fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }

    pub fn state(&self) -> PlayerState {
        PlayerState {
            id: self.id,
            role: self.role,
            position: self.position,
            hp: self.health.current(),
            dead: self.health.is_dead(),
            last_input: self.last_input,
        }
    }
}

/// Moves a box by `delta`, one axis at a time, stopping flush against any
/// collider in `mask`. Colliders the box already overlaps do not block, so a
/// player spawned inside geometry can walk out of it.
pub fn sweep_box(world: &SpatialIndex, bounds: Aabb, delta: Vec2, mask: LayerMask) -> Vec2 {
    let mut moved = bounds;
    let x = sweep_axis(world, moved, delta.x, true, mask);
    moved = moved.translated(Vec2::new(x, 0.0));
    let y = sweep_axis(world, moved, delta.y, false, mask);
    moved = moved.translated(Vec2::new(0.0, y));
    moved.center()
}

fn sweep_axis(world: &SpatialIndex, bounds: Aabb, delta: f32, horizontal: bool, mask: LayerMask) -> f32 {
    if delta == 0.0 {
        return 0.0;
    }
    let step = if horizontal {
        Vec2::new(delta, 0.0)
    } else {
        Vec2::new(0.0, delta)
    };
    let target = bounds.translated(step);
    let swept = Aabb::new(
        Vec2::new(bounds.min.x.min(target.min.x), bounds.min.y.min(target.min.y)),
        Vec2::new(bounds.max.x.max(target.max.x), bounds.max.y.max(target.max.y)),
    );

    let mut allowed = delta;
    for hit in world.overlap_box(swept, mask) {
        let Some(collider) = world.get(hit.collider) else {
            continue;
        };
        let other = collider.aabb;
        if other.intersects(&bounds) {
            continue;
        }
        let gap = match (horizontal, delta > 0.0) {
            (true, true) => other.min.x - bounds.max.x,
            (true, false) => other.max.x - bounds.min.x,
            (false, true) => other.min.y - bounds.max.y,
            (false, false) => other.max.y - bounds.min.y,
        };
        if delta > 0.0 {
            allowed = allowed.min(gap.max(0.0));
        } else {
            allowed = allowed.max(gap.min(0.0));
        }
    }
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{Layer, Owner};
    use assert_approx_eq::assert_approx_eq;

    fn world_with_floor_and_wall() -> SpatialIndex {
        let mut world = SpatialIndex::new();
        world.insert(
            Aabb::new(Vec2::new(-10.0, -1.0), Vec2::new(10.0, 0.0)),
            Layer::Floor,
            Owner::Room(1),
        );
        world.insert(
            Aabb::new(Vec2::new(3.0, 0.0), Vec2::new(4.0, 10.0)),
            Layer::Wall,
            Owner::Room(1),
        );
        world
    }

    #[test]
    fn test_intent_direction() {
        let intent = MoveIntent {
            left: true,
            up: true,
            ..MoveIntent::default()
        };
        assert_eq!(intent.direction(), Vec2::new(-1.0, 1.0));

        let both = MoveIntent {
            left: true,
            right: true,
            ..MoveIntent::default()
        };
        assert_eq!(both.direction(), Vec2::ZERO);
    }

    #[test]
    fn test_sweep_stops_at_wall_and_floor() {
        let world = world_with_floor_and_wall();
        let bounds = Aabb::from_center_size(Vec2::new(0.0, 0.9), Vec2::new(1.0, 1.8));

        let center = sweep_box(&world, bounds, Vec2::new(5.0, -2.0), LayerMask::SOLID);
        assert_approx_eq!(center.x, 2.5);
        assert_approx_eq!(center.y, 0.9);
    }

    #[test]
    fn test_free_movement_and_overlap_escape() {
        let world = world_with_floor_and_wall();
        let bounds = Aabb::from_center_size(Vec2::new(-5.0, 3.0), Vec2::new(1.0, 1.8));
        let center = sweep_box(&world, bounds, Vec2::new(-1.0, 0.5), LayerMask::SOLID);
        assert_approx_eq!(center.x, -6.0);
        assert_approx_eq!(center.y, 3.5);

        // Starting inside the wall, moving right is not blocked by it.
        let stuck = Aabb::from_center_size(Vec2::new(3.5, 3.0), Vec2::new(1.0, 1.8));
        let center = sweep_box(&world, stuck, Vec2::new(1.0, 0.0), LayerMask::SOLID);
        assert_approx_eq!(center.x, 4.5);
    }
}
