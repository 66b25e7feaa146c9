//! Collider storage and the point, shape and cast queries the match runs
//! against it.
//!
//! Colliders are axis-aligned boxes tagged with a [`Layer`] and an [`Owner`].
//! Queries filter by [`LayerMask`] and skip disabled colliders. Iteration
//! follows collider id order so equal-distance ties always resolve the same way.

use shared::{Aabb, ClientId, EntityId, Vec2};
use std::collections::BTreeMap;

pub type ColliderId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    PlaceArea,
    Floor,
    Wall,
    Reactor,
    Player,
    Trap,
    Projectile,
    Cover,
    Ui,
}

impl Layer {
    const fn bit(self) -> u32 {
        1 << self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerMask(u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    pub const STRUCTURE: LayerMask = LayerMask(Layer::Floor.bit() | Layer::Wall.bit());
    pub const SOLID: LayerMask =
        LayerMask(Layer::Floor.bit() | Layer::Wall.bit() | Layer::Reactor.bit());

    pub const fn only(layer: Layer) -> LayerMask {
        LayerMask(layer.bit())
    }

    pub const fn with(self, layer: Layer) -> LayerMask {
        LayerMask(self.0 | layer.bit())
    }

    pub const fn without(self, layer: Layer) -> LayerMask {
        LayerMask(self.0 & !layer.bit())
    }

    pub const fn contains(self, layer: Layer) -> bool {
        self.0 & layer.bit() != 0
    }
}

/// The entity a collider belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Room(EntityId),
    Reactor(EntityId),
    Player(ClientId),
    Bot(EntityId),
    Trap(EntityId),
}

#[derive(Debug, Clone)]
pub struct Collider {
    pub aabb: Aabb,
    pub layer: Layer,
    pub owner: Owner,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub collider: ColliderId,
    pub layer: Layer,
    pub owner: Owner,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastHit {
    pub hit: Hit,
    pub distance: f32,
    pub point: Vec2,
    pub normal: Vec2,
}

/// Query surface the gameplay systems depend on.
pub trait SpatialQuery {
    fn overlap_point(&self, point: Vec2, mask: LayerMask) -> Option<Hit>;

    /// Closest collider within `radius` of `center`.
    fn overlap_circle(&self, center: Vec2, radius: f32, mask: LayerMask) -> Option<Hit>;

    fn overlap_box(&self, area: Aabb, mask: LayerMask) -> Vec<Hit>;

    fn closest_point(&self, collider: ColliderId, point: Vec2) -> Option<Vec2>;

    /// Every collider a circle meets while sweeping `distance` along `dir`,
    /// nearest first.
    fn circle_cast(
        &self,
        origin: Vec2,
        radius: f32,
        dir: Vec2,
        distance: f32,
        mask: LayerMask,
    ) -> Vec<CastHit>;

    fn line_of_sight(&self, from: Vec2, to: Vec2, blockers: LayerMask) -> bool {
        let delta = to - from;
        let distance = delta.length();
        if distance <= f32::EPSILON {
            return true;
        }
        self.circle_cast(from, 0.0, delta * (1.0 / distance), distance, blockers)
            .first()
            .map_or(true, |hit| hit.distance >= distance)
    }
}

#[derive(Debug, Default)]
pub struct SpatialIndex {
    colliders: BTreeMap<ColliderId, Collider>,
    next_id: ColliderId,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, aabb: Aabb, layer: Layer, owner: Owner) -> ColliderId {
        self.next_id += 1;
        let id = self.next_id;
        self.colliders.insert(
            id,
            Collider {
                aabb,
                layer,
                owner,
                enabled: true,
            },
        );
        id
    }

    pub fn remove(&mut self, id: ColliderId) -> bool {
        self.colliders.remove(&id).is_some()
    }

    pub fn get(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.get(&id)
    }

    pub fn set_aabb(&mut self, id: ColliderId, aabb: Aabb) {
        if let Some(collider) = self.colliders.get_mut(&id) {
            collider.aabb = aabb;
        }
    }

    pub fn set_enabled(&mut self, id: ColliderId, enabled: bool) {
        if let Some(collider) = self.colliders.get_mut(&id) {
            collider.enabled = enabled;
        }
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    fn candidates(&self, mask: LayerMask) -> impl Iterator<Item = (ColliderId, &Collider)> {
        self.colliders
            .iter()
            .filter(move |(_, c)| c.enabled && mask.contains(c.layer))
            .map(|(id, c)| (*id, c))
    }

    fn hit(id: ColliderId, collider: &Collider) -> Hit {
        Hit {
            collider: id,
            layer: collider.layer,
            owner: collider.owner,
        }
    }
}

impl SpatialQuery for SpatialIndex {
    fn overlap_point(&self, point: Vec2, mask: LayerMask) -> Option<Hit> {
        self.candidates(mask)
            .find(|(_, c)| c.aabb.contains(point))
            .map(|(id, c)| Self::hit(id, c))
    }

    fn overlap_circle(&self, center: Vec2, radius: f32, mask: LayerMask) -> Option<Hit> {
        let mut best: Option<(f32, Hit)> = None;
        for (id, collider) in self.candidates(mask) {
            let distance = collider.aabb.distance_to(center);
            if distance > radius {
                continue;
            }
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, Self::hit(id, collider)));
            }
        }
        best.map(|(_, hit)| hit)
    }

    fn overlap_box(&self, area: Aabb, mask: LayerMask) -> Vec<Hit> {
        self.candidates(mask)
            .filter(|(_, c)| c.aabb.intersects(&area))
            .map(|(id, c)| Self::hit(id, c))
            .collect()
    }

    fn closest_point(&self, collider: ColliderId, point: Vec2) -> Option<Vec2> {
        self.colliders
            .get(&collider)
            .map(|c| c.aabb.closest_point(point))
    }

    fn circle_cast(
        &self,
        origin: Vec2,
        radius: f32,
        dir: Vec2,
        distance: f32,
        mask: LayerMask,
    ) -> Vec<CastHit> {
        let dir = dir.normalize_or(Vec2::RIGHT);
        let mut hits: Vec<CastHit> = self
            .candidates(mask)
            .filter_map(|(id, c)| {
                c.aabb
                    .expanded(radius)
                    .ray_hit(origin, dir, distance)
                    .map(|(t, normal)| CastHit {
                        hit: Self::hit(id, c),
                        distance: t,
                        point: origin + dir * t,
                        normal,
                    })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn boxed(x0: f32, y0: f32, x1: f32, y1: f32) -> Aabb {
        Aabb::new(Vec2::new(x0, y0), Vec2::new(x1, y1))
    }

    #[test]
    fn test_layer_mask() {
        let mask = LayerMask::STRUCTURE.with(Layer::Reactor);
        assert!(mask.contains(Layer::Floor));
        assert!(mask.contains(Layer::Reactor));
        assert!(!mask.contains(Layer::Player));
        assert!(!LayerMask::ALL.without(Layer::Ui).contains(Layer::Ui));
        assert_eq!(mask, LayerMask::SOLID);
    }

    #[test]
    fn test_overlap_point_respects_mask_and_enabled() {
        let mut index = SpatialIndex::new();
        let area = index.insert(boxed(0.0, 0.0, 10.0, 10.0), Layer::PlaceArea, Owner::Room(1));
        let floor = index.insert(boxed(0.0, -1.0, 10.0, 0.0), Layer::Floor, Owner::Room(1));

        let hit = index
            .overlap_point(Vec2::new(5.0, 5.0), LayerMask::only(Layer::PlaceArea))
            .unwrap();
        assert_eq!(hit.collider, area);
        assert_eq!(hit.owner, Owner::Room(1));

        assert!(index
            .overlap_point(Vec2::new(5.0, 5.0), LayerMask::STRUCTURE)
            .is_none());

        index.set_enabled(floor, false);
        assert!(index
            .overlap_point(Vec2::new(5.0, -0.5), LayerMask::STRUCTURE)
            .is_none());
    }

    #[test]
    fn test_overlap_circle_picks_closest() {
        let mut index = SpatialIndex::new();
        let far = index.insert(boxed(0.0, 0.0, 1.0, 1.0), Layer::Wall, Owner::Room(1));
        let near = index.insert(boxed(1.5, 0.0, 2.5, 1.0), Layer::Wall, Owner::Room(2));

        let hit = index
            .overlap_circle(Vec2::new(1.4, 0.5), 0.5, LayerMask::STRUCTURE)
            .unwrap();
        assert_eq!(hit.collider, near);

        let hit = index
            .overlap_circle(Vec2::new(0.5, 0.5), 0.1, LayerMask::STRUCTURE)
            .unwrap();
        assert_eq!(hit.collider, far);

        assert!(index
            .overlap_circle(Vec2::new(5.0, 5.0), 0.5, LayerMask::STRUCTURE)
            .is_none());
    }

    #[test]
    fn test_circle_cast_sorted_by_distance() {
        let mut index = SpatialIndex::new();
        let second = index.insert(boxed(6.0, -1.0, 7.0, 1.0), Layer::Wall, Owner::Room(1));
        let first = index.insert(boxed(3.0, -1.0, 4.0, 1.0), Layer::Player, Owner::Player(2));

        let hits = index.circle_cast(Vec2::ZERO, 0.5, Vec2::RIGHT, 10.0, LayerMask::ALL);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].hit.collider, first);
        assert_approx_eq!(hits[0].distance, 2.5);
        assert_eq!(hits[1].hit.collider, second);

        let short = index.circle_cast(Vec2::ZERO, 0.5, Vec2::RIGHT, 2.0, LayerMask::ALL);
        assert!(short.is_empty());
    }

    #[test]
    fn test_line_of_sight() {
        let mut index = SpatialIndex::new();
        index.insert(boxed(4.0, -5.0, 5.0, 5.0), Layer::Wall, Owner::Room(1));

        assert!(!index.line_of_sight(Vec2::ZERO, Vec2::new(8.0, 0.0), LayerMask::STRUCTURE));
        assert!(index.line_of_sight(Vec2::ZERO, Vec2::new(3.0, 0.0), LayerMask::STRUCTURE));
        assert!(index.line_of_sight(Vec2::ZERO, Vec2::new(8.0, 0.0), LayerMask::NONE));
    }
}
