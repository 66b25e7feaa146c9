use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A vector in 2D world space.
/// Positive x is to the right, positive y is up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2::new(0.0, 0.0);
    pub const RIGHT: Vec2 = Vec2::new(1.0, 0.0);
    pub const UP: Vec2 = Vec2::new(0.0, 1.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    /// Returns the unit vector, or `fallback` when the vector has no usable direction.
    pub fn normalize_or(self, fallback: Vec2) -> Vec2 {
        let len = self.length();
        if len <= f32::EPSILON {
            fallback
        } else {
            Vec2::new(self.x / len, self.y / len)
        }
    }

    /// Angle of the vector in degrees, counter-clockwise from +x.
    pub fn angle_deg(self) -> f32 {
        self.y.atan2(self.x).to_degrees()
    }

    pub fn from_angle_deg(degrees: f32) -> Vec2 {
        let radians = degrees.to_radians();
        Vec2::new(radians.cos(), radians.sin())
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, scalar: f32) -> Vec2 {
        Vec2::new(self.x * scalar, self.y * scalar)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Axis-aligned box, `min` is the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: Vec2::new(min.x.min(max.x), min.y.min(max.y)),
            max: Vec2::new(min.x.max(max.x), min.y.max(max.y)),
        }
    }

    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self::new(center - half, center + half)
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Inclusive of the boundary.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        !(self.max.x <= other.min.x
            || other.max.x <= self.min.x
            || self.max.y <= other.min.y
            || other.max.y <= self.min.y)
    }

    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }

    pub fn distance_to(&self, point: Vec2) -> f32 {
        self.closest_point(point).distance(point)
    }

    pub fn expanded(&self, margin: f32) -> Aabb {
        Aabb::new(
            self.min - Vec2::new(margin, margin),
            self.max + Vec2::new(margin, margin),
        )
    }

    pub fn translated(&self, offset: Vec2) -> Aabb {
        Aabb::new(self.min + offset, self.max + offset)
    }

    /// Slab test for a ray starting at `origin` travelling along the unit `dir`.
    /// Returns the entry distance and the surface normal of the entered face.
    /// A ray starting inside the box hits at distance zero facing back along `dir`.
    pub fn ray_hit(&self, origin: Vec2, dir: Vec2, max_distance: f32) -> Option<(f32, Vec2)> {
        if self.contains(origin) {
            return Some((0.0, (-dir).normalize_or(Vec2::UP)));
        }

        let mut t_enter = 0.0f32;
        let mut t_exit = max_distance;
        let mut normal = Vec2::ZERO;

        let axes = [
            (origin.x, dir.x, self.min.x, self.max.x, Vec2::new(-1.0, 0.0)),
            (origin.y, dir.y, self.min.y, self.max.y, Vec2::new(0.0, -1.0)),
        ];

        for (o, d, lo, hi, low_face) in axes {
            if d.abs() < 1e-8 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let mut t1 = (lo - o) * inv;
            let mut t2 = (hi - o) * inv;
            let mut face = low_face;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
                face = -low_face;
            }

            if t1 > t_enter {
                t_enter = t1;
                normal = face;
            }
            t_exit = t_exit.min(t2);
            if t_enter > t_exit {
                return None;
            }
        }

        Some((t_enter, normal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_normalize_falls_back_on_zero() {
        assert_eq!(Vec2::ZERO.normalize_or(Vec2::RIGHT), Vec2::RIGHT);

        let n = Vec2::new(3.0, 4.0).normalize_or(Vec2::RIGHT);
        assert_approx_eq!(n.x, 0.6);
        assert_approx_eq!(n.y, 0.8);
    }

    #[test]
    fn test_angles() {
        assert_approx_eq!(Vec2::UP.angle_deg(), 90.0);
        assert_approx_eq!(Vec2::new(-1.0, 0.0).angle_deg(), 180.0);

        let v = Vec2::from_angle_deg(270.0);
        assert_approx_eq!(v.x, 0.0, 1e-5);
        assert_approx_eq!(v.y, -1.0, 1e-5);
    }

    #[test]
    fn test_aabb_closest_point() {
        let aabb = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 1.0));
        assert_eq!(aabb.closest_point(Vec2::new(5.0, 0.5)), Vec2::new(2.0, 0.5));
        assert_eq!(aabb.closest_point(Vec2::new(1.0, 0.5)), Vec2::new(1.0, 0.5));
        assert_approx_eq!(aabb.distance_to(Vec2::new(1.0, 3.0)), 2.0);
    }

    #[test]
    fn test_aabb_touching_does_not_intersect() {
        let a = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0));
        let b = Aabb::new(Vec2::new(1.0, 0.0), Vec2::new(2.0, 1.0));
        let c = Aabb::new(Vec2::new(0.5, 0.5), Vec2::new(1.5, 1.5));
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
    }

    #[test]
    fn test_ray_hit_entry_face() {
        let aabb = Aabb::new(Vec2::new(4.0, -1.0), Vec2::new(5.0, 1.0));

        let (t, normal) = aabb.ray_hit(Vec2::ZERO, Vec2::RIGHT, 10.0).unwrap();
        assert_approx_eq!(t, 4.0);
        assert_eq!(normal, Vec2::new(-1.0, 0.0));

        let (t, normal) = aabb
            .ray_hit(Vec2::new(8.0, 0.0), Vec2::new(-1.0, 0.0), 10.0)
            .unwrap();
        assert_approx_eq!(t, 3.0);
        assert_eq!(normal, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_ray_miss_and_short_range() {
        let aabb = Aabb::new(Vec2::new(4.0, -1.0), Vec2::new(5.0, 1.0));
        assert!(aabb.ray_hit(Vec2::ZERO, Vec2::UP, 10.0).is_none());
        assert!(aabb.ray_hit(Vec2::ZERO, Vec2::RIGHT, 3.0).is_none());
    }

    #[test]
    fn test_ray_from_inside_hits_immediately() {
        let aabb = Aabb::new(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0));
        let (t, normal) = aabb.ray_hit(Vec2::ZERO, Vec2::RIGHT, 1.0).unwrap();
        assert_eq!(t, 0.0);
        assert_eq!(normal, Vec2::new(-1.0, 0.0));
    }
}
