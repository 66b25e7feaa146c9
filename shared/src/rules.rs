//! Placement and firing rules shared by the authoritative server and the
//! client's predictive checks. Both sides call the same functions so a
//! request the client considers valid is only refused on a real desync.

use crate::catalog::{BuildSettings, TrapDef, WeaponSettings};
use crate::math::Vec2;
use crate::types::{AttachKind, GridPos, Role, SurfaceKind};
use thiserror::Error;

/// Read access to a room grid, implemented by the server's authoritative
/// table and by the client replica.
pub trait RoomOccupancy {
    fn is_occupied(&self, pos: GridPos) -> bool;
    fn placed_count(&self) -> usize;
    fn main_room_placed(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoomRejection {
    #[error("only the builder can place rooms")]
    NotBuilder,
    #[error("rooms can only be placed while building rooms")]
    WrongPhase,
    #[error("unknown room prefab {0}")]
    UnknownPrefab(usize),
    #[error("cell {0} lies outside the buildable grid")]
    OutOfBounds(GridPos),
    #[error("row {y} is below the lowest buildable row {min}")]
    BelowMinimumRow { y: i32, min: i32 },
    #[error("cell {0} is already occupied")]
    Occupied(GridPos),
    #[error("all {max} room slots are used")]
    BudgetExhausted { max: usize },
    #[error("the main room is already placed")]
    MainRoomAlreadyPlaced,
    #[error("the last room slot is reserved for the main room")]
    LastSlotReservedForMainRoom,
    #[error("cell {0} does not touch the ground or another room")]
    NotConnected(GridPos),
}

/// Room placement checks in their fixed order: role, prefab, grid extent,
/// row, occupancy, budget, main-room rule, adjacency.
pub fn validate_room_placement<G: RoomOccupancy + ?Sized>(
    grid: &G,
    build: &BuildSettings,
    prefab_count: usize,
    role: Role,
    prefab: usize,
    pos: GridPos,
) -> Result<(), RoomRejection> {
    if role != Role::Builder {
        return Err(RoomRejection::NotBuilder);
    }
    if prefab >= prefab_count {
        return Err(RoomRejection::UnknownPrefab(prefab));
    }
    let extent = build.max_grid_extent.unsigned_abs();
    if pos.x.unsigned_abs() > extent || pos.y.unsigned_abs() > extent {
        return Err(RoomRejection::OutOfBounds(pos));
    }
    if pos.y < build.min_grid_y {
        return Err(RoomRejection::BelowMinimumRow {
            y: pos.y,
            min: build.min_grid_y,
        });
    }
    if grid.is_occupied(pos) {
        return Err(RoomRejection::Occupied(pos));
    }

    let placed = grid.placed_count();
    if placed >= build.max_rooms {
        return Err(RoomRejection::BudgetExhausted {
            max: build.max_rooms,
        });
    }

    if prefab == build.main_room_prefab {
        if grid.main_room_placed() {
            return Err(RoomRejection::MainRoomAlreadyPlaced);
        }
    } else if !grid.main_room_placed() && placed + 1 == build.max_rooms {
        return Err(RoomRejection::LastSlotReservedForMainRoom);
    }

    let connected = placed == 0
        || pos.y == 0
        || pos
            .neighbours()
            .any(|(_, neighbour)| grid.is_occupied(neighbour));
    if !connected {
        return Err(RoomRejection::NotConnected(pos));
    }

    Ok(())
}

/// Stable per-room namespace for trap counters.
pub fn room_hash(pos: GridPos) -> i32 {
    pos.x.wrapping_mul(73_856_093) ^ pos.y.wrapping_mul(19_349_663)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrapRejection {
    #[error("only the builder can place traps")]
    NotBuilder,
    #[error("traps can only be placed while placing traps")]
    WrongPhase,
    #[error("unknown trap type {0}")]
    UnknownTrap(usize),
    #[error("position is not inside a room")]
    OutsidePlacementArea,
    #[error("global limit of {limit} reached")]
    GlobalLimitReached { limit: u32 },
    #[error("limit of {limit} per room reached")]
    RoomLimitReached { limit: u32 },
    #[error("no surface to mount on")]
    NoSurface,
    #[error("surface belongs to another room")]
    SurfaceInOtherRoom,
    #[error("trap cannot mount on that surface")]
    SurfaceNotAllowed,
    #[error("resolved position is too far away")]
    TooFarFromRequest,
}

pub fn check_trap_limits(
    def: &TrapDef,
    global_count: u32,
    room_count: u32,
) -> Result<(), TrapRejection> {
    if def.limit_global > 0 && global_count >= def.limit_global {
        return Err(TrapRejection::GlobalLimitReached {
            limit: def.limit_global,
        });
    }
    if def.max_per_room > 0 && room_count >= def.max_per_room {
        return Err(TrapRejection::RoomLimitReached {
            limit: def.max_per_room,
        });
    }
    Ok(())
}

/// Normalises a quarter-turn step into 0..4 and restricts it to the allowed set.
pub fn clamp_rotation_step(def: &TrapDef, step: i32) -> i32 {
    if !def.allow_rotate || def.allowed_rot_steps.is_empty() {
        return 0;
    }
    let step = step.rem_euclid(4);
    if def
        .allowed_rot_steps
        .iter()
        .any(|allowed| allowed.rem_euclid(4) == step)
    {
        step
    } else {
        def.allowed_rot_steps[0].rem_euclid(4)
    }
}

pub fn snap_position(position: Vec2, step: f32) -> Vec2 {
    if step <= 0.0 {
        return position;
    }
    Vec2::new(
        (position.x / step).round() * step,
        (position.y / step).round() * step,
    )
}

/// Angle that points a trap's local up axis along `normal`.
///
/// Trap rotations use an up-facing frame: 0 degrees is a trap standing on a
/// floor, so the result is the normal's heading minus 90 degrees and every
/// catalog `angle_offset_deg` is measured from that frame.
pub fn base_angle_from_normal(normal: Vec2) -> f32 {
    let n = normal.normalize_or(Vec2::UP);
    n.angle_deg() - 90.0
}

/// Final rotation of a trap. `normal` is `None` for interior traps.
pub fn trap_rotation_deg(def: &TrapDef, normal: Option<Vec2>, step: i32) -> f32 {
    if def.force_fixed_angle {
        return def.fixed_angle_deg + def.angle_offset_deg;
    }
    let base = normal.map(base_angle_from_normal).unwrap_or(0.0);
    base + def.angle_offset_deg + clamp_rotation_step(def, step) as f32 * 90.0
}

/// Best guess at where a trap would mount in the room at `room`, using only
/// the room's inner faces. The client uses it to aim requests; the server
/// still resolves the real surface against its colliders.
///
/// Returns the mounting point (already pushed off the face by `offset`) and
/// the face normal.
pub fn nearest_room_surface(
    build: &BuildSettings,
    room: GridPos,
    point: Vec2,
    attach: AttachKind,
    offset: f32,
) -> Option<(Vec2, Vec2)> {
    let interior = build.room_interior(room);
    if attach == AttachKind::Interior {
        return Some((interior.closest_point(point), Vec2::UP));
    }

    let clamped = interior.closest_point(point);
    let faces = [
        (SurfaceKind::Floor, Vec2::new(clamped.x, interior.min.y), Vec2::UP),
        (SurfaceKind::Wall, Vec2::new(clamped.x, interior.max.y), Vec2::new(0.0, -1.0)),
        (SurfaceKind::Wall, Vec2::new(interior.min.x, clamped.y), Vec2::RIGHT),
        (SurfaceKind::Wall, Vec2::new(interior.max.x, clamped.y), Vec2::new(-1.0, 0.0)),
    ];

    faces
        .iter()
        .filter(|(kind, _, _)| attach.allows(*kind))
        .min_by(|a, b| a.1.distance(point).total_cmp(&b.1.distance(point)))
        .map(|(_, face, normal)| (*face + *normal * offset, *normal))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FireRejection {
    #[error("weapons are only live in play")]
    WrongPhase,
    #[error("attacker cannot fire before the reveal")]
    NotRevealed,
    #[error("shooter is dead")]
    Dead,
    #[error("aim has a non-finite component")]
    InvalidAim,
    #[error("weapon is cooling down")]
    Cooldown,
    #[error("burst exhausted")]
    BurstCooldown,
}

/// Refuses aims that cannot be normalised into a direction.
pub fn check_aim(aim: Vec2) -> Result<(), FireRejection> {
    if aim.x.is_finite() && aim.y.is_finite() {
        Ok(())
    } else {
        Err(FireRejection::InvalidAim)
    }
}

/// Cooldown plus burst limiter. The server keeps one per shooter, the
/// client keeps its own copy purely to avoid sending doomed requests.
#[derive(Debug, Clone, PartialEq)]
pub struct FireLimiter {
    next_fire: f64,
    burst_block_until: f64,
    shots_left: u32,
}

impl FireLimiter {
    pub fn new(weapon: &WeaponSettings) -> Self {
        Self {
            next_fire: 0.0,
            burst_block_until: 0.0,
            shots_left: weapon.burst_size,
        }
    }

    pub fn shots_left(&self) -> u32 {
        self.shots_left
    }

    /// Consumes a shot if one is available at `now`. Emptying the burst
    /// refills it and blocks firing for the burst cooldown.
    pub fn try_fire(&mut self, weapon: &WeaponSettings, now: f64) -> Result<(), FireRejection> {
        if now < self.burst_block_until {
            return Err(FireRejection::BurstCooldown);
        }
        if now < self.next_fire {
            return Err(FireRejection::Cooldown);
        }
        if self.shots_left == 0 {
            self.shots_left = weapon.burst_size;
            self.burst_block_until = now + weapon.burst_cooldown as f64;
            return Err(FireRejection::BurstCooldown);
        }

        self.next_fire = now + 1.0 / weapon.fire_rate.max(0.1) as f64;
        self.shots_left -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MatchRules;
    use assert_approx_eq::assert_approx_eq;
    use std::collections::HashSet;

    struct Grid {
        cells: HashSet<GridPos>,
        main: bool,
    }

    impl RoomOccupancy for Grid {
        fn is_occupied(&self, pos: GridPos) -> bool {
            self.cells.contains(&pos)
        }

        fn placed_count(&self) -> usize {
            self.cells.len()
        }

        fn main_room_placed(&self) -> bool {
            self.main
        }
    }

    fn grid(cells: &[(i32, i32)], main: bool) -> Grid {
        Grid {
            cells: cells.iter().map(|&(x, y)| GridPos::new(x, y)).collect(),
            main,
        }
    }

    fn check(grid: &Grid, role: Role, prefab: usize, x: i32, y: i32) -> Result<(), RoomRejection> {
        let rules = MatchRules::default();
        validate_room_placement(
            grid,
            &rules.build,
            rules.rooms.len(),
            role,
            prefab,
            GridPos::new(x, y),
        )
    }

    #[test]
    fn test_room_rejections_in_order() {
        let empty = grid(&[], false);
        assert_eq!(check(&empty, Role::Attacker, 9, 0, -1), Err(RoomRejection::NotBuilder));
        assert_eq!(check(&empty, Role::Builder, 9, 0, -1), Err(RoomRejection::UnknownPrefab(9)));
        assert_eq!(
            check(&empty, Role::Builder, 1, 0, -1),
            Err(RoomRejection::BelowMinimumRow { y: -1, min: 0 })
        );

        let one = grid(&[(0, 0)], false);
        assert_eq!(
            check(&one, Role::Builder, 1, 0, 0),
            Err(RoomRejection::Occupied(GridPos::new(0, 0)))
        );
    }

    #[test]
    fn test_cells_outside_grid_extent_are_refused() {
        let one = grid(&[(0, 0)], false);
        assert_eq!(
            check(&one, Role::Builder, 1, i32::MAX, 0),
            Err(RoomRejection::OutOfBounds(GridPos::new(i32::MAX, 0)))
        );
        assert_eq!(
            check(&one, Role::Builder, 1, i32::MIN, 0),
            Err(RoomRejection::OutOfBounds(GridPos::new(i32::MIN, 0)))
        );
        assert_eq!(
            check(&one, Role::Builder, 1, 0, 65),
            Err(RoomRejection::OutOfBounds(GridPos::new(0, 65)))
        );
        assert!(check(&one, Role::Builder, 1, -64, 0).is_ok());
    }

    #[test]
    fn test_first_room_and_ground_row_are_always_connected() {
        let empty = grid(&[], false);
        assert!(check(&empty, Role::Builder, 1, 5, 3).is_ok());

        let one = grid(&[(0, 0)], false);
        assert!(check(&one, Role::Builder, 1, 10, 0).is_ok());
        assert_eq!(
            check(&one, Role::Builder, 1, 10, 1),
            Err(RoomRejection::NotConnected(GridPos::new(10, 1)))
        );
        assert!(check(&one, Role::Builder, 1, 0, 1).is_ok());
    }

    #[test]
    fn test_last_slot_is_reserved_for_main_room() {
        let seven = grid(&[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (5, 0), (6, 0)], false);
        assert_eq!(
            check(&seven, Role::Builder, 1, 7, 0),
            Err(RoomRejection::LastSlotReservedForMainRoom)
        );
        assert!(check(&seven, Role::Builder, 0, 7, 0).is_ok());
    }

    #[test]
    fn test_budget_and_main_singleton() {
        let full = grid(&[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (5, 0), (6, 0), (7, 0)], true);
        assert_eq!(
            check(&full, Role::Builder, 0, 8, 0),
            Err(RoomRejection::BudgetExhausted { max: 8 })
        );

        let with_main = grid(&[(0, 0)], true);
        assert_eq!(
            check(&with_main, Role::Builder, 0, 1, 0),
            Err(RoomRejection::MainRoomAlreadyPlaced)
        );
    }

    #[test]
    fn test_room_hash_is_stable_and_wraps() {
        assert_eq!(room_hash(GridPos::new(0, 0)), 0);
        assert_eq!(room_hash(GridPos::new(1, 0)), 73_856_093);
        assert_eq!(room_hash(GridPos::new(0, 1)), 19_349_663);
        assert_ne!(room_hash(GridPos::new(1, 0)), room_hash(GridPos::new(0, 1)));
        assert_eq!(room_hash(GridPos::new(100, -50)), room_hash(GridPos::new(100, -50)));
    }

    #[test]
    fn test_trap_limits() {
        let def = TrapDef::default();
        assert!(check_trap_limits(&def, 0, 0).is_ok());
        assert_eq!(
            check_trap_limits(&def, 1, 1),
            Err(TrapRejection::RoomLimitReached { limit: 1 })
        );
        assert_eq!(
            check_trap_limits(&def, 3, 0),
            Err(TrapRejection::GlobalLimitReached { limit: 3 })
        );

        let unlimited = TrapDef {
            limit_global: 0,
            max_per_room: 0,
            ..TrapDef::default()
        };
        assert!(check_trap_limits(&unlimited, 500, 500).is_ok());
    }

    #[test]
    fn test_clamp_rotation_step() {
        let def = TrapDef::default();
        assert_eq!(clamp_rotation_step(&def, 5), 1);
        assert_eq!(clamp_rotation_step(&def, -1), 3);

        let limited = TrapDef {
            allowed_rot_steps: vec![2, 0],
            ..TrapDef::default()
        };
        assert_eq!(clamp_rotation_step(&limited, 1), 2);
        assert_eq!(clamp_rotation_step(&limited, 4), 0);

        let fixed = TrapDef {
            allow_rotate: false,
            ..TrapDef::default()
        };
        assert_eq!(clamp_rotation_step(&fixed, 3), 0);
    }

    #[test]
    fn test_snap_and_angles() {
        let snapped = snap_position(Vec2::new(1.26, -0.74), 0.5);
        assert_approx_eq!(snapped.x, 1.5);
        assert_approx_eq!(snapped.y, -0.5);
        assert_eq!(snap_position(Vec2::new(1.26, 2.0), 0.0), Vec2::new(1.26, 2.0));

        assert_approx_eq!(base_angle_from_normal(Vec2::UP), 0.0);
        assert_approx_eq!(base_angle_from_normal(Vec2::new(-1.0, 0.0)), 90.0);
        assert_approx_eq!(base_angle_from_normal(Vec2::ZERO), 0.0);
        for normal in [Vec2::RIGHT, Vec2::new(0.0, -1.0), Vec2::new(1.0, 1.0)] {
            assert_approx_eq!(base_angle_from_normal(normal) + 90.0, normal.angle_deg(), 1e-4);
        }

        let def = TrapDef {
            angle_offset_deg: 5.0,
            ..TrapDef::default()
        };
        assert_approx_eq!(trap_rotation_deg(&def, Some(Vec2::UP), 1), 95.0);
        assert_approx_eq!(trap_rotation_deg(&def, None, 2), 185.0);

        let forced = TrapDef {
            force_fixed_angle: true,
            fixed_angle_deg: 45.0,
            ..TrapDef::default()
        };
        assert_approx_eq!(trap_rotation_deg(&forced, Some(Vec2::RIGHT), 3), 45.0);
    }

    #[test]
    fn test_nearest_room_surface() {
        let build = BuildSettings::default();
        let room = GridPos::new(0, 0);

        let (point, normal) =
            nearest_room_surface(&build, room, Vec2::new(2.0, -3.0), AttachKind::FloorOnly, 0.06)
                .unwrap();
        assert_approx_eq!(point.x, 2.0);
        assert_approx_eq!(point.y, -4.94);
        assert_eq!(normal, Vec2::UP);

        let (point, normal) =
            nearest_room_surface(&build, room, Vec2::new(10.0, 0.0), AttachKind::WallOnly, 0.06)
                .unwrap();
        assert_approx_eq!(point.x, 11.94);
        assert_eq!(normal, Vec2::new(-1.0, 0.0));

        let (point, _) =
            nearest_room_surface(&build, room, Vec2::new(50.0, 0.0), AttachKind::Interior, 0.06)
                .unwrap();
        assert_approx_eq!(point.x, 12.0);
    }

    #[test]
    fn test_non_finite_aim_is_refused() {
        assert_eq!(check_aim(Vec2::new(1.0, -0.5)), Ok(()));
        assert_eq!(check_aim(Vec2::ZERO), Ok(()));
        assert_eq!(check_aim(Vec2::new(f32::NAN, 0.0)), Err(FireRejection::InvalidAim));
        assert_eq!(check_aim(Vec2::new(0.0, f32::INFINITY)), Err(FireRejection::InvalidAim));
        assert_eq!(
            FireRejection::InvalidAim.to_string(),
            "aim has a non-finite component"
        );
    }

    #[test]
    fn test_fire_limiter_burst() {
        let weapon = WeaponSettings {
            fire_rate: 10.0,
            burst_size: 2,
            burst_cooldown: 1.0,
        };
        let mut limiter = FireLimiter::new(&weapon);

        assert!(limiter.try_fire(&weapon, 0.0).is_ok());
        assert_eq!(limiter.try_fire(&weapon, 0.05), Err(FireRejection::Cooldown));
        assert!(limiter.try_fire(&weapon, 0.1).is_ok());
        assert_eq!(limiter.shots_left(), 0);

        // Empty burst refills but blocks.
        assert_eq!(limiter.try_fire(&weapon, 0.2), Err(FireRejection::BurstCooldown));
        assert_eq!(limiter.shots_left(), 2);
        assert_eq!(limiter.try_fire(&weapon, 1.1), Err(FireRejection::BurstCooldown));
        assert!(limiter.try_fire(&weapon, 1.25).is_ok());
    }
}
