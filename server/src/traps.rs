//! Surface-constrained trap placement and the per-trap runtime state the
//! hazard step works on.

use crate::entity::EntityIds;
use crate::rooms::RoomGrid;
use crate::spatial::{ColliderId, Layer, LayerMask, Owner, SpatialIndex, SpatialQuery};
use log::info;
use shared::rules::{check_trap_limits, clamp_rotation_step, snap_position, trap_rotation_deg};
use shared::{
    Aabb, AttachKind, ClientId, EntityId, MatchRules, Role, SurfaceKind, TrapBehaviour, TrapDef,
    TrapRejection, Vec2,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A builder's request as it arrives off the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrapRequest {
    pub trap: usize,
    pub position: Vec2,
    pub normal_hint: Vec2,
    pub rotation_step: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FireCycle {
    Idle,
    Arming { active_at: f64 },
    Active { until: f64 },
}

/// Mutable behaviour state, one variant per behaviour kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TrapRuntime {
    Inert,
    Spikes {
        last_hit: HashMap<u32, f64>,
    },
    /// First shot is scheduled once the round is seen running.
    ArrowLauncher {
        next_fire: Option<f64>,
    },
    Firetrap {
        cycle: FireCycle,
        /// Fractional damage carried between ticks.
        carry: f32,
    },
    Defender {
        bot: Option<EntityId>,
    },
    Spikehead {
        /// Interior of the owning room; a charge ends at its edge.
        arena: Aabb,
        check_timer: f32,
        charge: Option<Vec2>,
    },
    Saw {
        arena: Aabb,
        home: Vec2,
        /// Signed distance from `home` along the trap's x axis.
        travel: f32,
        backwards: bool,
        touching: HashSet<ClientId>,
    },
}

impl TrapRuntime {
    fn for_behaviour(behaviour: &TrapBehaviour, position: Vec2, arena: Aabb) -> Self {
        match behaviour {
            TrapBehaviour::Inert => TrapRuntime::Inert,
            TrapBehaviour::Spikes { .. } => TrapRuntime::Spikes {
                last_hit: HashMap::new(),
            },
            TrapBehaviour::ArrowLauncher { .. } => TrapRuntime::ArrowLauncher { next_fire: None },
            TrapBehaviour::Firetrap { .. } => TrapRuntime::Firetrap {
                cycle: FireCycle::Idle,
                carry: 0.0,
            },
            TrapBehaviour::Defender(_) => TrapRuntime::Defender { bot: None },
            TrapBehaviour::Spikehead { .. } => TrapRuntime::Spikehead {
                arena,
                check_timer: 0.0,
                charge: None,
            },
            TrapBehaviour::Saw { .. } => TrapRuntime::Saw {
                arena,
                home: position,
                travel: 0.0,
                backwards: false,
                touching: HashSet::new(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trap {
    pub id: EntityId,
    pub kind: usize,
    pub room: EntityId,
    pub room_hash: i32,
    pub position: Vec2,
    pub rotation_deg: f32,
    pub bounds: Aabb,
    pub collider: Option<ColliderId>,
    pub runtime: TrapRuntime,
}

impl Trap {
    /// Unit vector along the trap's local up axis.
    pub fn facing(&self) -> Vec2 {
        Vec2::from_angle_deg(self.rotation_deg + 90.0)
    }

    /// Unit vector along the trap's local x axis.
    pub fn side(&self) -> Vec2 {
        Vec2::from_angle_deg(self.rotation_deg)
    }

    pub fn is_mobile(&self) -> bool {
        matches!(
            self.runtime,
            TrapRuntime::Spikehead { .. } | TrapRuntime::Saw { .. }
        )
    }

    /// Moves the trap and its hitbox. The caller syncs the collider.
    pub fn move_to(&mut self, position: Vec2) {
        self.bounds = self.bounds.translated(position - self.position);
        self.position = position;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedTrap {
    pub trap: EntityId,
    pub kind: usize,
    pub room: EntityId,
    pub room_hash: i32,
    pub position: Vec2,
    pub rotation_deg: f32,
}

/// All placed traps plus the two counters that bound them.
#[derive(Debug, Default)]
pub struct TrapBoard {
    traps: BTreeMap<EntityId, Trap>,
    global: HashMap<usize, u32>,
    per_room: HashMap<(i32, usize), u32>,
}

impl TrapBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global_count(&self, kind: usize) -> u32 {
        self.global.get(&kind).copied().unwrap_or(0)
    }

    pub fn room_count(&self, room_hash: i32, kind: usize) -> u32 {
        self.per_room.get(&(room_hash, kind)).copied().unwrap_or(0)
    }

    pub fn get(&self, id: EntityId) -> Option<&Trap> {
        self.traps.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Trap> {
        self.traps.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trap> {
        self.traps.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Trap> {
        self.traps.values_mut()
    }

    pub fn len(&self) -> usize {
        self.traps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traps.is_empty()
    }

    /// Validates a request, resolves its final position and rotation, and
    /// records the trap. Counters only ever go up.
    pub fn place(
        &mut self,
        rules: &MatchRules,
        role: Role,
        request: &TrapRequest,
        rooms: &RoomGrid,
        ids: &mut EntityIds,
        world: &mut SpatialIndex,
    ) -> Result<PlacedTrap, TrapRejection> {
        if role != Role::Builder {
            return Err(TrapRejection::NotBuilder);
        }
        let def = rules
            .trap(request.trap)
            .ok_or(TrapRejection::UnknownTrap(request.trap))?;

        let area = world
            .overlap_point(request.position, LayerMask::only(Layer::PlaceArea))
            .ok_or(TrapRejection::OutsidePlacementArea)?;
        let room_id = match area.owner {
            Owner::Room(id) => id,
            _ => return Err(TrapRejection::OutsidePlacementArea),
        };
        let room = rooms
            .get(room_id)
            .ok_or(TrapRejection::OutsidePlacementArea)?;

        check_trap_limits(
            def,
            self.global_count(request.trap),
            self.room_count(room.hash, request.trap),
        )?;

        let hint = if request.normal_hint.length_squared() < 1e-4 {
            Vec2::UP
        } else {
            request.normal_hint.normalize_or(Vec2::UP)
        };

        let (resolved, normal) = if def.attach == AttachKind::Interior {
            let inside = world
                .closest_point(area.collider, request.position)
                .unwrap_or(request.position);
            (inside, None)
        } else {
            let (point, normal) = resolve_surface(rules, def, request.position, hint, room_id, world)?;
            (point, Some(normal))
        };

        let max_snap = rules.trap_placement.max_snap_distance;
        if max_snap > 0.0 && resolved.distance(request.position) > max_snap {
            return Err(TrapRejection::TooFarFromRequest);
        }

        let position = snap_position(resolved, def.position_snap_step);
        let step = clamp_rotation_step(def, request.rotation_step);
        let rotation_deg = trap_rotation_deg(def, normal, step);

        let id = ids.next();
        let bounds = Aabb::from_center_size(position, rotated_size(def.size, rotation_deg));
        let collider = match def.behaviour {
            TrapBehaviour::Defender(_) => None,
            _ => Some(world.insert(bounds, Layer::Trap, Owner::Trap(id))),
        };

        *self.global.entry(request.trap).or_insert(0) += 1;
        *self.per_room.entry((room.hash, request.trap)).or_insert(0) += 1;

        info!(
            "Placed trap {} ({}) in room {} at ({:.2}, {:.2}) rot {:.0}",
            id, def.name, room_id, position.x, position.y, rotation_deg
        );

        self.traps.insert(
            id,
            Trap {
                id,
                kind: request.trap,
                room: room_id,
                room_hash: room.hash,
                position,
                rotation_deg,
                bounds,
                collider,
                runtime: TrapRuntime::for_behaviour(
                    &def.behaviour,
                    position,
                    rules.build.room_interior(room.grid),
                ),
            },
        );

        Ok(PlacedTrap {
            trap: id,
            kind: request.trap,
            room: room_id,
            room_hash: room.hash,
            position,
            rotation_deg,
        })
    }
}

/// Finds the mounting surface near `desired` and returns the final point
/// and the surface normal.
fn resolve_surface(
    rules: &MatchRules,
    def: &TrapDef,
    desired: Vec2,
    hint: Vec2,
    room: EntityId,
    world: &SpatialIndex,
) -> Result<(Vec2, Vec2), TrapRejection> {
    let placement = &rules.trap_placement;
    let sample = desired - hint * placement.place_offset;
    let surface = world
        .overlap_circle(sample, placement.validate_radius, LayerMask::STRUCTURE)
        .ok_or(TrapRejection::NoSurface)?;

    if surface.owner != Owner::Room(room) {
        return Err(TrapRejection::SurfaceInOtherRoom);
    }
    let kind = match surface.layer {
        Layer::Floor => SurfaceKind::Floor,
        _ => SurfaceKind::Wall,
    };
    if !def.attach.allows(kind) {
        return Err(TrapRejection::SurfaceNotAllowed);
    }

    let closest = world
        .closest_point(surface.collider, desired)
        .ok_or(TrapRejection::NoSurface)?;
    let away = desired - closest;
    let normal = if away.length_squared() < 1e-4 {
        hint
    } else {
        away.normalize_or(hint)
    };
    Ok((closest + normal * placement.place_offset, normal))
}

/// Footprint after quarter-turn rotation.
fn rotated_size(size: Vec2, rotation_deg: f32) -> Vec2 {
    let quarter = (rotation_deg / 90.0).round() as i32;
    if quarter.rem_euclid(2) == 1 {
        Vec2::new(size.y, size.x)
    } else {
        size
    }
}
