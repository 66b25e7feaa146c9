//! Grid room building.
//!
//! Each placed room owns its colliders: one placement area covering the
//! interior, a floor strip along the bottom and wall strips on the other
//! three sides. When a neighbour appears, the shared side of both rooms is
//! opened by swapping the solid strip for segments that leave a doorway.

use crate::entity::EntityIds;
use crate::spatial::{ColliderId, Layer, Owner, SpatialIndex};
use log::info;
use shared::rules::{room_hash, validate_room_placement};
use shared::{
    Aabb, BuildSettings, EntityId, GridPos, MatchRules, Role, RoomOccupancy, RoomRejection, Vec2,
    WallSide,
};
use std::collections::{BTreeMap, HashMap};

/// Collider handles for one side of a room.
#[derive(Debug, Clone, Default)]
pub struct WallHandle {
    pub segments: Vec<ColliderId>,
}

#[derive(Debug, Clone, Default)]
pub struct RoomWalls {
    pub left: WallHandle,
    pub right: WallHandle,
    pub top: WallHandle,
    pub bottom: WallHandle,
}

impl RoomWalls {
    pub fn side(&self, side: WallSide) -> &WallHandle {
        match side {
            WallSide::Left => &self.left,
            WallSide::Right => &self.right,
            WallSide::Top => &self.top,
            WallSide::Bottom => &self.bottom,
        }
    }

    fn side_mut(&mut self, side: WallSide) -> &mut WallHandle {
        match side {
            WallSide::Left => &mut self.left,
            WallSide::Right => &mut self.right,
            WallSide::Top => &mut self.top,
            WallSide::Bottom => &mut self.bottom,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: EntityId,
    pub prefab: usize,
    pub grid: GridPos,
    pub position: Vec2,
    pub bounds: Aabb,
    pub open_mask: u8,
    pub hash: i32,
    pub place_area: ColliderId,
    pub walls: RoomWalls,
}

impl Room {
    pub fn is_open(&self, side: WallSide) -> bool {
        self.open_mask & side.bit() != 0
    }

    /// Opens one side. Returns false when it was already open.
    pub fn open(&mut self, side: WallSide, build: &BuildSettings, world: &mut SpatialIndex) -> bool {
        if self.is_open(side) {
            return false;
        }
        self.open_mask |= side.bit();

        let owner = Owner::Room(self.id);
        let handle = self.walls.side_mut(side);
        for segment in handle.segments.drain(..) {
            world.remove(segment);
        }
        handle.segments = wall_segments(&self.bounds, side, build, true)
            .into_iter()
            .map(|aabb| world.insert(aabb, wall_layer(side), owner))
            .collect();
        true
    }
}

fn wall_layer(side: WallSide) -> Layer {
    match side {
        WallSide::Bottom => Layer::Floor,
        _ => Layer::Wall,
    }
}

/// Geometry of one side. Floor and ceiling span the full width, side walls
/// fill the height between them. Side doorways start at floor level;
/// floor and ceiling hatches are centred.
fn wall_segments(bounds: &Aabb, side: WallSide, build: &BuildSettings, open: bool) -> Vec<Aabb> {
    let t = build.wall_thickness;
    let (min, max) = (bounds.min, bounds.max);
    let inner_bottom = min.y + t;
    let inner_top = max.y - t;

    match side {
        WallSide::Left | WallSide::Right => {
            let (x0, x1) = if side == WallSide::Left {
                (min.x, min.x + t)
            } else {
                (max.x - t, max.x)
            };
            if !open {
                return vec![Aabb::new(Vec2::new(x0, inner_bottom), Vec2::new(x1, inner_top))];
            }
            let door = build.door_size.min((inner_top - inner_bottom) * 0.9);
            vec![Aabb::new(
                Vec2::new(x0, inner_bottom + door),
                Vec2::new(x1, inner_top),
            )]
        }
        WallSide::Top | WallSide::Bottom => {
            let (y0, y1) = if side == WallSide::Bottom {
                (min.y, min.y + t)
            } else {
                (max.y - t, max.y)
            };
            if !open {
                return vec![Aabb::new(Vec2::new(min.x, y0), Vec2::new(max.x, y1))];
            }
            let half = build.door_size.min((max.x - min.x) * 0.9) * 0.5;
            let center = bounds.center().x;
            vec![
                Aabb::new(Vec2::new(min.x, y0), Vec2::new(center - half, y1)),
                Aabb::new(Vec2::new(center + half, y0), Vec2::new(max.x, y1)),
            ]
        }
    }
}

/// Result of a successful placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRoom {
    pub room: EntityId,
    pub is_main: bool,
    /// Every room whose opening mask changed, with its new mask.
    pub doors_changed: Vec<(EntityId, u8)>,
}

/// Authoritative table of placed rooms.
#[derive(Debug, Default)]
pub struct RoomGrid {
    rooms: BTreeMap<EntityId, Room>,
    by_grid: HashMap<GridPos, EntityId>,
    main_room: Option<EntityId>,
}

impl RoomOccupancy for RoomGrid {
    fn is_occupied(&self, pos: GridPos) -> bool {
        self.by_grid.contains_key(&pos)
    }

    fn placed_count(&self) -> usize {
        self.rooms.len()
    }

    fn main_room_placed(&self) -> bool {
        self.main_room.is_some()
    }
}

impl RoomGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EntityId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn at(&self, pos: GridPos) -> Option<&Room> {
        self.by_grid.get(&pos).and_then(|id| self.rooms.get(id))
    }

    pub fn main_room(&self) -> Option<&Room> {
        self.main_room.and_then(|id| self.rooms.get(&id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Validates and places a room, then stitches it to its neighbours.
    pub fn place(
        &mut self,
        rules: &MatchRules,
        role: Role,
        prefab: usize,
        pos: GridPos,
        ids: &mut EntityIds,
        world: &mut SpatialIndex,
    ) -> Result<PlacedRoom, RoomRejection> {
        validate_room_placement(&*self, &rules.build, rules.rooms.len(), role, prefab, pos)?;

        let build = &rules.build;
        let id = ids.next();
        let owner = Owner::Room(id);
        let bounds = build.room_bounds(pos);

        let place_area = world.insert(build.room_interior(pos), Layer::PlaceArea, owner);
        let mut walls = RoomWalls::default();
        for side in WallSide::ALL {
            walls.side_mut(side).segments = wall_segments(&bounds, side, build, false)
                .into_iter()
                .map(|aabb| world.insert(aabb, wall_layer(side), owner))
                .collect();
        }

        let mut room = Room {
            id,
            prefab,
            grid: pos,
            position: build.room_center(pos),
            bounds,
            open_mask: 0,
            hash: room_hash(pos),
            place_area,
            walls,
        };

        let mut doors_changed = Vec::new();
        for (side, neighbour_pos) in pos.neighbours() {
            let Some(neighbour_id) = self.by_grid.get(&neighbour_pos).copied() else {
                continue;
            };
            room.open(side, build, world);
            if let Some(neighbour) = self.rooms.get_mut(&neighbour_id) {
                if neighbour.open(side.opposite(), build, world) {
                    doors_changed.push((neighbour_id, neighbour.open_mask));
                }
            }
        }

        let is_main = rules.is_main_room(prefab);
        if is_main {
            self.main_room = Some(id);
        }

        info!(
            "Placed room {} ({}) at {}{}",
            id,
            rules.rooms[prefab].name,
            pos,
            if is_main { " as main room" } else { "" }
        );

        self.by_grid.insert(pos, id);
        self.rooms.insert(id, room);

        Ok(PlacedRoom {
            room: id,
            is_main,
            doors_changed,
        })
    }

    /// Builder relocation target for a room: its builder anchor or its position.
    pub fn builder_anchor(&self, rules: &MatchRules, id: EntityId) -> Option<Vec2> {
        let room = self.rooms.get(&id)?;
        let offset = rules.room(room.prefab).and_then(|p| p.builder_spawn);
        Some(offset.map_or(room.position, |o| room.position + o))
    }

    pub fn attacker_anchor(&self, rules: &MatchRules, id: EntityId) -> Option<Vec2> {
        let room = self.rooms.get(&id)?;
        let offset = rules.room(room.prefab).and_then(|p| p.attacker_spawn);
        Some(offset.map_or(room.position, |o| room.position + o))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{LayerMask, SpatialQuery};

    struct Fixture {
        rules: MatchRules,
        grid: RoomGrid,
        ids: EntityIds,
        world: SpatialIndex,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                rules: MatchRules::default(),
                grid: RoomGrid::new(),
                ids: EntityIds::new(),
                world: SpatialIndex::new(),
            }
        }

        fn place(&mut self, prefab: usize, x: i32, y: i32) -> Result<PlacedRoom, RoomRejection> {
            self.grid.place(
                &self.rules,
                Role::Builder,
                prefab,
                GridPos::new(x, y),
                &mut self.ids,
                &mut self.world,
            )
        }
    }

    #[test]
    fn test_place_creates_area_and_walls() {
        let mut fx = Fixture::new();
        let placed = fx.place(1, 0, 0).unwrap();
        let room = fx.grid.get(placed.room).unwrap();

        assert_eq!(room.open_mask, 0);
        assert_eq!(room.hash, 0);
        for side in WallSide::ALL {
            assert_eq!(room.walls.side(side).segments.len(), 1);
        }
        // Area plus four sides.
        assert_eq!(fx.world.len(), 5);

        let hit = fx
            .world
            .overlap_point(Vec2::new(0.0, 0.0), LayerMask::only(Layer::PlaceArea))
            .unwrap();
        assert_eq!(hit.owner, Owner::Room(placed.room));
    }

    #[test]
    fn test_neighbours_open_shared_walls() {
        let mut fx = Fixture::new();
        let first = fx.place(1, 0, 0).unwrap();
        let second = fx.place(1, 1, 0).unwrap();

        let a = fx.grid.get(first.room).unwrap();
        let b = fx.grid.get(second.room).unwrap();
        assert!(a.is_open(WallSide::Right));
        assert!(b.is_open(WallSide::Left));
        assert!(!a.is_open(WallSide::Left));
        assert_eq!(second.doors_changed, vec![(first.room, WallSide::Right.bit())]);

        let above = fx.place(2, 1, 1).unwrap();
        let b = fx.grid.get(second.room).unwrap();
        let c = fx.grid.get(above.room).unwrap();
        assert!(b.is_open(WallSide::Top));
        assert!(c.is_open(WallSide::Bottom));
        assert_eq!(c.walls.bottom.segments.len(), 2);
    }

    #[test]
    fn test_open_is_idempotent() {
        let mut fx = Fixture::new();
        let placed = fx.place(1, 0, 0).unwrap();
        let build = fx.rules.build.clone();
        let room = fx.grid.rooms.get_mut(&placed.room).unwrap();

        assert!(room.open(WallSide::Left, &build, &mut fx.world));
        let colliders = fx.world.len();
        assert!(!room.open(WallSide::Left, &build, &mut fx.world));
        assert_eq!(fx.world.len(), colliders);
    }

    #[test]
    fn test_side_doorway_starts_at_floor() {
        let mut fx = Fixture::new();
        fx.place(1, 0, 0).unwrap();
        fx.place(1, 1, 0).unwrap();

        // Walking height next to the shared side is clear, higher up is wall.
        assert!(fx
            .world
            .overlap_point(Vec2::new(12.5, -4.5), LayerMask::STRUCTURE)
            .is_none());
        assert!(fx
            .world
            .overlap_point(Vec2::new(12.5, 3.0), LayerMask::STRUCTURE)
            .is_some());
    }

    #[test]
    fn test_main_room_flag_and_anchors() {
        let mut fx = Fixture::new();
        let placed = fx.place(0, 0, 0).unwrap();
        assert!(placed.is_main);
        assert!(fx.grid.main_room_placed());
        assert_eq!(
            fx.grid.builder_anchor(&fx.rules, placed.room),
            Some(Vec2::new(-8.0, -4.0))
        );

        let hall = fx.place(2, 1, 0).unwrap();
        assert!(!hall.is_main);
        assert_eq!(
            fx.grid.attacker_anchor(&fx.rules, hall.room),
            Some(Vec2::new(26.0, 0.0))
        );
        assert_eq!(fx.place(0, 2, 0), Err(RoomRejection::MainRoomAlreadyPlaced));
    }
}
