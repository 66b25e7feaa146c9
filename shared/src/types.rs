use serde::{Deserialize, Serialize};
use std::fmt;

pub type ClientId = u32;
pub type EntityId = u32;

/// Which side of the match a participant plays. Assigned once at join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Builder,
    Attacker,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Builder => write!(f, "Builder"),
            Role::Attacker => write!(f, "Attacker"),
        }
    }
}

/// Global match stage. Only ever advances during normal play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    BuildRooms,
    PlaceTraps,
    Play,
}

impl Phase {
    /// The phase a builder request advances to, `None` once in `Play`.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::BuildRooms => Some(Phase::PlaceTraps),
            Phase::PlaceTraps => Some(Phase::Play),
            Phase::Play => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundState {
    WaitingForReveal,
    Running,
    Ended,
}

/// Grid slot of a room. One room per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent cell on `side`, or `None` past the edge of `i32`.
    pub fn offset(self, side: WallSide) -> Option<GridPos> {
        let (x, y) = match side {
            WallSide::Left => (self.x.checked_sub(1)?, self.y),
            WallSide::Right => (self.x.checked_add(1)?, self.y),
            WallSide::Top => (self.x, self.y.checked_add(1)?),
            WallSide::Bottom => (self.x, self.y.checked_sub(1)?),
        };
        Some(GridPos::new(x, y))
    }

    /// The existing orthogonal neighbours paired with the side of `self`
    /// they touch.
    pub fn neighbours(self) -> impl Iterator<Item = (WallSide, GridPos)> {
        WallSide::ALL
            .into_iter()
            .filter_map(move |side| self.offset(side).map(|pos| (side, pos)))
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One side of a room. Each side owns one bit of the room's opening mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl WallSide {
    pub const ALL: [WallSide; 4] = [
        WallSide::Left,
        WallSide::Right,
        WallSide::Top,
        WallSide::Bottom,
    ];

    pub fn bit(self) -> u8 {
        match self {
            WallSide::Left => 1,
            WallSide::Right => 1 << 1,
            WallSide::Top => 1 << 2,
            WallSide::Bottom => 1 << 3,
        }
    }

    pub fn opposite(self) -> WallSide {
        match self {
            WallSide::Left => WallSide::Right,
            WallSide::Right => WallSide::Left,
            WallSide::Top => WallSide::Bottom,
            WallSide::Bottom => WallSide::Top,
        }
    }
}

/// Required mounting surface of a trap type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachKind {
    FloorOnly,
    WallOnly,
    SurfaceAny,
    Interior,
}

/// Structural surfaces a trap can be mounted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    Floor,
    Wall,
}

impl AttachKind {
    pub fn allows(self, surface: SurfaceKind) -> bool {
        match self {
            AttachKind::FloorOnly => surface == SurfaceKind::Floor,
            AttachKind::WallOnly => surface == SurfaceKind::Wall,
            AttachKind::SurfaceAny => true,
            AttachKind::Interior => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_progression() {
        assert_eq!(Phase::BuildRooms.next(), Some(Phase::PlaceTraps));
        assert_eq!(Phase::PlaceTraps.next(), Some(Phase::Play));
        assert_eq!(Phase::Play.next(), None);
    }

    #[test]
    fn test_wall_bits_are_distinct() {
        let mask = WallSide::ALL.iter().fold(0u8, |mask, side| {
            assert_eq!(mask & side.bit(), 0);
            mask | side.bit()
        });
        assert_eq!(mask, 0b1111);
    }

    #[test]
    fn test_neighbour_sides_pair_up() {
        let origin = GridPos::new(2, 1);
        for (side, neighbour) in origin.neighbours() {
            assert_eq!(neighbour.offset(side.opposite()), Some(origin));
        }
        assert_eq!(origin.offset(WallSide::Top), Some(GridPos::new(2, 2)));
    }

    #[test]
    fn test_neighbours_stop_at_integer_edge() {
        let corner = GridPos::new(i32::MAX, i32::MIN);
        assert_eq!(corner.offset(WallSide::Right), None);
        assert_eq!(corner.offset(WallSide::Bottom), None);

        let sides: Vec<WallSide> = corner.neighbours().map(|(side, _)| side).collect();
        assert_eq!(sides, vec![WallSide::Left, WallSide::Top]);
    }

    #[test]
    fn test_attach_kind_surfaces() {
        assert!(AttachKind::FloorOnly.allows(SurfaceKind::Floor));
        assert!(!AttachKind::FloorOnly.allows(SurfaceKind::Wall));
        assert!(AttachKind::WallOnly.allows(SurfaceKind::Wall));
        assert!(AttachKind::SurfaceAny.allows(SurfaceKind::Wall));
        assert!(!AttachKind::Interior.allows(SurfaceKind::Floor));
    }
}
