//! Local checks run before a request is sent.
//!
//! They use the same rule functions as the server, so a request that passes
//! here is only refused on a genuine desync. Failing checks never reach the
//! wire.

use crate::replica::Replica;
use shared::rules::{
    check_aim, check_trap_limits, nearest_room_surface, validate_room_placement, FireLimiter,
    FireRejection, RoomRejection, TrapRejection,
};
use shared::{EntityId, GridPos, Packet, Phase, Role, Vec2};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Refusal {
    #[error("not connected to a match")]
    NotJoined,
    #[error("cannot place room here: {0}")]
    Room(#[from] RoomRejection),
    #[error("cannot place trap here: {0}")]
    Trap(#[from] TrapRejection),
    #[error("cannot fire: {0}")]
    Fire(#[from] FireRejection),
    #[error("cannot advance: {0}")]
    Phase(&'static str),
    #[error("cannot spawn there: {0}")]
    Spawn(&'static str),
}

fn role(replica: &Replica) -> Result<Role, Refusal> {
    replica.role.ok_or(Refusal::NotJoined)
}

pub struct Predictor {
    limiter: Option<FireLimiter>,
}

impl Default for Predictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor {
    pub fn new() -> Self {
        Self { limiter: None }
    }

    pub fn advance_phase(&self, replica: &Replica) -> Result<Packet, Refusal> {
        if role(replica)? != Role::Builder {
            return Err(Refusal::Phase("only the builder moves the match on"));
        }
        if replica.phase == Phase::Play {
            return Err(Refusal::Phase("already in play"));
        }
        Ok(Packet::RequestPhaseAdvance)
    }

    pub fn place_room(&self, replica: &Replica, prefab: usize, pos: GridPos) -> Result<Packet, Refusal> {
        let role = role(replica)?;
        if role == Role::Builder && replica.phase != Phase::BuildRooms {
            return Err(Refusal::Room(RoomRejection::WrongPhase));
        }
        let rules = &replica.rules;
        validate_room_placement(replica, &rules.build, rules.rooms.len(), role, prefab, pos)
            .map_err(Refusal::Room)?;
        Ok(Packet::PlaceRoom {
            prefab,
            grid_x: pos.x,
            grid_y: pos.y,
        })
    }

    /// Aims a trap at the nearest surface of the room under `point` that the
    /// trap can mount on. An explicit `normal_hint` overrides the face normal.
    pub fn place_trap(
        &self,
        replica: &Replica,
        trap: usize,
        point: Vec2,
        normal_hint: Option<Vec2>,
        rotation_step: i32,
    ) -> Result<Packet, Refusal> {
        let refuse = Refusal::Trap;
        if role(replica)? != Role::Builder {
            return Err(refuse(TrapRejection::NotBuilder));
        }
        if replica.phase != Phase::PlaceTraps {
            return Err(refuse(TrapRejection::WrongPhase));
        }
        let rules = &replica.rules;
        let def = rules.trap(trap).ok_or(refuse(TrapRejection::UnknownTrap(trap)))?;
        let grid = rules.build.grid_at(point);
        let room = replica
            .room_at(grid)
            .ok_or(refuse(TrapRejection::OutsidePlacementArea))?;

        check_trap_limits(
            def,
            replica.trap_count(trap),
            replica.room_trap_count(room.room_hash, trap),
        )
        .map_err(refuse)?;

        let placement = &rules.trap_placement;
        let (position, normal) = nearest_room_surface(
            &rules.build,
            grid,
            point,
            def.attach,
            placement.place_offset,
        )
        .ok_or(refuse(TrapRejection::SurfaceNotAllowed))?;
        if placement.max_snap_distance > 0.0 && position.distance(point) > placement.max_snap_distance {
            return Err(refuse(TrapRejection::TooFarFromRequest));
        }

        Ok(Packet::PlaceTrap {
            trap,
            position,
            normal_hint: normal_hint.unwrap_or(normal),
            rotation_step,
        })
    }

    pub fn select_spawn(&self, replica: &Replica, room: EntityId) -> Result<Packet, Refusal> {
        if role(replica)? != Role::Attacker {
            return Err(Refusal::Spawn("only the attacker picks an entry room"));
        }
        if replica.phase != Phase::Play {
            return Err(Refusal::Spawn("the match is not in play"));
        }
        if replica.base_revealed {
            return Err(Refusal::Spawn("entry room already chosen"));
        }
        if replica.room(room).is_none() {
            return Err(Refusal::Spawn("no such room"));
        }
        Ok(Packet::SelectSpawnRoom { room })
    }

    /// Runs the local fire limiter; `now` is the client's own clock in seconds.
    pub fn fire(&mut self, replica: &Replica, aim: Vec2, now: f64) -> Result<Packet, Refusal> {
        let role = role(replica)?;
        if replica.phase != Phase::Play {
            return Err(Refusal::Fire(FireRejection::WrongPhase));
        }
        if role == Role::Attacker && !replica.base_revealed {
            return Err(Refusal::Fire(FireRejection::NotRevealed));
        }
        if replica.is_dead() {
            return Err(Refusal::Fire(FireRejection::Dead));
        }
        check_aim(aim)?;

        let weapon = &replica.rules.combat.weapon;
        self.limiter
            .get_or_insert_with(|| FireLimiter::new(weapon))
            .try_fire(weapon, now)
            .map_err(Refusal::Fire)?;
        Ok(Packet::FireWeapon { aim })
    }
}
