//! Attacker entry room selection.

use crate::phase::PhaseState;
use crate::rooms::RoomGrid;
use log::info;
use shared::{EntityId, MatchRules, Phase, Role, Vec2};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpawnRejection {
    #[error("only the attacker picks an entry room")]
    NotAttacker,
    #[error("entry rooms are picked during play")]
    WrongPhase,
    #[error("the base is already revealed")]
    AlreadyRevealed,
    #[error("no room with id {0}")]
    UnknownRoom(EntityId),
}

/// Picks the attacker's entry room once per match. On success the spawn
/// point is recorded and the base is revealed; the caller moves the attacker.
pub fn select_spawn_room(
    phase: &mut PhaseState,
    rooms: &RoomGrid,
    rules: &MatchRules,
    role: Role,
    room: EntityId,
) -> Result<Vec2, SpawnRejection> {
    if role != Role::Attacker {
        return Err(SpawnRejection::NotAttacker);
    }
    if phase.phase() != Phase::Play {
        return Err(SpawnRejection::WrongPhase);
    }
    if phase.base_revealed() {
        return Err(SpawnRejection::AlreadyRevealed);
    }

    let spawn = rooms
        .attacker_anchor(rules, room)
        .ok_or(SpawnRejection::UnknownRoom(room))?;
    phase.reveal_base(spawn);
    info!("Attacker entering through room {} at ({:.1}, {:.1})", room, spawn.x, spawn.y);
    Ok(spawn)
}
