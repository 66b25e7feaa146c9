//! Match phase progression and the base reveal flag it owns.

use log::info;
use shared::{Phase, Role, Vec2};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PhaseRejection {
    #[error("only the builder can advance the phase")]
    NotBuilder,
    #[error("already in the final phase")]
    AlreadyInPlay,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseState {
    phase: Phase,
    base_revealed: bool,
    attacker_spawn: Option<Vec2>,
}

impl Default for PhaseState {
    fn default() -> Self {
        Self {
            phase: Phase::BuildRooms,
            base_revealed: false,
            attacker_spawn: None,
        }
    }
}

impl PhaseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn base_revealed(&self) -> bool {
        self.base_revealed
    }

    pub fn attacker_spawn(&self) -> Option<Vec2> {
        self.attacker_spawn
    }

    /// Advances one step on a builder's request.
    pub fn request_transition(&mut self, requester: Role) -> Result<Phase, PhaseRejection> {
        if requester != Role::Builder {
            return Err(PhaseRejection::NotBuilder);
        }
        let next = self.phase.next().ok_or(PhaseRejection::AlreadyInPlay)?;
        self.set_phase(next);
        Ok(next)
    }

    /// Sets the phase unconditionally. Leaving `Play` hides the base again
    /// and forgets the attacker spawn.
    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        if phase != Phase::Play {
            self.base_revealed = false;
            self.attacker_spawn = None;
        }
        info!("Phase is now {:?}", phase);
    }

    /// Records the attacker spawn and reveals the base. Returns false if the
    /// base was already revealed, in which case nothing changes.
    pub fn reveal_base(&mut self, attacker_spawn: Vec2) -> bool {
        if self.base_revealed {
            return false;
        }
        self.attacker_spawn = Some(attacker_spawn);
        self.base_revealed = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_advances_in_order() {
        let mut state = PhaseState::new();
        assert_eq!(state.request_transition(Role::Builder), Ok(Phase::PlaceTraps));
        assert_eq!(state.request_transition(Role::Builder), Ok(Phase::Play));
        assert_eq!(
            state.request_transition(Role::Builder),
            Err(PhaseRejection::AlreadyInPlay)
        );
        assert_eq!(state.phase(), Phase::Play);
    }

    #[test]
    fn test_attacker_cannot_advance() {
        let mut state = PhaseState::new();
        assert_eq!(
            state.request_transition(Role::Attacker),
            Err(PhaseRejection::NotBuilder)
        );
        assert_eq!(state.phase(), Phase::BuildRooms);
    }

    #[test]
    fn test_reveal_is_one_shot() {
        let mut state = PhaseState::new();
        state.set_phase(Phase::Play);
        assert!(state.reveal_base(Vec2::new(3.0, 1.0)));
        assert!(!state.reveal_base(Vec2::new(9.0, 9.0)));
        assert_eq!(state.attacker_spawn(), Some(Vec2::new(3.0, 1.0)));
    }

    #[test]
    fn test_reset_hides_base() {
        let mut state = PhaseState::new();
        state.set_phase(Phase::Play);
        state.reveal_base(Vec2::ZERO);

        state.set_phase(Phase::Play);
        assert!(state.base_revealed());

        state.set_phase(Phase::BuildRooms);
        assert!(!state.base_revealed());
        assert_eq!(state.attacker_spawn(), None);
    }
}
