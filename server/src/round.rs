use log::info;
use shared::{Phase, Role, RoundState};

/// A change worth replicating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoundTransition {
    Started { end_time: f64 },
    Ended { winner: Role },
}

/// Timed contest that starts once the base is revealed during play.
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    state: RoundState,
    winner: Role,
    end_time: Option<f64>,
    duration: f64,
}

impl Round {
    pub fn new(duration: f64) -> Self {
        Self {
            state: RoundState::WaitingForReveal,
            winner: Role::Builder,
            end_time: None,
            duration,
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RoundState::Running
    }

    /// Only meaningful once the round has ended.
    pub fn winner(&self) -> Option<Role> {
        (self.state == RoundState::Ended).then_some(self.winner)
    }

    pub fn end_time(&self) -> Option<f64> {
        self.end_time
    }

    pub fn remaining_seconds(&self, now: f64) -> f64 {
        match (self.state, self.end_time) {
            (RoundState::Running, Some(end)) => (end - now).max(0.0),
            _ => 0.0,
        }
    }

    /// Runs the start and end checks. Reactor destruction is checked before
    /// the timer so a same-tick tie goes to the attacker.
    pub fn update(
        &mut self,
        now: f64,
        phase: Phase,
        base_revealed: bool,
        reactor_destroyed: bool,
    ) -> Option<RoundTransition> {
        match self.state {
            RoundState::WaitingForReveal if phase == Phase::Play && base_revealed => {
                let end_time = now + self.duration;
                self.state = RoundState::Running;
                self.end_time = Some(end_time);
                info!("Round started, ends at {:.1}s", end_time);
                Some(RoundTransition::Started { end_time })
            }
            RoundState::Running if reactor_destroyed => self.end(Role::Attacker),
            RoundState::Running if self.end_time.map_or(false, |end| now >= end) => {
                self.end(Role::Builder)
            }
            _ => None,
        }
    }

    /// Ends the round. A round that already ended keeps its winner.
    pub fn end(&mut self, winner: Role) -> Option<RoundTransition> {
        if self.state == RoundState::Ended {
            return None;
        }
        self.state = RoundState::Ended;
        self.winner = winner;
        info!("Round over, {} wins", winner);
        Some(RoundTransition::Ended { winner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_waits_for_play_and_reveal() {
        let mut round = Round::new(120.0);
        assert_eq!(round.update(1.0, Phase::PlaceTraps, true, false), None);
        assert_eq!(round.update(1.0, Phase::Play, false, false), None);
        assert_eq!(round.state(), RoundState::WaitingForReveal);
        assert_eq!(round.remaining_seconds(1.0), 0.0);

        assert_eq!(
            round.update(10.0, Phase::Play, true, false),
            Some(RoundTransition::Started { end_time: 130.0 })
        );
        assert_approx_eq!(round.remaining_seconds(40.0), 90.0);
    }

    #[test]
    fn test_timer_expiry_gives_builder_the_win() {
        let mut round = Round::new(5.0);
        round.update(0.0, Phase::Play, true, false);
        assert_eq!(round.update(4.9, Phase::Play, true, false), None);
        assert_eq!(
            round.update(5.0, Phase::Play, true, false),
            Some(RoundTransition::Ended {
                winner: Role::Builder
            })
        );
        assert_eq!(round.winner(), Some(Role::Builder));
        assert_eq!(round.remaining_seconds(5.0), 0.0);
    }

    #[test]
    fn test_destruction_beats_timer_in_same_tick() {
        let mut round = Round::new(5.0);
        round.update(0.0, Phase::Play, true, false);
        assert_eq!(
            round.update(6.0, Phase::Play, true, true),
            Some(RoundTransition::Ended {
                winner: Role::Attacker
            })
        );
    }

    #[test]
    fn test_ended_is_terminal() {
        let mut round = Round::new(5.0);
        round.update(0.0, Phase::Play, true, false);
        round.end(Role::Attacker);
        assert_eq!(round.end(Role::Builder), None);
        assert_eq!(round.update(100.0, Phase::Play, true, false), None);
        assert_eq!(round.winner(), Some(Role::Attacker));
    }
}
