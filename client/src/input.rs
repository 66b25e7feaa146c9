//! Text commands typed on stdin

use shared::{EntityId, GridPos, Vec2};
use thiserror::Error;

/// Which direction keys are held. `Stop` releases everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Left,
    Right,
    Up,
    Down,
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Advance,
    Room {
        prefab: usize,
        pos: GridPos,
    },
    Trap {
        trap: usize,
        point: Vec2,
        normal_hint: Option<Vec2>,
        rotation_step: i32,
    },
    Spawn(EntityId),
    Fire(Vec2),
    Move(Heading),
    Status,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseError(pub String);

pub const USAGE: &str = "commands: advance | room <prefab> <x> <y> | \
trap <type> <x> <y> [nx ny] [rot] | spawn <room-id> | fire <x> <y> | \
move <left|right|up|down|stop> | status | quit";

fn arg<T: std::str::FromStr>(words: &[&str], index: usize, name: &str) -> Result<T, ParseError> {
    let word = words
        .get(index)
        .ok_or_else(|| ParseError(format!("missing {}", name)))?;
    word.parse()
        .map_err(|_| ParseError(format!("bad {}: {}", name, word)))
}

/// Parses one line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<UserCommand>, ParseError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some(first) = words.first() else {
        return Ok(None);
    };

    let command = match first.to_ascii_lowercase().as_str() {
        "advance" => UserCommand::Advance,
        "room" => UserCommand::Room {
            prefab: arg(&words, 1, "prefab")?,
            pos: GridPos::new(arg(&words, 2, "x")?, arg(&words, 3, "y")?),
        },
        "trap" => {
            let trap = arg(&words, 1, "trap type")?;
            let point = Vec2::new(arg(&words, 2, "x")?, arg(&words, 3, "y")?);
            let (normal_hint, rotation_step) = match words.len() {
                4 => (None, 0),
                5 => (None, arg(&words, 4, "rotation")?),
                6 => (Some(Vec2::new(arg(&words, 4, "nx")?, arg(&words, 5, "ny")?)), 0),
                7 => (
                    Some(Vec2::new(arg(&words, 4, "nx")?, arg(&words, 5, "ny")?)),
                    arg(&words, 6, "rotation")?,
                ),
                _ => return Err(ParseError("trap <type> <x> <y> [nx ny] [rot]".to_string())),
            };
            UserCommand::Trap {
                trap,
                point,
                normal_hint,
                rotation_step,
            }
        }
        "spawn" => UserCommand::Spawn(arg(&words, 1, "room id")?),
        "fire" => UserCommand::Fire(Vec2::new(arg(&words, 1, "x")?, arg(&words, 2, "y")?)),
        "move" => {
            let heading = match words.get(1).map(|w| w.to_ascii_lowercase()).as_deref() {
                Some("left") => Heading::Left,
                Some("right") => Heading::Right,
                Some("up") => Heading::Up,
                Some("down") => Heading::Down,
                Some("stop") => Heading::Stop,
                _ => return Err(ParseError("move <left|right|up|down|stop>".to_string())),
            };
            UserCommand::Move(heading)
        }
        "status" => UserCommand::Status,
        "quit" | "exit" => UserCommand::Quit,
        other => return Err(ParseError(format!("unknown command '{}'", other))),
    };
    Ok(Some(command))
}

/// Sequenced movement input built from headings.
pub struct InputManager {
    next_sequence: u32,
    heading: Heading,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            next_sequence: 1,
            heading: Heading::Stop,
        }
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    /// Records the new heading and returns the input packet announcing it.
    pub fn steer(&mut self, heading: Heading) -> shared::Packet {
        self.heading = heading;
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        shared::Packet::Input {
            sequence,
            left: heading == Heading::Left,
            right: heading == Heading::Right,
            up: heading == Heading::Up,
            down: heading == Heading::Down,
        }
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Packet;

    #[test]
    fn test_parse_basic_commands() {
        assert_eq!(parse_command("  "), Ok(None));
        assert_eq!(parse_command("advance"), Ok(Some(UserCommand::Advance)));
        assert_eq!(
            parse_command("room 0 1 -1"),
            Ok(Some(UserCommand::Room {
                prefab: 0,
                pos: GridPos::new(1, -1)
            }))
        );
        assert_eq!(parse_command("spawn 7"), Ok(Some(UserCommand::Spawn(7))));
        assert_eq!(
            parse_command("FIRE 1 0.5"),
            Ok(Some(UserCommand::Fire(Vec2::new(1.0, 0.5))))
        );
        assert_eq!(parse_command("quit"), Ok(Some(UserCommand::Quit)));
    }

    #[test]
    fn test_parse_trap_variants() {
        assert_eq!(
            parse_command("trap 1 -11.5 0"),
            Ok(Some(UserCommand::Trap {
                trap: 1,
                point: Vec2::new(-11.5, 0.0),
                normal_hint: None,
                rotation_step: 0,
            }))
        );
        assert_eq!(
            parse_command("trap 1 -11.5 0 1 0 2"),
            Ok(Some(UserCommand::Trap {
                trap: 1,
                point: Vec2::new(-11.5, 0.0),
                normal_hint: Some(Vec2::RIGHT),
                rotation_step: 2,
            }))
        );
        assert!(parse_command("trap 1 2").is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("room x 0 0").is_err());
        assert!(parse_command("move sideways").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn test_steer_sequences_inputs() {
        let mut input = InputManager::new();
        assert_eq!(
            input.steer(Heading::Left),
            Packet::Input {
                sequence: 1,
                left: true,
                right: false,
                up: false,
                down: false,
            }
        );
        match input.steer(Heading::Stop) {
            Packet::Input {
                sequence,
                left,
                right,
                ..
            } => {
                assert_eq!(sequence, 2);
                assert!(!left && !right);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(input.heading(), Heading::Stop);
    }
}
