use crate::input::{parse_command, InputManager, UserCommand, USAGE};
use crate::predict::{Predictor, Refusal};
use crate::replica::{LogObserver, Replica, ReplicaObserver};
use log::{error, info, warn};
use shared::wire::{read_packet, write_packet};
use shared::{Packet, PROTOCOL_VERSION};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::interval;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// What the caller should do after a typed command.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Send(Packet),
    Nothing,
    Quit,
}

/// Client-side match logic with no I/O: applies server packets to the
/// replica and turns user commands into requests worth sending.
pub struct Client<O: ReplicaObserver = LogObserver> {
    replica: Replica,
    predictor: Predictor,
    input: InputManager,
    observer: O,
    started: Instant,
}

impl Client<LogObserver> {
    pub fn new() -> Self {
        Self::with_observer(LogObserver)
    }
}

impl Default for Client<LogObserver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: ReplicaObserver> Client<O> {
    pub fn with_observer(observer: O) -> Self {
        Self {
            replica: Replica::new(),
            predictor: Predictor::new(),
            input: InputManager::new(),
            observer,
            started: Instant::now(),
        }
    }

    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn handle_packet(&mut self, packet: &Packet) {
        self.replica.apply(packet, &mut self.observer);
    }

    pub fn handle_command(&mut self, command: UserCommand) -> Result<Action, Refusal> {
        let replica = &self.replica;
        let packet = match command {
            UserCommand::Advance => self.predictor.advance_phase(replica)?,
            UserCommand::Room { prefab, pos } => self.predictor.place_room(replica, prefab, pos)?,
            UserCommand::Trap {
                trap,
                point,
                normal_hint,
                rotation_step,
            } => self
                .predictor
                .place_trap(replica, trap, point, normal_hint, rotation_step)?,
            UserCommand::Spawn(room) => self.predictor.select_spawn(replica, room)?,
            UserCommand::Fire(aim) => {
                let now = self.started.elapsed().as_secs_f64();
                self.predictor.fire(replica, aim, now)?
            }
            UserCommand::Move(heading) => self.input.steer(heading),
            UserCommand::Status => {
                self.log_status();
                return Ok(Action::Nothing);
            }
            UserCommand::Quit => return Ok(Action::Quit),
        };
        Ok(Action::Send(packet))
    }

    fn log_status(&self) {
        let r = &self.replica;
        info!(
            "role {:?}, phase {:?}, revealed {}, round {:?}, {:.0}s left, {} rooms",
            r.role,
            r.phase,
            r.base_revealed,
            r.round_state,
            r.remaining_seconds(),
            r.rooms().count()
        );
        for room in r.rooms() {
            info!("  room {} prefab {} at {}", room.id, room.prefab, room.grid);
        }
        if let Some(reactor) = r.reactor {
            info!("  reactor {}/{}", reactor.current, reactor.max);
        }
        if let Some(position) = r.own_position {
            info!("  you are at ({:.1}, {:.1})", position.x, position.y);
        }
    }
}

/// Connects, joins and runs the stdin command loop until `quit`, EOF on
/// stdin, or the server closing the connection.
pub async fn run(server_addr: &str, session: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    info!("Connecting to server at {}...", server_addr);
    let stream = TcpStream::connect(server_addr).await?;
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();

    write_packet(
        &mut writer,
        &Packet::Connect {
            client_version: PROTOCOL_VERSION,
            session,
        },
    )
    .await?;

    let (packet_tx, mut packet_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            match read_packet(&mut reader).await {
                Ok(Some(packet)) => {
                    if packet_tx.send(packet).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Error receiving packet: {}", e);
                    break;
                }
            }
        }
    });

    let mut client = Client::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut heartbeat = interval(HEARTBEAT_INTERVAL);
    info!("{}", USAGE);

    loop {
        tokio::select! {
            packet = packet_rx.recv() => {
                match packet {
                    Some(Packet::Disconnected { reason }) => {
                        client.handle_packet(&Packet::Disconnected { reason });
                        break;
                    }
                    Some(packet) => client.handle_packet(&packet),
                    None => {
                        warn!("Server closed the connection");
                        break;
                    }
                }
            },

            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let command = match parse_command(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("{} ({})", e, USAGE);
                        continue;
                    }
                };
                match client.handle_command(command) {
                    Ok(Action::Send(packet)) => write_packet(&mut writer, &packet).await?,
                    Ok(Action::Nothing) => {}
                    Ok(Action::Quit) => break,
                    Err(refusal) => warn!("{}", refusal),
                }
            },

            _ = heartbeat.tick() => {
                write_packet(&mut writer, &Packet::Heartbeat).await?;
            },
        }
    }

    let _ = write_packet(&mut writer, &Packet::Disconnect).await;
    if let Some(session) = client.replica().session {
        info!("Reconnect with --session {}", session);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Heading;
    use crate::replica::NoopObserver;
    use shared::{GridPos, MatchRules, Phase, Role};

    fn joined(role: Role) -> Client<NoopObserver> {
        let mut client = Client::with_observer(NoopObserver);
        client.handle_packet(&Packet::Welcome {
            client_id: 1,
            session: 77,
            role,
            rules: MatchRules::default(),
        });
        client
    }

    #[test]
    fn test_commands_before_welcome_are_refused() {
        let mut client = Client::with_observer(NoopObserver);
        assert_eq!(
            client.handle_command(UserCommand::Advance),
            Err(Refusal::NotJoined)
        );
        assert_eq!(client.handle_command(UserCommand::Quit), Ok(Action::Quit));
    }

    #[test]
    fn test_builder_room_request() {
        let mut client = joined(Role::Builder);
        assert_eq!(
            client.handle_command(UserCommand::Room {
                prefab: 0,
                pos: GridPos::new(0, 0)
            }),
            Ok(Action::Send(Packet::PlaceRoom {
                prefab: 0,
                grid_x: 0,
                grid_y: 0
            }))
        );
        assert_eq!(
            client.handle_command(UserCommand::Advance),
            Ok(Action::Send(Packet::RequestPhaseAdvance))
        );
    }

    #[test]
    fn test_attacker_cannot_advance() {
        let mut client = joined(Role::Attacker);
        assert!(client.handle_command(UserCommand::Advance).is_err());
        client.handle_packet(&Packet::PhaseChanged { phase: Phase::Play });
        assert!(matches!(
            client.handle_command(UserCommand::Move(Heading::Right)),
            Ok(Action::Send(Packet::Input { right: true, .. }))
        ));
    }
}
