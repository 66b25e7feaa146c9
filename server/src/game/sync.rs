//! Catch-up and per-tick replication.

use super::GameState;
use shared::{
    BotState, HealthTarget, Packet, PlayerState, ProjectileState, RoundState, SpawnKind,
    TrapState,
};

/// Everything a late joiner needs to rebuild the current match: phase,
/// reveal and round state, then every live entity with its health.
pub fn sync_packets(game: &GameState) -> Vec<Packet> {
    let mut packets = vec![Packet::PhaseChanged {
        phase: game.phase.phase(),
    }];
    if game.phase.base_revealed() {
        packets.push(Packet::BaseRevealed);
    }
    if game.round.state() != RoundState::WaitingForReveal {
        packets.push(Packet::RoundStateChanged {
            state: game.round.state(),
            winner: game.round.winner(),
            end_time: game.round.end_time(),
        });
    }

    for room in game.rooms.iter() {
        packets.push(Packet::EntitySpawned {
            entity: room.id,
            kind: SpawnKind::Room {
                prefab: room.prefab,
                grid: room.grid,
                open_mask: room.open_mask,
                room_hash: room.hash,
            },
            position: room.position,
            rotation_deg: 0.0,
        });
    }

    if let Some(reactor) = &game.reactor {
        packets.push(Packet::EntitySpawned {
            entity: reactor.id,
            kind: SpawnKind::Reactor { room: reactor.room },
            position: reactor.position,
            rotation_deg: 0.0,
        });
        packets.push(Packet::ReactorHealthChanged {
            current: reactor.health.current(),
            max: reactor.health.max(),
            destroyed: reactor.health.is_destroyed(),
        });
    }

    for trap in game.traps.iter() {
        packets.push(Packet::EntitySpawned {
            entity: trap.id,
            kind: SpawnKind::Trap {
                trap: trap.kind,
                room: trap.room,
                room_hash: trap.room_hash,
            },
            position: trap.position,
            rotation_deg: trap.rotation_deg,
        });
    }

    for bot in game.bots.iter() {
        let kind = game.traps.get(bot.trap).map_or(0, |trap| trap.kind);
        packets.push(Packet::EntitySpawned {
            entity: bot.id,
            kind: SpawnKind::Bot { trap: kind },
            position: bot.position,
            rotation_deg: 0.0,
        });
        packets.push(Packet::HealthChanged {
            target: HealthTarget::Bot(bot.id),
            current: bot.health.current(),
            max: bot.health.max(),
            dead: bot.health.is_dead(),
        });
    }

    for player in game.players.values() {
        packets.push(Packet::HealthChanged {
            target: HealthTarget::Player(player.id),
            current: player.health.current(),
            max: player.health.max(),
            dead: player.health.is_dead(),
        });
    }

    packets
}

/// Positions of everything that moves, sent every tick.
pub fn snapshot(game: &GameState) -> Packet {
    let players: Vec<PlayerState> = game.players.values().map(|p| p.state()).collect();
    let bots: Vec<BotState> = game.bots.iter().map(|b| b.state()).collect();
    let projectiles: Vec<ProjectileState> = game
        .projectiles
        .values()
        .map(|p| ProjectileState {
            id: p.id,
            position: p.position,
        })
        .collect();
    let traps: Vec<TrapState> = game
        .traps
        .iter()
        .filter(|t| t.is_mobile())
        .map(|t| TrapState {
            id: t.id,
            position: t.position,
        })
        .collect();

    Packet::Snapshot {
        tick: game.tick,
        time: game.time,
        players,
        bots,
        projectiles,
        traps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Command;
    use shared::{GridPos, MatchRules, Phase};

    #[test]
    fn test_sync_for_fresh_match() {
        let game = GameState::new(MatchRules::default(), Some(1));
        let packets = sync_packets(&game);
        assert_eq!(
            packets,
            vec![Packet::PhaseChanged {
                phase: Phase::BuildRooms
            }]
        );
    }

    #[test]
    fn test_sync_lists_rooms_reactor_and_players() {
        let mut game = GameState::new(MatchRules::default(), Some(1));
        game.join(1, None);
        game.handle_command(
            1,
            Command::PlaceRoom {
                prefab: 0,
                pos: GridPos::new(0, 0),
            },
        )
        .unwrap();

        let packets = sync_packets(&game);
        let rooms = packets
            .iter()
            .filter(|p| matches!(p, Packet::EntitySpawned { kind: SpawnKind::Room { .. }, .. }))
            .count();
        assert_eq!(rooms, 1);
        assert!(packets.iter().any(|p| matches!(
            p,
            Packet::EntitySpawned {
                kind: SpawnKind::Reactor { .. },
                ..
            }
        )));
        assert!(packets.iter().any(|p| matches!(
            p,
            Packet::HealthChanged {
                target: HealthTarget::Player(1),
                current: 140,
                ..
            }
        )));
    }

    #[test]
    fn test_snapshot_carries_tick_and_players() {
        let mut game = GameState::new(MatchRules::default(), Some(1));
        game.join(1, None);
        game.join(2, None);
        game.tick(0.5);

        match snapshot(&game) {
            Packet::Snapshot {
                tick,
                time,
                players,
                ..
            } => {
                assert_eq!(tick, 1);
                assert_eq!(time, 0.5);
                assert_eq!(players.len(), 2);
            }
            other => panic!("expected snapshot, got {:?}", other),
        }
    }
}
