//! Read-only mirror of the server's match state.
//!
//! The replica never decides anything. It applies the packets the server
//! sends, keeps enough derived state for local prediction (occupied cells,
//! trap counters) and tells an observer what changed.

use log::{info, warn};
use shared::rules::RoomOccupancy;
use shared::{
    BotState, ClientId, EntityId, GridPos, HealthTarget, MatchRules, Packet, Phase, PlayerState,
    ProjectileState, Role, RoundState, SpawnKind, Vec2,
};
use std::collections::{BTreeMap, HashMap};

/// Callbacks for replicated changes. Every method defaults to doing nothing.
pub trait ReplicaObserver {
    fn on_welcome(&mut self, _client_id: ClientId, _role: Role) {}
    fn on_disconnected(&mut self, _reason: &str) {}
    fn on_phase_changed(&mut self, _phase: Phase) {}
    fn on_base_revealed(&mut self) {}
    fn on_round_state(&mut self, _state: RoundState, _winner: Option<Role>) {}
    fn on_room_placed(&mut self, _room: &RoomView) {}
    fn on_doors_changed(&mut self, _room: EntityId, _open_mask: u8) {}
    fn on_entity_spawned(&mut self, _entity: EntityId, _kind: &SpawnKind, _position: Vec2) {}
    fn on_entity_destroyed(&mut self, _entity: EntityId) {}
    fn on_health_changed(&mut self, _target: HealthTarget, _current: i32, _max: i32, _dead: bool) {}
    fn on_reactor_health(&mut self, _current: i32, _max: i32, _destroyed: bool) {}
    fn on_teleport(&mut self, _position: Vec2) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl ReplicaObserver for NoopObserver {}

/// Observer that reports milestones through the log.
pub struct LogObserver;

impl ReplicaObserver for LogObserver {
    fn on_welcome(&mut self, client_id: ClientId, role: Role) {
        info!("Joined as client {} playing {}", client_id, role);
    }

    fn on_disconnected(&mut self, reason: &str) {
        warn!("Disconnected: {}", reason);
    }

    fn on_phase_changed(&mut self, phase: Phase) {
        info!("Phase: {:?}", phase);
    }

    fn on_base_revealed(&mut self) {
        info!("The base has been revealed");
    }

    fn on_round_state(&mut self, state: RoundState, winner: Option<Role>) {
        match winner {
            Some(winner) => info!("Round {:?}, {} wins", state, winner),
            None => info!("Round {:?}", state),
        }
    }

    fn on_room_placed(&mut self, room: &RoomView) {
        info!(
            "Room {} (prefab {}) placed at {}",
            room.id, room.prefab, room.grid
        );
    }

    fn on_health_changed(&mut self, target: HealthTarget, current: i32, max: i32, dead: bool) {
        if dead {
            info!("{:?} died", target);
        } else {
            info!("{:?} health {}/{}", target, current, max);
        }
    }

    fn on_reactor_health(&mut self, current: i32, max: i32, destroyed: bool) {
        if destroyed {
            info!("Reactor destroyed");
        } else {
            info!("Reactor health {}/{}", current, max);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomView {
    pub id: EntityId,
    pub prefab: usize,
    pub grid: GridPos,
    pub position: Vec2,
    pub open_mask: u8,
    pub room_hash: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    pub kind: SpawnKind,
    pub position: Vec2,
    pub rotation_deg: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthView {
    pub current: i32,
    pub max: i32,
    pub dead: bool,
}

#[derive(Debug, Clone)]
pub struct Replica {
    pub client_id: Option<ClientId>,
    pub role: Option<Role>,
    pub session: Option<u64>,
    pub rules: MatchRules,
    pub phase: Phase,
    pub base_revealed: bool,
    pub round_state: RoundState,
    pub winner: Option<Role>,
    pub end_time: Option<f64>,
    pub tick: u32,
    /// Server clock from the latest snapshot.
    pub server_time: f64,
    pub own_position: Option<Vec2>,
    pub reactor: Option<HealthView>,
    pub players: Vec<PlayerState>,
    pub bots: Vec<BotState>,
    pub projectiles: Vec<ProjectileState>,
    rooms: BTreeMap<EntityId, RoomView>,
    cells: HashMap<GridPos, EntityId>,
    entities: BTreeMap<EntityId, EntityView>,
    health: HashMap<HealthTarget, HealthView>,
}

impl Default for Replica {
    fn default() -> Self {
        Self::new()
    }
}

impl Replica {
    pub fn new() -> Self {
        Self {
            client_id: None,
            role: None,
            session: None,
            rules: MatchRules::default(),
            phase: Phase::BuildRooms,
            base_revealed: false,
            round_state: RoundState::WaitingForReveal,
            winner: None,
            end_time: None,
            tick: 0,
            server_time: 0.0,
            own_position: None,
            reactor: None,
            players: Vec::new(),
            bots: Vec::new(),
            projectiles: Vec::new(),
            rooms: BTreeMap::new(),
            cells: HashMap::new(),
            entities: BTreeMap::new(),
            health: HashMap::new(),
        }
    }

    pub fn room(&self, id: EntityId) -> Option<&RoomView> {
        self.rooms.get(&id)
    }

    pub fn room_at(&self, grid: GridPos) -> Option<&RoomView> {
        self.cells.get(&grid).and_then(|id| self.rooms.get(id))
    }

    pub fn rooms(&self) -> impl Iterator<Item = &RoomView> {
        self.rooms.values()
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityView> {
        self.entities.get(&id)
    }

    pub fn health(&self, target: HealthTarget) -> Option<HealthView> {
        self.health.get(&target).copied()
    }

    /// Whether this client's own player is currently dead.
    pub fn is_dead(&self) -> bool {
        self.client_id
            .and_then(|id| self.health(HealthTarget::Player(id)))
            .map_or(false, |h| h.dead)
    }

    /// Placed traps of a kind, across the whole base.
    pub fn trap_count(&self, kind: usize) -> u32 {
        self.traps().filter(|(trap, _)| *trap == kind).count() as u32
    }

    /// Placed traps of a kind inside the room with `room_hash`.
    pub fn room_trap_count(&self, room_hash: i32, kind: usize) -> u32 {
        self.traps()
            .filter(|(trap, hash)| *trap == kind && *hash == room_hash)
            .count() as u32
    }

    fn traps(&self) -> impl Iterator<Item = (usize, i32)> + '_ {
        self.entities.values().filter_map(|e| match e.kind {
            SpawnKind::Trap { trap, room_hash, .. } => Some((trap, room_hash)),
            _ => None,
        })
    }

    /// Seconds left in a running round, by the server's clock.
    pub fn remaining_seconds(&self) -> f64 {
        match (self.round_state, self.end_time) {
            (RoundState::Running, Some(end)) => (end - self.server_time).max(0.0),
            _ => 0.0,
        }
    }

    pub fn apply(&mut self, packet: &Packet, observer: &mut dyn ReplicaObserver) {
        match packet {
            Packet::Welcome {
                client_id,
                session,
                role,
                rules,
            } => {
                *self = Replica::new();
                self.client_id = Some(*client_id);
                self.session = Some(*session);
                self.role = Some(*role);
                self.rules = rules.clone();
                observer.on_welcome(*client_id, *role);
            }
            Packet::Disconnected { reason } => {
                self.client_id = None;
                observer.on_disconnected(reason);
            }
            Packet::PhaseChanged { phase } => {
                self.phase = *phase;
                if *phase != Phase::Play {
                    self.base_revealed = false;
                }
                observer.on_phase_changed(*phase);
            }
            Packet::BaseRevealed => {
                self.base_revealed = true;
                observer.on_base_revealed();
            }
            Packet::RoundStateChanged {
                state,
                winner,
                end_time,
            } => {
                self.round_state = *state;
                self.winner = *winner;
                self.end_time = *end_time;
                observer.on_round_state(*state, *winner);
            }
            Packet::EntitySpawned {
                entity,
                kind,
                position,
                rotation_deg,
            } => {
                if let SpawnKind::Room {
                    prefab,
                    grid,
                    open_mask,
                    room_hash,
                } = kind
                {
                    let room = RoomView {
                        id: *entity,
                        prefab: *prefab,
                        grid: *grid,
                        position: *position,
                        open_mask: *open_mask,
                        room_hash: *room_hash,
                    };
                    self.cells.insert(*grid, *entity);
                    observer.on_room_placed(&room);
                    self.rooms.insert(*entity, room);
                }
                self.entities.insert(
                    *entity,
                    EntityView {
                        kind: kind.clone(),
                        position: *position,
                        rotation_deg: *rotation_deg,
                    },
                );
                observer.on_entity_spawned(*entity, kind, *position);
            }
            Packet::EntityDestroyed { entity } => {
                self.entities.remove(entity);
                self.health.remove(&HealthTarget::Bot(*entity));
                observer.on_entity_destroyed(*entity);
            }
            Packet::RoomDoorsChanged { room, open_mask } => {
                if let Some(view) = self.rooms.get_mut(room) {
                    view.open_mask = *open_mask;
                }
                if let Some(EntityView {
                    kind: SpawnKind::Room { open_mask: mask, .. },
                    ..
                }) = self.entities.get_mut(room)
                {
                    *mask = *open_mask;
                }
                observer.on_doors_changed(*room, *open_mask);
            }
            Packet::HealthChanged {
                target,
                current,
                max,
                dead,
            } => {
                self.health.insert(
                    *target,
                    HealthView {
                        current: *current,
                        max: *max,
                        dead: *dead,
                    },
                );
                observer.on_health_changed(*target, *current, *max, *dead);
            }
            Packet::ReactorHealthChanged {
                current,
                max,
                destroyed,
            } => {
                self.reactor = Some(HealthView {
                    current: *current,
                    max: *max,
                    dead: *destroyed,
                });
                observer.on_reactor_health(*current, *max, *destroyed);
            }
            Packet::Teleport { position } => {
                self.own_position = Some(*position);
                observer.on_teleport(*position);
            }
            Packet::Snapshot {
                tick,
                time,
                players,
                bots,
                projectiles,
                traps,
            } => {
                self.tick = *tick;
                self.server_time = *time;
                if let Some(me) = self
                    .client_id
                    .and_then(|id| players.iter().find(|p| p.id == id))
                {
                    self.own_position = Some(me.position);
                }
                self.players = players.clone();
                self.bots = bots.clone();
                self.projectiles = projectiles.clone();
                for trap in traps {
                    if let Some(entity) = self.entities.get_mut(&trap.id) {
                        entity.position = trap.position;
                    }
                }
            }
            other => warn!("Unexpected packet from server: {:?}", other),
        }
    }
}

impl RoomOccupancy for Replica {
    fn is_occupied(&self, pos: GridPos) -> bool {
        self.cells.contains_key(&pos)
    }

    fn placed_count(&self) -> usize {
        self.rooms.len()
    }

    fn main_room_placed(&self) -> bool {
        let main = self.rules.build.main_room_prefab;
        self.rooms.values().any(|room| room.prefab == main)
    }
}
