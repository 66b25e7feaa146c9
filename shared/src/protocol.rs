use crate::catalog::MatchRules;
use crate::math::Vec2;
use crate::types::{ClientId, EntityId, GridPos, Phase, Role, RoundState};
use serde::{Deserialize, Serialize};

/// Everything that travels over the wire, in both directions.
///
/// Client to server messages are requests the server may refuse silently.
/// Server to client messages only ever describe committed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    Connect {
        client_version: u32,
        /// Token from an earlier `Welcome`, presented on reconnect.
        session: Option<u64>,
    },
    Heartbeat,
    Input {
        sequence: u32,
        left: bool,
        right: bool,
        up: bool,
        down: bool,
    },
    RequestPhaseAdvance,
    PlaceRoom {
        prefab: usize,
        grid_x: i32,
        grid_y: i32,
    },
    PlaceTrap {
        trap: usize,
        position: Vec2,
        normal_hint: Vec2,
        rotation_step: i32,
    },
    SelectSpawnRoom {
        room: EntityId,
    },
    FireWeapon {
        aim: Vec2,
    },
    Disconnect,

    Welcome {
        client_id: ClientId,
        session: u64,
        role: Role,
        rules: MatchRules,
    },
    Disconnected {
        reason: String,
    },
    PhaseChanged {
        phase: Phase,
    },
    BaseRevealed,
    HealthChanged {
        target: HealthTarget,
        current: i32,
        max: i32,
        dead: bool,
    },
    ReactorHealthChanged {
        current: i32,
        max: i32,
        destroyed: bool,
    },
    RoundStateChanged {
        state: RoundState,
        winner: Option<Role>,
        end_time: Option<f64>,
    },
    EntitySpawned {
        entity: EntityId,
        kind: SpawnKind,
        position: Vec2,
        rotation_deg: f32,
    },
    EntityDestroyed {
        entity: EntityId,
    },
    RoomDoorsChanged {
        room: EntityId,
        open_mask: u8,
    },
    /// Sent only to the client that owns the moved player.
    Teleport {
        position: Vec2,
    },
    Snapshot {
        tick: u32,
        time: f64,
        players: Vec<PlayerState>,
        bots: Vec<BotState>,
        projectiles: Vec<ProjectileState>,
        /// Only traps that move.
        traps: Vec<TrapState>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthTarget {
    Player(ClientId),
    Bot(EntityId),
}

/// Type-specific initialisation data carried by `EntitySpawned`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpawnKind {
    Room {
        prefab: usize,
        grid: GridPos,
        open_mask: u8,
        room_hash: i32,
    },
    Reactor {
        room: EntityId,
    },
    Trap {
        trap: usize,
        room: EntityId,
        room_hash: i32,
    },
    Bot {
        trap: usize,
    },
    Projectile {
        direction: Vec2,
        speed: f32,
        shooter_role: Role,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: ClientId,
    pub role: Role,
    pub position: Vec2,
    pub hp: i32,
    pub dead: bool,
    pub last_input: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotState {
    pub id: EntityId,
    pub position: Vec2,
    pub facing_left: bool,
    pub hp: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileState {
    pub id: EntityId,
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrapState {
    pub id: EntityId,
    pub position: Vec2,
}
