pub mod catalog;
pub mod math;
pub mod protocol;
pub mod rules;
pub mod types;
pub mod wire;

pub use catalog::{
    BuildSettings, CombatSettings, DefenderDef, MatchRules, ReactorDef, RoomPrefab,
    RoundSettings, SpawnSettings, TrapBehaviour, TrapDef, TrapPlacement, WeaponSettings,
};
pub use math::{Aabb, Vec2};
pub use protocol::{
    BotState, HealthTarget, Packet, PlayerState, ProjectileState, SpawnKind, TrapState,
};
pub use rules::{FireLimiter, FireRejection, RoomOccupancy, RoomRejection, TrapRejection};
pub use types::{
    AttachKind, ClientId, EntityId, GridPos, Phase, Role, RoundState, SurfaceKind, WallSide,
};

pub const PROTOCOL_VERSION: u32 = 1;
