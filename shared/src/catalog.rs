//! Static match rules: grid layout, room and trap catalogs, combat tuning.
//!
//! Every struct deserialises with defaults for missing fields, so a rules file
//! only needs to name what it changes. The server sends its rules to each
//! client in the welcome packet, which keeps client-side prediction on the
//! same numbers as the authoritative checks.

use crate::math::{Aabb, Vec2};
use crate::types::{AttachKind, GridPos, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRules {
    pub build: BuildSettings,
    pub rooms: Vec<RoomPrefab>,
    pub trap_placement: TrapPlacement,
    pub traps: Vec<TrapDef>,
    pub combat: CombatSettings,
    pub round: RoundSettings,
    pub spawns: SpawnSettings,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            build: BuildSettings::default(),
            rooms: default_rooms(),
            trap_placement: TrapPlacement::default(),
            traps: default_traps(),
            combat: CombatSettings::default(),
            round: RoundSettings::default(),
            spawns: SpawnSettings::default(),
        }
    }
}

impl MatchRules {
    pub fn room(&self, prefab: usize) -> Option<&RoomPrefab> {
        self.rooms.get(prefab)
    }

    pub fn trap(&self, trap: usize) -> Option<&TrapDef> {
        self.traps.get(trap)
    }

    pub fn is_main_room(&self, prefab: usize) -> bool {
        prefab == self.build.main_room_prefab
    }

    /// Checks cross-references inside the catalog.
    pub fn validate(&self) -> Result<(), String> {
        let main = self.rooms.get(self.build.main_room_prefab).ok_or_else(|| {
            format!(
                "main room prefab index {} is outside the room catalog ({} entries)",
                self.build.main_room_prefab,
                self.rooms.len()
            )
        })?;
        if main.reactor.is_none() {
            return Err(format!("main room prefab '{}' has no reactor", main.name));
        }
        if self.build.max_rooms == 0 {
            return Err("max_rooms must be at least 1".to_string());
        }
        if self.build.room_width <= 2.0 * self.build.wall_thickness
            || self.build.room_height <= 2.0 * self.build.wall_thickness
        {
            return Err("rooms must be larger than two wall thicknesses".to_string());
        }
        if self.build.max_grid_extent < 0 {
            return Err("max_grid_extent must not be negative".to_string());
        }
        if self.round.duration_secs <= 0.0 {
            return Err("round duration must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    pub room_width: f32,
    pub room_height: f32,
    pub wall_thickness: f32,
    /// Height of side doorways and width of floor/ceiling hatches.
    pub door_size: f32,
    pub max_rooms: usize,
    pub min_grid_y: i32,
    /// Largest absolute grid coordinate a room may use on either axis.
    pub max_grid_extent: i32,
    pub origin: Vec2,
    pub main_room_prefab: usize,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            room_width: 26.0,
            room_height: 12.0,
            wall_thickness: 1.0,
            door_size: 3.0,
            max_rooms: 8,
            min_grid_y: 0,
            max_grid_extent: 64,
            origin: Vec2::ZERO,
            main_room_prefab: 0,
        }
    }
}

impl BuildSettings {
    /// World position of a room, the centre of its grid cell.
    pub fn room_center(&self, pos: GridPos) -> Vec2 {
        self.origin
            + Vec2::new(
                pos.x as f32 * self.room_width,
                pos.y as f32 * self.room_height,
            )
    }

    pub fn room_bounds(&self, pos: GridPos) -> Aabb {
        Aabb::from_center_size(
            self.room_center(pos),
            Vec2::new(self.room_width, self.room_height),
        )
    }

    /// Inner region of a room, inside its walls.
    pub fn room_interior(&self, pos: GridPos) -> Aabb {
        let t = self.wall_thickness;
        let bounds = self.room_bounds(pos);
        Aabb::new(bounds.min + Vec2::new(t, t), bounds.max - Vec2::new(t, t))
    }

    /// Grid cell containing a world point.
    pub fn grid_at(&self, point: Vec2) -> GridPos {
        let local = point - self.origin;
        GridPos::new(
            (local.x / self.room_width).round() as i32,
            (local.y / self.room_height).round() as i32,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomPrefab {
    pub name: String,
    /// Offsets from the room position.
    pub builder_spawn: Option<Vec2>,
    pub attacker_spawn: Option<Vec2>,
    pub reactor: Option<ReactorDef>,
}

impl Default for RoomPrefab {
    fn default() -> Self {
        Self {
            name: "Room".to_string(),
            builder_spawn: None,
            attacker_spawn: None,
            reactor: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactorDef {
    pub offset: Vec2,
    pub size: Vec2,
    pub max_hp: i32,
}

impl Default for ReactorDef {
    fn default() -> Self {
        Self {
            offset: Vec2::new(0.0, -3.5),
            size: Vec2::new(2.0, 3.0),
            max_hp: 200,
        }
    }
}

fn default_rooms() -> Vec<RoomPrefab> {
    vec![
        RoomPrefab {
            name: "MainRoom".to_string(),
            builder_spawn: Some(Vec2::new(-8.0, -4.0)),
            attacker_spawn: Some(Vec2::new(8.0, -4.0)),
            reactor: Some(ReactorDef::default()),
        },
        RoomPrefab {
            name: "Corridor".to_string(),
            builder_spawn: Some(Vec2::new(0.0, -4.0)),
            attacker_spawn: Some(Vec2::new(0.0, -4.0)),
            reactor: None,
        },
        RoomPrefab {
            name: "Hall".to_string(),
            ..RoomPrefab::default()
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrapPlacement {
    /// Furthest a resolved trap position may land from the requested point.
    /// Zero disables the check.
    pub max_snap_distance: f32,
    /// Gap between a surface and a mounted trap.
    pub place_offset: f32,
    /// Radius of the surface check around the desired point.
    pub validate_radius: f32,
}

impl Default for TrapPlacement {
    fn default() -> Self {
        Self {
            max_snap_distance: 4.0,
            place_offset: 0.06,
            validate_radius: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrapDef {
    pub name: String,
    pub attach: AttachKind,
    /// Zero disables the limit.
    pub limit_global: u32,
    /// Zero disables the limit.
    pub max_per_room: u32,
    pub angle_offset_deg: f32,
    pub allow_rotate: bool,
    pub allowed_rot_steps: Vec<i32>,
    pub force_fixed_angle: bool,
    pub fixed_angle_deg: f32,
    /// Zero disables snapping.
    pub position_snap_step: f32,
    /// Hitbox used by contact behaviours and as the trap's collider.
    pub size: Vec2,
    pub behaviour: TrapBehaviour,
}

impl Default for TrapDef {
    fn default() -> Self {
        Self {
            name: "Trap".to_string(),
            attach: AttachKind::FloorOnly,
            limit_global: 3,
            max_per_room: 1,
            angle_offset_deg: 0.0,
            allow_rotate: true,
            allowed_rot_steps: vec![0, 1, 2, 3],
            force_fixed_angle: false,
            fixed_angle_deg: 0.0,
            position_snap_step: 0.0,
            size: Vec2::new(1.0, 0.5),
            behaviour: TrapBehaviour::Inert,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrapBehaviour {
    Inert,
    Spikes {
        damage: i32,
        hit_cooldown: f32,
    },
    ArrowLauncher {
        cooldown: f32,
        projectile_speed: f32,
        damage: i32,
        lifetime: f32,
    },
    Firetrap {
        activation_delay: f32,
        active_time: f32,
        damage_per_second: f32,
    },
    Defender(DefenderDef),
    /// Watches its four local axes and charges at an attacker it sees,
    /// stopping on contact or at the room wall.
    Spikehead {
        speed: f32,
        range: f32,
        check_delay: f32,
        damage: i32,
    },
    /// Slides back and forth along its local x axis, hurting attackers it
    /// runs into.
    Saw {
        movement_distance: f32,
        speed: f32,
        damage: i32,
    },
}

impl TrapBehaviour {
    /// Whether the trap changes position at runtime.
    pub fn is_mobile(&self) -> bool {
        matches!(self, TrapBehaviour::Spikehead { .. } | TrapBehaviour::Saw { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenderDef {
    pub max_hp: i32,
    pub size: Vec2,
    pub patrol_speed: f32,
    pub patrol_distance: f32,
    pub detection_range: f32,
    pub shoot_cooldown: f32,
    pub damage: i32,
    pub projectile_speed: f32,
    pub projectile_lifetime: f32,
}

impl Default for DefenderDef {
    fn default() -> Self {
        Self {
            max_hp: 60,
            size: Vec2::new(1.0, 1.6),
            patrol_speed: 2.0,
            patrol_distance: 4.0,
            detection_range: 7.0,
            shoot_cooldown: 1.0,
            damage: 10,
            projectile_speed: 6.0,
            projectile_lifetime: 3.0,
        }
    }
}

fn default_traps() -> Vec<TrapDef> {
    vec![
        TrapDef {
            name: "Spikes".to_string(),
            behaviour: TrapBehaviour::Spikes {
                damage: 10,
                hit_cooldown: 0.5,
            },
            ..TrapDef::default()
        },
        TrapDef {
            name: "ArrowLauncher".to_string(),
            attach: AttachKind::WallOnly,
            limit_global: 4,
            max_per_room: 2,
            size: Vec2::new(0.6, 0.6),
            behaviour: TrapBehaviour::ArrowLauncher {
                cooldown: 2.0,
                projectile_speed: 10.0,
                damage: 10,
                lifetime: 2.5,
            },
            ..TrapDef::default()
        },
        TrapDef {
            name: "Firetrap".to_string(),
            limit_global: 4,
            max_per_room: 2,
            size: Vec2::new(1.0, 1.5),
            behaviour: TrapBehaviour::Firetrap {
                activation_delay: 0.35,
                active_time: 1.2,
                damage_per_second: 10.0,
            },
            ..TrapDef::default()
        },
        TrapDef {
            name: "Defender".to_string(),
            attach: AttachKind::Interior,
            limit_global: 2,
            max_per_room: 1,
            allow_rotate: false,
            force_fixed_angle: true,
            size: Vec2::new(1.0, 1.6),
            behaviour: TrapBehaviour::Defender(DefenderDef::default()),
            ..TrapDef::default()
        },
        TrapDef {
            name: "Spikehead".to_string(),
            attach: AttachKind::Interior,
            limit_global: 2,
            max_per_room: 1,
            allow_rotate: false,
            size: Vec2::new(1.2, 1.2),
            behaviour: TrapBehaviour::Spikehead {
                speed: 6.0,
                range: 4.0,
                check_delay: 0.25,
                damage: 10,
            },
            ..TrapDef::default()
        },
        TrapDef {
            name: "Saw".to_string(),
            limit_global: 3,
            max_per_room: 1,
            allowed_rot_steps: vec![0],
            size: Vec2::new(1.0, 1.0),
            behaviour: TrapBehaviour::Saw {
                movement_distance: 2.0,
                speed: 2.0,
                damage: 10,
            },
            ..TrapDef::default()
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponSettings {
    pub fire_rate: f32,
    pub burst_size: u32,
    pub burst_cooldown: f32,
}

impl Default for WeaponSettings {
    fn default() -> Self {
        Self {
            fire_rate: 8.0,
            burst_size: 10,
            burst_cooldown: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatSettings {
    pub weapon: WeaponSettings,
    pub projectile_speed: f32,
    pub projectile_lifetime: f32,
    pub projectile_damage: i32,
    pub cast_radius: f32,
    pub muzzle_offset: f32,
    pub builder_max_hp: i32,
    pub attacker_max_hp: i32,
    pub respawn_delay: f32,
    pub player_speed: f32,
    pub player_size: Vec2,
}

impl Default for CombatSettings {
    fn default() -> Self {
        Self {
            weapon: WeaponSettings::default(),
            projectile_speed: 12.0,
            projectile_lifetime: 2.5,
            projectile_damage: 10,
            cast_radius: 0.05,
            muzzle_offset: 0.8,
            builder_max_hp: 140,
            attacker_max_hp: 100,
            respawn_delay: 1.5,
            player_speed: 6.0,
            player_size: Vec2::new(1.0, 1.8),
        }
    }
}

impl CombatSettings {
    pub fn max_hp(&self, role: Role) -> i32 {
        match role {
            Role::Builder => self.builder_max_hp,
            Role::Attacker => self.attacker_max_hp,
        }
    }

    pub fn min_lifetime(lifetime: f32) -> f32 {
        lifetime.max(0.05)
    }

    pub fn effective_cast_radius(&self) -> f32 {
        self.cast_radius.max(0.02)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundSettings {
    pub duration_secs: f64,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            duration_secs: 120.0,
        }
    }
}

/// Default join positions per role, used until a room anchor replaces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnSettings {
    pub builder: Vec2,
    pub attacker: Vec2,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            builder: Vec2::ZERO,
            attacker: Vec2::new(-40.0, 0.0),
        }
    }
}

impl SpawnSettings {
    pub fn for_role(&self, role: Role) -> Vec2 {
        match role {
            Role::Builder => self.builder,
            Role::Attacker => self.attacker,
        }
    }
}
