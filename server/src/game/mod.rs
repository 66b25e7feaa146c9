//! The authoritative match.
//!
//! [`GameState`] owns every table the match mutates. The network loop feeds
//! it commands in receipt order, advances it with [`GameState::tick`] and
//! forwards whatever it queued in its outbox. Nothing in here touches a
//! socket, so whole matches can be driven from tests.

pub mod players;
pub mod sync;

use crate::bots::BotRoster;
use crate::combat::projectile::SWEEP_MASK;
use crate::combat::{
    aim_direction, resolve_hit, DamageOutcome, DamageTarget, Projectile, ReactorHealth, Resolution,
    Shooter,
};
use crate::entity::EntityIds;
use crate::fog::{select_spawn_room, SpawnRejection};
use crate::hazards::{step_hazards, HazardEffect, Intruder};
use crate::phase::{PhaseRejection, PhaseState};
use crate::roles::RoleAssigner;
use crate::rooms::RoomGrid;
use crate::round::{Round, RoundTransition};
use crate::schedule::{Deferred, Schedule};
use crate::spatial::{ColliderId, Layer, LayerMask, Owner, SpatialIndex, SpatialQuery};
use crate::traps::{TrapBoard, TrapRequest, TrapRuntime};
use log::{debug, info, warn};
use players::{sweep_box, MoveIntent, Player};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::rules::check_aim;
use shared::{
    Aabb, ClientId, EntityId, FireRejection, GridPos, HealthTarget, MatchRules, Packet, Phase,
    Role, RoomRejection, SpawnKind, TrapBehaviour, TrapRejection, Vec2,
};
use std::collections::BTreeMap;
use thiserror::Error;

/// Who receives an outgoing packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    Only(ClientId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub audience: Audience,
    pub packet: Packet,
}

/// A gameplay request from one participant.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Move { sequence: u32, intent: MoveIntent },
    AdvancePhase,
    PlaceRoom { prefab: usize, pos: GridPos },
    PlaceTrap(TrapRequest),
    SelectSpawnRoom(EntityId),
    Fire { aim: Vec2 },
}

impl Command {
    /// Maps client packets to commands. Session and server packets map to `None`.
    pub fn from_packet(packet: &Packet) -> Option<Command> {
        match packet {
            Packet::Input {
                sequence,
                left,
                right,
                up,
                down,
            } => Some(Command::Move {
                sequence: *sequence,
                intent: MoveIntent {
                    left: *left,
                    right: *right,
                    up: *up,
                    down: *down,
                },
            }),
            Packet::RequestPhaseAdvance => Some(Command::AdvancePhase),
            Packet::PlaceRoom {
                prefab,
                grid_x,
                grid_y,
            } => Some(Command::PlaceRoom {
                prefab: *prefab,
                pos: GridPos::new(*grid_x, *grid_y),
            }),
            Packet::PlaceTrap {
                trap,
                position,
                normal_hint,
                rotation_step,
            } => Some(Command::PlaceTrap(TrapRequest {
                trap: *trap,
                position: *position,
                normal_hint: *normal_hint,
                rotation_step: *rotation_step,
            })),
            Packet::SelectSpawnRoom { room } => Some(Command::SelectSpawnRoom(*room)),
            Packet::FireWeapon { aim } => Some(Command::Fire { aim: *aim }),
            _ => None,
        }
    }
}

/// Why a command changed nothing. Never sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("client {0} has no player")]
    UnknownClient(ClientId),
    #[error("phase advance refused: {0}")]
    Phase(#[from] PhaseRejection),
    #[error("room refused: {0}")]
    Room(#[from] RoomRejection),
    #[error("trap refused: {0}")]
    Trap(#[from] TrapRejection),
    #[error("spawn room refused: {0}")]
    Spawn(#[from] SpawnRejection),
    #[error("shot refused: {0}")]
    Fire(#[from] FireRejection),
}

/// Result of a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Joined {
    pub role: Role,
    pub session: u64,
}

#[derive(Debug, Clone)]
pub struct Reactor {
    pub id: EntityId,
    pub room: EntityId,
    pub position: Vec2,
    pub collider: ColliderId,
    pub health: ReactorHealth,
}

pub struct GameState {
    pub tick: u32,
    time: f64,
    rules: MatchRules,
    ids: EntityIds,
    world: SpatialIndex,
    roles: RoleAssigner,
    phase: PhaseState,
    round: Round,
    rooms: RoomGrid,
    traps: TrapBoard,
    reactor: Option<Reactor>,
    players: BTreeMap<ClientId, Player>,
    bots: BotRoster,
    projectiles: BTreeMap<EntityId, Projectile>,
    schedule: Schedule,
    outbox: Vec<Outgoing>,
    rng: StdRng,
}

impl GameState {
    /// `seed` fixes bot behaviour and session tokens; `None` draws from entropy.
    pub fn new(rules: MatchRules, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            tick: 0,
            time: 0.0,
            round: Round::new(rules.round.duration_secs),
            rules,
            ids: EntityIds::new(),
            world: SpatialIndex::new(),
            roles: RoleAssigner::new(),
            phase: PhaseState::new(),
            rooms: RoomGrid::new(),
            traps: TrapBoard::new(),
            reactor: None,
            players: BTreeMap::new(),
            bots: BotRoster::new(),
            projectiles: BTreeMap::new(),
            schedule: Schedule::new(),
            outbox: Vec::new(),
            rng,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    pub fn phase(&self) -> Phase {
        self.phase.phase()
    }

    pub fn base_revealed(&self) -> bool {
        self.phase.base_revealed()
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn rooms(&self) -> &RoomGrid {
        &self.rooms
    }

    pub fn traps(&self) -> &TrapBoard {
        &self.traps
    }

    pub fn bots(&self) -> &BotRoster {
        &self.bots
    }

    pub fn reactor(&self) -> Option<&Reactor> {
        self.reactor.as_ref()
    }

    pub fn player(&self, id: ClientId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    pub fn world(&self) -> &SpatialIndex {
        &self.world
    }

    pub fn drain_outbox(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbox)
    }

    fn emit(&mut self, packet: Packet) {
        self.outbox.push(Outgoing {
            audience: Audience::All,
            packet,
        });
    }

    fn emit_to(&mut self, client: ClientId, packet: Packet) {
        self.outbox.push(Outgoing {
            audience: Audience::Only(client),
            packet,
        });
    }

    /// Adds a participant. Roles follow join order unless a known session
    /// token is presented.
    pub fn join(&mut self, client: ClientId, session: Option<u64>) -> Joined {
        let fresh = self.rng.gen::<u64>();
        let (role, session) = self.roles.assign(session, fresh);

        let position = match role {
            Role::Attacker if self.phase.base_revealed() => self.phase.attacker_spawn(),
            Role::Builder => self
                .rooms
                .main_room()
                .map(|room| room.id)
                .and_then(|id| self.rooms.builder_anchor(&self.rules, id)),
            Role::Attacker => None,
        }
        .unwrap_or_else(|| self.rules.spawns.for_role(role));

        if let Some(old) = self.players.remove(&client) {
            self.world.remove(old.collider);
        }
        let collider = self.world.insert(
            Aabb::from_center_size(position, self.rules.combat.player_size),
            Layer::Player,
            Owner::Player(client),
        );
        let player = Player::new(client, role, position, &self.rules, collider);
        info!(
            "Player {} joined as {} at ({:.1}, {:.1})",
            client, role, position.x, position.y
        );
        let health = Self::player_health_packet(&player);
        self.players.insert(client, player);
        self.emit(health);

        Joined { role, session }
    }

    pub fn leave(&mut self, client: ClientId) {
        if let Some(player) = self.players.remove(&client) {
            self.world.remove(player.collider);
            info!("Player {} ({}) left", client, player.role);
        }
    }

    /// Validates and applies one command against the current state.
    pub fn handle_command(&mut self, client: ClientId, command: Command) -> Result<(), Rejection> {
        let role = self
            .players
            .get(&client)
            .map(|p| p.role)
            .ok_or(Rejection::UnknownClient(client))?;

        match command {
            Command::Move { sequence, intent } => {
                if let Some(player) = self.players.get_mut(&client) {
                    if sequence >= player.last_input {
                        player.intent = intent;
                        player.last_input = sequence;
                    }
                }
                Ok(())
            }
            Command::AdvancePhase => {
                let phase = self.phase.request_transition(role)?;
                self.emit(Packet::PhaseChanged { phase });
                Ok(())
            }
            Command::PlaceRoom { prefab, pos } => self.place_room(client, role, prefab, pos),
            Command::PlaceTrap(request) => self.place_trap(role, request),
            Command::SelectSpawnRoom(room) => {
                let spawn = select_spawn_room(&mut self.phase, &self.rooms, &self.rules, role, room)?;
                if let Some(player) = self.players.get_mut(&client) {
                    player.respawn_point = spawn;
                }
                self.teleport(client, spawn);
                self.emit(Packet::BaseRevealed);
                Ok(())
            }
            Command::Fire { aim } => self.fire(client, role, aim),
        }
    }

    fn place_room(&mut self, client: ClientId, role: Role, prefab: usize, pos: GridPos) -> Result<(), Rejection> {
        if role != Role::Builder {
            return Err(RoomRejection::NotBuilder.into());
        }
        if self.phase.phase() != Phase::BuildRooms {
            return Err(RoomRejection::WrongPhase.into());
        }

        let placed = self
            .rooms
            .place(&self.rules, role, prefab, pos, &mut self.ids, &mut self.world)?;

        if let Some(room) = self.rooms.get(placed.room) {
            let packet = Packet::EntitySpawned {
                entity: room.id,
                kind: SpawnKind::Room {
                    prefab: room.prefab,
                    grid: room.grid,
                    open_mask: room.open_mask,
                    room_hash: room.hash,
                },
                position: room.position,
                rotation_deg: 0.0,
            };
            self.emit(packet);
        }
        for (room, open_mask) in placed.doors_changed {
            self.emit(Packet::RoomDoorsChanged { room, open_mask });
        }

        if placed.is_main {
            self.spawn_reactor(placed.room);
            if let Some(anchor) = self.rooms.builder_anchor(&self.rules, placed.room) {
                if let Some(player) = self.players.get_mut(&client) {
                    player.respawn_point = anchor;
                }
                self.teleport(client, anchor);
            }
        }
        Ok(())
    }

    fn spawn_reactor(&mut self, room_id: EntityId) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        let Some(def) = self.rules.room(room.prefab).and_then(|p| p.reactor.clone()) else {
            warn!("Main room {} has no reactor definition", room_id);
            return;
        };

        let id = self.ids.next();
        let position = room.position + def.offset;
        let collider = self.world.insert(
            Aabb::from_center_size(position, def.size),
            Layer::Reactor,
            Owner::Reactor(id),
        );
        let health = ReactorHealth::new(def.max_hp);
        info!("Reactor {} online in room {} with {} HP", id, room_id, def.max_hp);

        self.emit(Packet::EntitySpawned {
            entity: id,
            kind: SpawnKind::Reactor { room: room_id },
            position,
            rotation_deg: 0.0,
        });
        self.emit(Packet::ReactorHealthChanged {
            current: health.current(),
            max: health.max(),
            destroyed: false,
        });
        self.reactor = Some(Reactor {
            id,
            room: room_id,
            position,
            collider,
            health,
        });
    }

    fn place_trap(&mut self, role: Role, request: TrapRequest) -> Result<(), Rejection> {
        if role != Role::Builder {
            return Err(TrapRejection::NotBuilder.into());
        }
        if self.phase.phase() != Phase::PlaceTraps {
            return Err(TrapRejection::WrongPhase.into());
        }

        let placed = self.traps.place(
            &self.rules,
            role,
            &request,
            &self.rooms,
            &mut self.ids,
            &mut self.world,
        )?;
        self.emit(Packet::EntitySpawned {
            entity: placed.trap,
            kind: SpawnKind::Trap {
                trap: placed.kind,
                room: placed.room,
                room_hash: placed.room_hash,
            },
            position: placed.position,
            rotation_deg: placed.rotation_deg,
        });

        let defender = match self.rules.trap(placed.kind).map(|def| &def.behaviour) {
            Some(TrapBehaviour::Defender(def)) => Some(def.clone()),
            _ => None,
        };
        if let Some(def) = defender {
            let Some(interior) = self
                .rooms
                .get(placed.room)
                .map(|room| self.rules.build.room_interior(room.grid))
            else {
                return Ok(());
            };
            let bot_id = self.ids.next();
            let bot = self.bots.spawn(
                bot_id,
                placed.trap,
                placed.position,
                &def,
                interior,
                &mut self.world,
                self.time,
                &mut self.rng,
            );
            let health = Packet::HealthChanged {
                target: HealthTarget::Bot(bot.id),
                current: bot.health.current(),
                max: bot.health.max(),
                dead: false,
            };
            if let Some(trap) = self.traps.get_mut(placed.trap) {
                trap.runtime = TrapRuntime::Defender { bot: Some(bot_id) };
            }
            self.emit(Packet::EntitySpawned {
                entity: bot_id,
                kind: SpawnKind::Bot { trap: placed.kind },
                position: placed.position,
                rotation_deg: 0.0,
            });
            self.emit(health);
        }
        Ok(())
    }

    fn fire(&mut self, client: ClientId, role: Role, aim: Vec2) -> Result<(), Rejection> {
        if self.phase.phase() != Phase::Play {
            return Err(FireRejection::WrongPhase.into());
        }
        if role == Role::Attacker && !self.phase.base_revealed() {
            return Err(FireRejection::NotRevealed.into());
        }
        let now = self.time;
        let weapon = self.rules.combat.weapon.clone();
        let player = self
            .players
            .get_mut(&client)
            .ok_or(Rejection::UnknownClient(client))?;
        if !player.is_alive() {
            return Err(FireRejection::Dead.into());
        }
        check_aim(aim)?;
        player.limiter.try_fire(&weapon, now)?;

        let direction = aim_direction(aim);
        let combat = &self.rules.combat;
        let origin = player.position + direction * combat.muzzle_offset;
        let (speed, damage, lifetime) = (
            combat.projectile_speed,
            combat.projectile_damage,
            combat.projectile_lifetime,
        );
        self.spawn_projectile(
            origin,
            direction,
            speed,
            damage,
            lifetime,
            Shooter::Player(client),
            role,
        );
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_projectile(
        &mut self,
        origin: Vec2,
        aim: Vec2,
        speed: f32,
        damage: i32,
        lifetime: f32,
        shooter: Shooter,
        role: Role,
    ) -> EntityId {
        let id = self.ids.next();
        let projectile = Projectile::new(id, origin, aim, speed, damage, lifetime, shooter, role);
        self.emit(Packet::EntitySpawned {
            entity: id,
            kind: SpawnKind::Projectile {
                direction: projectile.direction,
                speed,
                shooter_role: role,
            },
            position: origin,
            rotation_deg: projectile.direction.angle_deg(),
        });
        self.projectiles.insert(id, projectile);
        id
    }

    fn player_health_packet(player: &Player) -> Packet {
        Packet::HealthChanged {
            target: HealthTarget::Player(player.id),
            current: player.health.current(),
            max: player.health.max(),
            dead: player.health.is_dead(),
        }
    }

    fn teleport(&mut self, client: ClientId, position: Vec2) {
        let Some(player) = self.players.get_mut(&client) else {
            return;
        };
        player.position = position;
        let (collider, bounds) = (player.collider, player.bounds());
        self.world.set_aabb(collider, bounds);
        self.emit_to(client, Packet::Teleport { position });
    }

    /// Forces a phase. Leaving play hides the base again.
    pub fn set_phase(&mut self, phase: Phase) {
        self.phase.set_phase(phase);
        self.emit(Packet::PhaseChanged { phase });
    }

    /// Reactor damage from a source of the given role. Only attackers hurt it;
    /// destroying it ends the round on the spot.
    pub fn damage_reactor(&mut self, amount: i32, source: Role) -> DamageOutcome {
        if source != Role::Attacker {
            return DamageOutcome::Ignored;
        }
        let Some(reactor) = self.reactor.as_mut() else {
            return DamageOutcome::Ignored;
        };
        let outcome = reactor.health.take_damage(amount);
        if !outcome.changed() {
            return outcome;
        }
        let packet = Packet::ReactorHealthChanged {
            current: reactor.health.current(),
            max: reactor.health.max(),
            destroyed: reactor.health.is_destroyed(),
        };
        self.emit(packet);

        if outcome == DamageOutcome::Killed {
            info!("Reactor destroyed at {:.2}s", self.time);
            if let Some(transition) = self.round.end(Role::Attacker) {
                self.emit_round(transition);
            }
        }
        outcome
    }

    fn apply_damage(&mut self, target: DamageTarget, amount: i32, source: Role) {
        match target {
            DamageTarget::Reactor(_) => {
                self.damage_reactor(amount, source);
            }
            DamageTarget::Player(id) => self.damage_player(id, amount),
            DamageTarget::Bot(id) => {
                let now = self.time;
                let Some(bot) = self.bots.get_mut(id) else {
                    return;
                };
                let outcome = bot.health.take_damage(amount);
                if !outcome.changed() {
                    return;
                }
                let packet = Packet::HealthChanged {
                    target: HealthTarget::Bot(id),
                    current: bot.health.current(),
                    max: bot.health.max(),
                    dead: bot.health.is_dead(),
                };
                let delay = bot.health.policy().delay();
                let collider = bot.collider;
                self.emit(packet);
                if outcome == DamageOutcome::Killed {
                    info!("Bot {} destroyed", id);
                    self.world.set_enabled(collider, false);
                    self.schedule.push(now + delay as f64, Deferred::DestroyBot(id));
                }
            }
        }
    }

    fn damage_player(&mut self, id: ClientId, amount: i32) {
        let now = self.time;
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        let outcome = player.health.take_damage(amount);
        if !outcome.changed() {
            return;
        }
        let packet = Self::player_health_packet(player);
        let delay = player.health.policy().delay();
        let collider = player.collider;
        if outcome == DamageOutcome::Killed {
            player.intent = MoveIntent::default();
            info!("Player {} ({}) died", id, player.role);
        }
        self.emit(packet);
        if outcome == DamageOutcome::Killed {
            self.world.set_enabled(collider, false);
            self.schedule.push(now + delay as f64, Deferred::RespawnPlayer(id));
        }
    }

    fn emit_round(&mut self, transition: RoundTransition) {
        let packet = match transition {
            RoundTransition::Started { end_time } => Packet::RoundStateChanged {
                state: self.round.state(),
                winner: None,
                end_time: Some(end_time),
            },
            RoundTransition::Ended { winner } => Packet::RoundStateChanged {
                state: self.round.state(),
                winner: Some(winner),
                end_time: self.round.end_time(),
            },
        };
        self.emit(packet);
    }

    fn check_round(&mut self) {
        let destroyed = self
            .reactor
            .as_ref()
            .map_or(false, |r| r.health.is_destroyed());
        if let Some(transition) = self.round.update(
            self.time,
            self.phase.phase(),
            self.phase.base_revealed(),
            destroyed,
        ) {
            self.emit_round(transition);
        }
    }

    /// Advances the match by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        self.check_round();
        self.move_players(dt);

        if self.round.is_running() {
            let intruders = self.intruders();
            let effects = step_hazards(&mut self.traps, &self.rules, &intruders, self.time, dt);
            for effect in effects {
                match effect {
                    HazardEffect::Damage { target, amount, .. } => {
                        self.damage_player(target, amount)
                    }
                    HazardEffect::Launch {
                        trap,
                        origin,
                        direction,
                        speed,
                        damage,
                        lifetime,
                    } => {
                        self.spawn_projectile(
                            origin,
                            direction,
                            speed,
                            damage,
                            lifetime,
                            Shooter::Trap(trap),
                            Role::Builder,
                        );
                    }
                }
            }

            for trap in self.traps.iter().filter(|t| t.is_mobile()) {
                if let Some(collider) = trap.collider {
                    self.world.set_aabb(collider, trap.bounds);
                }
            }

            let shots = self.bots.step(&mut self.world, &intruders, self.time, dt);
            for shot in shots {
                self.spawn_projectile(
                    shot.origin,
                    shot.direction,
                    shot.speed,
                    shot.damage,
                    shot.lifetime,
                    Shooter::Bot(shot.bot),
                    Role::Builder,
                );
            }
        }

        self.step_projectiles(dt);

        self.time += dt as f64;
        self.tick += 1;

        for effect in self.schedule.drain_due(self.time) {
            self.run_deferred(effect);
        }
        self.check_round();
    }

    fn intruders(&self) -> Vec<Intruder> {
        self.players
            .values()
            .map(|p| Intruder {
                id: p.id,
                role: p.role,
                bounds: p.bounds(),
                alive: p.is_alive(),
            })
            .collect()
    }

    fn move_players(&mut self, dt: f32) {
        if self.phase.phase() != Phase::Play {
            return;
        }
        let revealed = self.phase.base_revealed();
        let speed = self.rules.combat.player_speed;

        for player in self.players.values_mut() {
            if !player.is_alive() || (player.role == Role::Attacker && !revealed) {
                continue;
            }
            let direction = player.intent.direction();
            if direction == Vec2::ZERO {
                continue;
            }
            let delta = direction.normalize_or(Vec2::ZERO) * (speed * dt);
            player.position = sweep_box(&self.world, player.bounds(), delta, LayerMask::SOLID);
            self.world.set_aabb(player.collider, player.bounds());
        }
    }

    fn step_projectiles(&mut self, dt: f32) {
        if !self.round.is_running() {
            let stale: Vec<EntityId> = self.projectiles.keys().copied().collect();
            for id in stale {
                self.projectiles.remove(&id);
                self.emit(Packet::EntityDestroyed { entity: id });
            }
            return;
        }

        let radius = self.rules.combat.effective_cast_radius();
        let ids: Vec<EntityId> = self.projectiles.keys().copied().collect();
        for id in ids {
            let Some(mut projectile) = self.projectiles.remove(&id) else {
                continue;
            };
            // An earlier projectile this tick may have ended the round.
            if !self.round.is_running() {
                self.emit(Packet::EntityDestroyed { entity: id });
                continue;
            }
            if !projectile.age_by(dt) {
                self.emit(Packet::EntityDestroyed { entity: id });
                continue;
            }

            let distance = projectile.speed * dt;
            let hits = self.world.circle_cast(
                projectile.position,
                radius,
                projectile.direction,
                distance,
                SWEEP_MASK,
            );

            let mut consumed = None;
            for cast in &hits {
                match resolve_hit(&projectile, &cast.hit, |owner| self.role_of(owner)) {
                    Resolution::PassThrough => continue,
                    Resolution::Consumed { damage } => {
                        consumed = Some(damage);
                        break;
                    }
                }
            }

            match consumed {
                Some(damage) => {
                    debug!("Projectile {} consumed", id);
                    if let Some(target) = damage {
                        self.apply_damage(target, projectile.damage, projectile.shooter_role);
                    }
                    self.emit(Packet::EntityDestroyed { entity: id });
                }
                None => {
                    projectile.position = projectile.position + projectile.direction * distance;
                    self.projectiles.insert(id, projectile);
                }
            }
        }
    }

    fn role_of(&self, owner: Owner) -> Option<Role> {
        match owner {
            Owner::Player(id) => self.players.get(&id).map(|p| p.role),
            Owner::Bot(id) => self.bots.get(id).map(|_| Role::Builder),
            _ => None,
        }
    }

    fn run_deferred(&mut self, effect: Deferred) {
        match effect {
            Deferred::RespawnPlayer(id) => {
                let max = {
                    let Some(player) = self.players.get_mut(&id) else {
                        debug!("Respawn for departed player {} dropped", id);
                        return;
                    };
                    if !player.health.is_dead() {
                        return;
                    }
                    let max = self.rules.combat.max_hp(player.role);
                    player.health.reset(max);
                    self.world.set_enabled(player.collider, true);
                    max
                };
                let Some(player) = self.players.get(&id) else {
                    return;
                };
                let (respawn, packet) = (player.respawn_point, Self::player_health_packet(player));
                info!("Player {} respawned with {} HP", id, max);
                self.emit(packet);
                self.teleport(id, respawn);
            }
            Deferred::DestroyBot(id) => {
                let Some(bot) = self.bots.remove(id, &mut self.world) else {
                    return;
                };
                if let Some(trap) = self.traps.get_mut(bot.trap) {
                    trap.runtime = TrapRuntime::Defender { bot: None };
                }
                self.emit(Packet::EntityDestroyed { entity: id });
            }
        }
    }
}
