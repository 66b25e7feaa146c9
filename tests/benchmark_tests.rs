//! Performance benchmarks for hot match paths

use server::game::{Command, GameState};
use server::spatial::{Layer, LayerMask, Owner, SpatialIndex, SpatialQuery};
use shared::rules::{validate_room_placement, RoomOccupancy};
use shared::wire::{decode_payload, encode_frame, HEADER_LEN};
use shared::{Aabb, GridPos, MatchRules, Packet, Phase, Role, Vec2};
use std::collections::HashSet;
use std::time::Instant;

fn crowded_world(count: usize) -> SpatialIndex {
    let mut world = SpatialIndex::new();
    for i in 0..count {
        let x = (i % 40) as f32 * 3.0;
        let y = (i / 40) as f32 * 3.0;
        let layer = if i % 3 == 0 { Layer::Wall } else { Layer::Floor };
        world.insert(
            Aabb::from_center_size(Vec2::new(x, y), Vec2::new(1.0, 1.0)),
            layer,
            Owner::Room(i as u32),
        );
    }
    world
}

/// Benchmarks projectile-style circle casts against a few hundred colliders
#[test]
fn benchmark_circle_cast() {
    let world = crowded_world(400);
    let iterations = 10_000;
    let start = Instant::now();

    let mut hits = 0;
    for i in 0..iterations {
        let origin = Vec2::new(-2.0, (i % 30) as f32);
        hits += world
            .circle_cast(origin, 0.05, Vec2::RIGHT, 0.2 * 60.0, LayerMask::STRUCTURE)
            .len();
    }

    let duration = start.elapsed();
    println!(
        "Circle cast: {} casts in {:?} ({:.2} μs/cast, {} hits)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64,
        hits
    );

    assert!(hits > 0);
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks point and box overlap queries
#[test]
fn benchmark_overlap_queries() {
    let world = crowded_world(400);
    let iterations = 20_000;
    let start = Instant::now();

    for i in 0..iterations {
        let point = Vec2::new((i % 120) as f32, (i % 30) as f32);
        let _ = world.overlap_point(point, LayerMask::ALL);
        let _ = world.overlap_box(Aabb::from_center_size(point, Vec2::new(4.0, 4.0)), LayerMask::SOLID);
    }

    let duration = start.elapsed();
    println!(
        "Overlap queries: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}

struct Cells(HashSet<GridPos>, bool);

impl RoomOccupancy for Cells {
    fn is_occupied(&self, pos: GridPos) -> bool {
        self.0.contains(&pos)
    }

    fn placed_count(&self) -> usize {
        self.0.len()
    }

    fn main_room_placed(&self) -> bool {
        self.1
    }
}

/// Benchmarks room placement validation
#[test]
fn benchmark_room_validation() {
    let rules = MatchRules::default();
    let cells = Cells((0..5).map(|x| GridPos::new(x, 0)).collect(), false);
    let iterations = 100_000;
    let start = Instant::now();

    let mut accepted = 0;
    for i in 0..iterations {
        let pos = GridPos::new(i % 9 - 2, i % 3);
        if validate_room_placement(&cells, &rules.build, rules.rooms.len(), Role::Builder, 1, pos)
            .is_ok()
        {
            accepted += 1;
        }
    }

    let duration = start.elapsed();
    println!(
        "Room validation: {} checks in {:?} ({:.2} ns/check, {} accepted)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64,
        accepted
    );

    assert!(accepted > 0);
    assert!(duration.as_millis() < 500);
}

/// Benchmarks a full match tick with a steady stream of projectiles
#[test]
fn benchmark_match_tick() {
    let mut game = GameState::new(MatchRules::default(), Some(3));
    game.join(1, None);
    game.join(2, None);
    game.handle_command(
        1,
        Command::PlaceRoom {
            prefab: 0,
            pos: GridPos::new(0, 0),
        },
    )
    .unwrap();
    game.set_phase(Phase::Play);
    let main = game.rooms().main_room().unwrap().id;
    game.handle_command(2, Command::SelectSpawnRoom(main)).unwrap();

    let dt = 1.0 / 60.0;
    let iterations = 3_600;
    let start = Instant::now();

    for i in 0..iterations {
        let aim = Vec2::from_angle_deg((i * 7 % 360) as f32);
        let _ = game.handle_command(1, Command::Fire { aim });
        let _ = game.handle_command(2, Command::Fire { aim: Vec2::new(-aim.x, aim.y) });
        game.tick(dt);
        game.drain_outbox();
    }

    let duration = start.elapsed();
    println!(
        "Match tick: {} ticks in {:?} ({:.2} μs/tick)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // One simulated minute should take well under a real second.
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks framing and decoding a small packet
#[test]
fn benchmark_wire_codec() {
    let packet = Packet::PhaseChanged { phase: Phase::Play };
    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let frame = encode_frame(&packet).unwrap();
        let decoded = decode_payload(&frame[HEADER_LEN..]).unwrap();
        assert_eq!(decoded, packet);
    }

    let duration = start.elapsed();
    println!(
        "Wire codec: {} round trips in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}
