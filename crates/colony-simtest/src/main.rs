//! Colony Headless Simulation Harness
//!
//! Drives the colony engine through scripted scenarios and a seeded random
//! soak, checking world invariants along the way. Runs entirely
//! in-process; no rendering.
//!
//! Usage:
//!   cargo run -p colony-simtest
//!   cargo run -p colony-simtest -- --verbose --ticks 5000 --seed 42
//!
//! Set `RUST_LOG=colony_core=debug` to watch the engine's own log.

use std::collections::BTreeSet;

use colony_core::generation::{build_test_route, fill_floor, randomize_tiles};
use colony_core::persistence::SaveData;
use colony_core::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DT: f32 = 0.05;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

struct Options {
    verbose: bool,
    ticks: u32,
    seed: u64,
}

fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let value_of = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .and_then(|v| v.parse::<u64>().ok())
    };
    Options {
        verbose: args.iter().any(|a| a == "--verbose"),
        ticks: value_of("--ticks").map(|t| t as u32).unwrap_or(2000),
        seed: value_of("--seed").unwrap_or(1),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn main() {
    init_tracing();
    let opts = parse_args();
    println!("=== Colony Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Prototype catalog
    results.extend(validate_catalog(opts.verbose));

    // 2. Room partitioning
    results.extend(validate_rooms(opts.verbose));

    // 3. Pathfinding
    results.extend(validate_pathfinding(opts.verbose));

    // 4. Building and hauling
    results.extend(validate_construction(opts.verbose));

    // 5. Doors and atmosphere
    results.extend(validate_furniture(opts.verbose));

    // 6. Save / load
    results.extend(validate_persistence(opts.verbose));

    // 7. Random soak
    results.extend(validate_soak(&opts));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || opts.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn floored(width: u32, height: u32) -> Result<SimulationEngine, String> {
    let mut engine = SimulationEngine::with_builtin_catalog(SimConfig::with_size(width, height))
        .map_err(|e| e.to_string())?;
    fill_floor(
        &mut engine,
        TileCoord::new(0, 0),
        TileCoord::new(width as i32 - 1, height as i32 - 1),
    )
    .map_err(|e| e.to_string())?;
    Ok(engine)
}

/// Walls the rectangle's outline, leaving its interior as one room.
fn wall_ring(engine: &mut SimulationEngine, x0: i32, y0: i32, x1: i32, y1: i32) -> Result<(), String> {
    for y in y0..=y1 {
        for x in x0..=x1 {
            if x == x0 || x == x1 || y == y0 || y == y1 {
                engine
                    .place_furniture("Wall", TileCoord::new(x, y))
                    .map_err(|e| e.to_string())?;
            }
        }
    }
    Ok(())
}

fn run_for(engine: &mut SimulationEngine, seconds: f32) {
    let steps = (seconds / DT).ceil() as u32;
    for _ in 0..steps {
        engine.tick(DT);
    }
}

fn failed(name: &str, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed: false,
        detail: detail.into(),
    }
}

// ── 1. Catalog ──────────────────────────────────────────────────────────

fn validate_catalog(verbose: bool) -> Vec<TestResult> {
    println!("--- Prototype Catalog ---");
    let mut results = Vec::new();

    let catalog = match FurnitureCatalog::builtin() {
        Ok(c) => c,
        Err(e) => {
            results.push(failed("catalog_parse", format!("JSON error: {}", e)));
            return results;
        }
    };

    let problems = catalog.validate();
    results.push(TestResult {
        name: "catalog_valid".into(),
        passed: problems.is_empty(),
        detail: format!("{} problems", problems.len()),
    });

    let wanted = ["Wall", "Door", "Stockpile", "Oxygen Generator"];
    let missing: Vec<_> = wanted.iter().filter(|k| catalog.get(k).is_none()).collect();
    results.push(TestResult {
        name: "catalog_core_prototypes".into(),
        passed: missing.is_empty(),
        detail: format!("missing: {:?}", missing),
    });

    let wall_ok = catalog
        .get("Wall")
        .map(|w| w.movement_cost == 0.0 && w.room_border && w.links_to_neighbour)
        .unwrap_or(false);
    results.push(TestResult {
        name: "catalog_wall_impassable_border".into(),
        passed: wall_ok,
        detail: "walls block movement and bound rooms".into(),
    });

    if verbose {
        for kind in catalog.kinds() {
            if let Some(p) = catalog.get(kind) {
                println!(
                    "  {:18} cost={:.1} {}x{} build={:.1}s materials={:?}",
                    kind, p.movement_cost, p.width, p.height, p.build_time, p.materials
                );
            }
        }
    }

    results
}

// ── 2. Rooms ────────────────────────────────────────────────────────────

fn validate_rooms(_verbose: bool) -> Vec<TestResult> {
    println!("--- Room Partitioning ---");
    let mut results = Vec::new();

    let mut engine = match floored(12, 12) {
        Ok(e) => e,
        Err(e) => return vec![failed("rooms_setup", e)],
    };
    if let Err(e) = wall_ring(&mut engine, 2, 2, 8, 8) {
        return vec![failed("rooms_setup", e)];
    }

    let inside = TileCoord::new(5, 5);
    let enclosed = engine.rooms().enclosed().count();
    let size = engine.room_of(inside).map(|r| r.size()).unwrap_or(0);
    results.push(TestResult {
        name: "rooms_ring_encloses".into(),
        passed: enclosed == 1 && size == 25,
        detail: format!("{} enclosed rooms, inner size {}", enclosed, size),
    });

    if let Some(room) = engine.room_of_mut(inside) {
        room.set_gas("O2", 0.2);
    }
    // Split with an interior wall line
    let mut split_ok = true;
    for y in 3..8 {
        split_ok &= engine.place_furniture("Wall", TileCoord::new(5, y)).is_ok();
    }
    let left = engine.room_of(TileCoord::new(3, 5)).map(|r| (r.id, r.gas("O2")));
    let right = engine.room_of(TileCoord::new(7, 5)).map(|r| (r.id, r.gas("O2")));
    let split = match (left, right) {
        (Some((a, ga)), Some((b, gb))) => a != b && (ga - 0.2).abs() < 1e-5 && (gb - 0.2).abs() < 1e-5,
        _ => false,
    };
    results.push(TestResult {
        name: "rooms_split_copies_gas".into(),
        passed: split_ok && split,
        detail: format!("left={:?} right={:?}", left, right),
    });

    // Breach to outside
    let breached = engine.remove_furniture(TileCoord::new(2, 5)).is_ok()
        && engine
            .room_of(TileCoord::new(3, 5))
            .map(|r| r.id.is_outside())
            .unwrap_or(false);
    results.push(TestResult {
        name: "rooms_breach_vents".into(),
        passed: breached,
        detail: "removing an outer wall joins the room to outside".into(),
    });

    let partitioned = check_room_partition(&engine);
    results.push(TestResult {
        name: "rooms_partition_consistent".into(),
        passed: partitioned.is_ok(),
        detail: partitioned.err().unwrap_or_else(|| "tile and room views agree".into()),
    });

    results
}

/// Every tile's room back-reference agrees with the room's member set, and
/// no tile sits in two rooms.
fn check_room_partition(engine: &SimulationEngine) -> Result<(), String> {
    let mut seen = BTreeSet::new();
    for room in engine.rooms().iter() {
        for coord in room.tiles() {
            if !seen.insert(*coord) {
                return Err(format!("{} is in two rooms", coord));
            }
            let back = engine.tile(*coord).and_then(|t| t.room);
            if back != Some(room.id) {
                return Err(format!("{} claims {:?} but is in {}", coord, back, room.id));
            }
        }
    }
    for tile in engine.grid().tiles() {
        if tile.room.is_some() && !seen.contains(&tile.coord) {
            return Err(format!("{} points at a room that does not list it", tile.coord));
        }
        if tile.room.is_some() && (tile.is_empty() || tile.is_room_border()) {
            return Err(format!("{} is empty or a border yet has a room", tile.coord));
        }
    }
    Ok(())
}

// ── 3. Pathfinding ──────────────────────────────────────────────────────

fn validate_pathfinding(verbose: bool) -> Vec<TestResult> {
    println!("--- Pathfinding ---");
    let mut results = Vec::new();

    let engine = match floored(10, 10) {
        Ok(e) => e,
        Err(e) => return vec![failed("path_setup", e)],
    };
    let mut cache = PathCache::new(64);
    let path = cache.find_path(
        engine.grid(),
        TileCoord::new(0, 0),
        TileCoord::new(9, 9),
        true,
    );
    let diagonal = path
        .as_ref()
        .map(|p| p.len() == 9 && (p.cost() - 9.0 * std::f32::consts::SQRT_2).abs() < 1e-3)
        .unwrap_or(false);
    results.push(TestResult {
        name: "path_open_diagonal".into(),
        passed: diagonal,
        detail: format!(
            "len={:?} cost={:?}",
            path.as_ref().map(|p| p.len()),
            path.as_ref().map(|p| p.cost())
        ),
    });

    let mut route = match SimulationEngine::with_builtin_catalog(SimConfig::with_size(40, 40)) {
        Ok(e) => e,
        Err(e) => return vec![failed("path_setup", e.to_string())],
    };
    if let Err(e) = build_test_route(&mut route) {
        results.push(failed("path_test_route", e.to_string()));
        return results;
    }
    let mut cache = PathCache::new(64);
    let (start, goal) = (TileCoord::new(16, 17), TileCoord::new(10, 10));
    let detour = cache.find_path(route.grid(), start, goal, true);
    let clear = detour
        .as_ref()
        .map(|p| p.tiles().all(|t| route.movement_cost(*t) > 0.0))
        .unwrap_or(false);
    results.push(TestResult {
        name: "path_test_route_detour".into(),
        passed: clear,
        detail: format!(
            "{} -> {}: {:?} tiles",
            start,
            goal,
            detour.as_ref().map(|p| p.len())
        ),
    });
    if verbose {
        if let Some(p) = &detour {
            let tiles: Vec<String> = p.tiles().map(|t| t.to_string()).collect();
            println!("  route: {}", tiles.join(" "));
        }
    }

    // One rebuild per burst of edits
    let mut burst = match floored(16, 16) {
        Ok(e) => e,
        Err(e) => return vec![failed("path_setup", e)],
    };
    let who = burst.spawn_character(TileCoord::new(0, 0));
    burst.submit_job(Job::new(TileCoord::new(15, 15), JobPurpose::Generic, 0.5));
    burst.tick(DT);
    let before = burst.path_cache().rebuild_count();
    for y in 4..12 {
        let _ = burst.place_furniture("Wall", TileCoord::new(12, y));
    }
    burst.submit_job(Job::new(TileCoord::new(0, 15), JobPurpose::Generic, 0.5));
    run_for(&mut burst, 15.0);
    let rebuilds = burst.path_cache().rebuild_count() - before;
    results.push(TestResult {
        name: "path_rebuild_once_per_burst".into(),
        passed: who.is_ok() && rebuilds == 1 && burst.jobs().live_jobs() == 0,
        detail: format!(
            "{} rebuilds after 8 walls, {} jobs left",
            rebuilds,
            burst.jobs().live_jobs()
        ),
    });

    results
}

// ── 4. Construction ─────────────────────────────────────────────────────

fn validate_construction(_verbose: bool) -> Vec<TestResult> {
    println!("--- Building & Hauling ---");
    let mut results = Vec::new();

    let mut engine = match floored(12, 6) {
        Ok(e) => e,
        Err(e) => return vec![failed("build_setup", e)],
    };
    let _ = engine.spawn_inventory(TileCoord::new(0, 0), "Steel Plate", 20);
    let _ = engine.spawn_character(TileCoord::new(2, 3));
    let ordered = engine.order_build("Wall", TileCoord::new(10, 3)).is_ok()
        && engine.order_build("Wall", TileCoord::new(10, 4)).is_ok();
    run_for(&mut engine, 20.0);
    let walls = [TileCoord::new(10, 3), TileCoord::new(10, 4)]
        .iter()
        .filter(|c| engine.furniture_at(**c).map(|f| f.kind == "Wall").unwrap_or(false))
        .count();
    let left = engine.inventory().total_of_kind("Steel Plate");
    results.push(TestResult {
        name: "build_fetch_and_construct".into(),
        passed: ordered && walls == 2 && left == 10,
        detail: format!("{} walls built, {} steel left", walls, left),
    });

    // Stockpile pulls loose steel onto itself
    let mut engine = match floored(10, 5) {
        Ok(e) => e,
        Err(e) => return vec![failed("haul_setup", e)],
    };
    let _ = engine.spawn_inventory(TileCoord::new(8, 1), "Steel Plate", 15);
    let _ = engine.spawn_inventory(TileCoord::new(8, 3), "Steel Plate", 15);
    let _ = engine.spawn_character(TileCoord::new(4, 2));
    let pile = TileCoord::new(1, 2);
    let placed = engine.order_build("Stockpile", pile).is_ok();
    run_for(&mut engine, 30.0);
    let stocked = engine.inventory_at(pile).map(|s| s.stack_size).unwrap_or(0);
    let loose = engine.inventory_at(TileCoord::new(8, 1)).is_none()
        && engine.inventory_at(TileCoord::new(8, 3)).is_none();
    let one_demand = engine
        .jobs()
        .iter()
        .filter(|(_, j)| matches!(j.purpose, JobPurpose::Haul { .. }))
        .count()
        <= 1;
    results.push(TestResult {
        name: "haul_to_stockpile".into(),
        passed: placed && stocked == 30 && loose && one_demand,
        detail: format!("stockpile holds {}, loose stacks cleared={}", stocked, loose),
    });

    // Abandoning gives the job back exactly once
    let mut engine = match floored(8, 3) {
        Ok(e) => e,
        Err(e) => return vec![failed("abandon_setup", e)],
    };
    let _ = engine.spawn_character(TileCoord::new(0, 1));
    let id = engine.order_build("Wall", TileCoord::new(6, 1));
    run_for(&mut engine, 0.5);
    let queued_once = id
        .as_ref()
        .map(|id| engine.jobs().queued().iter().filter(|q| *q == id).count() == 1)
        .unwrap_or(false);
    let pending_cleared = engine
        .tile(TileCoord::new(6, 1))
        .map(|t| t.pending_furniture_job.is_none())
        .unwrap_or(false);
    results.push(TestResult {
        name: "abandon_requeues_once".into(),
        passed: queued_once && pending_cleared,
        detail: format!("queued once={} pending cleared={}", queued_once, pending_cleared),
    });

    // Deconstructing a dividing wall merges the two rooms
    let mut engine = match floored(12, 8) {
        Ok(e) => e,
        Err(e) => return vec![failed("deconstruct_setup", e)],
    };
    let mut setup = wall_ring(&mut engine, 1, 1, 9, 6);
    for y in 2..6 {
        setup = setup.and_then(|_| {
            engine
                .place_furniture("Wall", TileCoord::new(5, y))
                .map(|_| ())
                .map_err(|e| e.to_string())
        });
    }
    if let Err(e) = setup {
        return vec![failed("deconstruct_setup", e)];
    }
    let _ = engine.spawn_character(TileCoord::new(3, 3));
    let before = engine.rooms().enclosed().count();
    let ordered = engine.order_deconstruct(TileCoord::new(5, 3)).is_ok();
    run_for(&mut engine, 10.0);
    let after = engine.rooms().enclosed().count();
    results.push(TestResult {
        name: "deconstruct_merges_rooms".into(),
        passed: ordered && before == 2 && after == 1,
        detail: format!("{} rooms before, {} after", before, after),
    });

    results
}

// ── 5. Doors & Atmosphere ───────────────────────────────────────────────

fn validate_furniture(_verbose: bool) -> Vec<TestResult> {
    println!("--- Doors & Atmosphere ---");
    let mut results = Vec::new();

    // A character crosses a doorway in a wall line
    let mut engine = match floored(9, 5) {
        Ok(e) => e,
        Err(e) => return vec![failed("door_setup", e)],
    };
    let mut ok = true;
    for y in 0..5 {
        ok &= if y == 2 {
            engine.place_furniture("Door", TileCoord::new(4, y)).is_ok()
        } else {
            engine.place_furniture("Wall", TileCoord::new(4, y)).is_ok()
        };
    }
    let who = engine.spawn_character(TileCoord::new(1, 2));
    engine.submit_job(Job::new(TileCoord::new(7, 2), JobPurpose::Generic, 0.1));
    let mut door_moved = false;
    for _ in 0..200 {
        engine.tick(DT);
        door_moved |= engine
            .furniture_at(TileCoord::new(4, 2))
            .and_then(|f| f.parameter("openness"))
            .map(|o| o > 0.0)
            .unwrap_or(false);
    }
    let crossed = who
        .ok()
        .and_then(|e| engine.character(e).map(|c| c.current.x > 4))
        .unwrap_or(false);
    results.push(TestResult {
        name: "door_opens_for_traffic".into(),
        passed: ok && door_moved && crossed,
        detail: format!("door opened={} crossed={}", door_moved, crossed),
    });

    // Generator fills its room up to the ceiling and no further
    let mut engine = match floored(10, 10) {
        Ok(e) => e,
        Err(e) => return vec![failed("gas_setup", e)],
    };
    if let Err(e) = wall_ring(&mut engine, 1, 1, 8, 8) {
        return vec![failed("gas_setup", e)];
    }
    let placed = engine.place_furniture("Oxygen Generator", TileCoord::new(3, 3)).is_ok();
    run_for(&mut engine, 5.0);
    let early = engine.room_of(TileCoord::new(6, 6)).map(|r| r.gas("O2")).unwrap_or(0.0);
    run_for(&mut engine, 60.0);
    let late = engine.room_of(TileCoord::new(6, 6)).map(|r| r.gas("O2")).unwrap_or(0.0);
    results.push(TestResult {
        name: "gas_generator_fills_room".into(),
        passed: placed && early > 0.0 && early < late && (late - 0.2).abs() < 1e-4,
        detail: format!("O2 {:.3} after 5s, {:.3} after 65s", early, late),
    });

    let outside = engine.rooms().outside().map(|r| r.gas("O2")).unwrap_or(-1.0);
    results.push(TestResult {
        name: "gas_outside_stays_vacuum".into(),
        passed: outside == 0.0,
        detail: format!("outside O2 {:.3}", outside),
    });

    results
}

// ── 6. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(_verbose: bool) -> Vec<TestResult> {
    println!("--- Save / Load ---");
    let mut results = Vec::new();

    let mut engine = match floored(12, 12) {
        Ok(e) => e,
        Err(e) => return vec![failed("save_setup", e)],
    };
    if let Err(e) = wall_ring(&mut engine, 2, 2, 9, 9) {
        return vec![failed("save_setup", e)];
    }
    let inside = TileCoord::new(5, 5);
    if let Some(room) = engine.room_of_mut(inside) {
        room.set_gas("O2", 0.12);
    }
    let _ = engine.spawn_inventory(TileCoord::new(0, 0), "Copper Wire", 7);
    let _ = engine.spawn_character(TileCoord::new(5, 5));
    run_for(&mut engine, 1.0);

    let mut buffer = Vec::new();
    if let Err(e) = engine.save(&mut buffer) {
        return vec![failed("save_write", e.to_string())];
    }
    let mut loaded = match SimulationEngine::with_builtin_catalog(SimConfig::default()) {
        Ok(e) => e,
        Err(e) => return vec![failed("save_setup", e.to_string())],
    };
    let load = loaded.load(buffer.as_slice());

    let same = load.is_ok() && SaveData::capture(&loaded) == SaveData::capture(&engine);
    results.push(TestResult {
        name: "save_roundtrip_identical".into(),
        passed: same,
        detail: format!("{} bytes, load={:?}", buffer.len(), load.as_ref().err()),
    });

    let gas = loaded.room_of(inside).map(|r| (r.id, r.gas("O2")));
    let original = engine.room_of(inside).map(|r| (r.id, r.gas("O2")));
    results.push(TestResult {
        name: "save_room_ids_and_gas".into(),
        passed: gas.is_some() && gas == original,
        detail: format!("before={:?} after={:?}", original, gas),
    });

    results
}

// ── 7. Random soak ──────────────────────────────────────────────────────

fn validate_soak(opts: &Options) -> Vec<TestResult> {
    println!("--- Random Soak (seed {}, {} ticks) ---", opts.seed, opts.ticks);
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(opts.seed);

    let mut engine = match SimulationEngine::with_builtin_catalog(SimConfig::with_size(32, 32)) {
        Ok(e) => e,
        Err(e) => return vec![failed("soak_setup", e.to_string())],
    };
    randomize_tiles(&mut engine, &mut rng);
    let _ = fill_floor(&mut engine, TileCoord::new(8, 8), TileCoord::new(23, 23));

    let mut spawned = 0;
    while spawned < 4 {
        let c = TileCoord::new(rng.gen_range(8..24), rng.gen_range(8..24));
        if engine.spawn_character(c).is_ok() {
            spawned += 1;
        }
    }
    for _ in 0..6 {
        let c = TileCoord::new(rng.gen_range(0..32), rng.gen_range(0..32));
        let kind = if rng.gen_bool(0.5) { "Steel Plate" } else { "Copper Wire" };
        let _ = engine.spawn_inventory(c, kind, rng.gen_range(1..40));
    }

    let kinds = ["Wall", "Door", "Stockpile", "Oxygen Generator"];
    let mut violations = Vec::new();
    for tick in 0..opts.ticks {
        if tick % 40 == 0 {
            let c = TileCoord::new(rng.gen_range(0..32), rng.gen_range(0..32));
            if rng.gen_bool(0.8) {
                let kind = kinds[rng.gen_range(0..kinds.len())];
                let _ = engine.order_build(kind, c);
            } else {
                let _ = engine.order_deconstruct(c);
            }
        }
        engine.tick(DT);

        if tick % 50 == 0 {
            if let Err(e) = check_room_partition(&engine) {
                violations.push(format!("tick {}: {}", tick, e));
            }
            if let Err(e) = check_stacks(&engine) {
                violations.push(format!("tick {}: {}", tick, e));
            }
            if let Err(e) = check_jobs(&engine) {
                violations.push(format!("tick {}: {}", tick, e));
            }
        }
    }

    results.push(TestResult {
        name: "soak_invariants".into(),
        passed: violations.is_empty(),
        detail: if violations.is_empty() {
            format!(
                "{} furniture, {} live jobs, {} rooms after {:.0}s",
                engine.furniture_entities().len(),
                engine.jobs().live_jobs(),
                engine.rooms().len(),
                engine.sim_time
            )
        } else {
            violations[..violations.len().min(5)].join("; ")
        },
    });

    if opts.verbose {
        println!(
            "  {} events emitted, {} path graph rebuilds",
            engine.events().emitted_count(),
            engine.path_cache().rebuild_count()
        );
    }

    results
}

/// Stacks are never empty, never buried, and tile back-references match.
fn check_stacks(engine: &SimulationEngine) -> Result<(), String> {
    for (id, stack) in engine.inventory().iter() {
        if stack.stack_size == 0 {
            return Err(format!("empty {} stack survived", stack.kind));
        }
        if stack.stack_size > stack.max_stack_size {
            return Err(format!("{} stack over its limit", stack.kind));
        }
        if let Some(at) = stack.tile() {
            if engine.tile(at).and_then(|t| t.inventory) != Some(id) {
                return Err(format!("stack on {} not linked from its tile", at));
            }
            if engine.movement_cost(at) <= 0.0 {
                return Err(format!("{} stack buried at {}", stack.kind, at));
            }
        }
    }
    Ok(())
}

/// A job is held by at most one character and a held job is never queued.
fn check_jobs(engine: &SimulationEngine) -> Result<(), String> {
    let mut held: BTreeSet<JobId> = BTreeSet::new();
    for e in engine.characters() {
        let Some(ch) = engine.character(*e) else {
            continue;
        };
        if let Some(job) = ch.job {
            if !held.insert(job) {
                return Err(format!("{:?} held twice", job));
            }
            if engine.jobs().is_queued(job) {
                return Err(format!("{:?} held and queued", job));
            }
        }
    }
    Ok(())
}
