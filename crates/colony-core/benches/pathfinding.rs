use colony_core::generation::{build_test_route, fill_floor};
use colony_core::prelude::*;
use colony_core::systems::{find_path, PathGraph};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn open_world(size: u32) -> SimulationEngine {
    let mut engine = SimulationEngine::with_builtin_catalog(SimConfig::with_size(size, size))
        .expect("builtin catalog");
    let far = size as i32 - 1;
    fill_floor(&mut engine, TileCoord::new(0, 0), TileCoord::new(far, far)).expect("in bounds");
    engine
}

fn bench_graph_rebuild(c: &mut Criterion) {
    let engine = open_world(100);
    c.bench_function("path_graph_build_100x100", |b| {
        b.iter(|| PathGraph::build(black_box(engine.grid())))
    });
}

fn bench_astar(c: &mut Criterion) {
    let engine = open_world(100);
    let graph = PathGraph::build(engine.grid());
    c.bench_function("astar_open_corner_to_corner", |b| {
        b.iter(|| {
            find_path(
                &graph,
                black_box(TileCoord::new(0, 0)),
                black_box(TileCoord::new(99, 99)),
                true,
            )
        })
    });

    let mut route = open_world(60);
    build_test_route(&mut route).expect("route fits");
    let graph = PathGraph::build(route.grid());
    c.bench_function("astar_test_route_detour", |b| {
        b.iter(|| {
            find_path(
                &graph,
                black_box(TileCoord::new(28, 28)),
                black_box(TileCoord::new(5, 55)),
                false,
            )
        })
    });
}

criterion_group!(benches, bench_graph_rebuild, bench_astar);
criterion_main!(benches);
