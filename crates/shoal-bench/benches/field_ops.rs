//! Criterion micro-benchmarks for per-tile passes: boundary exchange,
//! composite packing and the jump flood.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use shoal_boundary::{BoundaryExchange, BoundarySide, Topology};
use shoal_compute::{CommandStream, KernelTable, Kernels, SoftwareBackend};
use shoal_core::TileId;
use shoal_grid::{GridConfig, SimulationGrid};
use shoal_readback::JumpFlood;
use shoal_test_utils::fill_interior;

fn grid(backend: &mut SoftwareBackend, config: &GridConfig) -> SimulationGrid {
    let mut g = SimulationGrid::init(config, backend).unwrap();
    fill_interior(&mut g, 1.0);
    g
}

fn bench_exchange(c: &mut Criterion) {
    let mut backend = SoftwareBackend::new();
    let mut table = KernelTable::new();
    let kernels = Kernels::resolve(&mut table);
    let config = GridConfig::new(128, 64.0);
    let mut a = grid(&mut backend, &config);
    let mut b = grid(&mut backend, &config);
    let mut topology = Topology::new();
    topology.insert(TileId(0), [0, 0]).unwrap();
    topology.insert(TileId(1), [1, 0]).unwrap();
    topology.link(TileId(0), BoundarySide::Right, TileId(1)).unwrap();
    let mut exchange = BoundaryExchange::new(false);

    c.bench_function("exchange_two_tiles_128", |bench| {
        bench.iter(|| {
            let mut tiles = [(TileId(0), &mut a), (TileId(1), &mut b)];
            let mut stream = CommandStream::new(&mut backend, &kernels);
            exchange.exchange(&topology, &mut tiles, &mut stream);
        });
    });
}

fn bench_composite(c: &mut Criterion) {
    let mut backend = SoftwareBackend::new();
    let mut table = KernelTable::new();
    let kernels = Kernels::resolve(&mut table);
    let mut g = grid(&mut backend, &GridConfig::new(256, 64.0));

    c.bench_function("pack_composite_256", |bench| {
        bench.iter(|| {
            let mut stream = CommandStream::new(&mut backend, &kernels);
            g.pack_composite(&mut stream);
            g.compute_normals(&mut stream);
            black_box(g.composite_current().data().len());
        });
    });
}

fn bench_jump_flood(c: &mut Criterion) {
    let mut backend = SoftwareBackend::new();
    let mut table = KernelTable::new();
    let kernels = Kernels::resolve(&mut table);
    let mut config = GridConfig::new(256, 64.0);
    config.distance_downsample = Some(2);
    let mut g = SimulationGrid::init(&config, &mut backend).unwrap();
    let gm = g.ghost_margin();
    g.height.active_mut().set(gm + 10, gm + 200, 0, 1.0);
    g.height.active_mut().set(gm + 180, gm + 40, 0, 1.0);
    let flood = JumpFlood::new(8);

    c.bench_function("jump_flood_128", |bench| {
        bench.iter(|| {
            let mut stream = CommandStream::new(&mut backend, &kernels);
            black_box(flood.run(&mut g, &mut stream));
        });
    });
}

criterion_group!(benches, bench_exchange, bench_composite, bench_jump_flood);
criterion_main!(benches);
