// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Benchmarks for the tick kernel.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use logicsim::circuit::{CellRule, CircuitPlanes};
use logicsim::grid::PackedGrid;
use logicsim::kernel;
use rand::RngCore;
use rand::SeedableRng;

fn random_board(width: usize, height: usize, seed: u64) -> (CircuitPlanes, PackedGrid) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let rules: Vec<u32> = (0..width * height)
        .map(|_| rng.next_u32() & CellRule::MASK)
        .collect();
    let planes = CircuitPlanes::build(width, height, &rules);
    let mut state = PackedGrid::new(width, height);
    for y in 0..height {
        for x in 0..width {
            state.set(x as i32, y as i32, rng.next_u32() & 1 != 0);
        }
    }
    (planes, state)
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel");

    for side in [64usize, 256, 1024] {
        group.bench_with_input(BenchmarkId::new("step", side), &side, |b, &side| {
            let (planes, current) = random_board(side, side, 0xb0a7d_5eed);
            let mut next = PackedGrid::new(side, side);
            b.iter(|| {
                kernel::step(black_box(&planes), black_box(&current), &mut next);
                black_box(next.words()[0])
            });
        });
    }

    group.finish();
}

fn bench_tick_with_swap(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_generations");

    group.bench_function("step_256_alternating", |b| {
        let (planes, mut current) = random_board(256, 256, 0x51de_f00d);
        let mut next = PackedGrid::new(256, 256);
        b.iter(|| {
            kernel::step(&planes, &current, &mut next);
            std::mem::swap(&mut current, &mut next);
            black_box(current.words()[0])
        });
    });

    group.finish();
}

criterion_group!(benches, bench_step, bench_tick_with_swap);
criterion_main!(benches);
