// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Benchmarks for the dynamic AABB tree
//!
//! These benchmarks measure:
//! - Bulk insertion of scattered proxies
//! - Region queries against a populated tree
//! - Small moves that stay inside the fat AABB versus moves that re-insert

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rigid2d::tree::DynamicTree;
use rigid2d::{Aabb, Vec2};

/// Deterministic scatter of unit boxes over a square field
fn scatter(count: usize) -> Vec<Aabb> {
    let side = (count as f64).sqrt().ceil() as usize;
    (0..count)
        .map(|i| {
            let jitter = ((i * 7919) % 13) as f64 * 0.05;
            let center = Vec2::new((i % side) as f64 * 2.0 + jitter, (i / side) as f64 * 2.0);
            Aabb::from_center(center, Vec2::new(0.5, 0.5))
        })
        .collect()
}

fn populated(boxes: &[Aabb]) -> (DynamicTree<usize>, Vec<rigid2d::tree::ProxyId>) {
    let mut tree = DynamicTree::new();
    let proxies = boxes
        .iter()
        .enumerate()
        .map(|(i, aabb)| tree.insert(*aabb, i))
        .collect();
    (tree, proxies)
}

/// Benchmark: Insert N proxies into an empty tree
fn bench_tree_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_insert");

    for count in [100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        let boxes = scatter(*count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &boxes, |b, boxes| {
            b.iter(|| {
                let (tree, _) = populated(boxes);
                black_box(tree.height());
            });
        });
    }

    group.finish();
}

/// Benchmark: Query a 5x5 window at every proxy position
fn bench_tree_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_query");

    for count in [100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        let boxes = scatter(*count);
        let (tree, _) = populated(&boxes);

        group.bench_with_input(BenchmarkId::from_parameter(count), &boxes, |b, boxes| {
            b.iter(|| {
                let mut hits = 0usize;
                for aabb in boxes {
                    let window = Aabb::new(
                        aabb.lower - Vec2::new(2.0, 2.0),
                        aabb.upper + Vec2::new(2.0, 2.0),
                    );
                    tree.query(&window, |_| {
                        hits += 1;
                        true
                    });
                }
                black_box(hits);
            });
        });
    }

    group.finish();
}

/// Benchmark: Move every proxy a little or far
fn bench_tree_move(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_move");
    let count = 1000;
    group.throughput(Throughput::Elements(count as u64));
    let boxes = scatter(count);

    for (label, step) in [("inside_margin", 0.01), ("reinsert", 1.5)] {
        group.bench_function(label, |b| {
            b.iter_batched(
                || populated(&boxes),
                |(mut tree, proxies)| {
                    let offset = Vec2::new(step, 0.0);
                    let mut moved = 0usize;
                    for (proxy, aabb) in proxies.iter().zip(&boxes) {
                        let target = Aabb::new(aabb.lower + offset, aabb.upper + offset);
                        if tree.move_proxy(*proxy, target, offset) {
                            moved += 1;
                        }
                    }
                    black_box((tree.height(), moved));
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tree_insert, bench_tree_query, bench_tree_move);
criterion_main!(benches);
