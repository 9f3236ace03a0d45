//! Benchmark suite for eyeradar-algo
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use eyeradar_algo::{compute_difficulty, prioritize_areas, AreaHistory};

fn bench_compute_difficulty(c: &mut Criterion) {
    let history = [0.55, 0.62, 0.71, 0.8, 0.93];
    c.bench_function("compute_difficulty/warm", |b| {
        b.iter(|| compute_difficulty(black_box(9), black_box(3), black_box(5), black_box(&history[..])))
    });
    let empty: Vec<f64> = Vec::new();
    c.bench_function("compute_difficulty/cold", |b| {
        b.iter(|| compute_difficulty(black_box(9), black_box(3), black_box(5), black_box(&empty)))
    });
}

fn bench_prioritize_areas(c: &mut Criterion) {
    let areas: Vec<AreaHistory> = eyeradar_algo::DeficitArea::ALL
        .iter()
        .enumerate()
        .map(|(i, area)| {
            let accuracies = (0..10).map(|j| ((i + j) % 10) as f64 / 10.0).collect();
            AreaHistory::new(area.as_str(), (i % 5) as i32 + 1, accuracies)
        })
        .collect();

    c.bench_function("prioritize_areas/six", |b| {
        b.iter(|| prioritize_areas(black_box(&areas)))
    });
}

criterion_group!(benches, bench_compute_difficulty, bench_prioritize_areas);
criterion_main!(benches);
