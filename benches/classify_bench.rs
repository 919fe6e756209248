//! Benchmarks for the classification hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use xenosplit::classify::{mapping_state, MappingState, PairPolicy, ScorePair, NO_SCORE};

fn benchmark_mapping_state(c: &mut Criterion) {
    let cases: Vec<(ScorePair, ScorePair)> = (0..1024)
        .map(|i| {
            (
                ScorePair::new(200 - (i % 7), 199 - (i % 5)),
                ScorePair::new(198 + (i % 3), NO_SCORE),
            )
        })
        .collect();

    c.bench_function("mapping_state_1024", |b| {
        b.iter(|| {
            for (primary, secondary) in &cases {
                let state =
                    mapping_state(black_box(*primary), black_box(*secondary), NO_SCORE).unwrap();
                black_box(state);
            }
        });
    });
}

fn benchmark_pair_resolution(c: &mut Criterion) {
    let grid: Vec<(MappingState, Option<MappingState>)> = MappingState::ALL
        .into_iter()
        .flat_map(|f| {
            MappingState::ALL
                .into_iter()
                .map(Some)
                .chain(std::iter::once(None))
                .map(move |r| (f, r))
        })
        .collect();

    c.bench_function("pair_resolution_grid", |b| {
        b.iter(|| {
            for (forward, reverse) in &grid {
                for policy in [PairPolicy::Priority, PairPolicy::Conservative] {
                    black_box(policy.resolve(black_box(*forward), black_box(*reverse)));
                }
            }
        });
    });
}

criterion_group!(benches, benchmark_mapping_state, benchmark_pair_resolution);
criterion_main!(benches);
