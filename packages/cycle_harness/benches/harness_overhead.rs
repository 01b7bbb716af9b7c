//! Benchmarks to measure the overhead of the harness itself.
//!
//! The profiler is meant to be left in hot loops, so entering and exiting a region must cost
//! little more than two counter reads.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use cycle_harness::{Clock, Profiler};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("cycle_harness_overhead");

    // Baseline measurement - no instrumentation at all.
    group.bench_function("baseline_empty", |b| {
        b.iter(|| {
            black_box(());
        });
    });

    let clock = Clock::new();
    group.bench_function("clock_now", |b| {
        b.iter(|| black_box(clock.now()));
    });

    let profiler = Profiler::new();
    let empty = profiler.region("empty");
    let outer = profiler.region("outer");
    let inner = profiler.region("inner");

    group.bench_function("region_empty", |b| {
        b.iter(|| {
            let _guard = profiler.enter(empty);
            black_box(());
        });
    });

    group.bench_function("region_nested_empty", |b| {
        b.iter(|| {
            let _outer = profiler.enter(outer);
            let _inner = profiler.enter(inner);
            black_box(());
        });
    });

    group.bench_function("region_named_lookup", |b| {
        b.iter(|| {
            let _guard = profiler.enter_named("empty");
            black_box(());
        });
    });

    group.finish();

    // Keep the profiler session alive until all benchmarks have run.
    black_box(profiler.report());
}
