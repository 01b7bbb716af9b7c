#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Estimates how many loads and stores the processor can issue per cycle.
//!
//! Runs the same number of loads (or stores) to one address with one to four operations per
//! loop iteration. Once the cycles per operation stop falling as operations are added to the
//! loop body, the processor has run out of read (or write) ports.
//!
//! This module is excluded from mutation testing because it only wires arguments to library
//! functions and prints their results.

use std::hint::black_box;
use std::process::ExitCode;
use std::time::Duration;

use argh::FromArgs;
use benchmarks::{CACHE_LINE_SIZE, init_logging, read_loop, write_loop};
use cycle_harness::RepetitionTester;

/// Measures cycles per load and per store with one to four operations per loop iteration.
#[derive(FromArgs)]
struct Args {
    /// number of operations per trial, in Mi (default 256)
    #[argh(option, default = "256")]
    op_count_mi: usize,

    /// seconds without a new best time before a measurement stops (default 3)
    #[argh(option, default = "3")]
    idle_seconds: u64,
}

#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    init_logging();

    let args: Args = argh::from_env();

    let Some(op_count) = args.op_count_mi.checked_mul(1024 * 1024) else {
        eprintln!("Error: {} Mi operations is too many", args.op_count_mi);
        return ExitCode::FAILURE;
    };

    let tester = RepetitionTester::builder()
        .max_idle_time(Duration::from_secs(args.idle_seconds))
        .build();

    println!("Cycle counter: {}", tester.clock().calibrate());

    let mut data = [0_u8; CACHE_LINE_SIZE];

    measure(&tester, "write_x1", op_count, || write_loop::<1>(&mut data, op_count));
    measure(&tester, "write_x2", op_count, || write_loop::<2>(&mut data, op_count));
    measure(&tester, "write_x3", op_count, || write_loop::<3>(&mut data, op_count));
    measure(&tester, "write_x4", op_count, || write_loop::<4>(&mut data, op_count));

    measure(&tester, "read_x1", op_count, || black_box(read_loop::<1>(&data, op_count)));
    measure(&tester, "read_x2", op_count, || black_box(read_loop::<2>(&data, op_count)));
    measure(&tester, "read_x3", op_count, || black_box(read_loop::<3>(&data, op_count)));
    measure(&tester, "read_x4", op_count, || black_box(read_loop::<4>(&data, op_count)));

    ExitCode::SUCCESS
}

#[cfg_attr(test, mutants::skip)]
fn measure<R>(
    tester: &RepetitionTester,
    name: &str,
    op_count: usize,
    mut kernel: impl FnMut() -> R,
) {
    println!("== {name} ==");

    let state = tester.run_until_converged(|| {
        black_box(kernel());
    });

    let summary = state.summary(op_count as u64);

    println!("{summary}");
    println!("Cycles per op: {:.3}", summary.cycles_per_byte());
    println!();
}
