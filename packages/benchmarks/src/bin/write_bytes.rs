#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Measures how fast a single thread can write sequential bytes to memory.
//!
//! This module is excluded from mutation testing because it only wires arguments to library
//! functions and prints their results.

use std::hint::black_box;
use std::process::ExitCode;
use std::time::Duration;

use argh::FromArgs;
use benchmarks::{init_logging, write_bytes};
use cycle_harness::RepetitionTester;

/// Measures single-threaded sequential memory write bandwidth.
#[derive(FromArgs)]
struct Args {
    /// size of the buffer to fill, in MiB (default 256)
    #[argh(option, default = "256")]
    size_mib: usize,

    /// seconds without a new best time before a measurement stops (default 3)
    #[argh(option, default = "3")]
    idle_seconds: u64,
}

#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    init_logging();

    let args: Args = argh::from_env();

    let Some(size) = args.size_mib.checked_mul(1024 * 1024) else {
        eprintln!("Error: a buffer of {} MiB is too large", args.size_mib);
        return ExitCode::FAILURE;
    };

    let tester = RepetitionTester::builder()
        .max_idle_time(Duration::from_secs(args.idle_seconds))
        .build();

    println!("Cycle counter: {}", tester.clock().calibrate());

    let mut data = vec![0_u8; size];

    let state = tester.run_until_converged(|| {
        write_bytes(&mut data);
        black_box(&data);
    });

    let summary = state.summary(size as u64);

    print!("{state}");
    println!("{summary}");
    println!("Cycles per byte: {:.3}", summary.cycles_per_byte());

    ExitCode::SUCCESS
}
