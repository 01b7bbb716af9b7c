#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Finds the cache sizes of the machine by reading the same amount of data through ever
//! smaller windows of memory and printing the bandwidth of each window size as CSV.
//!
//! Bandwidth steps up each time the window starts fitting into a faster cache level.
//!
//! This module is excluded from mutation testing because it only wires arguments to library
//! functions and prints their results.

use std::hint::black_box;
use std::iter;
use std::process::ExitCode;
use std::time::Duration;

use argh::FromArgs;
use benchmarks::{CACHE_LINE_SIZE, init_logging, read_window};
use cycle_harness::RepetitionTester;

/// Prints read bandwidth for window sizes from the whole buffer down to one cache line.
#[derive(FromArgs)]
struct Args {
    /// size of the buffer in MiB, a power of two (default 1024)
    #[argh(option, default = "1024")]
    size_mib: usize,

    /// smallest window to measure, in bytes (default 64)
    #[argh(option, default = "CACHE_LINE_SIZE")]
    min_window: usize,

    /// seconds without a new best time before a measurement stops (default 3)
    #[argh(option, default = "3")]
    idle_seconds: u64,
}

#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    init_logging();

    let args: Args = argh::from_env();

    let size = match args.size_mib.checked_mul(1024 * 1024) {
        Some(size) if size.is_power_of_two() => size,
        _ => {
            eprintln!(
                "Error: buffer size must be a power of two that fits in memory, got {} MiB",
                args.size_mib
            );
            return ExitCode::FAILURE;
        }
    };

    let min_window = args.min_window.max(CACHE_LINE_SIZE);

    let tester = RepetitionTester::builder()
        .max_idle_time(Duration::from_secs(args.idle_seconds))
        .track_page_faults(false)
        .build();

    println!("Cycle counter: {}", tester.clock().calibrate());

    // Filling the buffer also makes sure every page is backed before measuring.
    let words = size
        .checked_div(size_of::<u64>())
        .expect("divisor is a non-zero constant");
    let data: Vec<u64> = (0_u64..).take(words).collect();

    println!("use_length,bandwidth");

    let windows = iter::successors(Some(size), |window| window.checked_div(2))
        .take_while(|window| *window >= min_window);

    for window in windows {
        let state = tester.run_until_converged(|| {
            black_box(read_window(&data, window));
        });

        println!("{window},{:.2}", state.summary(size as u64).gib_per_second());
    }

    ExitCode::SUCCESS
}
