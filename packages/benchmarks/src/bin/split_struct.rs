#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Measures how fast an array of three-field structs can be split into three separate arrays.
//!
//! This module is excluded from mutation testing because it only wires arguments to library
//! functions and prints their results.

use std::hint::black_box;
use std::process::ExitCode;
use std::time::Duration;

use argh::FromArgs;
use benchmarks::{Triple, init_logging, split_fields};
use cycle_harness::RepetitionTester;

/// Measures splitting an array of structs into a struct of arrays.
#[derive(FromArgs)]
struct Args {
    /// number of structs to split (default 10000)
    #[argh(option, default = "10_000")]
    count: i32,

    /// seconds without a new best time before a measurement stops (default 3)
    #[argh(option, default = "3")]
    idle_seconds: u64,
}

#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    init_logging();

    let args: Args = argh::from_env();

    let Ok(count) = usize::try_from(args.count) else {
        eprintln!("Error: count must not be negative, got {}", args.count);
        return ExitCode::FAILURE;
    };

    let source: Vec<Triple> = (0..args.count)
        .map(|i| Triple {
            a: i,
            b: i.wrapping_neg(),
            c: i.wrapping_mul(3),
        })
        .collect();

    let mut a = vec![0; count];
    let mut b = vec![0; count];
    let mut c = vec![0; count];

    let tester = RepetitionTester::builder()
        .max_idle_time(Duration::from_secs(args.idle_seconds))
        .build();

    let state = tester.run_until_converged(|| {
        split_fields(&source, &mut a, &mut b, &mut c);
        black_box((&a, &b, &c));
    });

    let summary = state.summary(size_of_val(source.as_slice()) as u64);

    print!("{state}");
    println!("{summary}");
    println!("Bytes per cycle: {:.1}", summary.bytes_per_cycle());

    ExitCode::SUCCESS
}
