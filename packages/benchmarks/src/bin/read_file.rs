#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Measures how fast a file can be read into memory, with the destination buffer either reused
//! between reads or freshly mapped from the operating system before each read.
//!
//! Mapping happens outside the timed part of each trial, so the difference between the two
//! modes is the cost of faulting in fresh pages during the read.
//!
//! This module is excluded from mutation testing because it only wires arguments to library
//! functions and prints their results.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use argh::FromArgs;
use benchmarks::{FreshPages, init_logging, read_whole_file};
use cycle_harness::RepetitionTester;

/// Measures file read bandwidth with reused and freshly mapped buffers.
#[derive(FromArgs)]
struct Args {
    /// file to read
    #[argh(positional)]
    path: PathBuf,

    /// number of measurements, alternating between reused and fresh buffers (default 2)
    #[argh(option, default = "2")]
    rounds: usize,

    /// seconds without a new best time before a measurement stops (default 3)
    #[argh(option, default = "3")]
    idle_seconds: u64,
}

#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    init_logging();

    let args: Args = argh::from_env();

    let mut file = match File::open(&args.path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error: cannot open '{}': {e}", args.path.display());
            return ExitCode::FAILURE;
        }
    };

    let file_size = match file.metadata() {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            eprintln!("Error: cannot inspect '{}': {e}", args.path.display());
            return ExitCode::FAILURE;
        }
    };

    let Ok(length) = usize::try_from(file_size) else {
        eprintln!("Error: '{}' does not fit in memory", args.path.display());
        return ExitCode::FAILURE;
    };

    let tester = RepetitionTester::builder()
        .max_idle_time(Duration::from_secs(args.idle_seconds))
        .build();

    let mut reuse_buffer = true;

    for _ in 0..args.rounds {
        println!(
            "Testing with {} buffer",
            if reuse_buffer { "reused" } else { "fresh" }
        );

        let mut session = tester.start_session();
        let Some(mut buffer) = map_buffer(length) else {
            return ExitCode::FAILURE;
        };

        while session.should_continue() {
            if !reuse_buffer {
                // Unmap the old buffer first so that only one of them is mapped at a time.
                drop(buffer);

                let Some(fresh) = map_buffer(length) else {
                    return ExitCode::FAILURE;
                };

                buffer = fresh;
            }

            if let Err(e) =
                session.measure(|| read_whole_file(&mut file, buffer.as_mut_slice()))
            {
                eprintln!("Error: cannot read '{}': {e}", args.path.display());
                return ExitCode::FAILURE;
            }
        }

        let state = session.finish();

        print!("{state}");
        println!("{}", state.summary(file_size));
        println!();

        reuse_buffer = !reuse_buffer;
    }

    ExitCode::SUCCESS
}

#[cfg_attr(test, mutants::skip)]
fn map_buffer(length: usize) -> Option<FreshPages> {
    FreshPages::map(length)
        .inspect_err(|e| eprintln!("Error: cannot map {length} bytes of memory: {e}"))
        .ok()
}
