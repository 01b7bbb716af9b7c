#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Generates random coordinate pairs as JSON and computes their mean haversine distance,
//! printing a profile of where the time went.
//!
//! This module is excluded from mutation testing because it only wires arguments to library
//! functions and prints their results.

use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use benchmarks::{HaversineError, generate_files, init_logging, sum_file};
use cycle_harness::Profiler;

/// Generates and sums haversine distance inputs.
#[derive(FromArgs)]
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Generate(GenerateArgs),
    Sum(SumArgs),
}

/// Writes random coordinate pairs and their expected distances.
#[derive(FromArgs)]
#[argh(subcommand, name = "generate")]
struct GenerateArgs {
    /// number of pairs to generate (default 10)
    #[argh(option, default = "10")]
    count: usize,

    /// seed for the random number generator (default 0)
    #[argh(option, default = "0")]
    seed: u64,

    /// path of the point file to write (default points.json)
    #[argh(option, default = "PathBuf::from(\"points.json\")")]
    points: PathBuf,

    /// path of the answer file to write (default haversine.f64)
    #[argh(option, default = "PathBuf::from(\"haversine.f64\")")]
    answers: PathBuf,
}

/// Computes the mean distance of a point file and prints a profile.
#[derive(FromArgs)]
#[argh(subcommand, name = "sum")]
struct SumArgs {
    /// path of the point file to read (default points.json)
    #[argh(option, default = "PathBuf::from(\"points.json\")")]
    points: PathBuf,

    /// path of an answer file to check the distances against
    #[argh(option)]
    answers: Option<PathBuf>,
}

#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    init_logging();

    let args: Args = argh::from_env();

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), HaversineError> {
    match command {
        Command::Generate(args) => {
            let average = generate_files(&args.points, &args.answers, args.count, args.seed)?;

            println!("Pairs: {}", args.count);
            println!("Average: {average}");
        }
        Command::Sum(args) => {
            let profiler = Profiler::new();

            let outcome = sum_file(&args.points, args.answers.as_deref(), &profiler)?;

            println!("Pairs: {}", outcome.pair_count);
            println!("Average: {}", outcome.average);

            if let Some(reference) = outcome.reference_average {
                println!("Reference average: {reference}");
                println!("Difference: {}", outcome.average - reference);
            }

            if let Some(deviation) = outcome.max_deviation {
                println!("Largest pair deviation: {deviation}");
            }

            println!();
            profiler.report().print_to_stdout();
        }
    }

    Ok(())
}
