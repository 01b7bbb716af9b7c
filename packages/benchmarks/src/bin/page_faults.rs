#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Shows how the operating system handles page faults by touching a growing number of pages
//! of freshly mapped memory and printing how many faults each round caused.
//!
//! Every round maps its own pages from the operating system instead of allocating, since the
//! allocator would hand back pages that an earlier round already faulted in.
//!
//! More faults than touched pages means the operating system maps extra pages up front, fewer
//! means it maps ahead of the access pattern. Touching in reverse order shows whether that
//! mapping ahead only works for forward access.
//!
//! This module is excluded from mutation testing because it only wires arguments to library
//! functions and prints their results.

use std::hint::black_box;
use std::process::ExitCode;

use argh::FromArgs;
use benchmarks::{FreshPages, PAGE_SIZE, init_logging, touch_pages};
use cycle_harness::Clock;

/// Prints page faults caused by touching 0 to N-1 fresh pages.
#[derive(FromArgs)]
struct Args {
    /// number of pages to allocate per round (default 128)
    #[argh(option, default = "128")]
    pages: usize,

    /// touch pages starting from the end of the allocation
    #[argh(switch)]
    reverse: bool,
}

#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    init_logging();

    let args: Args = argh::from_env();

    let Some(size) = args.pages.checked_mul(PAGE_SIZE) else {
        eprintln!("Error: {} pages is too many", args.pages);
        return ExitCode::FAILURE;
    };

    let clock = Clock::new();

    println!("touched, faults, extra_faults");

    for touched in 0..args.pages {
        let mut memory = match FreshPages::map(size) {
            Ok(memory) => memory,
            Err(e) => {
                eprintln!("Error: cannot map {size} bytes of memory: {e}");
                return ExitCode::FAILURE;
            }
        };

        let before = clock.page_faults();
        touch_pages(memory.as_mut_slice(), touched, args.reverse);
        let faults = clock.page_faults().saturating_sub(before);

        let extra = i128::from(faults)
            .checked_sub(i128::try_from(touched).expect("page counts fit in i128"))
            .expect("difference of two u64-range values fits in i128");

        println!("{touched}, {faults}, {extra}");

        black_box(memory.as_slice());
    }

    ExitCode::SUCCESS
}
