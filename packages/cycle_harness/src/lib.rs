#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Cycle-counter instrumentation for performance experiments.
//!
//! This package measures code with the processor's cycle counter instead of operating system
//! timer calls, so that even regions entered millions of times can be measured without the
//! measurement dominating the result. It provides two independent tools on top of a shared
//! [`Clock`]:
//!
//! - [`Profiler`] attributes elapsed cycles to nested named regions, splitting each region's time
//!   into an inclusive part (time on the stack) and an exclusive part (time not spent in nested
//!   regions), and renders the result as a [`ProfileReport`].
//! - [`RepetitionTester`] runs a workload over and over, keeping the fastest trial, until the
//!   best time stops improving. The result is a [`RepetitionState`], which can be summarized as
//!   time, bandwidth and cycles per byte.
//!
//! Cycle counts are converted into real time through a [`Calibration`], measured once per
//! process by busy-waiting against the monotonic wall clock for a tenth of a second.
//!
//! This package is not meant for use in production, serving only as a development tool.
//!
//! # Profiling nested regions
//!
//! ```
//! use cycle_harness::Profiler;
//!
//! let profiler = Profiler::new();
//!
//! // Register regions once, then enter them by identifier on the hot path.
//! let total = profiler.region("total");
//! let square = profiler.region("square");
//!
//! let values: Vec<u64> = (0..1_000).collect();
//!
//! {
//!     let _total = profiler.enter(total);
//!
//!     let mut sum = 0_u64;
//!     for value in &values {
//!         let _square = profiler.enter(square);
//!         sum = sum.wrapping_add(value * value);
//!     }
//!
//!     std::hint::black_box(sum);
//! }
//!
//! let report = profiler.report();
//! assert_eq!(report.region("square").unwrap().entrance_count(), 1_000);
//!
//! report.print_to_stdout();
//! ```
//!
//! # Repetition testing
//!
//! ```
//! use std::hint::black_box;
//! use std::time::Duration;
//!
//! use cycle_harness::RepetitionTester;
//!
//! let mut buffer = vec![0_u8; 1024 * 1024];
//!
//! let tester = RepetitionTester::builder()
//!     .max_idle_time(Duration::from_millis(100))
//!     .build();
//!
//! let state = tester.run_until_converged(|| {
//!     for (index, byte) in buffer.iter_mut().enumerate() {
//!         *byte = index as u8;
//!     }
//!     black_box(&buffer);
//! });
//!
//! let summary = state.summary(buffer.len() as u64);
//! println!("{summary}");
//! println!("Cycles per byte: {:.3}", summary.cycles_per_byte());
//! ```
//!
//! # Threading
//!
//! A [`Profiler`] is single-threaded: it cannot be sent to or shared with other threads. Create
//! one profiler per thread if several threads need instrumentation. [`Clock`] and
//! [`RepetitionTester`] are thread-safe and share the process-wide calibration.

mod calibration;
mod clock;
mod pal;
mod profile_report;
mod profiler;
mod region_guard;
mod region_id;
mod region_summary;
mod repetition_session;
mod repetition_state;
mod repetition_summary;
mod repetition_tester;
mod repetition_tester_builder;
mod trial;

pub use calibration::Calibration;
pub use clock::Clock;
pub use profile_report::ProfileReport;
pub use profiler::{FRAME_CAPACITY, Profiler, REGION_CAPACITY};
pub use region_guard::RegionGuard;
pub use region_id::RegionId;
pub use region_summary::RegionSummary;
pub use repetition_session::RepetitionSession;
pub use repetition_state::{RECORDED_TRIAL_CAPACITY, RepetitionState};
pub use repetition_summary::RepetitionSummary;
pub use repetition_tester::RepetitionTester;
pub use repetition_tester_builder::{DEFAULT_MAX_IDLE_TIME, RepetitionTesterBuilder};
pub use trial::Trial;
