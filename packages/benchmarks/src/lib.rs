#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Measurement programs built on `cycle_harness`, and the workloads they measure.
//!
//! Each binary in this package answers one question about the machine it runs on:
//!
//! - `write_bytes` - how fast can a single thread write to memory?
//! - `read_file` - how fast is reading a file, with and without reusing the buffer?
//! - `cache_sizes` - how does read bandwidth change as the working set grows?
//! - `split_struct` - how fast is turning an array of structs into a struct of arrays?
//! - `page_faults` - how many page faults does touching fresh memory cause?
//! - `rw_ports` - how many loads and stores can the processor issue per cycle?
//! - `haversine` - where does the time go when parsing JSON and computing distances?
//!
//! Set `RUST_LOG=debug` to see calibration and repetition details.

mod error;
mod fresh_pages;
mod haversine;
mod json;
mod logging;
mod workloads;

pub use error::*;
pub use fresh_pages::FreshPages;
pub use haversine::*;
pub use json::{Json, MAX_NESTING_DEPTH};
pub use logging::init_logging;
pub use workloads::*;
