//! Platform abstraction layer for the three primitives the harness consumes from the operating
//! system and hardware: the cycle counter, the monotonic wall clock and the process page fault
//! counter.
//!
//! The layering is abstraction (trait) → facade (enum) → real implementation, with a fake and a
//! mock available in test builds so that timing logic can be tested against scripted counters.

mod abstractions;
mod facade;
#[cfg(test)]
mod fake;
mod real;

pub(crate) use abstractions::*;
pub(crate) use facade::*;
#[cfg(test)]
pub(crate) use fake::*;
pub(crate) use real::*;
