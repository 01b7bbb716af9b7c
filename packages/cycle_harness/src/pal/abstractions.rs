use std::fmt::Debug;

/// A reading of the monotonic high-resolution wall clock of the operating system.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct WallClock {
    pub(crate) ticks: u64,
    pub(crate) ticks_per_second: u64,
}

/// Provides the raw counters that all harness measurements are built from.
///
/// All access to hardware and operating system counters must go through this trait,
/// enabling it to be replaced by a fake or a mock in tests.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Reads the hardware cycle counter.
    ///
    /// The value increases monotonically and is assumed to be synchronized across processors
    /// for the lifetime of the process. Its frequency is not known up front.
    fn cycle_counter(&self) -> u64;

    /// Reads the monotonic wall clock together with its frequency.
    fn wall_clock(&self) -> WallClock;

    /// Returns the cumulative number of page faults incurred by the current process.
    ///
    /// Returns zero on platforms where this information is not available.
    fn page_fault_count(&self) -> u64;
}
