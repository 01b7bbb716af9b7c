use crate::{Profiler, RegionId};

/// An active profiler region, exited when the guard is dropped.
///
/// Returned by [`Profiler::enter()`]. The time between creation and drop is attributed to the
/// region. Because exiting happens on drop, the region is exited on every path out of the scope,
/// including early returns and `?` error propagation.
///
/// Guards must be dropped in the reverse order of creation. Dropping an outer guard while an
/// inner one is still alive panics.
///
/// # Examples
///
/// ```
/// use cycle_harness::Profiler;
///
/// let profiler = Profiler::new();
/// let checksum = profiler.region("checksum");
///
/// let data = vec![7_u8; 1024];
///
/// let guard = profiler.enter(checksum);
/// let sum: u64 = data.iter().map(|b| u64::from(*b)).sum();
/// guard.record_bytes(data.len() as u64);
/// guard.exit();
///
/// assert_eq!(sum, 7 * 1024);
/// ```
#[derive(Debug)]
#[must_use = "the region is exited when the guard is dropped"]
pub struct RegionGuard<'p> {
    profiler: &'p Profiler,
    region: RegionId,

    // Position of our frame on the profiler stack, 1-based.
    depth: usize,
}

impl<'p> RegionGuard<'p> {
    pub(crate) fn new(profiler: &'p Profiler, region: RegionId, depth: usize) -> Self {
        Self {
            profiler,
            region,
            depth,
        }
    }

    /// The region this guard keeps active.
    #[must_use]
    pub fn region(&self) -> RegionId {
        self.region
    }

    /// Attributes `bytes` of processed data to this guard's region.
    pub fn record_bytes(&self, bytes: u64) {
        self.profiler.record_bytes_for(self.region, bytes);
    }

    /// Exits the region now. Equivalent to dropping the guard.
    pub fn exit(self) {
        drop(self);
    }
}

impl Drop for RegionGuard<'_> {
    fn drop(&mut self) {
        self.profiler.exit(self.region, self.depth);
    }
}
