/// Identifies a named region registered with a [`Profiler`][crate::Profiler].
///
/// Obtained once from [`Profiler::region()`][crate::Profiler::region] and then used for every
/// entry into the region, so the hot path never compares names.
///
/// A region identifier is only meaningful for the profiler that issued it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RegionId {
    index: usize,
}

impl RegionId {
    pub(crate) const fn new(index: usize) -> Self {
        Self { index }
    }

    pub(crate) const fn index(self) -> usize {
        self.index
    }
}
