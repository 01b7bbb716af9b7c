use std::fmt::{self, Debug};
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::pal::{FakePlatform, MockPlatform};
use crate::pal::{BuildTargetPlatform, Platform, WallClock};

/// Static instance of the real platform for production use.
static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

/// Dispatches to the real platform or, in test builds, to a fake or a mock.
#[derive(Clone)]
pub(crate) enum PlatformFacade {
    Target(&'static BuildTargetPlatform),

    #[cfg(test)]
    Fake(FakePlatform),

    #[cfg(test)]
    Mock(Arc<MockPlatform>),
}

// Facade types are trivial pass-through layers - not worth testing.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl PlatformFacade {
    pub(crate) const fn target() -> Self {
        Self::Target(&BUILD_TARGET_PLATFORM)
    }
}

// Facade types are trivial pass-through layers - not worth testing.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl Platform for PlatformFacade {
    #[inline]
    fn cycle_counter(&self) -> u64 {
        match self {
            Self::Target(p) => p.cycle_counter(),
            #[cfg(test)]
            Self::Fake(p) => p.cycle_counter(),
            #[cfg(test)]
            Self::Mock(p) => p.cycle_counter(),
        }
    }

    fn wall_clock(&self) -> WallClock {
        match self {
            Self::Target(p) => p.wall_clock(),
            #[cfg(test)]
            Self::Fake(p) => p.wall_clock(),
            #[cfg(test)]
            Self::Mock(p) => p.wall_clock(),
        }
    }

    fn page_fault_count(&self) -> u64 {
        match self {
            Self::Target(p) => p.page_fault_count(),
            #[cfg(test)]
            Self::Fake(p) => p.page_fault_count(),
            #[cfg(test)]
            Self::Mock(p) => p.page_fault_count(),
        }
    }
}

#[cfg(test)]
impl From<FakePlatform> for PlatformFacade {
    fn from(p: FakePlatform) -> Self {
        Self::Fake(p)
    }
}

#[cfg(test)]
impl From<MockPlatform> for PlatformFacade {
    fn from(p: MockPlatform) -> Self {
        Self::Mock(Arc::new(p))
    }
}

// Debug implementations have no API contract to test.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl Debug for PlatformFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target(p) => p.fmt(f),
            #[cfg(test)]
            Self::Fake(p) => p.fmt(f),
            #[cfg(test)]
            Self::Mock(_) => f.debug_struct("PlatformFacade::Mock").finish(),
        }
    }
}
