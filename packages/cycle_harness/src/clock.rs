use std::sync::{Arc, OnceLock};

use crate::Calibration;
use crate::pal::{Platform, PlatformFacade};

/// The calibration of the real cycle counter, measured at most once per process.
static PROCESS_CALIBRATION: OnceLock<Calibration> = OnceLock::new();

/// Reads the hardware cycle counter and converts cycle counts into real time.
///
/// Reading the clock is a single counter read with no operating system call, which makes it
/// suitable for instrumenting code that runs millions of times. Converting cycles into real
/// time requires a [`Calibration`], which is measured lazily on first use by busy-waiting for a
/// tenth of a second. All clocks over the real hardware share one process-wide calibration.
///
/// Cloning a clock is cheap; clones share the calibration cache.
///
/// # Examples
///
/// ```
/// use cycle_harness::Clock;
///
/// let clock = Clock::new();
///
/// let start = clock.now();
/// let sum: u64 = (0..10_000_u64).sum();
/// let elapsed = clock.now() - start;
///
/// let calibration = clock.calibrate();
/// println!(
///     "sum {sum} took {elapsed} cycles ({:.1} us)",
///     calibration.cycles_to_microseconds(elapsed)
/// );
/// ```
#[derive(Clone, Debug)]
pub struct Clock {
    platform: PlatformFacade,
    calibration: CalibrationCache,
}

#[derive(Clone, Debug)]
enum CalibrationCache {
    Process,

    #[cfg_attr(
        not(test),
        expect(dead_code, reason = "only clocks over fake platforms own a cache")
    )]
    Owned(Arc<OnceLock<Calibration>>),
}

impl Clock {
    /// Creates a clock over the real hardware cycle counter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            platform: PlatformFacade::target(),
            calibration: CalibrationCache::Process,
        }
    }

    /// Creates a clock over a test platform, with its own calibration cache.
    #[cfg(test)]
    pub(crate) fn with_platform(platform: impl Into<PlatformFacade>) -> Self {
        Self {
            platform: platform.into(),
            calibration: CalibrationCache::Owned(Arc::new(OnceLock::new())),
        }
    }

    /// Creates a clock over a test platform whose calibration is already known.
    #[cfg(test)]
    pub(crate) fn with_calibration(
        platform: impl Into<PlatformFacade>,
        calibration: Calibration,
    ) -> Self {
        Self {
            platform: platform.into(),
            calibration: CalibrationCache::Owned(Arc::new(OnceLock::from(calibration))),
        }
    }

    /// Reads the current value of the cycle counter.
    #[inline]
    #[must_use]
    pub fn now(&self) -> u64 {
        self.platform.cycle_counter()
    }

    /// Returns the cumulative number of page faults incurred by the current process.
    ///
    /// Returns zero on platforms that do not expose this information.
    #[must_use]
    pub fn page_faults(&self) -> u64 {
        self.platform.page_fault_count()
    }

    /// Returns the calibration of the cycle counter, measuring it on first use.
    ///
    /// The first call busy-waits for a tenth of a second; every later call returns the cached
    /// value without touching the platform.
    ///
    /// # Panics
    ///
    /// Panics if the platform has no usable monotonic wall clock or cycle counter.
    #[must_use]
    pub fn calibrate(&self) -> Calibration {
        *self
            .cache()
            .get_or_init(|| Calibration::measure(&self.platform))
    }

    /// Whether [`calibrate()`](Self::calibrate) has already measured the counter.
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.cache().get().is_some()
    }

    fn cache(&self) -> &OnceLock<Calibration> {
        match &self.calibration {
            CalibrationCache::Process => &PROCESS_CALIBRATION,
            CalibrationCache::Owned(cell) => cell,
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
