//! Relating the cycle counter to real time.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::pal::Platform;

/// We busy-wait for `1 / CALIBRATION_FRACTION` of a second when measuring the counter frequency.
const CALIBRATION_FRACTION: u64 = 10;

const MICROSECONDS_PER_SECOND: f64 = 1_000_000.0;
const NANOSECONDS_PER_SECOND: u128 = 1_000_000_000;

/// Bandwidth is `bytes / 2^30 / (microseconds / 10^6)`. Both constants are divided by 64 so that
/// the numerator stays small for large byte counts.
const BANDWIDTH_NUMERATOR: f64 = 15_625.0;
const BANDWIDTH_DENOMINATOR: f64 = 16_777_216.0; // 2^24

/// The measured relation between the cycle counter and real time.
///
/// Obtained from [`Clock::calibrate()`][crate::Clock::calibrate], which measures it once and
/// caches the result. Use it to convert cycle counts into microseconds, durations and bandwidth.
///
/// # Examples
///
/// ```
/// use cycle_harness::Calibration;
///
/// // A counter known to tick at 3 GHz.
/// let calibration = Calibration::from_cycles_per_second(3_000_000_000);
///
/// assert_eq!(calibration.cycles_per_second(), 3_000_000_000);
/// assert!((calibration.cycles_to_microseconds(3_000) - 1.0).abs() < 1e-9);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    cycles_per_second: u64,
    microseconds_per_cycle: f64,
}

impl Calibration {
    /// Creates a calibration for a counter whose frequency is already known.
    ///
    /// # Panics
    ///
    /// Panics if `cycles_per_second` is zero.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "counter frequencies are far below the 2^52 limit of exact f64 integers"
    )]
    pub fn from_cycles_per_second(cycles_per_second: u64) -> Self {
        assert!(
            cycles_per_second != 0,
            "cycle counter frequency must be non-zero"
        );

        Self {
            cycles_per_second,
            microseconds_per_cycle: MICROSECONDS_PER_SECOND / cycles_per_second as f64,
        }
    }

    /// Measures the cycle counter frequency against the wall clock of the platform.
    ///
    /// Busy-waits for a tenth of a second. A wall clock without a frequency or a cycle counter
    /// that does not advance leaves the harness unusable, so both are treated as fatal.
    pub(crate) fn measure(platform: &impl Platform) -> Self {
        let start = platform.wall_clock();
        let start_cycles = platform.cycle_counter();

        assert!(
            start.ticks_per_second != 0,
            "the platform wall clock reports a zero frequency - cannot calibrate the cycle counter"
        );

        let wait_ticks = start
            .ticks_per_second
            .checked_div(CALIBRATION_FRACTION)
            .expect("divisor is a non-zero constant");

        loop {
            let now = platform.wall_clock();

            if now.ticks.saturating_sub(start.ticks) > wait_ticks {
                break;
            }
        }

        let cycles = platform.cycle_counter().saturating_sub(start_cycles);

        assert!(
            cycles != 0,
            "the cycle counter did not advance during calibration - no usable counter on this platform"
        );

        let cycles_per_second = cycles
            .checked_mul(CALIBRATION_FRACTION)
            .expect("counter frequency beyond 1.8 exahertz - impossible");

        debug!(
            cycles_per_second,
            measured_cycles = cycles,
            "calibrated cycle counter against wall clock"
        );

        Self::from_cycles_per_second(cycles_per_second)
    }

    /// How many times the cycle counter ticks per second.
    #[must_use]
    pub fn cycles_per_second(&self) -> u64 {
        self.cycles_per_second
    }

    /// How many microseconds a single tick of the cycle counter represents.
    #[must_use]
    pub fn microseconds_per_cycle(&self) -> f64 {
        self.microseconds_per_cycle
    }

    /// Converts a cycle count into microseconds.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "sub-cycle precision is irrelevant for reporting"
    )]
    pub fn cycles_to_microseconds(&self, cycles: u64) -> f64 {
        cycles as f64 * self.microseconds_per_cycle
    }

    /// Converts a cycle count into a [`Duration`].
    #[must_use]
    pub fn cycles_to_duration(&self, cycles: u64) -> Duration {
        let nanos = u128::from(cycles)
            .saturating_mul(NANOSECONDS_PER_SECOND)
            .checked_div(u128::from(self.cycles_per_second))
            .expect("frequency is non-zero by construction");

        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Converts a [`Duration`] into the number of cycles that elapse during it.
    ///
    /// Saturates at `u64::MAX` for durations too long to express in cycles.
    #[must_use]
    pub fn duration_to_cycles(&self, duration: Duration) -> u64 {
        let cycles = duration
            .as_nanos()
            .saturating_mul(u128::from(self.cycles_per_second))
            .checked_div(NANOSECONDS_PER_SECOND)
            .expect("divisor is a non-zero constant");

        u64::try_from(cycles).unwrap_or(u64::MAX)
    }

    /// Converts microseconds into the number of cycles that elapse during them.
    #[must_use]
    pub fn microseconds_to_cycles(&self, microseconds: u64) -> u64 {
        self.duration_to_cycles(Duration::from_micros(microseconds))
    }

    /// Calculates bandwidth in GiB per second for `bytes` processed in `cycles`.
    ///
    /// Returns infinity for zero cycles, matching plain floating point division.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "bandwidth is reported with two decimals, precision loss is irrelevant"
    )]
    pub fn gib_per_second(&self, bytes: u64, cycles: u64) -> f64 {
        bytes as f64 * BANDWIDTH_NUMERATOR
            / (BANDWIDTH_DENOMINATOR * self.microseconds_per_cycle * cycles as f64)
    }
}

impl fmt::Display for Calibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cycles per second", self.cycles_per_second)
    }
}
