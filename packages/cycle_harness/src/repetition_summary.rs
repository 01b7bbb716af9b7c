use std::fmt;

use crate::Calibration;

/// The best time of a repetition session expressed as time and throughput.
///
/// Obtained from [`RepetitionState::summary()`][crate::RepetitionState::summary], which takes the
/// number of bytes a single trial processes.
///
/// # Examples
///
/// ```
/// use std::hint::black_box;
/// use std::time::Duration;
///
/// use cycle_harness::RepetitionTester;
///
/// let mut buffer = vec![0_u8; 64 * 1024];
///
/// let tester = RepetitionTester::builder()
///     .max_idle_time(Duration::from_millis(20))
///     .build();
///
/// let state = tester.run_until_converged(|| {
///     buffer.fill(1);
///     black_box(&buffer);
/// });
///
/// let summary = state.summary(buffer.len() as u64);
/// println!("{summary}");
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RepetitionSummary {
    best_cycles: u64,
    data_length: u64,
    best_microseconds: f64,
    gib_per_second: f64,
}

impl RepetitionSummary {
    pub(crate) fn new(best_cycles: u64, data_length: u64, calibration: Calibration) -> Self {
        Self {
            best_cycles,
            data_length,
            best_microseconds: calibration.cycles_to_microseconds(best_cycles),
            gib_per_second: calibration.gib_per_second(data_length, best_cycles),
        }
    }

    /// The best trial time in cycles.
    #[must_use]
    pub fn best_cycles(&self) -> u64 {
        self.best_cycles
    }

    /// The best trial time in microseconds.
    #[must_use]
    pub fn best_microseconds(&self) -> f64 {
        self.best_microseconds
    }

    /// Bytes processed by a single trial.
    #[must_use]
    pub fn data_length(&self) -> u64 {
        self.data_length
    }

    /// Throughput of the best trial.
    #[must_use]
    pub fn gib_per_second(&self) -> f64 {
        self.gib_per_second
    }

    /// Cycles spent per byte in the best trial.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "ratios are reported with three decimals, precision loss is irrelevant"
    )]
    pub fn cycles_per_byte(&self) -> f64 {
        self.best_cycles as f64 / self.data_length as f64
    }

    /// Bytes processed per cycle in the best trial.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "ratios are reported with three decimals, precision loss is irrelevant"
    )]
    pub fn bytes_per_cycle(&self) -> f64 {
        self.data_length as f64 / self.best_cycles as f64
    }

    /// Prints the summary to stdout.
    #[cfg_attr(test, mutants::skip)] // Too difficult to test stdout output reliably - manually tested.
    pub fn print_to_stdout(&self) {
        println!("{self}");
    }
}

impl fmt::Display for RepetitionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Best time: {} cycles / {:.0} us, Bandwidth: {:.2} GiB/s",
            self.best_cycles,
            self.best_microseconds.trunc(),
            self.gib_per_second
        )
    }
}
