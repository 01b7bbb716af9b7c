use std::time::Duration;

use crate::{Clock, RepetitionTester};

/// How long a session keeps running trials after the last new best time, unless configured.
pub const DEFAULT_MAX_IDLE_TIME: Duration = Duration::from_secs(3);

/// Builder for creating an instance of [`RepetitionTester`].
///
/// All settings are optional.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use cycle_harness::RepetitionTester;
///
/// let tester = RepetitionTester::builder()
///     .max_idle_time(Duration::from_millis(500))
///     .track_page_faults(false)
///     .build();
///
/// assert_eq!(tester.max_idle_time(), Duration::from_millis(500));
/// ```
#[derive(Debug)]
#[must_use]
pub struct RepetitionTesterBuilder {
    clock: Option<Clock>,
    max_idle_time: Duration,
    track_page_faults: bool,
}

impl RepetitionTesterBuilder {
    pub(crate) fn new() -> Self {
        Self {
            clock: None,
            max_idle_time: DEFAULT_MAX_IDLE_TIME,
            track_page_faults: true,
        }
    }

    /// Sets how long a session keeps running trials without finding a new best time before it
    /// is considered converged.
    ///
    /// Defaults to [`DEFAULT_MAX_IDLE_TIME`].
    pub fn max_idle_time(mut self, max_idle_time: Duration) -> Self {
        self.max_idle_time = max_idle_time;
        self
    }

    /// Sets whether the first trials of each session also count page faults.
    ///
    /// Enabled by default. Reading the page fault counter is a system call, made outside the
    /// timed part of the trial.
    pub fn track_page_faults(mut self, track_page_faults: bool) -> Self {
        self.track_page_faults = track_page_faults;
        self
    }

    /// Sets the clock to time trials with. Defaults to [`Clock::new()`].
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the repetition tester with the specified configuration.
    #[must_use]
    pub fn build(self) -> RepetitionTester {
        RepetitionTester::new_inner(
            self.clock.unwrap_or_default(),
            self.max_idle_time,
            self.track_page_faults,
        )
    }
}
