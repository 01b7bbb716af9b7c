use tracing::{debug, trace};

use crate::{Calibration, Clock, RepetitionState, Trial};

/// One run of a [`RepetitionTester`][crate::RepetitionTester], stepped trial by trial.
///
/// Use this instead of [`RepetitionTester::run_until_converged()`][1] when each trial needs work
/// that must not be timed, such as allocating a fresh buffer or reopening a file:
///
/// ```
/// use std::hint::black_box;
/// use std::time::Duration;
///
/// use cycle_harness::RepetitionTester;
///
/// let tester = RepetitionTester::builder()
///     .max_idle_time(Duration::from_millis(20))
///     .build();
///
/// let mut session = tester.start_session();
///
/// while session.should_continue() {
///     // Untimed setup.
///     let mut buffer = vec![0_u8; 4096];
///
///     session.measure(|| {
///         buffer.fill(0xFF);
///         black_box(&buffer);
///     });
/// }
///
/// let state = session.finish();
/// println!("{}", state.summary(4096));
/// ```
///
/// [1]: crate::RepetitionTester::run_until_converged
#[derive(Debug)]
pub struct RepetitionSession {
    clock: Clock,
    max_idle_cycles: u64,
    track_page_faults: bool,
    state: RepetitionState,
}

impl RepetitionSession {
    pub(crate) fn new(
        clock: Clock,
        calibration: Calibration,
        max_idle_cycles: u64,
        track_page_faults: bool,
    ) -> Self {
        let started_at = clock.now();

        Self {
            clock,
            max_idle_cycles,
            track_page_faults,
            state: RepetitionState::new(calibration, started_at),
        }
    }

    /// Whether another trial should run.
    ///
    /// Returns `false` once the idle time has passed since the last new best time (or since the
    /// session started, if no trial has improved on it yet). The first trial always runs.
    #[must_use]
    pub fn should_continue(&self) -> bool {
        if self.state.trial_count() == 0 {
            return true;
        }

        let idle_cycles = self.clock.now().saturating_sub(self.state.best_timestamp());

        idle_cycles < self.max_idle_cycles
    }

    /// Runs one trial, timing only the call to `f`, and returns its result.
    ///
    /// For the first trials of the session, page faults are counted around the timed part.
    pub fn measure<R>(&mut self, f: impl FnOnce() -> R) -> R {
        let page_faults_before = (self.track_page_faults && self.state.records_next_trial())
            .then(|| self.clock.page_faults());

        let start = self.clock.now();
        let result = f();
        let end = self.clock.now();

        let page_faults = page_faults_before
            .map(|before| self.clock.page_faults().saturating_sub(before));

        let elapsed_cycles = end.saturating_sub(start);

        if self.state.record(Trial::new(elapsed_cycles, page_faults), end) {
            trace!(
                elapsed_cycles,
                trial = self.state.trial_count(),
                "new best repetition time"
            );
        }

        result
    }

    /// Runs `trial` until the session converges and returns the final state.
    pub fn run_until_converged(mut self, mut trial: impl FnMut()) -> RepetitionState {
        while self.should_continue() {
            self.measure(&mut trial);
        }

        self.finish()
    }

    /// The state of the session so far.
    #[must_use]
    pub fn state(&self) -> &RepetitionState {
        &self.state
    }

    /// Ends the session and returns its final state.
    #[must_use]
    pub fn finish(self) -> RepetitionState {
        debug!(
            trial_count = self.state.trial_count(),
            best_cycles = self.state.best_cycles(),
            "repetition session finished"
        );

        self.state
    }
}
