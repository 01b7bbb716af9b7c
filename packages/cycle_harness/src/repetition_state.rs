use std::fmt;
use std::time::Duration;

use crate::{Calibration, RepetitionSummary, Trial};

/// Number of trials at the start of a session whose individual results are kept.
pub const RECORDED_TRIAL_CAPACITY: usize = 4;

/// The outcome of a repetition session: the best time seen and a short record of the first trials.
///
/// Returned by [`RepetitionSession::finish()`][crate::RepetitionSession::finish] and
/// [`RepetitionTester::run_until_converged()`][crate::RepetitionTester::run_until_converged].
///
/// The first [`RECORDED_TRIAL_CAPACITY`] trials are kept individually because they are the ones
/// that show cold-start effects such as page faults on freshly allocated memory.
#[derive(Clone, Debug)]
pub struct RepetitionState {
    calibration: Calibration,

    // u64::MAX until the first trial completes.
    best_cycles: u64,

    // Cycle counter value at the end of the trial that set the best time, or at session start.
    best_timestamp: u64,

    trial_count: u64,
    recorded_trials: heapless::Vec<Trial, RECORDED_TRIAL_CAPACITY>,
}

impl RepetitionState {
    pub(crate) fn new(calibration: Calibration, started_at: u64) -> Self {
        Self {
            calibration,
            best_cycles: u64::MAX,
            best_timestamp: started_at,
            trial_count: 0,
            recorded_trials: heapless::Vec::new(),
        }
    }

    /// Whether the next trial is one that gets recorded individually.
    pub(crate) fn records_next_trial(&self) -> bool {
        !self.recorded_trials.is_full()
    }

    /// Folds a completed trial into the state. Returns whether it set a new best time.
    pub(crate) fn record(&mut self, trial: Trial, ended_at: u64) -> bool {
        let improved = trial.elapsed_cycles() < self.best_cycles;

        if improved {
            self.best_cycles = trial.elapsed_cycles();
            self.best_timestamp = ended_at;
        }

        // Once full, later trials are only counted.
        _ = self.recorded_trials.push(trial);

        self.trial_count = self
            .trial_count
            .checked_add(1)
            .expect("trial count overflows u64 - this indicates an unrealistic scenario");

        improved
    }

    pub(crate) fn best_timestamp(&self) -> u64 {
        self.best_timestamp
    }

    /// The smallest number of cycles any trial took, or `u64::MAX` if no trial has completed.
    #[must_use]
    pub fn best_cycles(&self) -> u64 {
        self.best_cycles
    }

    /// The best time as a [`Duration`], or `None` if no trial has completed.
    #[must_use]
    pub fn best_duration(&self) -> Option<Duration> {
        (self.trial_count > 0).then(|| self.calibration.cycles_to_duration(self.best_cycles))
    }

    /// How many trials have completed.
    #[must_use]
    pub fn trial_count(&self) -> u64 {
        self.trial_count
    }

    /// The first trials of the session, in execution order.
    pub fn recorded_trials(&self) -> impl Iterator<Item = &Trial> {
        self.recorded_trials.iter()
    }

    /// The calibration used to convert cycles of this session into real time.
    #[must_use]
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Summarizes the best time of the session for a workload that processes `data_length`
    /// bytes per trial.
    ///
    /// # Panics
    ///
    /// Panics if no trial has completed.
    #[must_use]
    pub fn summary(&self, data_length: u64) -> RepetitionSummary {
        assert!(
            self.trial_count > 0,
            "cannot summarize a repetition session in which no trial completed"
        );

        RepetitionSummary::new(self.best_cycles, data_length, self.calibration)
    }
}

/// Lists the recorded trials, one per line.
impl fmt::Display for RepetitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, trial) in self.recorded_trials.iter().enumerate() {
            writeln!(f, "Trial {index}: {trial}")?;
        }

        writeln!(f, "Trials: {}", self.trial_count)
    }
}
