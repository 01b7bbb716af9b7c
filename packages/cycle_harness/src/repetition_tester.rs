use std::time::Duration;

use tracing::debug;

use crate::{Clock, RepetitionSession, RepetitionState, RepetitionTesterBuilder};

/// Finds the fastest execution of a workload by running it until the best time stops improving.
///
/// Timing on real hardware is noisy: scheduling, cold caches, page faults and frequency changes
/// all add time to a run, but nothing ever makes a run faster than the hardware allows. The
/// minimum over many trials is therefore the best estimate of what the workload costs when
/// everything goes right.
///
/// Rather than running a fixed number of trials, a session keeps running trials for as long as
/// new best times keep appearing, and stops once no improvement has appeared for the configured
/// idle time (3 seconds by default). This adapts to fast and slow workloads alike.
///
/// The tester itself only holds configuration. Each measurement runs in a
/// [`RepetitionSession`], either all at once via [`run_until_converged()`][1] or stepped
/// manually via [`start_session()`][2] for workloads that need untimed setup between trials.
///
/// # Examples
///
/// ```
/// use std::hint::black_box;
/// use std::time::Duration;
///
/// use cycle_harness::RepetitionTester;
///
/// let data: Vec<u64> = (0..10_000).collect();
///
/// let tester = RepetitionTester::builder()
///     .max_idle_time(Duration::from_millis(50))
///     .build();
///
/// let state = tester.run_until_converged(|| {
///     black_box(data.iter().sum::<u64>());
/// });
///
/// assert!(state.trial_count() > 0);
/// println!("{}", state.summary((data.len() * size_of::<u64>()) as u64));
/// ```
///
/// [1]: Self::run_until_converged
/// [2]: Self::start_session
#[derive(Clone, Debug)]
pub struct RepetitionTester {
    clock: Clock,
    max_idle_time: Duration,
    track_page_faults: bool,
}

impl RepetitionTester {
    /// Creates a tester with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder to configure a tester.
    pub fn builder() -> RepetitionTesterBuilder {
        RepetitionTesterBuilder::new()
    }

    pub(crate) fn new_inner(clock: Clock, max_idle_time: Duration, track_page_faults: bool) -> Self {
        Self {
            clock,
            max_idle_time,
            track_page_faults,
        }
    }

    /// How long a session runs without a new best time before it is considered converged.
    #[must_use]
    pub fn max_idle_time(&self) -> Duration {
        self.max_idle_time
    }

    /// Whether sessions count page faults for their first trials.
    #[must_use]
    pub fn tracks_page_faults(&self) -> bool {
        self.track_page_faults
    }

    /// The clock that times the trials.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Starts a new session with a fresh state.
    ///
    /// Calibrates the clock if that has not happened yet, so the calibration busy-wait never
    /// falls inside a session.
    pub fn start_session(&self) -> RepetitionSession {
        let calibration = self.clock.calibrate();
        let max_idle_cycles = calibration.duration_to_cycles(self.max_idle_time);

        debug!(
            max_idle_cycles,
            track_page_faults = self.track_page_faults,
            "starting repetition session"
        );

        RepetitionSession::new(
            self.clock.clone(),
            calibration,
            max_idle_cycles,
            self.track_page_faults,
        )
    }

    /// Runs `trial` in a new session until no new best time has appeared for the idle time.
    ///
    /// The whole call to `trial` is timed. Use [`start_session()`](Self::start_session) if each
    /// trial needs setup that should not be timed.
    pub fn run_until_converged(&self, trial: impl FnMut()) -> RepetitionState {
        self.start_session().run_until_converged(trial)
    }
}

impl Default for RepetitionTester {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::Calibration;
    use crate::pal::FakePlatform;

    assert_impl_all!(RepetitionTester: Send, Sync, Clone);

    fn fake_tester(platform: &FakePlatform, max_idle_time: Duration) -> RepetitionTester {
        RepetitionTester::builder()
            .clock(Clock::with_calibration(
                platform.clone(),
                Calibration::from_cycles_per_second(1_000_000),
            ))
            .max_idle_time(max_idle_time)
            .build()
    }

    #[test]
    fn converges_shortly_after_last_improvement() {
        let platform = FakePlatform::new();
        let tester = fake_tester(&platform, Duration::from_millis(2));

        // Strictly decreasing for five trials, then constant.
        let times = [1_000, 900, 800, 700, 600];
        let mut next = 0_usize;

        let state = tester.run_until_converged(|| {
            let time = times.get(next).copied().unwrap_or(600);
            next += 1;
            platform.advance_cycles(time);
        });

        // The fifth trial ends at cycle 4000, after which each trial adds 600 cycles and the
        // session stops once 2000 idle cycles have passed.
        assert_eq!(state.best_cycles(), 600);
        assert_eq!(state.trial_count(), 9);
        assert_eq!(state.best_duration(), Some(Duration::from_micros(600)));
    }

    #[test]
    fn zero_idle_time_runs_single_trial() {
        let platform = FakePlatform::new();
        let tester = fake_tester(&platform, Duration::ZERO);

        let mut calls = 0;
        let state = tester.run_until_converged(|| {
            calls += 1;
            platform.advance_cycles(10);
        });

        assert_eq!(calls, 1);
        assert_eq!(state.trial_count(), 1);
        assert_eq!(state.best_cycles(), 10);
    }

    #[test]
    fn start_session_calibrates_clock() {
        let platform = FakePlatform::new();
        platform.set_wall_ticks_per_read(10_000);
        platform.set_cycles_per_read(1_000);

        let clock = Clock::with_platform(platform);
        let tester = RepetitionTester::builder().clock(clock.clone()).build();

        assert!(!clock.is_calibrated());

        let _session = tester.start_session();

        assert!(clock.is_calibrated());
    }
}
