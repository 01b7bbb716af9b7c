//! Fake platform implementation for testing.

use std::sync::{Arc, Mutex};

use crate::pal::{Platform, WallClock};

const ERR_POISONED_FAKE: &str = "FakePlatform state lock should not be poisoned";

/// Internal state for the fake platform that can be shared between clones.
#[derive(Debug)]
struct FakePlatformState {
    cycles: u64,
    cycles_per_read: u64,
    wall_ticks: u64,
    wall_ticks_per_read: u64,
    wall_ticks_per_second: u64,
    page_faults: u64,
}

/// Fake implementation of the platform abstraction for testing.
///
/// Tests control the counter values instead of relying on real hardware. Multiple clones of the
/// same `FakePlatform` share the same underlying state, so a test can hand one clone to a clock
/// and keep another to simulate time passing, typically from inside a workload closure.
///
/// Each read of a counter first returns the current value and then advances it by the
/// configured per-read step (zero by default), which makes busy-wait loops terminate.
#[derive(Clone, Debug)]
pub(crate) struct FakePlatform {
    state: Arc<Mutex<FakePlatformState>>,
}

impl FakePlatform {
    /// Creates a fake platform with all counters at zero and a microsecond wall clock.
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakePlatformState {
                cycles: 0,
                cycles_per_read: 0,
                wall_ticks: 0,
                wall_ticks_per_read: 0,
                wall_ticks_per_second: 1_000_000,
                page_faults: 0,
            })),
        }
    }

    /// Moves the cycle counter forward, as if the current thread had spent `cycles` working.
    pub(crate) fn advance_cycles(&self, cycles: u64) {
        let mut state = self.state.lock().expect(ERR_POISONED_FAKE);
        state.cycles = state.cycles.checked_add(cycles).expect("fake cycle counter overflow");
    }

    /// Sets how far the cycle counter advances on every read.
    pub(crate) fn set_cycles_per_read(&self, cycles: u64) {
        self.state.lock().expect(ERR_POISONED_FAKE).cycles_per_read = cycles;
    }

    /// Sets how far the wall clock advances on every read.
    pub(crate) fn set_wall_ticks_per_read(&self, ticks: u64) {
        self.state.lock().expect(ERR_POISONED_FAKE).wall_ticks_per_read = ticks;
    }

    /// Moves the page fault counter forward.
    pub(crate) fn add_page_faults(&self, faults: u64) {
        let mut state = self.state.lock().expect(ERR_POISONED_FAKE);
        state.page_faults = state
            .page_faults
            .checked_add(faults)
            .expect("fake page fault counter overflow");
    }
}

impl Platform for FakePlatform {
    fn cycle_counter(&self) -> u64 {
        let mut state = self.state.lock().expect(ERR_POISONED_FAKE);
        let value = state.cycles;
        state.cycles = value
            .checked_add(state.cycles_per_read)
            .expect("fake cycle counter overflow");
        value
    }

    fn wall_clock(&self) -> WallClock {
        let mut state = self.state.lock().expect(ERR_POISONED_FAKE);
        let ticks = state.wall_ticks;
        state.wall_ticks = ticks
            .checked_add(state.wall_ticks_per_read)
            .expect("fake wall clock overflow");

        WallClock {
            ticks,
            ticks_per_second: state.wall_ticks_per_second,
        }
    }

    fn page_fault_count(&self) -> u64 {
        self.state.lock().expect(ERR_POISONED_FAKE).page_faults
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn initializes_with_zero_counters() {
        let platform = FakePlatform::new();

        assert_eq!(platform.cycle_counter(), 0);
        assert_eq!(platform.page_fault_count(), 0);
        assert_eq!(
            platform.wall_clock(),
            WallClock {
                ticks: 0,
                ticks_per_second: 1_000_000
            }
        );
    }

    #[test]
    fn reads_advance_by_configured_step() {
        let platform = FakePlatform::new();
        platform.set_cycles_per_read(7);
        platform.set_wall_ticks_per_read(3);

        assert_eq!(platform.cycle_counter(), 0);
        assert_eq!(platform.cycle_counter(), 7);
        assert_eq!(platform.wall_clock().ticks, 0);
        assert_eq!(platform.wall_clock().ticks, 3);
    }

    #[test]
    fn shared_state_between_clones() {
        let platform1 = FakePlatform::new();
        let platform2 = platform1.clone();

        platform1.advance_cycles(100);
        assert_eq!(platform2.cycle_counter(), 100);

        platform2.add_page_faults(5);
        assert_eq!(platform1.page_fault_count(), 5);
    }
}
