use std::cell::RefCell;
use std::marker::PhantomData;
use std::thread;

use crate::{Clock, ProfileReport, RegionGuard, RegionId, RegionSummary};

/// Maximum number of distinct regions a profiler can register.
pub const REGION_CAPACITY: usize = 64;

/// Maximum number of regions that can be active (nested) at the same time.
pub const FRAME_CAPACITY: usize = 64;

const ERR_OVERFLOW: &str = "cycle accumulation overflows u64 - this indicates an unrealistic scenario";

/// Attributes elapsed cycles to nested named regions of code.
///
/// A profiler owns one profiling session: a fixed-capacity registry of named regions, a stack
/// of the currently active regions and the start and end time of the session. When a region
/// exits, its elapsed time is split into an exclusive part (time not spent in nested regions)
/// and an inclusive part (time the region was on the stack). Inclusive time of a recursive
/// region is only counted once, when its outermost activation exits.
///
/// Regions are registered once via [`region()`](Self::region) and entered via
/// [`enter()`](Self::enter), which returns a [`RegionGuard`] that exits the region when
/// dropped. Regions must exit in the reverse order of entry.
///
/// Registry and stack have fixed capacities ([`REGION_CAPACITY`] and [`FRAME_CAPACITY`]) so
/// that entering and exiting a region never allocates. Exceeding them is a programming error
/// and panics.
///
/// The profiler is single-threaded. Each thread that needs profiling creates its own.
///
/// # Examples
///
/// ```
/// use cycle_harness::Profiler;
///
/// let profiler = Profiler::new();
///
/// let load = profiler.region("load");
/// let parse = profiler.region("parse");
///
/// {
///     let _load = profiler.enter(load);
///     let data = vec![1_u8; 4096];
///     profiler.record_bytes(data.len() as u64);
///
///     let _parse = profiler.enter(parse);
///     let sum: u64 = data.iter().map(|b| u64::from(*b)).sum();
///     assert_eq!(sum, 4096);
/// }
///
/// let report = profiler.report();
/// println!("{report}");
/// ```
#[derive(Debug)]
pub struct Profiler {
    clock: Clock,
    state: RefCell<SessionState>,

    _single_threaded: PhantomData<*const ()>,
}

#[derive(Debug)]
struct SessionState {
    regions: heapless::Vec<RegionStats, REGION_CAPACITY>,
    frames: heapless::Vec<ActiveFrame, FRAME_CAPACITY>,
    start_time: u64,
    end_time: Option<u64>,
}

#[derive(Debug)]
struct RegionStats {
    name: &'static str,

    // Total time this region was on the stack.
    inclusive_cycles: u64,

    // Total time this region was at the top of the stack.
    exclusive_cycles: u64,

    entrance_count: u64,

    // Number of frames for this region currently on the stack.
    active_frames: usize,

    bytes_processed: u64,
}

impl RegionStats {
    const fn new(name: &'static str) -> Self {
        Self {
            name,
            inclusive_cycles: 0,
            exclusive_cycles: 0,
            entrance_count: 0,
            active_frames: 0,
            bytes_processed: 0,
        }
    }

    fn clear(&mut self) {
        *self = Self::new(self.name);
    }
}

#[derive(Debug)]
struct ActiveFrame {
    region: RegionId,
    start_time: u64,
    child_time: u64,
}

impl Profiler {
    /// Creates a profiler over the real cycle counter and starts its session.
    #[expect(
        clippy::new_without_default,
        reason = "creating a profiler starts a session, which is not a neutral default"
    )]
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Clock::new())
    }

    /// Creates a profiler that reads time from the given clock and starts its session.
    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        let start_time = clock.now();

        Self {
            clock,
            state: RefCell::new(SessionState {
                regions: heapless::Vec::new(),
                frames: heapless::Vec::new(),
                start_time,
                end_time: None,
            }),
            _single_threaded: PhantomData,
        }
    }

    /// The clock this profiler reads time from.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Registers a region with the given display name, or returns the existing identifier if a
    /// region with this name is already registered.
    ///
    /// Call this once per region (for example when constructing the instrumented component)
    /// and keep the identifier; the lookup compares names and is not meant for hot paths.
    ///
    /// # Panics
    ///
    /// Panics if [`REGION_CAPACITY`] regions are already registered.
    pub fn region(&self, name: &'static str) -> RegionId {
        let mut state = self.state.borrow_mut();

        if let Some(index) = state.regions.iter().position(|region| region.name == name) {
            return RegionId::new(index);
        }

        assert!(
            !state.regions.is_full(),
            "profiler region registry is full ({REGION_CAPACITY} regions) - cannot register '{name}'"
        );

        let index = state.regions.len();
        state
            .regions
            .push(RegionStats::new(name))
            .expect("guarded by capacity assertion");

        RegionId::new(index)
    }

    /// Enters a registered region, returning a guard that exits it when dropped.
    ///
    /// # Panics
    ///
    /// Panics if [`FRAME_CAPACITY`] regions are already active or if the region identifier was
    /// not issued by this profiler.
    pub fn enter(&self, region: RegionId) -> RegionGuard<'_> {
        let depth = {
            let mut state_ref = self.state.borrow_mut();
            let state = &mut *state_ref;

            assert!(
                !state.frames.is_full(),
                "profiler frame stack is full ({FRAME_CAPACITY} active regions) - regions are nested too deeply"
            );

            let stats = state
                .regions
                .get_mut(region.index())
                .expect("region identifier was not issued by this profiler");

            stats.entrance_count = stats
                .entrance_count
                .checked_add(1)
                .expect("entrance count overflows u64 - this indicates an unrealistic scenario");
            stats.active_frames = stats
                .active_frames
                .checked_add(1)
                .expect("bounded by frame capacity");

            // Read the counter last, to exclude our own bookkeeping from the region.
            let start_time = self.clock.now();

            state
                .frames
                .push(ActiveFrame {
                    region,
                    start_time,
                    child_time: 0,
                })
                .expect("guarded by capacity assertion");

            state.frames.len()
        };

        RegionGuard::new(self, region, depth)
    }

    /// Registers (if needed) and enters the region with the given name.
    ///
    /// Equivalent to `profiler.enter(profiler.region(name))`. Prefer keeping the identifier from
    /// [`region()`](Self::region) for regions entered on hot paths.
    pub fn enter_named(&self, name: &'static str) -> RegionGuard<'_> {
        self.enter(self.region(name))
    }

    /// Exits the region whose frame is at `depth`, which must be the top of the stack.
    pub(crate) fn exit(&self, region: RegionId, depth: usize) {
        // Read the counter first, to exclude our own bookkeeping from the region.
        let now = self.clock.now();

        let mut state_ref = self.state.borrow_mut();
        let state = &mut *state_ref;

        if state.frames.len() != depth {
            // Unwinding may drop guards in any order, the session is unusable at that point anyway.
            if thread::panicking() {
                return;
            }

            panic!(
                "profiler region '{}' exited out of order - regions must exit in reverse order of entry (frame depth {depth}, stack depth {})",
                state.regions.get(region.index()).map_or("<unknown>", |r| r.name),
                state.frames.len()
            );
        }

        let frame = state
            .frames
            .pop()
            .expect("a guard always has a frame on the stack");

        debug_assert_eq!(frame.region, region);

        let elapsed = now.saturating_sub(frame.start_time);
        let exclusive = elapsed.saturating_sub(frame.child_time);

        if let Some(parent) = state.frames.last_mut() {
            parent.child_time = parent.child_time.checked_add(elapsed).expect(ERR_OVERFLOW);
        }

        let stats = state
            .regions
            .get_mut(frame.region.index())
            .expect("frames only reference registered regions");

        stats.exclusive_cycles = stats
            .exclusive_cycles
            .checked_add(exclusive)
            .expect(ERR_OVERFLOW);
        stats.active_frames = stats
            .active_frames
            .checked_sub(1)
            .expect("every active frame was counted on entry");

        // Only the outermost activation of a recursive region contributes inclusive time.
        if stats.active_frames == 0 {
            stats.inclusive_cycles = stats
                .inclusive_cycles
                .checked_add(elapsed)
                .expect(ERR_OVERFLOW);
        }
    }

    /// Attributes `bytes` of processed data to the innermost active region.
    ///
    /// # Panics
    ///
    /// Panics if no region is active.
    pub fn record_bytes(&self, bytes: u64) {
        let mut state_ref = self.state.borrow_mut();
        let state = &mut *state_ref;

        let frame = state
            .frames
            .last()
            .expect("record_bytes() requires an active profiler region");

        Self::add_bytes(state, frame.region, bytes);
    }

    /// Attributes `bytes` of processed data to a specific region.
    pub(crate) fn record_bytes_for(&self, region: RegionId, bytes: u64) {
        Self::add_bytes(&mut self.state.borrow_mut(), region, bytes);
    }

    fn add_bytes(state: &mut SessionState, region: RegionId, bytes: u64) {
        let stats = state
            .regions
            .get_mut(region.index())
            .expect("region identifier was not issued by this profiler");

        stats.bytes_processed = stats.bytes_processed.checked_add(bytes).expect(
            "processed byte count overflows u64 - this indicates an unrealistic scenario",
        );
    }

    /// The number of regions currently active.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.state.borrow().frames.len()
    }

    /// Ends the session, fixing its end time. Returns the end time.
    ///
    /// Only the first call has an effect; [`report()`](Self::report) calls this implicitly.
    pub fn end(&self) -> u64 {
        let mut state = self.state.borrow_mut();

        if let Some(end_time) = state.end_time {
            return end_time;
        }

        let end_time = self.clock.now();
        state.end_time = Some(end_time);
        end_time
    }

    /// Discards all statistics and starts a new session.
    ///
    /// Registered region identifiers remain valid.
    ///
    /// # Panics
    ///
    /// Panics if any region is still active.
    pub fn reset(&self) {
        let mut state = self.state.borrow_mut();

        assert!(
            state.frames.is_empty(),
            "cannot reset the profiler while {} regions are still active",
            state.frames.len()
        );

        for region in &mut state.regions {
            region.clear();
        }

        state.end_time = None;
        state.start_time = self.clock.now();
    }

    /// Ends the session (if not already ended) and summarizes all regions that were entered.
    ///
    /// Calibrates the clock if that has not happened yet.
    ///
    /// # Panics
    ///
    /// Panics if any region is still active, as this means some instrumented code failed to
    /// exit a region it entered.
    #[must_use]
    pub fn report(&self) -> ProfileReport {
        let end_time = self.end();
        let state = self.state.borrow();

        assert!(
            state.frames.is_empty(),
            "cannot report while {} profiler regions are still active - every entered region must exit first",
            state.frames.len()
        );

        for region in &state.regions {
            assert!(
                region.active_frames == 0,
                "profiler region '{}' is still active",
                region.name
            );
        }

        let total_cycles = end_time.saturating_sub(state.start_time);
        let calibration = self.clock.calibrate();

        let regions = state
            .regions
            .iter()
            .filter(|region| region.entrance_count > 0)
            .map(|region| {
                RegionSummary::new(
                    region.name,
                    region.entrance_count,
                    region.inclusive_cycles,
                    region.exclusive_cycles,
                    region.bytes_processed,
                    total_cycles,
                    &calibration,
                )
            })
            .collect();

        ProfileReport::new(total_cycles, calibration, regions)
    }
}
