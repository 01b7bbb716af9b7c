use std::fmt;

use crate::{Calibration, RegionSummary};

/// Summary of a completed profiling session.
///
/// Produced by [`Profiler::report()`][crate::Profiler::report]. Contains the total session time
/// and one [`RegionSummary`] for every region that was entered at least once, in registration
/// order.
///
/// The [`Display`][fmt::Display] implementation renders the classic text profile:
///
/// ```text
/// Total run time:                     152034 us
///   read                        1      20311 us      20311 us (13.4%) 2.35 GiB/s
///   parse                       1     120884 us     120884 us (79.5%)
/// ```
///
/// # Examples
///
/// ```
/// use cycle_harness::Profiler;
///
/// let profiler = Profiler::new();
///
/// for _ in 0..3 {
///     let _step = profiler.enter_named("step");
///     std::hint::black_box((0..1_000_u64).sum::<u64>());
/// }
///
/// let report = profiler.report();
///
/// let step = report.region("step").unwrap();
/// assert_eq!(step.entrance_count(), 3);
/// assert!(step.inclusive_cycles() <= report.total_cycles());
///
/// report.print_to_stdout();
/// ```
#[derive(Clone, Debug)]
pub struct ProfileReport {
    total_cycles: u64,
    calibration: Calibration,
    regions: Vec<RegionSummary>,
}

impl ProfileReport {
    pub(crate) fn new(
        total_cycles: u64,
        calibration: Calibration,
        regions: Vec<RegionSummary>,
    ) -> Self {
        Self {
            total_cycles,
            calibration,
            regions,
        }
    }

    /// Cycles between the start and the end of the session.
    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Session time in microseconds.
    #[must_use]
    pub fn total_microseconds(&self) -> f64 {
        self.calibration.cycles_to_microseconds(self.total_cycles)
    }

    /// Session cycles not attributed to any region, i.e. spent outside all regions.
    #[must_use]
    pub fn unattributed_cycles(&self) -> u64 {
        let attributed = self
            .regions
            .iter()
            .map(RegionSummary::exclusive_cycles)
            .fold(0_u64, u64::saturating_add);

        self.total_cycles.saturating_sub(attributed)
    }

    /// The calibration used to convert cycles in this report.
    #[must_use]
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Summaries of all regions entered during the session, in registration order.
    pub fn regions(&self) -> impl Iterator<Item = &RegionSummary> {
        self.regions.iter()
    }

    /// The summary of the region with the given name, if it was entered during the session.
    #[must_use]
    pub fn region(&self, name: &str) -> Option<&RegionSummary> {
        self.regions.iter().find(|region| region.name() == name)
    }

    /// Whether no region was entered during the session.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Prints the profile to stdout.
    ///
    /// Prints nothing if no region was entered.
    #[cfg_attr(test, mutants::skip)] // Too difficult to test stdout output reliably - manually tested.
    pub fn print_to_stdout(&self) {
        if self.is_empty() {
            return;
        }

        print!("{self}");
    }
}

impl fmt::Display for ProfileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Total run time:                 {:>10.0} us",
            self.total_microseconds().trunc()
        )?;

        for region in &self.regions {
            writeln!(f, "{region}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn sample_report() -> ProfileReport {
        let calibration = Calibration::from_cycles_per_second(1_000_000);

        ProfileReport::new(
            10_000,
            calibration,
            vec![
                RegionSummary::new("outer", 1, 9_000, 6_000, 0, 10_000, &calibration),
                RegionSummary::new("inner", 2, 3_000, 3_000, 0, 10_000, &calibration),
            ],
        )
    }

    #[test]
    fn finds_regions_by_name() {
        let report = sample_report();

        assert_eq!(report.region("inner").unwrap().entrance_count(), 2);
        assert!(report.region("missing").is_none());
        assert_eq!(report.regions().count(), 2);
        assert!(!report.is_empty());
    }

    #[test]
    fn unattributed_is_remainder_of_exclusive_time() {
        let report = sample_report();

        assert_eq!(report.unattributed_cycles(), 1_000);
        assert!((report.total_microseconds() - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn renders_header_and_region_lines() {
        let report = sample_report();

        let expected = "\
Total run time:                      10000 us
  outer                       1       9000 us       6000 us (60.0%)
  inner                       2       3000 us       3000 us (30.0%)
";

        assert_eq!(report.to_string(), expected);
    }

    #[test]
    fn empty_report_renders_only_header() {
        let report = ProfileReport::new(0, Calibration::from_cycles_per_second(1_000), Vec::new());

        assert!(report.is_empty());
        assert_eq!(
            report.to_string(),
            "Total run time:                          0 us\n"
        );
    }
}
