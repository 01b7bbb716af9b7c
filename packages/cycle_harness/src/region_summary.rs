use std::fmt;

use crate::Calibration;

/// Statistics of one profiler region over a completed session.
///
/// Part of a [`ProfileReport`][crate::ProfileReport].
#[derive(Clone, Debug, PartialEq)]
pub struct RegionSummary {
    name: &'static str,
    entrance_count: u64,
    inclusive_cycles: u64,
    exclusive_cycles: u64,
    bytes_processed: u64,
    inclusive_microseconds: f64,
    exclusive_microseconds: f64,
    exclusive_percent: f64,
    gib_per_second: Option<f64>,
}

impl RegionSummary {
    #[expect(
        clippy::cast_precision_loss,
        reason = "percentages are reported with one decimal, precision loss is irrelevant"
    )]
    pub(crate) fn new(
        name: &'static str,
        entrance_count: u64,
        inclusive_cycles: u64,
        exclusive_cycles: u64,
        bytes_processed: u64,
        session_cycles: u64,
        calibration: &Calibration,
    ) -> Self {
        let exclusive_percent = if session_cycles == 0 {
            0.0
        } else {
            100.0 * exclusive_cycles as f64 / session_cycles as f64
        };

        let gib_per_second = (bytes_processed > 0)
            .then(|| calibration.gib_per_second(bytes_processed, inclusive_cycles));

        Self {
            name,
            entrance_count,
            inclusive_cycles,
            exclusive_cycles,
            bytes_processed,
            inclusive_microseconds: calibration.cycles_to_microseconds(inclusive_cycles),
            exclusive_microseconds: calibration.cycles_to_microseconds(exclusive_cycles),
            exclusive_percent,
            gib_per_second,
        }
    }

    /// The display name of the region.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// How many times the region was entered.
    #[must_use]
    pub fn entrance_count(&self) -> u64 {
        self.entrance_count
    }

    /// Cycles during which the region was on the stack, counting recursive activations once.
    #[must_use]
    pub fn inclusive_cycles(&self) -> u64 {
        self.inclusive_cycles
    }

    /// Cycles spent in the region itself, excluding nested regions.
    #[must_use]
    pub fn exclusive_cycles(&self) -> u64 {
        self.exclusive_cycles
    }

    /// Bytes of data attributed to the region.
    #[must_use]
    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    /// Inclusive time in microseconds.
    #[must_use]
    pub fn inclusive_microseconds(&self) -> f64 {
        self.inclusive_microseconds
    }

    /// Exclusive time in microseconds.
    #[must_use]
    pub fn exclusive_microseconds(&self) -> f64 {
        self.exclusive_microseconds
    }

    /// Exclusive time as a percentage of the whole session.
    #[must_use]
    pub fn exclusive_percent(&self) -> f64 {
        self.exclusive_percent
    }

    /// Throughput over the inclusive time, if any bytes were recorded for the region.
    #[must_use]
    pub fn gib_per_second(&self) -> Option<f64> {
        self.gib_per_second
    }
}

impl fmt::Display for RegionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  {:<18} {:>10} {:>10.0} us {:>10.0} us ({:>4.1}%)",
            self.name,
            self.entrance_count,
            self.inclusive_microseconds.trunc(),
            self.exclusive_microseconds.trunc(),
            self.exclusive_percent
        )?;

        if let Some(gib_per_second) = self.gib_per_second {
            write!(f, " {gib_per_second:4.2} GiB/s")?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn derives_times_and_percentage() {
        let calibration = Calibration::from_cycles_per_second(1_000_000);

        let summary = RegionSummary::new("parse", 3, 4_000, 1_000, 0, 8_000, &calibration);

        assert!((summary.inclusive_microseconds() - 4_000.0).abs() < 1e-9);
        assert!((summary.exclusive_microseconds() - 1_000.0).abs() < 1e-9);
        assert!((summary.exclusive_percent() - 12.5).abs() < 1e-9);
        assert_eq!(summary.gib_per_second(), None);
    }

    #[test]
    fn empty_session_has_zero_percentage() {
        let calibration = Calibration::from_cycles_per_second(1_000_000);

        let summary = RegionSummary::new("idle", 1, 0, 0, 0, 0, &calibration);

        assert!(summary.exclusive_percent().abs() < f64::EPSILON);
    }

    #[test]
    fn formats_fixed_width_line() {
        let calibration = Calibration::from_cycles_per_second(1_000_000);

        let summary = RegionSummary::new("parse", 3, 4_000, 1_000, 0, 8_000, &calibration);

        assert_eq!(
            summary.to_string(),
            "  parse                       3       4000 us       1000 us (12.5%)"
        );
    }

    #[test]
    fn formats_bandwidth_when_bytes_recorded() {
        let calibration = Calibration::from_cycles_per_second(1_000_000);

        // 1 GiB in one second.
        let summary =
            RegionSummary::new("read", 1, 1_000_000, 1_000_000, 1 << 30, 1_000_000, &calibration);

        assert_eq!(
            summary.to_string(),
            "  read                        1    1000000 us    1000000 us (100.0%) 1.00 GiB/s"
        );
    }
}
