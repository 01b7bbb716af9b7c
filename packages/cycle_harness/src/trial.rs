use std::fmt;

/// One timed invocation of a workload under a [`RepetitionSession`][crate::RepetitionSession].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Trial {
    elapsed_cycles: u64,
    page_faults: Option<u64>,
}

impl Trial {
    pub(crate) const fn new(elapsed_cycles: u64, page_faults: Option<u64>) -> Self {
        Self {
            elapsed_cycles,
            page_faults,
        }
    }

    /// Cycles the workload took.
    #[must_use]
    pub fn elapsed_cycles(&self) -> u64 {
        self.elapsed_cycles
    }

    /// Page faults incurred by the process during the trial.
    ///
    /// `None` if page fault tracking was disabled for the session.
    #[must_use]
    pub fn page_faults(&self) -> Option<u64> {
        self.page_faults
    }
}

impl fmt::Display for Trial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cycles", self.elapsed_cycles)?;

        if let Some(page_faults) = self.page_faults {
            write!(f, ", {page_faults} page faults")?;
        }

        Ok(())
    }
}
