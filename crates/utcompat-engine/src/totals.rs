//! Pass/fail tallies.

use serde::{Deserialize, Serialize};

/// Passed/failed counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub passed: u64,
    pub failed: u64,
}

impl Counts {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.passed + self.failed
    }

    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn record(&mut self, ok: bool) {
        if ok {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Totals for a whole run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub assertions: Counts,
    pub test_cases: Counts,
}

impl Totals {
    /// Process status for this run: the failed assertion count, capped.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        let capped = self
            .assertions
            .failed
            .min(u64::from(crate::session::MAX_EXIT_CODE.unsigned_abs()));
        capped as i32
    }
}
