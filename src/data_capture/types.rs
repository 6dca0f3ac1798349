//! Common data types used across the data_capture subsystem.

use serde::Serialize;

/// Outcome of one poll, parse and persist cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Sessions the daemon reported in this cycle.
    pub sessions: usize,
    /// Samples persisted.
    pub written: usize,
    /// Samples the store refused; the cycle carried on past each of them.
    pub failed: usize,
}

impl CycleReport {
    pub fn is_partial(&self) -> bool {
        self.failed > 0
    }
}
