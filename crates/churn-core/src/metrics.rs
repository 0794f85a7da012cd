//! Per-worker counters and run totals.
//!
//! Counts only. The harness asserts on correctness, never on latency or
//! throughput.

use serde::{Deserialize, Serialize};

use crate::types::{StopReason, WorkerState};

/// What one worker did during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Worker label.
    pub worker: String,
    /// Resource the worker targeted.
    pub resource: String,
    /// Completed iterations.
    pub iterations: u64,
    /// Create calls issued.
    pub creates: u64,
    /// Delete calls issued.
    pub deletes: u64,
    /// Probe queries issued.
    pub probes: u64,
    /// Probe failures classified as expected absence.
    pub expected_absences: u64,
    /// Probes that still found the resource after its delete.
    #[serde(default)]
    pub visible_after_delete: u64,
    /// Errors this worker recorded into the failure slot.
    pub failures_recorded: u64,
    /// Final worker state.
    pub state: WorkerState,
}

impl WorkerStats {
    /// Creates zeroed stats for a running worker.
    #[must_use]
    pub fn new(worker: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            worker: worker.into(),
            resource: resource.into(),
            iterations: 0,
            creates: 0,
            deletes: 0,
            probes: 0,
            expected_absences: 0,
            visible_after_delete: 0,
            failures_recorded: 0,
            state: WorkerState::Running,
        }
    }

    /// Returns why the worker stopped, if it has.
    #[must_use]
    pub const fn stop_reason(&self) -> Option<StopReason> {
        match self.state {
            WorkerState::Stopped(reason) => Some(reason),
            WorkerState::Running => None,
        }
    }
}

/// Sum of all worker stats in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunTotals {
    /// Completed iterations.
    pub iterations: u64,
    /// Create calls issued.
    pub creates: u64,
    /// Delete calls issued.
    pub deletes: u64,
    /// Probe queries issued.
    pub probes: u64,
    /// Probe failures classified as expected absence.
    pub expected_absences: u64,
    /// Errors recorded into the failure slot.
    pub failures_recorded: u64,
}

impl RunTotals {
    /// Sums a set of worker stats.
    #[must_use]
    pub fn from_stats<'a>(stats: impl IntoIterator<Item = &'a WorkerStats>) -> Self {
        stats.into_iter().fold(Self::default(), |mut acc, s| {
            acc.iterations += s.iterations;
            acc.creates += s.creates;
            acc.deletes += s.deletes;
            acc.probes += s.probes;
            acc.expected_absences += s.expected_absences;
            acc.failures_recorded += s.failures_recorded;
            acc
        })
    }
}
