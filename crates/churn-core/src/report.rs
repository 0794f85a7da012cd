//! Run report and verdict.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChurnError, Result};
use crate::failure::Failure;
use crate::metrics::{RunTotals, WorkerStats};
use crate::types::RunId;

/// Failure side of a verdict: the primary error and every suppressed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Run that failed.
    pub run_id: RunId,
    /// Recorded errors.
    pub failure: Failure,
}

impl std::fmt::Display for FailureReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.failure.primary)?;
        if !self.failure.suppressed.is_empty() {
            write!(f, " ({} suppressed)", self.failure.suppressed.len())?;
            for (i, suppressed) in self.failure.suppressed.iter().enumerate() {
                write!(f, "\n  suppressed #{}: {suppressed}", i + 1)?;
            }
        }
        Ok(())
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier.
    pub run_id: RunId,
    /// Per-worker stats in start order.
    pub workers: Vec<WorkerStats>,
    /// Wall time from start to the last join.
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    /// Recorded errors; `None` means the run passed.
    pub failure: Option<Failure>,
}

impl RunReport {
    /// Returns true if no worker recorded an error.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.failure.is_none()
    }

    /// Sum of all worker stats.
    #[must_use]
    pub fn totals(&self) -> RunTotals {
        RunTotals::from_stats(&self.workers)
    }

    /// Stats for the named worker.
    #[must_use]
    pub fn worker(&self, label: &str) -> Option<&WorkerStats> {
        self.workers.iter().find(|s| s.worker == label)
    }

    /// Converts the report into a pass/fail verdict.
    ///
    /// # Errors
    /// Returns [`ChurnError::Failed`] carrying the primary error and every
    /// suppressed error if any worker recorded a failure.
    pub fn verdict(&self) -> Result<()> {
        match &self.failure {
            None => Ok(()),
            Some(failure) => Err(ChurnError::Failed(FailureReport {
                run_id: self.run_id,
                failure: failure.clone(),
            })),
        }
    }

    /// Serializes the report as pretty JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
