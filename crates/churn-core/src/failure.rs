//! Single-winner failure register shared by every worker of a run.
//!
//! The first error recorded becomes the primary. Every later error is appended
//! to the primary's suppressed list, so a failed run reports one root cause
//! followed by everything that went wrong after it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::WorkerError;

/// An error together with the worker that observed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedError {
    /// Label of the observing worker.
    pub worker: String,
    /// What the worker observed.
    pub error: WorkerError,
}

impl RecordedError {
    /// Tags an error with the worker that observed it.
    #[must_use]
    pub fn new(worker: impl Into<String>, error: WorkerError) -> Self {
        Self {
            worker: worker.into(),
            error,
        }
    }
}

impl std::fmt::Display for RecordedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.worker, self.error)
    }
}

/// Primary error plus the errors recorded after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// First error recorded in the run.
    pub primary: RecordedError,
    /// Errors recorded after the primary, in recording order.
    pub suppressed: Vec<RecordedError>,
}

impl Failure {
    /// Total number of recorded errors.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.suppressed.len()
    }

    /// Always false; a failure holds at least its primary.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Debug, Default)]
struct SlotInner {
    tripped: AtomicBool,
    failure: Mutex<Option<Failure>>,
}

/// Thread-safe single-winner error register.
///
/// Cloning yields another handle to the same slot.
#[derive(Debug, Clone, Default)]
pub struct FailureSlot {
    inner: Arc<SlotInner>,
}

impl FailureSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error observed by `worker`.
    ///
    /// The first call stores the primary; later calls append to its
    /// suppressed list. Never replaces the primary and never drops an error.
    pub fn record(&self, worker: &str, error: WorkerError) {
        let entry = RecordedError::new(worker, error);
        let mut guard = self.inner.failure.lock();
        match guard.as_mut() {
            Some(failure) => {
                tracing::warn!(worker, error = %entry.error, "suppressed failure recorded");
                failure.suppressed.push(entry);
            }
            None => {
                tracing::warn!(worker, error = %entry.error, "primary failure recorded");
                *guard = Some(Failure {
                    primary: entry,
                    suppressed: Vec::new(),
                });
                self.inner.tripped.store(true, Ordering::Release);
            }
        }
    }

    /// Returns true once any error has been recorded.
    ///
    /// Lock-free; this is what workers poll at the top of every iteration.
    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.inner.tripped.load(Ordering::Acquire)
    }

    /// Returns the primary error, if any.
    #[must_use]
    pub fn peek(&self) -> Option<RecordedError> {
        if !self.is_tripped() {
            return None;
        }
        self.inner
            .failure
            .lock()
            .as_ref()
            .map(|failure| failure.primary.clone())
    }

    /// Returns a copy of the full failure: primary plus suppressed errors.
    #[must_use]
    pub fn snapshot(&self) -> Option<Failure> {
        self.inner.failure.lock().clone()
    }
}
