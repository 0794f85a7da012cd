//! Worker state machine.
//!
//! A worker repeats its behavior's per-iteration step against one resource
//! until the run deadline passes or any worker has recorded a failure. Both
//! conditions are checked before every iteration; an operation already in
//! flight is never interrupted.
//!
//! Errors never unwind out of a worker. Every failure, whether a non-zero
//! status or a raised client error, is recorded into the shared
//! [`FailureSlot`] and the worker carries on to its next check.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::client::{ClientHandle, ResourceShape};
use crate::error::{Operation, WorkerError};
use crate::failure::FailureSlot;
use crate::metrics::WorkerStats;
use crate::plan::WorkerSpec;
use crate::types::{StopReason, WorkerState};

/// Per-iteration behavior of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerBehavior {
    /// Create, then delete.
    Basic,
    /// Create, delete, then query the just-deleted resource.
    #[default]
    Observing,
}

impl WorkerBehavior {
    /// Runs one iteration of this behavior.
    pub async fn step(self, worker: &Worker, stats: &mut WorkerStats) {
        worker.create(stats).await;
        worker.delete(stats).await;
        if self == Self::Observing {
            worker.probe(stats).await;
        }
    }

    /// Prefix for worker labels running this behavior.
    #[must_use]
    pub const fn label_prefix(self) -> &'static str {
        match self {
            Self::Basic => "create-delete",
            Self::Observing => "create-delete-search",
        }
    }
}

impl std::fmt::Display for WorkerBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic => f.write_str("basic"),
            Self::Observing => f.write_str("observing"),
        }
    }
}

/// A single concurrent worker bound to one resource.
pub struct Worker {
    spec: WorkerSpec,
    behavior: WorkerBehavior,
    deadline: Instant,
    client: ClientHandle,
    failures: FailureSlot,
    query: String,
}

impl Worker {
    /// Creates a worker.
    #[must_use]
    pub fn new(
        spec: WorkerSpec,
        behavior: WorkerBehavior,
        deadline: Instant,
        client: ClientHandle,
        failures: FailureSlot,
    ) -> Self {
        Self {
            spec,
            behavior,
            deadline,
            client,
            failures,
            query: "*".to_string(),
        }
    }

    /// Sets the query expression used by the probe step.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Worker label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.spec.label
    }

    /// Target resource name.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.spec.resource
    }

    /// Configuration the resource is created from.
    #[must_use]
    pub fn config_name(&self) -> &str {
        &self.spec.config_name
    }

    /// The behavior this worker runs.
    #[must_use]
    pub const fn behavior(&self) -> WorkerBehavior {
        self.behavior
    }

    /// Returns the reason to stop, or `None` if another iteration may start.
    #[must_use]
    pub fn stop_reason(&self) -> Option<StopReason> {
        if self.failures.is_tripped() {
            Some(StopReason::FailureObserved)
        } else if Instant::now() >= self.deadline {
            Some(StopReason::Deadline)
        } else {
            None
        }
    }

    /// Loops until a stop condition holds, then returns what it did.
    ///
    /// Resources left mid-lifecycle are not cleaned up.
    pub async fn run(self) -> WorkerStats {
        let mut stats = WorkerStats::new(self.label(), self.resource());
        tracing::debug!(
            worker = self.label(),
            resource = self.resource(),
            config = self.config_name(),
            behavior = %self.behavior,
            "worker started"
        );

        let reason = loop {
            if let Some(reason) = self.stop_reason() {
                break reason;
            }
            self.behavior.step(&self, &mut stats).await;
            stats.iterations += 1;
            tokio::task::yield_now().await;
        };

        stats.state = WorkerState::Stopped(reason);
        tracing::debug!(
            worker = self.label(),
            iterations = stats.iterations,
            reason = %reason,
            "worker stopped"
        );
        stats
    }

    /// Issues a create with the minimal shape.
    async fn create(&self, stats: &mut WorkerStats) {
        stats.creates += 1;
        match self
            .client
            .create_resource(self.resource(), self.config_name(), ResourceShape::MINIMAL)
            .await
        {
            Ok(response) if response.is_success() => {}
            Ok(response) => {
                self.fail(stats, WorkerError::create_status(self.resource(), response.status));
            }
            Err(e) => self.fail(stats, WorkerError::raised(Operation::Create, self.resource(), e)),
        }
    }

    /// Issues a delete.
    async fn delete(&self, stats: &mut WorkerStats) {
        stats.deletes += 1;
        match self.client.delete_resource(self.resource()).await {
            Ok(response) if response.is_success() => {}
            Ok(response) => {
                self.fail(stats, WorkerError::delete_status(self.resource(), response.status));
            }
            Err(e) => self.fail(stats, WorkerError::raised(Operation::Delete, self.resource(), e)),
        }
    }

    /// Queries the resource this worker just deleted.
    ///
    /// Absence is expected and swallowed; anything else is recorded.
    async fn probe(&self, stats: &mut WorkerStats) {
        stats.probes += 1;
        match self.client.query(self.resource(), &self.query).await {
            Ok(found) => {
                stats.visible_after_delete += 1;
                tracing::debug!(
                    worker = self.label(),
                    num_found = found.num_found,
                    "resource still visible after delete"
                );
            }
            Err(e) if e.is_not_found() => {
                stats.expected_absences += 1;
                tracing::debug!(worker = self.label(), error = %e, "expected absence");
            }
            Err(e) => self.fail(stats, WorkerError::raised(Operation::Query, self.resource(), e)),
        }
    }

    fn fail(&self, stats: &mut WorkerStats, error: WorkerError) {
        stats.failures_recorded += 1;
        self.failures.record(self.label(), error);
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("spec", &self.spec)
            .field("behavior", &self.behavior)
            .field("deadline", &self.deadline)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}
