//! Run orchestration.
//!
//! # Run protocol
//! 1. Create one [`FailureSlot`] for the run
//! 2. Open client handles (one shared, or one per worker)
//! 3. Bind each worker to its names, the shared deadline and the slot
//! 4. Release all workers together through a barrier
//! 5. Join every worker, close the clients, read the slot
//!
//! Configurations referenced by the plan must already exist on the service
//! when [`Orchestrator::run`] is called. [`Orchestrator::provision`] uploads
//! them for callers that own that setup step.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Barrier;
use tokio::task::{Id, JoinSet};
use tokio::time::Instant;
use tracing::Instrument;

use crate::client::{ClientFactory, ClientHandle};
use crate::config::{ClientSharing, RunConfig};
use crate::error::{ChurnError, Result};
use crate::failure::FailureSlot;
use crate::metrics::WorkerStats;
use crate::plan::RunPlan;
use crate::report::RunReport;
use crate::types::RunId;
use crate::worker::Worker;

/// Builds, starts and joins the workers of a run.
pub struct Orchestrator {
    config: RunConfig,
    plan: RunPlan,
    factory: Arc<dyn ClientFactory>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator for a validated configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: RunConfig, factory: impl ClientFactory + 'static) -> Result<Self> {
        config.validate()?;
        let plan = RunPlan::from_config(&config);
        Ok(Self {
            config,
            plan,
            factory: Arc::new(factory),
        })
    }

    /// Replaces the derived plan with an explicit one.
    ///
    /// # Errors
    /// Returns an error if the plan is empty or two workers share a resource.
    pub fn with_plan(mut self, plan: RunPlan) -> Result<Self> {
        if plan.is_empty() {
            return Err(ChurnError::config("plan must contain at least one worker"));
        }
        if !plan.resources_are_exclusive() {
            return Err(ChurnError::config("each worker must own a distinct resource"));
        }
        self.plan = plan;
        Ok(self)
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The resolved worker plan.
    #[must_use]
    pub const fn plan(&self) -> &RunPlan {
        &self.plan
    }

    /// Uploads every configuration the plan references.
    ///
    /// # Errors
    /// Returns [`ChurnError::Setup`] on the first failed connect or upload.
    pub async fn provision(&self, config_dir: &Path) -> Result<()> {
        let client = self.connect()?;
        let result = self.upload_all(&client, config_dir).await;
        close_quietly(&client).await;
        result
    }

    async fn upload_all(&self, client: &ClientHandle, config_dir: &Path) -> Result<()> {
        for name in self.plan.config_names() {
            client
                .upload_configuration(config_dir, name)
                .await
                .map_err(|e| ChurnError::setup(format!("failed to upload config {name}: {e}")))?;
            tracing::debug!(config = name, dir = %config_dir.display(), "configuration uploaded");
        }
        Ok(())
    }

    /// Runs all workers to completion and reports what happened.
    ///
    /// A failed run is still `Ok`; inspect [`RunReport::passed`] or call
    /// [`RunReport::verdict`].
    ///
    /// # Errors
    /// Returns an error if a client cannot be opened or a worker task cannot
    /// be joined.
    pub async fn run(&self) -> Result<RunReport> {
        let run_id = RunId::new();
        let span = tracing::info_span!("run", %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    /// Runs all workers and fails unless the failure slot stayed empty.
    ///
    /// # Errors
    /// Returns [`ChurnError::Failed`] listing the primary and all suppressed
    /// errors, or any error from [`run`](Self::run).
    pub async fn run_checked(&self) -> Result<RunReport> {
        let report = self.run().await?;
        report.verdict()?;
        Ok(report)
    }

    async fn run_inner(&self, run_id: RunId) -> Result<RunReport> {
        let workers = self.plan.len();
        tracing::info!(
            workers,
            behavior = %self.config.behavior,
            duration = ?self.config.duration,
            naming = ?self.config.naming,
            clients = ?self.config.clients,
            "starting run"
        );

        let failures = FailureSlot::new();
        let clients = self.open_clients(workers).await?;

        let start = Instant::now();
        let deadline = start + self.config.duration;
        let barrier = Arc::new(Barrier::new(workers));

        // Dropping the set aborts every worker still running.
        let mut set = JoinSet::new();
        let mut labels = HashMap::with_capacity(workers);
        for (i, spec) in self.plan.workers().iter().enumerate() {
            let client = Arc::clone(&clients[i % clients.len()]);
            let label = spec.label.clone();
            let worker = Worker::new(
                spec.clone(),
                self.config.behavior,
                deadline,
                client,
                failures.clone(),
            )
            .with_query(self.config.query.clone());
            let barrier = Arc::clone(&barrier);

            let handle = set.spawn(
                async move {
                    barrier.wait().await;
                    (i, worker.run().await)
                }
                .in_current_span(),
            );
            labels.insert(handle.id(), label);
        }

        let stats = join_all(set, labels, workers).await;

        for client in &clients {
            close_quietly(client).await;
        }

        let stats = stats?;

        let report = RunReport {
            run_id,
            workers: stats,
            elapsed: start.elapsed(),
            failure: failures.snapshot(),
        };
        log_verdict(&report, self.config.duration);
        Ok(report)
    }

    fn connect(&self) -> Result<ClientHandle> {
        self.factory
            .connect()
            .map_err(|e| ChurnError::setup(format!("failed to open client: {e}")))
    }

    /// Opens the run's clients. Handles opened before a failed connect are
    /// closed again.
    async fn open_clients(&self, workers: usize) -> Result<Vec<ClientHandle>> {
        let wanted = match self.config.clients {
            ClientSharing::Shared => 1,
            ClientSharing::PerWorker => workers,
        };
        let mut clients = Vec::with_capacity(wanted);
        for _ in 0..wanted {
            match self.connect() {
                Ok(client) => clients.push(client),
                Err(e) => {
                    for client in &clients {
                        close_quietly(client).await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(clients)
    }
}

/// Joins every worker, even after one fails to join. Stats come back in
/// plan order.
async fn join_all(
    mut set: JoinSet<(usize, WorkerStats)>,
    mut labels: HashMap<Id, String>,
    workers: usize,
) -> Result<Vec<WorkerStats>> {
    let mut slots: Vec<Option<WorkerStats>> = (0..workers).map(|_| None).collect();
    let mut first_error = None;

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((i, s)) => slots[i] = Some(s),
            Err(e) => {
                let worker = labels.remove(&e.id()).unwrap_or_default();
                tracing::error!(worker = %worker, error = %e, "worker did not join");
                first_error.get_or_insert(ChurnError::Join {
                    worker,
                    reason: e.to_string(),
                });
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(slots.into_iter().flatten().collect()),
    }
}

async fn close_quietly(client: &ClientHandle) {
    if let Err(e) = client.close().await {
        tracing::warn!(error = %e, "failed to close client");
    }
}

fn log_verdict(report: &RunReport, duration: Duration) {
    let totals = report.totals();
    match &report.failure {
        None => tracing::info!(
            iterations = totals.iterations,
            creates = totals.creates,
            deletes = totals.deletes,
            probes = totals.probes,
            expected_absences = totals.expected_absences,
            elapsed = ?report.elapsed,
            "run passed"
        ),
        Some(failure) => tracing::error!(
            primary = %failure.primary,
            suppressed = failure.suppressed.len(),
            iterations = totals.iterations,
            elapsed = ?report.elapsed,
            overrun = ?report.elapsed.saturating_sub(duration),
            "run failed"
        ),
    }
}
