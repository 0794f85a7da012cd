//! Scenario test harness.
//!
//! Binds an [`InMemoryCluster`] to the orchestrator: uploads the
//! configurations a run needs, runs it under a hard timeout, and leaves the
//! cluster around for inspection.

use std::path::PathBuf;
use std::time::Duration;

use churn_core::{Operation, Orchestrator, RunConfig, RunReport};

use crate::cluster::{DEFAULT_LATENCY, InMemoryCluster};
use crate::error::{Result, TestError};
use crate::fault::FaultPlan;

/// Worker whose create is failed in [`Scenario::FaultInjected`].
pub const FAULTED_WORKER: usize = 3;

/// Create call of [`FAULTED_WORKER`] that returns a non-zero status.
pub const FAULTED_CREATE: u64 = 5;

/// The named end-to-end scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Ten observing workers on distinct resources and configurations.
    DistinctObserving,
    /// Two basic workers on distinct resources sharing one configuration.
    SharedConfig,
    /// Like [`DistinctObserving`](Self::DistinctObserving), with a non-zero
    /// create status forced on one worker.
    FaultInjected,
}

impl Scenario {
    /// Run configuration for the scenario.
    #[must_use]
    pub fn config(self) -> RunConfig {
        match self {
            Self::DistinctObserving | Self::FaultInjected => RunConfig::distinct_observing(),
            Self::SharedConfig => RunConfig::shared_config(),
        }
    }

    /// Faults the cluster applies during the scenario.
    #[must_use]
    pub fn faults(self) -> FaultPlan {
        match self {
            Self::DistinctObserving | Self::SharedConfig => FaultPlan::none(),
            Self::FaultInjected => {
                let config = self.config();
                let resource = format!("{}{FAULTED_WORKER}", config.resource_prefix);
                FaultPlan::none().status_on(Operation::Create, &resource, FAULTED_CREATE, 1)
            }
        }
    }
}

/// Test harness for running scenarios against an in-memory cluster.
#[derive(Debug)]
pub struct ScenarioHarness {
    cluster: InMemoryCluster,
    config_dir: PathBuf,
    grace: Duration,
}

impl ScenarioHarness {
    /// Creates a new harness builder.
    #[must_use]
    pub fn builder() -> ScenarioHarnessBuilder {
        ScenarioHarnessBuilder::default()
    }

    /// Creates a harness over a fault-free cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a harness with the faults the scenario needs.
    #[must_use]
    pub fn for_scenario(scenario: Scenario) -> Self {
        Self::builder().with_faults(scenario.faults()).build()
    }

    /// The cluster under test.
    #[must_use]
    pub const fn cluster(&self) -> &InMemoryCluster {
        &self.cluster
    }

    /// Slack allowed past the run duration before the run counts as hung.
    #[must_use]
    pub const fn grace(&self) -> Duration {
        self.grace
    }

    /// Builds an orchestrator wired to the cluster.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn orchestrator(&self, config: RunConfig) -> Result<Orchestrator> {
        Ok(Orchestrator::new(config, self.cluster.factory())?)
    }

    /// Builds an orchestrator and uploads every configuration it needs.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or an upload fails.
    pub async fn prepare(&self, config: RunConfig) -> Result<Orchestrator> {
        let orchestrator = self.orchestrator(config)?;
        orchestrator
            .provision(&self.config_dir)
            .await
            .map_err(|e| TestError::harness(format!("provisioning failed: {e}")))?;
        Ok(orchestrator)
    }

    /// Runs a prepared orchestrator, failing if it outlives its duration
    /// plus the grace period.
    ///
    /// # Errors
    /// Returns [`TestError::Timeout`] if the run hangs, or any run error.
    pub async fn execute(&self, orchestrator: &Orchestrator) -> Result<RunReport> {
        let limit = orchestrator.config().duration + self.grace;
        match tokio::time::timeout(limit, orchestrator.run()).await {
            Ok(report) => Ok(report?),
            Err(_) => {
                tracing::error!(limit = ?limit, "run did not finish");
                Err(TestError::Timeout(limit))
            }
        }
    }

    /// Prepares and runs a configuration.
    ///
    /// # Errors
    /// See [`prepare`](Self::prepare) and [`execute`](Self::execute).
    pub async fn run(&self, config: RunConfig) -> Result<RunReport> {
        let orchestrator = self.prepare(config).await?;
        self.execute(&orchestrator).await
    }

    /// Runs a named scenario.
    ///
    /// The harness should come from [`for_scenario`](Self::for_scenario) so
    /// the scenario's faults are installed.
    ///
    /// # Errors
    /// See [`run`](Self::run).
    pub async fn run_scenario(&self, scenario: Scenario) -> Result<RunReport> {
        tracing::info!(?scenario, "running scenario");
        self.run(scenario.config()).await
    }
}

impl Default for ScenarioHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`ScenarioHarness`].
#[derive(Debug, Default)]
pub struct ScenarioHarnessBuilder {
    latency: Option<Duration>,
    faults: FaultPlan,
    config_dir: Option<PathBuf>,
    grace: Option<Duration>,
}

impl ScenarioHarnessBuilder {
    /// Sets the per-call cluster latency.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Installs a fault plan.
    #[must_use]
    pub fn with_faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    /// Sets the directory passed to configuration uploads.
    #[must_use]
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Sets the grace period past the run duration.
    #[must_use]
    pub const fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = Some(grace);
        self
    }

    /// Builds the harness.
    ///
    /// The default grace is a few rounds of the slowest iteration.
    #[must_use]
    pub fn build(self) -> ScenarioHarness {
        let latency = self.latency.unwrap_or(DEFAULT_LATENCY);
        ScenarioHarness {
            cluster: InMemoryCluster::new(latency, self.faults),
            config_dir: self
                .config_dir
                .unwrap_or_else(|| PathBuf::from("configsets/minimal/conf")),
            grace: self.grace.unwrap_or(latency * 10),
        }
    }
}
