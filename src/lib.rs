//! Churn: concurrent lifecycle stress harness
//!
//! Races create/delete/query workers against a resource-management service
//! and turns every unexpected failure into a single verdict.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use churn::prelude::*;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let harness = ScenarioHarness::for_scenario(Scenario::DistinctObserving);
//! let report = harness.run_scenario(Scenario::DistinctObserving).await?;
//! report.verdict()?;
//! # Ok(())
//! # }
//! ```

pub use churn_core as core;
pub use churn_test as testing;

/// Prelude module for common imports.
pub mod prelude {
    pub use churn_core::{
        AdminClient, ChurnError, ClientError, ClientFactory, ClientHandle, FailureSlot,
        Orchestrator, RunConfig, RunReport, Worker, WorkerBehavior,
    };
    pub use churn_test::{FaultPlan, InMemoryCluster, Scenario, ScenarioHarness};
}
