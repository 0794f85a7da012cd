// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # churn-core
//!
//! Concurrent lifecycle stress harness for resource-management services.
//!
//! Several workers race create/delete (and optionally query) against a
//! service for a bounded duration. Any unexpected failure is funneled into a
//! single shared [`FailureSlot`]; the run passes iff the slot is empty after
//! every worker has joined.
//!
//! - [`FailureSlot`]: single-winner error register shared by all workers
//! - [`Worker`] / [`WorkerBehavior`]: the per-worker state machine
//! - [`Orchestrator`]: spawns, releases and joins the workers of a run
//! - [`AdminClient`]: the seam to the service under test
//!
//! ## Example
//!
//! ```rust,ignore
//! use churn_core::{Orchestrator, RunConfig};
//!
//! let orchestrator = Orchestrator::new(RunConfig::distinct_observing(), factory)?;
//! orchestrator.provision(config_dir).await?;
//! let report = orchestrator.run().await?;
//! report.verdict()?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod failure;
pub mod metrics;
pub mod orchestrator;
pub mod plan;
pub mod report;
#[cfg(test)]
pub mod tests;
pub mod types;
pub mod worker;

pub use client::{
    AdminClient, AdminResponse, ClientFactory, ClientHandle, ClientResult, QueryResponse,
    ResourceShape,
};
pub use config::{ClientSharing, NamingPolicy, RunConfig};
pub use error::{ChurnError, ClientError, NOT_FOUND_MARKERS, Operation, Result, WorkerError};
pub use failure::{Failure, FailureSlot, RecordedError};
pub use metrics::{RunTotals, WorkerStats};
pub use orchestrator::Orchestrator;
pub use plan::{RunPlan, WorkerSpec};
pub use report::{FailureReport, RunReport};
pub use types::{RunId, StopReason, WorkerState};
pub use worker::{Worker, WorkerBehavior};
