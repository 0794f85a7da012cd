// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # churn-test
//!
//! Testing infrastructure for churn.
//!
//! This crate provides:
//! - **In-memory cluster**: an [`AdminClient`](churn_core::AdminClient) with
//!   real create/delete/query semantics and per-call latency
//! - **Fault injection**: deterministic, call-counted faults per resource
//! - **Scenario harness**: provisioning, hard timeouts and the named
//!   end-to-end scenarios
//!
//! ## Example
//!
//! ```rust,ignore
//! use churn_test::{Scenario, ScenarioHarness};
//!
//! let harness = ScenarioHarness::for_scenario(Scenario::FaultInjected);
//! let report = harness.run_scenario(Scenario::FaultInjected).await?;
//! assert!(!report.passed());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cluster;
pub mod error;
pub mod fault;
pub mod harness;

pub use cluster::{CallOutcome, CallRecord, ClusterFactory, DEFAULT_LATENCY, InMemoryCluster};
pub use error::{Result, TestError};
pub use fault::{Fault, FaultInjector, FaultPlan, FaultRule, Trigger};
pub use harness::{
    FAULTED_CREATE, FAULTED_WORKER, Scenario, ScenarioHarness, ScenarioHarnessBuilder,
};
