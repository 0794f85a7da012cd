//! Deterministic fault injection.
//!
//! Faults are keyed by resource and operation and fire on a call count, so a
//! test can say "the 5th create of collection3 returns status 1" and get
//! exactly that, every run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use churn_core::{ClientError, Operation};
use parking_lot::Mutex;

/// What an injected fault does to a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Complete the call with a non-zero status. Queries have no status, so
    /// on a query this raises a server error carrying the status instead.
    Status(i32),
    /// Raise the given client error.
    Error(ClientError),
    /// Add latency, then behave normally.
    Delay(Duration),
}

/// When a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// On exactly the nth call (1-based).
    Nth(u64),
    /// On every call from the nth onward.
    From(u64),
    /// On every call.
    Always,
}

impl Trigger {
    const fn matches(self, call: u64) -> bool {
        match self {
            Self::Nth(n) => call == n,
            Self::From(n) => call >= n,
            Self::Always => true,
        }
    }
}

/// A single fault rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultRule {
    /// Resource the rule applies to.
    pub resource: String,
    /// Operation the rule applies to.
    pub op: Operation,
    /// When the rule fires, counted per resource and operation.
    pub trigger: Trigger,
    /// What happens when it fires.
    pub fault: Fault,
}

/// Set of fault rules for a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultPlan {
    rules: Vec<FaultRule>,
}

impl FaultPlan {
    /// A plan with no faults.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Adds a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: FaultRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// The nth `op` on `resource` completes with `status`.
    #[must_use]
    pub fn status_on(self, op: Operation, resource: &str, nth: u64, status: i32) -> Self {
        self.with_rule(FaultRule {
            resource: resource.to_string(),
            op,
            trigger: Trigger::Nth(nth),
            fault: Fault::Status(status),
        })
    }

    /// The nth `op` on `resource` raises `error`.
    #[must_use]
    pub fn error_on(self, op: Operation, resource: &str, nth: u64, error: ClientError) -> Self {
        self.with_rule(FaultRule {
            resource: resource.to_string(),
            op,
            trigger: Trigger::Nth(nth),
            fault: Fault::Error(error),
        })
    }

    /// Every `op` on `resource` suffers `fault`.
    #[must_use]
    pub fn always(self, op: Operation, resource: &str, fault: Fault) -> Self {
        self.with_rule(FaultRule {
            resource: resource.to_string(),
            op,
            trigger: Trigger::Always,
            fault,
        })
    }

    /// Every query of `resource` fails like a server-side malformed resource.
    #[must_use]
    pub fn malformed(self, resource: &str) -> Self {
        self.always(
            Operation::Query,
            resource,
            Fault::Error(ClientError::server(500, "internal error")),
        )
    }

    /// The rules in insertion order.
    #[must_use]
    pub fn rules(&self) -> &[FaultRule] {
        &self.rules
    }

    /// Returns true if the plan injects nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Applies a [`FaultPlan`] to a stream of calls.
#[derive(Debug, Default)]
pub struct FaultInjector {
    plan: FaultPlan,
    calls: Mutex<HashMap<(String, Operation), u64>>,
    injected: AtomicU64,
}

impl FaultInjector {
    /// Creates an injector for a plan.
    #[must_use]
    pub fn new(plan: FaultPlan) -> Self {
        Self {
            plan,
            calls: Mutex::new(HashMap::new()),
            injected: AtomicU64::new(0),
        }
    }

    /// Counts a call and returns the fault to inject, if any.
    ///
    /// The first matching rule wins.
    pub fn on_call(&self, resource: &str, op: Operation) -> Option<Fault> {
        let call = {
            let mut calls = self.calls.lock();
            let count = calls.entry((resource.to_string(), op)).or_insert(0);
            *count += 1;
            *count
        };

        let fault = self
            .plan
            .rules
            .iter()
            .find(|rule| rule.op == op && rule.resource == resource && rule.trigger.matches(call))
            .map(|rule| rule.fault.clone())?;

        self.injected.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(resource, %op, call, ?fault, "injecting fault");
        Some(fault)
    }

    /// Number of calls seen for a resource and operation.
    #[must_use]
    pub fn calls(&self, resource: &str, op: Operation) -> u64 {
        self.calls
            .lock()
            .get(&(resource.to_string(), op))
            .copied()
            .unwrap_or(0)
    }

    /// Number of faults injected so far.
    #[must_use]
    pub fn injected(&self) -> u64 {
        self.injected.load(Ordering::Relaxed)
    }
}
