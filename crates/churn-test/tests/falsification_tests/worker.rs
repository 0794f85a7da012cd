//! Falsification Tests: Category B - Worker Loop and Probe Policy (F006-F012)

use std::path::Path;
use std::time::Duration;

use churn_core::{
    ClientError, FailureSlot, Operation, StopReason, Worker, WorkerBehavior,
    WorkerError, WorkerSpec,
};
use churn_test::{CallOutcome, Fault, FaultPlan, InMemoryCluster};
use tokio::time::Instant;

const RESOURCE: &str = "collection0";

fn spec() -> WorkerSpec {
    WorkerSpec {
        label: "create-delete-0".to_string(),
        resource: RESOURCE.to_string(),
        config_name: RESOURCE.to_string(),
    }
}

async fn provisioned(faults: FaultPlan) -> InMemoryCluster {
    let cluster = InMemoryCluster::with_faults(faults);
    cluster
        .client()
        .upload_configuration(Path::new("conf"), RESOURCE)
        .await
        .unwrap();
    cluster
}

fn worker(
    cluster: &InMemoryCluster,
    behavior: WorkerBehavior,
    duration: Duration,
    failures: &FailureSlot,
) -> (Worker, Instant) {
    let deadline = Instant::now() + duration;
    let worker = Worker::new(spec(), behavior, deadline, cluster.client(), failures.clone());
    (worker, deadline)
}

// =============================================================================
// F006-F008: Deadline
// =============================================================================

/// F006: No create starts at or after the deadline
///
/// # Falsification Attempt
/// Run a basic worker for one second and scan the call log for a create
/// issued at or after the deadline.
#[tokio::test(start_paused = true)]
async fn f006_no_create_after_deadline() {
    let cluster = provisioned(FaultPlan::none()).await;
    let failures = FailureSlot::new();
    let (worker, deadline) = worker(
        &cluster,
        WorkerBehavior::Basic,
        Duration::from_secs(1),
        &failures,
    );

    let stats = worker.run().await;
    assert_eq!(stats.stop_reason(), Some(StopReason::Deadline));
    assert!(stats.iterations > 0);

    for call in cluster.calls().iter().filter(|c| c.op == Operation::Create) {
        assert!(
            call.at < deadline,
            "F006 FALSIFIED: create issued {:?} past the deadline",
            call.at - deadline
        );
    }
}

/// F007: The last operation starts before deadline plus one call's latency
///
/// # Falsification Attempt
/// Find the latest call in the log of a basic worker.
#[tokio::test(start_paused = true)]
async fn f007_overrun_is_one_call() {
    let cluster = provisioned(FaultPlan::none()).await;
    let failures = FailureSlot::new();
    let (worker, deadline) = worker(
        &cluster,
        WorkerBehavior::Basic,
        Duration::from_millis(995),
        &failures,
    );

    worker.run().await;

    let last = cluster.calls().iter().map(|c| c.at).max().unwrap();
    assert!(
        last < deadline + cluster.latency(),
        "F007 FALSIFIED: last call started {:?} past the deadline",
        last - deadline
    );
}

/// F008: A worker that sees an already tripped slot issues nothing
///
/// # Falsification Attempt
/// Trip the slot before the worker starts.
#[tokio::test(start_paused = true)]
async fn f008_tripped_slot_stops_before_first_call() {
    let cluster = provisioned(FaultPlan::none()).await;
    let failures = FailureSlot::new();
    failures.record("other", WorkerError::create_status("collection9", 1));
    let (worker, _) = worker(
        &cluster,
        WorkerBehavior::Observing,
        Duration::from_secs(30),
        &failures,
    );

    let stats = worker.run().await;
    assert_eq!(stats.stop_reason(), Some(StopReason::FailureObserved));
    assert_eq!(stats.iterations, 0);
    assert!(cluster.calls().is_empty(), "F008 FALSIFIED: worker issued calls");
}

// =============================================================================
// F009-F012: Probe Policy and Recording
// =============================================================================

/// F009: Probing a deleted resource never records a failure
///
/// # Falsification Attempt
/// Run an observing worker against a correct cluster; every probe hits the
/// just-deleted resource.
#[tokio::test(start_paused = true)]
async fn f009_not_found_probe_is_swallowed() {
    let cluster = provisioned(FaultPlan::none()).await;
    let failures = FailureSlot::new();
    let (worker, _) = worker(
        &cluster,
        WorkerBehavior::Observing,
        Duration::from_secs(2),
        &failures,
    );

    let stats = worker.run().await;
    assert!(stats.probes > 0);
    assert_eq!(stats.expected_absences, stats.probes);
    assert!(failures.snapshot().is_none(), "F009 FALSIFIED: absence recorded");
}

/// F010: A server error on probe is recorded
///
/// # Falsification Attempt
/// Make the resource malformed server-side so every query returns
/// "500 internal error".
#[tokio::test(start_paused = true)]
async fn f010_internal_error_probe_is_recorded() {
    let cluster = provisioned(FaultPlan::none().malformed(RESOURCE)).await;
    let failures = FailureSlot::new();
    let (worker, _) = worker(
        &cluster,
        WorkerBehavior::Observing,
        Duration::from_secs(2),
        &failures,
    );

    let stats = worker.run().await;
    let failure = failures.snapshot().expect("F010 FALSIFIED: server error swallowed");
    assert_eq!(failure.primary.error.operation(), Operation::Query);
    assert!(failure.primary.error.to_string().contains("internal error"));
    assert_eq!(stats.iterations, 1);
    assert_eq!(stats.stop_reason(), Some(StopReason::FailureObserved));
}

/// F011: A message-only not-found marker is still honored
///
/// # Falsification Attempt
/// Return a generic server error whose message says "Can not find".
#[tokio::test(start_paused = true)]
async fn f011_message_fallback_is_swallowed() {
    let faults = FaultPlan::none().always(
        Operation::Query,
        RESOURCE,
        Fault::Error(ClientError::server(400, "Can not find collection0")),
    );
    let cluster = provisioned(faults).await;
    let failures = FailureSlot::new();
    let (worker, _) = worker(
        &cluster,
        WorkerBehavior::Observing,
        Duration::from_secs(1),
        &failures,
    );

    let stats = worker.run().await;
    assert!(stats.expected_absences > 0);
    assert!(failures.snapshot().is_none(), "F011 FALSIFIED: fallback ignored");
}

/// F012: A non-zero status is recorded as a failure
///
/// # Falsification Attempt
/// Force status 2 on the third delete. The failure must be a status
/// failure naming the resource, and no retry may follow.
#[tokio::test(start_paused = true)]
async fn f012_status_failure_is_recorded() {
    let cluster =
        provisioned(FaultPlan::none().status_on(Operation::Delete, RESOURCE, 3, 2)).await;
    let failures = FailureSlot::new();
    let (worker, _) = worker(&cluster, WorkerBehavior::Basic, Duration::from_secs(30), &failures);

    let stats = worker.run().await;
    let failure = failures.snapshot().unwrap();
    assert!(failure.primary.error.is_status_failure());
    assert_eq!(
        failure.primary.error.to_string(),
        "failed to delete collection0 (status 2)"
    );
    assert_eq!(stats.deletes, 3, "F012 FALSIFIED: delete was retried");

    let statuses = cluster
        .calls()
        .iter()
        .filter(|c| matches!(c.outcome, CallOutcome::Status(_)))
        .count();
    assert_eq!(statuses, 1);
}
