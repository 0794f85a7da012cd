//! Falsification Tests: Category D - End-to-End Scenarios (F020-F024)
//!
//! All scenarios run thirty seconds of virtual time against the in-memory
//! cluster.

use churn_core::{ClientSharing, NamingPolicy, Operation, StopReason, WorkerBehavior};
use churn_test::{FAULTED_CREATE, FAULTED_WORKER, Scenario, ScenarioHarness};
use tokio::time::Instant;

// =============================================================================
// F020-F021: Scenario A - Distinct Observing Workers
// =============================================================================

/// F020: Ten distinct observing workers pass against a correct service
///
/// # Falsification Attempt
/// Run the full thirty-second scenario.
#[tokio::test(start_paused = true)]
async fn f020_distinct_observing_passes() {
    let scenario = Scenario::DistinctObserving;
    let harness = ScenarioHarness::for_scenario(scenario);

    let report = harness.run_scenario(scenario).await.unwrap();
    assert!(
        report.passed(),
        "F020 FALSIFIED: {}",
        report.verdict().unwrap_err()
    );
    assert_eq!(report.workers.len(), 10);

    let totals = report.totals();
    assert_eq!(totals.failures_recorded, 0);
    assert_eq!(totals.expected_absences, totals.probes);
    for stats in &report.workers {
        assert!(stats.worker.starts_with("create-delete-search-"));
        assert!(stats.iterations > 0);
        assert_eq!(stats.stop_reason(), Some(StopReason::Deadline));
    }
}

/// F021: Scenario A respects its deadline
///
/// # Falsification Attempt
/// Scan every create issued during the scenario.
#[tokio::test(start_paused = true)]
async fn f021_distinct_observing_respects_deadline() {
    let scenario = Scenario::DistinctObserving;
    let harness = ScenarioHarness::for_scenario(scenario);
    let config = scenario.config();
    let duration = config.duration;

    let orchestrator = harness.prepare(config).await.unwrap();
    let deadline = Instant::now() + duration;
    let report = harness.execute(&orchestrator).await.unwrap();

    assert!(report.passed());
    let latency = harness.cluster().latency();
    assert!(report.elapsed < duration + latency * 3);
    for call in harness.cluster().calls() {
        if call.op == Operation::Create {
            assert!(call.at < deadline, "F021 FALSIFIED: late create on {}", call.resource);
        }
    }
}

// =============================================================================
// F022: Scenario B - Shared Configuration
// =============================================================================

/// F022: Two workers reading one configuration never disturb each other
///
/// # Falsification Attempt
/// Run the shared-configuration scenario through one shared client; every
/// create must resolve the configuration and it must still exist afterwards.
#[tokio::test(start_paused = true)]
async fn f022_shared_configuration_passes() {
    let scenario = Scenario::SharedConfig;
    let config = scenario.config();
    assert_eq!(config.behavior, WorkerBehavior::Basic);
    assert_eq!(config.naming, NamingPolicy::SharedConfig);
    assert_eq!(config.clients, ClientSharing::Shared);
    let config_name = config.config_name.clone();

    let harness = ScenarioHarness::for_scenario(scenario);
    let report = harness.run_scenario(scenario).await.unwrap();
    assert!(report.passed(), "F022 FALSIFIED: {:?}", report.failure);

    let cluster = harness.cluster();
    assert_eq!(cluster.configurations().len(), 1);
    assert!(cluster.has_configuration(&config_name));
    assert_eq!(cluster.config_lookups(&config_name), report.totals().creates);
    assert_eq!(cluster.connections(), 2, "provisioning plus one shared client");

    let resources: Vec<_> = report.workers.iter().map(|w| w.resource.as_str()).collect();
    assert_eq!(resources, ["collection0", "collection1"]);
}

// =============================================================================
// F023-F024: Scenario C - Fault Injection
// =============================================================================

/// F023: A forced create status is the primary error
///
/// # Falsification Attempt
/// Force status 1 on the 5th create of worker 3.
#[tokio::test(start_paused = true)]
async fn f023_fault_injected_primary() {
    let scenario = Scenario::FaultInjected;
    let harness = ScenarioHarness::for_scenario(scenario);

    let report = harness.run_scenario(scenario).await.unwrap();
    let err = report.verdict().expect_err("F023 FALSIFIED: fault went unnoticed");

    let failure = err.failure().unwrap();
    let resource = format!("collection{FAULTED_WORKER}");
    assert!(
        failure
            .failure
            .primary
            .error
            .to_string()
            .contains(&format!("failed to create {resource}")),
        "F023 FALSIFIED: primary was {}",
        failure.failure.primary
    );
    assert_eq!(
        failure.failure.primary.worker,
        format!("create-delete-search-{FAULTED_WORKER}")
    );
    assert_eq!(harness.cluster().injected_faults(), 1);
}

/// F024: The faulted run joins every worker promptly
///
/// # Falsification Attempt
/// Every worker must report, all must have observed the failure, and the
/// run must end long before its thirty-second deadline.
#[tokio::test(start_paused = true)]
async fn f024_fault_injected_joins_all() {
    let scenario = Scenario::FaultInjected;
    let harness = ScenarioHarness::for_scenario(scenario);
    let config = scenario.config();
    let duration = config.duration;
    let workers = config.workers;

    let report = harness.run(config).await.unwrap();
    assert_eq!(report.workers.len(), workers, "F024 FALSIFIED: worker lost");

    let faulted = &report.workers[FAULTED_WORKER];
    assert_eq!(faulted.creates, FAULTED_CREATE);
    for stats in &report.workers {
        assert_eq!(stats.stop_reason(), Some(StopReason::FailureObserved));
        assert!(stats.creates <= FAULTED_CREATE + 1);
    }

    let iteration = harness.cluster().latency() * 3;
    assert!(
        report.elapsed <= iteration * u32::try_from(FAULTED_CREATE + 1).unwrap(),
        "F024 FALSIFIED: run took {:?}",
        report.elapsed
    );
    assert!(report.elapsed < duration);
}
