//! Falsification Tests: Category A - Failure Slot (F001-F005)

use std::collections::HashSet;
use std::sync::Arc;

use churn_core::{ClientError, FailureSlot, Operation, WorkerError};
use tokio::sync::Barrier;

fn create_failure(i: usize) -> WorkerError {
    WorkerError::create_status(format!("collection{i}"), 1)
}

// =============================================================================
// F001-F003: Single Winner
// =============================================================================

/// F001: The first recorded error stays primary under concurrent recording
///
/// # Falsification Attempt
/// Record E1, then release 64 tasks that record concurrently. If the primary
/// is anything but E1, the claim is falsified.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn f001_first_error_wins_under_contention() {
    let slot = FailureSlot::new();
    slot.record("first", WorkerError::create_status("collection0", 7));

    let barrier = Arc::new(Barrier::new(64));
    let handles: Vec<_> = (1..=64)
        .map(|i| {
            let slot = slot.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                slot.record(&format!("worker-{i}"), create_failure(i));
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let failure = slot.snapshot().unwrap();
    assert_eq!(
        failure.primary.worker, "first",
        "F001 FALSIFIED: primary was overwritten by {}",
        failure.primary.worker
    );
    assert!(failure.primary.error.to_string().contains("status 7"));
}

/// F002: No suppressed error is dropped
///
/// # Falsification Attempt
/// Record from 200 OS threads at once; every one must appear exactly once.
#[test]
fn f002_every_error_is_kept() {
    let slot = FailureSlot::new();
    let threads: Vec<_> = (0..200)
        .map(|i| {
            let slot = slot.clone();
            std::thread::spawn(move || slot.record(&format!("worker-{i}"), create_failure(i)))
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    let failure = slot.snapshot().unwrap();
    assert_eq!(failure.len(), 200, "F002 FALSIFIED: errors lost");

    let workers: HashSet<_> = std::iter::once(&failure.primary)
        .chain(failure.suppressed.iter())
        .map(|r| r.worker.clone())
        .collect();
    assert_eq!(workers.len(), 200, "F002 FALSIFIED: duplicate or missing worker");
}

/// F003: Peek reflects the primary as soon as one error is recorded
///
/// # Falsification Attempt
/// Check the slot before and after each of three records.
#[test]
fn f003_peek_is_primary() {
    let slot = FailureSlot::new();
    assert!(slot.peek().is_none());
    assert!(!slot.is_tripped());

    slot.record("a", create_failure(1));
    assert!(slot.is_tripped());
    assert_eq!(slot.peek().unwrap().worker, "a");

    slot.record(
        "b",
        WorkerError::raised(Operation::Delete, "collection2", ClientError::transport("reset")),
    );
    slot.record("c", create_failure(3));
    assert_eq!(slot.peek().unwrap().worker, "a");
    assert_eq!(slot.snapshot().unwrap().suppressed.len(), 2);
}

// =============================================================================
// F004-F005: Isolation
// =============================================================================

/// F004: Independent slots do not interfere
///
/// # Falsification Attempt
/// Record into one slot; a second slot must remain empty.
#[test]
fn f004_slots_are_independent() {
    let a = FailureSlot::new();
    let b = FailureSlot::new();
    a.record("worker-0", create_failure(0));

    assert!(a.is_tripped());
    assert!(!b.is_tripped(), "F004 FALSIFIED: state leaked across slots");
    assert!(b.snapshot().is_none());
}

/// F005: Clones share one slot
///
/// # Falsification Attempt
/// Record through a clone and observe through the original.
#[test]
fn f005_clones_share_state() {
    let original = FailureSlot::new();
    let handle = original.clone();
    handle.record("worker-1", create_failure(1));

    assert!(original.is_tripped(), "F005 FALSIFIED: clone is a copy");
    assert_eq!(original.peek().unwrap().worker, "worker-1");
}
