//! Deadlock scenario integration tests.
//!
//! Verifies circular wait between the two participants, compounding across
//! invocations, and registry growth under concurrent triggers.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{assert_mutual_exclusion, fast_controller, wait_until};
use threadlab_core::{LockName, ScenarioKind, WorkerRole, WorkerState};

#[test]
fn participants_reach_circular_wait() {
    let controller = fast_controller();
    let ack = controller.start_deadlock_scenario();
    assert_eq!(ack.kind, ScenarioKind::Deadlock);
    assert_eq!(ack.message(), "Deadlock scenario initiated!");

    let snapshot = wait_until(&controller, "both participants blocked", |ws| {
        ws.len() == 2 && ws.iter().all(|w| w.state == WorkerState::BlockedOnLock)
    });

    let a = snapshot
        .iter()
        .find(|w| w.role == WorkerRole::DeadlockA)
        .unwrap();
    let b = snapshot
        .iter()
        .find(|w| w.role == WorkerRole::DeadlockB)
        .unwrap();
    assert_eq!(a.name, "DeadlockThread-1");
    assert_eq!(b.name, "DeadlockThread-2");
    assert_eq!(a.held, vec![LockName::LockA]);
    assert_eq!(a.waiting_on, Some(LockName::LockB));
    assert_eq!(b.held, vec![LockName::LockB]);
    assert_eq!(b.waiting_on, Some(LockName::LockA));
    assert_mutual_exclusion(&snapshot);

    let locks = controller.context().locks();
    assert!(locks.is_held(LockName::LockA));
    assert!(locks.is_held(LockName::LockB));
}

#[test]
fn deadlock_never_resolves() {
    let controller = fast_controller();
    controller.start_deadlock_scenario();
    wait_until(&controller, "deadlock", |ws| {
        ws.iter().all(|w| w.state == WorkerState::BlockedOnLock)
    });

    thread::sleep(Duration::from_millis(500));
    assert_eq!(
        controller
            .context()
            .workers()
            .count_in_state(WorkerState::BlockedOnLock),
        2
    );
    assert_eq!(
        controller
            .context()
            .workers()
            .count_in_state(WorkerState::Terminated),
        0
    );
}

#[test]
fn back_to_back_invocations_compound() {
    let controller = fast_controller();
    controller.start_deadlock_scenario();
    controller.start_deadlock_scenario();
    assert_eq!(controller.context().workers().len(), 4);

    let snapshot = wait_until(&controller, "all four participants blocked", |ws| {
        ws.len() == 4 && ws.iter().all(|w| w.state == WorkerState::BlockedOnLock)
    });

    // Exactly one participant per lock holds it; the rest queue behind.
    let holding: Vec<_> = snapshot.iter().filter(|w| !w.held.is_empty()).collect();
    assert_eq!(holding.len(), 2);
    assert_mutual_exclusion(&snapshot);
    for worker in &snapshot {
        let waiting_on = worker.waiting_on.unwrap();
        assert!(controller.context().locks().is_held(waiting_on));
    }
}

#[test]
fn registry_grows_by_two_per_trigger_across_threads() {
    let controller = Arc::new(fast_controller());
    let callers: Vec<_> = (0..8)
        .map(|n| {
            let controller = Arc::clone(&controller);
            thread::spawn(move || {
                for _ in 0..3 {
                    if n % 2 == 0 {
                        controller.start_deadlock_scenario();
                    } else {
                        controller.start_blocking_scenario();
                    }
                }
            })
        })
        .collect();
    for caller in callers {
        caller.join().unwrap();
    }

    let registry = controller.context().workers();
    assert_eq!(registry.len(), 2 * 8 * 3);

    let snapshot = registry.snapshot();
    let mut ids: Vec<_> = snapshot.iter().map(|w| w.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), snapshot.len());
}
