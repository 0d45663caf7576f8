//! Shared helpers for scenario integration tests.

#![allow(dead_code)]

use std::thread;
use std::time::{Duration, Instant};

use threadlab_core::{
    LockName, ScenarioConfig, ScenarioContext, ScenarioController, StartOrdering, WorkerSnapshot,
};

/// Upper bound on how long any test waits for a steady state.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Controller with short timings suitable for tests.
pub fn fast_controller() -> ScenarioController {
    ScenarioController::new(
        ScenarioContext::new(),
        ScenarioConfig {
            grace_period_ms: 200,
            hold_delay_ms: 150,
            start_ordering: StartOrdering::Handshake,
        },
    )
}

/// Polls the registry until `pred` holds for the snapshot, panicking after
/// [`SETTLE_TIMEOUT`].
pub fn wait_until(
    controller: &ScenarioController,
    what: &str,
    pred: impl Fn(&[WorkerSnapshot]) -> bool,
) -> Vec<WorkerSnapshot> {
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    loop {
        let snapshot = controller.context().workers().snapshot();
        if pred(&snapshot) {
            return snapshot;
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting for {what}: {snapshot:#?}"
        );
        thread::sleep(Duration::from_millis(10));
    }
}

/// Asserts that no lock is recorded as held by more than one worker.
pub fn assert_mutual_exclusion(snapshot: &[WorkerSnapshot]) {
    for lock in LockName::ALL {
        let holders = snapshot.iter().filter(|w| w.held.contains(&lock)).count();
        assert!(holders <= 1, "{lock} held by {holders} workers: {snapshot:#?}");
    }
}

/// Returns `true` if a fresh thread manages to take `lock` within `window`.
pub fn third_party_acquires(
    controller: &ScenarioController,
    lock: LockName,
    window: Duration,
) -> bool {
    let deadline = Instant::now() + window;
    while Instant::now() < deadline {
        if !controller.context().locks().is_held(lock) {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}
