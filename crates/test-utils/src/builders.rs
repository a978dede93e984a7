#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use buildpipe::fs::mock::MockFileSystem;
use buildpipe::orchestrator::BuildOrchestrator;
use buildpipe::registry::Task;

use crate::actions::{FailingAction, GatedAction, RecordingAction, RunLog, SlowAction};

/// An orchestrator over a fresh in-memory filesystem.
pub fn mock_orchestrator() -> (BuildOrchestrator, Arc<MockFileSystem>) {
    let fs = Arc::new(MockFileSystem::new());
    let orchestrator = BuildOrchestrator::new(fs.clone());
    (orchestrator, fs)
}

/// A task whose action records `name` in `log` and succeeds.
pub fn recording_task(name: &str, log: &RunLog) -> Task {
    Task::new(name, Arc::new(RecordingAction::new(name, log.clone())))
}

/// A task whose action records `name` in `log`, then fails.
pub fn failing_task(name: &str, log: &RunLog) -> Task {
    Task::new(name, Arc::new(FailingAction::new(name, log.clone())))
}

/// A task whose action sleeps for `delay` before recording `name`.
pub fn slow_task(name: &str, log: &RunLog, delay: Duration) -> Task {
    Task::new(name, Arc::new(SlowAction::new(name, log.clone(), delay)))
}

/// A task whose action parks on `gate` until the test releases a permit.
/// Starts are recorded in `started`, completions in `done`.
pub fn gated_task(name: &str, started: &RunLog, done: &RunLog, gate: &Arc<Semaphore>) -> Task {
    Task::new(
        name,
        Arc::new(GatedAction::new(name, started.clone(), done.clone(), gate.clone())),
    )
}
