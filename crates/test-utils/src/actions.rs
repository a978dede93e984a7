use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;

use buildpipe::registry::{ActionContext, ActionOutput, BoxFuture, TaskAction};

/// Shared record of which actions ran, in completion order.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// How often `entry` was logged.
    pub fn count_of(&self, entry: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.as_str() == entry)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

/// A fake action that:
/// - records its label in the shared [`RunLog`]
/// - immediately succeeds with an empty output.
#[derive(Debug, Clone)]
pub struct RecordingAction {
    label: String,
    log: RunLog,
}

impl RecordingAction {
    pub fn new(label: impl Into<String>, log: RunLog) -> Self {
        Self {
            label: label.into(),
            log,
        }
    }
}

impl TaskAction for RecordingAction {
    fn run(&self, _ctx: ActionContext) -> BoxFuture<anyhow::Result<ActionOutput>> {
        let label = self.label.clone();
        let log = self.log.clone();
        Box::pin(async move {
            log.push(label);
            Ok(ActionOutput::default())
        })
    }
}

/// Records its label, then fails.
#[derive(Debug, Clone)]
pub struct FailingAction {
    label: String,
    log: RunLog,
}

impl FailingAction {
    pub fn new(label: impl Into<String>, log: RunLog) -> Self {
        Self {
            label: label.into(),
            log,
        }
    }
}

impl TaskAction for FailingAction {
    fn run(&self, _ctx: ActionContext) -> BoxFuture<anyhow::Result<ActionOutput>> {
        let label = self.label.clone();
        let log = self.log.clone();
        Box::pin(async move {
            log.push(label.clone());
            Err(anyhow::anyhow!("simulated failure in {label}"))
        })
    }
}

/// Sleeps for `delay`, then records its label and succeeds. For exercising
/// completion order without hand-rolled gating.
#[derive(Debug, Clone)]
pub struct SlowAction {
    label: String,
    log: RunLog,
    delay: Duration,
}

impl SlowAction {
    pub fn new(label: impl Into<String>, log: RunLog, delay: Duration) -> Self {
        Self {
            label: label.into(),
            log,
            delay,
        }
    }
}

impl TaskAction for SlowAction {
    fn run(&self, _ctx: ActionContext) -> BoxFuture<anyhow::Result<ActionOutput>> {
        let label = self.label.clone();
        let log = self.log.clone();
        let delay = self.delay;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            log.push(label);
            Ok(ActionOutput::default())
        })
    }
}

/// Parks until the test hands out a permit, then succeeds.
///
/// The label goes into `started` as soon as the invocation begins and into
/// `done` once it completes, so a test can hold a run open (zero permits),
/// observe that it is in flight, make changes, then release it with
/// `gate.add_permits(1)` and watch what the engine does next.
#[derive(Debug, Clone)]
pub struct GatedAction {
    label: String,
    started: RunLog,
    done: RunLog,
    gate: Arc<Semaphore>,
}

impl GatedAction {
    pub fn new(
        label: impl Into<String>,
        started: RunLog,
        done: RunLog,
        gate: Arc<Semaphore>,
    ) -> Self {
        Self {
            label: label.into(),
            started,
            done,
            gate,
        }
    }
}

impl TaskAction for GatedAction {
    fn run(&self, _ctx: ActionContext) -> BoxFuture<anyhow::Result<ActionOutput>> {
        let label = self.label.clone();
        let started = self.started.clone();
        let done = self.done.clone();
        let gate = self.gate.clone();
        Box::pin(async move {
            started.push(label.clone());
            let permit = gate.acquire().await?;
            // Consume the permit so each add_permits(1) releases one run.
            permit.forget();
            done.push(label);
            Ok(ActionOutput::default())
        })
    }
}
