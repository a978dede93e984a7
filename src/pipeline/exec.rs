// src/pipeline/exec.rs

//! Execution of pipeline nodes.
//!
//! A run holds one [`TaskCell`] per reachable task. The cell memoizes the
//! task's outcome in a `OnceCell`, so a task referenced from several places
//! in the tree (directly or through `depends_on`) executes at most once per
//! run; concurrent referers await the same execution and share its result,
//! including failure.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use anyhow::anyhow;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::errors::{BuildError, EngineError};
use crate::fs::FileSystem;
use crate::pattern::PatternMatcher;
use crate::pipeline::node::PipelineNode;
use crate::registry::{ActionContext, BoxFuture, Task, TaskName};

/// Per-run state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Linked into the run but not yet dispatched.
    Pending,
    /// Action currently executing.
    Running,
    /// Action completed successfully.
    Succeeded,
    /// Action failed, or a dependency failed before the action could run.
    Failed,
}

/// What a completed leaf task reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub name: TaskName,
    /// Resolved input files the action received.
    pub inputs: usize,
    /// Files the action wrote.
    pub written: usize,
}

/// Last-successful-run markers, keyed by task name.
///
/// A marker is the instant the task's last successful run started, so files
/// modified while that run was still executing are picked up by the next
/// incremental resolution. Failed runs do not advance the marker.
#[derive(Debug, Default)]
pub(crate) struct MarkerStore {
    markers: Mutex<HashMap<TaskName, SystemTime>>,
}

impl MarkerStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, task: &str) -> Option<SystemTime> {
        self.markers.lock().unwrap().get(task).copied()
    }

    pub(crate) fn record(&self, task: &str, started: SystemTime) {
        self.markers.lock().unwrap().insert(task.to_string(), started);
    }
}

type CellResult = Result<(), BuildError>;

/// Per-run slot for one task: definition, observable state, and the
/// memoized outcome shared by every referer in the run.
pub(crate) struct TaskCell {
    task: Arc<Task>,
    state: Mutex<RunState>,
    done: OnceCell<CellResult>,
}

impl TaskCell {
    pub(crate) fn new(task: Arc<Task>) -> Self {
        Self {
            task,
            state: Mutex::new(RunState::Pending),
            done: OnceCell::new(),
        }
    }

    pub(crate) fn task(&self) -> &Arc<Task> {
        &self.task
    }

    fn set_state(&self, next: RunState) {
        let mut state = self.state.lock().unwrap();
        debug!(task = %self.task.name(), from = ?*state, to = ?next, "task state change");
        *state = next;
    }
}

/// Shared state for one run of a node tree.
pub(crate) struct RunContext {
    matcher: PatternMatcher,
    fs: Arc<dyn FileSystem>,
    cells: HashMap<TaskName, Arc<TaskCell>>,
    markers: Arc<MarkerStore>,
    reports: Mutex<Vec<TaskReport>>,
}

impl RunContext {
    pub(crate) fn new(
        matcher: PatternMatcher,
        fs: Arc<dyn FileSystem>,
        cells: HashMap<TaskName, Arc<TaskCell>>,
        markers: Arc<MarkerStore>,
    ) -> Self {
        Self {
            matcher,
            fs,
            cells,
            markers,
            reports: Mutex::new(Vec::new()),
        }
    }

    /// Reports of the leaf tasks that completed so far, in completion order.
    pub(crate) fn take_reports(&self) -> Vec<TaskReport> {
        std::mem::take(&mut *self.reports.lock().unwrap())
    }
}

/// Run a node tree to completion.
///
/// Series children run strictly in sequence with an early return on the
/// first failure. Parallel children are spawned into a `JoinSet`; when one
/// fails the group keeps joining the remaining children, so running
/// siblings always finish, and the first failure in completion order
/// becomes the group's result.
pub(crate) fn run_node(ctx: Arc<RunContext>, node: PipelineNode) -> BoxFuture<CellResult> {
    Box::pin(async move {
        match node {
            PipelineNode::Task(name) => run_task(ctx, name).await,
            PipelineNode::Series(children) => {
                for child in children {
                    run_node(ctx.clone(), child).await?;
                }
                Ok(())
            }
            PipelineNode::Parallel(children) => run_parallel(ctx, children).await,
        }
    })
}

async fn run_parallel(ctx: Arc<RunContext>, children: Vec<PipelineNode>) -> CellResult {
    let mut set = JoinSet::new();
    for child in children {
        set.spawn(run_node(ctx.clone(), child));
    }

    let mut first_failure: Option<BuildError> = None;
    while let Some(joined) = set.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(join_err) => Err(BuildError::new(
                "parallel group",
                EngineError::Transform {
                    task: "parallel group".to_string(),
                    source: anyhow!("child task panicked: {join_err}"),
                },
            )),
        };
        if let Err(err) = outcome {
            if first_failure.is_none() {
                warn!(
                    task = %err.task,
                    "parallel child failed; waiting for running siblings"
                );
                first_failure = Some(err);
            }
        }
    }

    match first_failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn run_task(ctx: Arc<RunContext>, name: TaskName) -> CellResult {
    let cell = match ctx.cells.get(&name) {
        Some(cell) => cell.clone(),
        // The link phase puts a cell in place for every reachable task, so
        // this only fires for nodes that bypassed linking.
        None => {
            return Err(BuildError::new(
                name.clone(),
                EngineError::UnknownTask(name),
            ))
        }
    };

    let init_ctx = ctx.clone();
    let init_cell = cell.clone();
    cell.done
        .get_or_init(|| execute_leaf(init_ctx, init_cell))
        .await
        .clone()
}

async fn execute_leaf(ctx: Arc<RunContext>, cell: Arc<TaskCell>) -> CellResult {
    let task = cell.task.clone();
    let name = task.name().to_string();

    if !task.depends_on().is_empty() {
        let deps: Vec<PipelineNode> = task
            .depends_on()
            .iter()
            .cloned()
            .map(PipelineNode::Task)
            .collect();
        if let Err(err) = run_node(ctx.clone(), PipelineNode::Parallel(deps)).await {
            warn!(
                task = %name,
                failed = %err.task,
                "dependency failed; task will not run"
            );
            cell.set_state(RunState::Failed);
            return Err(err);
        }
    }

    let started = SystemTime::now();
    cell.set_state(RunState::Running);

    let files = match resolve_inputs(&ctx, &task) {
        Ok(files) => files,
        Err(err) => {
            warn!(task = %name, error = %err, "input resolution failed");
            cell.set_state(RunState::Failed);
            return Err(BuildError::new(&name, err));
        }
    };

    let inputs = files.len();
    debug!(task = %name, inputs, "task dispatched");

    let action_ctx = ActionContext {
        files,
        base: task
            .input()
            .map(|p| p.base().to_path_buf())
            .unwrap_or_default(),
        dest: task.dest().map(PathBuf::from).unwrap_or_default(),
        fs: ctx.fs.clone(),
    };

    match task.action().run(action_ctx).await {
        Ok(output) => {
            cell.set_state(RunState::Succeeded);
            ctx.markers.record(&name, started);
            let written = output.written.len();
            ctx.reports.lock().unwrap().push(TaskReport {
                name: name.clone(),
                inputs,
                written,
            });
            info!(task = %name, inputs, written, "task finished");
            Ok(())
        }
        Err(cause) => {
            cell.set_state(RunState::Failed);
            warn!(task = %name, error = %cause, "task action failed");
            Err(BuildError::new(
                &name,
                EngineError::Transform {
                    task: name.clone(),
                    source: cause,
                },
            ))
        }
    }
}

/// Resolve a task's input files. Incremental tasks with a recorded marker
/// only see files modified after their last successful run; the first run
/// of an incremental task sees the full set.
fn resolve_inputs(ctx: &RunContext, task: &Task) -> crate::errors::Result<Vec<PathBuf>> {
    let pattern = match task.input() {
        Some(pattern) => pattern,
        None => return Ok(Vec::new()),
    };

    if task.is_incremental() {
        if let Some(marker) = ctx.markers.get(task.name()) {
            return ctx.matcher.resolve_since(pattern, marker);
        }
    }
    ctx.matcher.resolve(pattern)
}
