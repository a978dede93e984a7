// src/registry.rs

//! Task definitions and the registry that stores them.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::{EngineError, Result};
use crate::fs::FileSystem;
use crate::pattern::Pattern;

/// Name of a task or pipeline.
pub type TaskName = String;

/// A boxed future that is Send and can be used across thread boundaries.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Everything an action needs for one invocation.
///
/// `files` is the resolved input set (already filtered by `resolve_since`
/// for incremental tasks), `base` the directory the inputs were resolved
/// against, `dest` where outputs go. All I/O goes through `fs`.
pub struct ActionContext {
    pub files: Vec<PathBuf>,
    pub base: PathBuf,
    pub dest: PathBuf,
    pub fs: Arc<dyn FileSystem>,
}

impl ActionContext {
    /// Destination path for an input file, mirroring its position under
    /// `base`. Inputs outside `base` land directly in `dest`.
    pub fn dest_for(&self, input: &Path) -> PathBuf {
        match input.strip_prefix(&self.base) {
            Ok(rel) => self.dest.join(rel),
            Err(_) => match input.file_name() {
                Some(name) => self.dest.join(name),
                None => self.dest.clone(),
            },
        }
    }
}

/// What an action reports on success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutput {
    /// Files the action wrote, used for reporting.
    pub written: Vec<PathBuf>,
}

impl ActionOutput {
    pub fn written<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            written: paths.into_iter().map(Into::into).collect(),
        }
    }
}

/// The work a task performs.
///
/// Implementations receive the resolved input set and write outputs through
/// the context's filesystem. A returned error becomes a transform failure
/// attributed to the owning task; the cause is passed through opaquely.
pub trait TaskAction: Send + Sync {
    fn run(&self, ctx: ActionContext) -> BoxFuture<anyhow::Result<ActionOutput>>;
}

/// Adapter so plain async closures can serve as actions:
/// `Task::new("lint", Arc::new(FnAction(|ctx: ActionContext| async move { .. })))`.
pub struct FnAction<F>(pub F);

impl<F, Fut> TaskAction for FnAction<F>
where
    F: Fn(ActionContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<ActionOutput>> + Send + 'static,
{
    fn run(&self, ctx: ActionContext) -> BoxFuture<anyhow::Result<ActionOutput>> {
        Box::pin((self.0)(ctx))
    }
}

/// A named unit of work.
///
/// Tasks are immutable once registered. `depends_on` names other tasks that
/// must complete successfully before this one runs; the names are validated
/// when a run is linked, not at registration, so forward references are
/// fine.
#[derive(Clone)]
pub struct Task {
    name: TaskName,
    action: Arc<dyn TaskAction>,
    depends_on: Vec<TaskName>,
    input: Option<Pattern>,
    dest: Option<PathBuf>,
    incremental: bool,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .field("input", &self.input)
            .field("dest", &self.dest)
            .field("incremental", &self.incremental)
            .finish_non_exhaustive()
    }
}

impl Task {
    pub fn new(name: impl Into<TaskName>, action: Arc<dyn TaskAction>) -> Self {
        Self {
            name: name.into(),
            action,
            depends_on: Vec::new(),
            input: None,
            dest: None,
            incremental: false,
        }
    }

    pub fn with_depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_input(mut self, input: Pattern) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_dest(mut self, dest: impl Into<PathBuf>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    /// Resolve inputs with `resolve_since(last successful run)` instead of
    /// the full set.
    pub fn incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> &Arc<dyn TaskAction> {
        &self.action
    }

    pub fn depends_on(&self) -> &[TaskName] {
        &self.depends_on
    }

    pub fn input(&self) -> Option<&Pattern> {
        self.input.as_ref()
    }

    pub fn dest(&self) -> Option<&Path> {
        self.dest.as_deref()
    }

    pub fn is_incremental(&self) -> bool {
        self.incremental
    }
}

/// Named task storage.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<TaskName, Arc<Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task under its name. Fails with
    /// [`EngineError::DuplicateTask`] if the name is taken.
    pub fn register(&mut self, task: Task) -> Result<()> {
        let name = task.name().to_string();
        if self.tasks.contains_key(&name) {
            return Err(EngineError::DuplicateTask(name));
        }
        self.tasks.insert(name, Arc::new(task));
        Ok(())
    }

    /// Look up a task by name. Fails with [`EngineError::UnknownTask`] if
    /// absent.
    pub fn lookup(&self, name: &str) -> Result<Arc<Task>> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
