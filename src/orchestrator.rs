// src/orchestrator.rs

//! The build orchestrator.
//!
//! Owns the task registry, the named pipeline table and the per-task
//! last-successful-run markers. A run goes through two phases:
//!
//! 1. **link** — collect the closure of tasks reachable from the requested
//!    node (through the tree and through `depends_on` edges), failing on
//!    unknown references and dependency cycles before any action runs
//! 2. **execute** — run the tree per the series/parallel semantics in
//!    [`crate::pipeline`]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::{info, warn};

use crate::errors::{BuildError, EngineError, Result};
use crate::fs::FileSystem;
use crate::pattern::PatternMatcher;
use crate::pipeline::exec::{self, MarkerStore, RunContext, TaskCell};
use crate::pipeline::{PipelineNode, TaskReport};
use crate::registry::{Task, TaskName, TaskRegistry};

/// Outcome of one orchestrated run.
pub type BuildResult = std::result::Result<RunSummary, BuildError>;

/// What a successful run reports.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The requested task or pipeline name (or an ad-hoc label).
    pub target: String,
    /// Executed leaf tasks in completion order.
    pub tasks: Vec<TaskReport>,
    pub elapsed: Duration,
}

/// Resolves names to nodes and runs them.
pub struct BuildOrchestrator {
    registry: TaskRegistry,
    pipelines: HashMap<String, PipelineNode>,
    matcher: PatternMatcher,
    fs: Arc<dyn FileSystem>,
    markers: Arc<MarkerStore>,
}

impl BuildOrchestrator {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            registry: TaskRegistry::new(),
            pipelines: HashMap::new(),
            matcher: PatternMatcher::new(fs.clone()),
            fs,
            markers: Arc::new(MarkerStore::new()),
        }
    }

    /// Register a task. Tasks and pipelines share one namespace, so a task
    /// may not reuse a pipeline's name.
    pub fn register_task(&mut self, task: Task) -> Result<()> {
        if self.pipelines.contains_key(task.name()) {
            return Err(EngineError::DuplicateTask(task.name().to_string()));
        }
        self.registry.register(task)
    }

    /// Define a named pipeline over already- or not-yet-registered tasks.
    pub fn define_pipeline(&mut self, name: impl Into<String>, node: PipelineNode) -> Result<()> {
        let name = name.into();
        if self.pipelines.contains_key(&name) || self.registry.contains(&name) {
            return Err(EngineError::DuplicateTask(name));
        }
        self.pipelines.insert(name, node);
        Ok(())
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// All runnable target names (tasks and pipelines), sorted.
    pub fn targets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .pipelines
            .keys()
            .map(String::as_str)
            .chain(self.registry.names())
            .collect();
        names.sort_unstable();
        names
    }

    /// Resolve a name to a runnable node: pipeline table first, then the
    /// registry.
    pub fn resolve(&self, name: &str) -> Result<PipelineNode> {
        if let Some(node) = self.pipelines.get(name) {
            return Ok(node.clone());
        }
        if self.registry.contains(name) {
            return Ok(PipelineNode::Task(name.to_string()));
        }
        Err(EngineError::UnknownTask(name.to_string()))
    }

    /// Run a named task or pipeline to completion.
    pub async fn run(&self, name: &str) -> BuildResult {
        let node = match self.resolve(name) {
            Ok(node) => node,
            Err(err) => {
                warn!(target = %name, error = %err, "unknown build target");
                return Err(BuildError::new(name, err));
            }
        };
        self.run_node(name, &node).await
    }

    /// Run an ad-hoc node under the given label. This is the same entry
    /// [`run`](Self::run) uses once it has resolved a name.
    pub async fn run_node(&self, label: &str, node: &PipelineNode) -> BuildResult {
        let started = Instant::now();
        info!(target = %label, "run started");

        let cells = match self.link(node) {
            Ok(cells) => cells,
            Err(err) => {
                let at = match &err {
                    EngineError::UnknownTask(name) | EngineError::Cycle(name) => name.clone(),
                    _ => label.to_string(),
                };
                warn!(target = %label, error = %err, "run failed during linking");
                return Err(BuildError::new(at, err));
            }
        };

        let ctx = Arc::new(RunContext::new(
            self.matcher.clone(),
            self.fs.clone(),
            cells,
            self.markers.clone(),
        ));
        let result = exec::run_node(ctx.clone(), node.clone()).await;
        let tasks = ctx.take_reports();
        let elapsed = started.elapsed();

        match result {
            Ok(()) => {
                info!(
                    target = %label,
                    tasks = tasks.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "run succeeded"
                );
                Ok(RunSummary {
                    target: label.to_string(),
                    tasks,
                    elapsed,
                })
            }
            Err(err) => {
                warn!(target = %label, task = %err.task, "run failed");
                Err(err)
            }
        }
    }

    /// Collect the reachable task closure and validate it.
    ///
    /// Every leaf named by the node and every transitive `depends_on` task
    /// must exist, and the dependency edges must be acyclic.
    fn link(&self, node: &PipelineNode) -> Result<HashMap<TaskName, Arc<TaskCell>>> {
        let mut cells: HashMap<TaskName, Arc<TaskCell>> = HashMap::new();
        let mut stack: Vec<TaskName> = node
            .task_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        while let Some(name) = stack.pop() {
            if cells.contains_key(&name) {
                continue;
            }
            let task = self.registry.lookup(&name)?;
            stack.extend(task.depends_on().iter().cloned());
            cells.insert(name, Arc::new(TaskCell::new(task)));
        }

        // Edge direction: dep -> task, same shape the config validator uses.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in cells.keys() {
            graph.add_node(name.as_str());
        }
        for (name, cell) in &cells {
            for dep in cell.task().depends_on() {
                if dep == name {
                    return Err(EngineError::Cycle(name.clone()));
                }
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(EngineError::Cycle(cycle.node_id().to_string()));
        }

        Ok(cells)
    }
}
