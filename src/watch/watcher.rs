// src/watch/watcher.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::errors::{EngineError, Result};
use crate::orchestrator::BuildOrchestrator;
use crate::pattern::{relative_str, CompiledPattern};
use crate::reload::ReloadSink;
use crate::watch::binding::{BindTarget, WatchBinding};
use crate::watch::debounce::TriggerCell;

/// Watcher tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// How long an event burst may settle before a triggered run starts.
    /// Zero disables the window (useful in tests).
    pub settle: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(50),
        }
    }
}

/// Per-binding state shared between the event loop, the runner task, and
/// the handle.
struct BindingRuntime {
    label: String,
    /// Canonicalized pattern base; event paths are relativized against it.
    watch_root: PathBuf,
    compiled: CompiledPattern,
    target: BindTarget,
    cell: TriggerCell,
    closed: AtomicBool,
}

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping the handle
/// stops file watching. [`unbind`](Self::unbind) stops individual bindings
/// without touching their in-flight runs.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    bindings: HashMap<String, Arc<BindingRuntime>>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

impl WatcherHandle {
    /// Stop future triggers for the labeled binding. An in-flight run of
    /// the bound node always finishes undisturbed. Returns false if no
    /// binding has that label.
    pub fn unbind(&self, label: &str) -> bool {
        match self.bindings.get(label) {
            Some(runtime) => {
                info!(binding = %label, "unbinding; in-flight runs will finish");
                runtime.closed.store(true, Ordering::SeqCst);
                // Wake the runner so it can exit instead of parking forever.
                runtime.cell.mark();
                true
            }
            None => false,
        }
    }

    /// Unbind every binding.
    pub fn shutdown(&self) {
        for label in self.bindings.keys() {
            self.unbind(label);
        }
    }

    /// Labels of the registered bindings, sorted.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }
}

/// Spawn a filesystem watcher over all the bindings' base directories.
///
/// Each binding gets its own runner task: change events matching the
/// binding mark its trigger cell, and the runner re-runs the bound node
/// (or pokes the reload sink) once per consumed trigger. Events arriving
/// while a run is in flight coalesce into at most one follow-up run. A
/// failed bound run is logged and the binding stays bound.
pub fn spawn_watcher(
    bindings: Vec<WatchBinding>,
    orchestrator: Arc<BuildOrchestrator>,
    sink: Arc<dyn ReloadSink>,
    options: WatchOptions,
) -> Result<WatcherHandle> {
    let mut runtimes: Vec<Arc<BindingRuntime>> = Vec::with_capacity(bindings.len());
    let mut by_label: HashMap<String, Arc<BindingRuntime>> = HashMap::new();

    for binding in &bindings {
        let compiled = binding.pattern().compile()?;
        let base = binding.pattern().base().to_path_buf();
        // Best-effort: notify reports canonical paths on most platforms.
        let watch_root = base.canonicalize().unwrap_or_else(|_| base.clone());

        let runtime = Arc::new(BindingRuntime {
            label: binding.label().to_string(),
            watch_root,
            compiled,
            target: binding.target().clone(),
            cell: TriggerCell::new(),
            closed: AtomicBool::new(false),
        });

        if by_label
            .insert(runtime.label.clone(), runtime.clone())
            .is_some()
        {
            return Err(EngineError::Config(format!(
                "duplicate watch binding label '{}'",
                runtime.label
            )));
        }
        runtimes.push(runtime);
    }

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // Can't log via tracing from the notify thread reliably.
                    eprintln!("buildpipe: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("buildpipe: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    let mut watched: Vec<PathBuf> = Vec::new();
    for runtime in &runtimes {
        if watched.contains(&runtime.watch_root) {
            continue;
        }
        match watcher.watch(&runtime.watch_root, RecursiveMode::Recursive) {
            Ok(()) => {
                info!(root = ?runtime.watch_root, "watching");
                watched.push(runtime.watch_root.clone());
            }
            Err(err) => {
                warn!(
                    root = ?runtime.watch_root,
                    error = %err,
                    "cannot watch directory; its bindings will not trigger"
                );
            }
        }
    }

    // Event loop: match changed paths against the bindings and mark cells.
    let loop_runtimes = runtimes.clone();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            debug!(kind = ?event.kind, paths = ?event.paths, "notify event");

            for path in &event.paths {
                for runtime in &loop_runtimes {
                    if runtime.closed.load(Ordering::SeqCst) {
                        continue;
                    }
                    if let Some(rel) = relative_str(&runtime.watch_root, path) {
                        if runtime.compiled.matches_rel(&rel) {
                            debug!(binding = %runtime.label, path = %rel, "watch match");
                            runtime.cell.mark();
                        }
                    }
                }
            }
        }
        debug!("watch event loop ended");
    });

    for runtime in &runtimes {
        let runtime = runtime.clone();
        let orchestrator = orchestrator.clone();
        let sink = sink.clone();
        let settle = options.settle;
        tokio::spawn(run_binding(runtime, orchestrator, sink, settle));
    }

    info!(bindings = runtimes.len(), "watcher started");

    Ok(WatcherHandle {
        _inner: watcher,
        bindings: by_label,
    })
}

async fn run_binding(
    runtime: Arc<BindingRuntime>,
    orchestrator: Arc<BuildOrchestrator>,
    sink: Arc<dyn ReloadSink>,
    settle: Duration,
) {
    loop {
        runtime.cell.triggered().await;
        if runtime.closed.load(Ordering::SeqCst) {
            break;
        }

        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
            // Later events in the same burst belong to this run, not the
            // next one.
            runtime.cell.take_pending();
        }

        match &runtime.target {
            BindTarget::Node(node) => {
                info!(binding = %runtime.label, "change detected; re-running bound node");
                match orchestrator.run_node(&runtime.label, node).await {
                    Ok(summary) => {
                        debug!(
                            binding = %runtime.label,
                            tasks = summary.tasks.len(),
                            "bound run finished"
                        );
                    }
                    Err(err) => {
                        warn!(
                            binding = %runtime.label,
                            task = %err.task,
                            cause = %err.source,
                            "bound run failed; binding stays active"
                        );
                    }
                }
            }
            BindTarget::Reload => {
                sink.notify(&runtime.label);
            }
        }

        if runtime.closed.load(Ordering::SeqCst) {
            break;
        }
    }

    debug!(binding = %runtime.label, "binding runner ended");
}
