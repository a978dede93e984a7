// src/config/mod.rs

//! Configuration loading, validation and engine assembly.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate reference and cycle invariants (`validate.rs`).
//! - Assemble a runnable [`Engine`] out of a config (`build_engine`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ActionKind, ConfigFile, PathsSection, PipelineSection, ReloadSection, SettingsSection,
    StepSpec, TaskSection, WatchSection,
};
pub use validate::validate_config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{EngineError, Result};
use crate::fs::FileSystem;
use crate::orchestrator::BuildOrchestrator;
use crate::pattern::Pattern;
use crate::pipeline::PipelineNode;
use crate::registry::{Task, TaskAction};
use crate::transforms::{CleanAction, ConcatAction, CopyAction};
use crate::watch::WatchBinding;

/// A fully assembled engine: the orchestrator plus everything watch mode
/// needs.
pub struct Engine {
    pub orchestrator: BuildOrchestrator,
    pub bindings: Vec<WatchBinding>,
    /// Settle window for watch triggers.
    pub debounce: Duration,
}

/// Assemble an [`Engine`] from a validated config.
pub fn build_engine(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Result<Engine> {
    let mut orchestrator = BuildOrchestrator::new(fs);

    for (name, section) in cfg.task.iter() {
        orchestrator.register_task(build_task(cfg, name, section)?)?;
    }

    for (name, pipeline) in cfg.pipeline.iter() {
        let mut expanding = vec![name.clone()];
        let node = steps_node(cfg, &pipeline.steps, &mut expanding)?;
        orchestrator.define_pipeline(name.clone(), node)?;
    }

    let bindings = build_bindings(cfg)?;
    let debounce = Duration::from_millis(cfg.settings.debounce_ms);

    Ok(Engine {
        orchestrator,
        bindings,
        debounce,
    })
}

fn build_task(cfg: &ConfigFile, name: &str, section: &model::TaskSection) -> Result<Task> {
    let action = build_action(name, section)?;
    let mut task = Task::new(name, action)
        .with_depends_on(section.depends_on.iter().cloned())
        .with_dest(output_dir(cfg, &section.output))
        .incremental(section.incremental);

    if !section.input.is_empty() {
        let base = base_root(cfg, section.base.as_deref());
        task = task.with_input(Pattern::new(base, section.input.iter().cloned()));
    }

    Ok(task)
}

fn build_action(name: &str, section: &model::TaskSection) -> Result<Arc<dyn TaskAction>> {
    match section.action {
        ActionKind::Clean => Ok(Arc::new(CleanAction)),
        ActionKind::Copy => Ok(Arc::new(CopyAction)),
        ActionKind::Concat => {
            let bundle = section.bundle.clone().ok_or_else(|| {
                EngineError::Config(format!(
                    "task '{name}': concat requires a `bundle` file name"
                ))
            })?;
            Ok(Arc::new(ConcatAction::new(bundle)))
        }
    }
}

/// Resolve a `base` selector to its `[paths]` root. Unknown selectors are
/// rejected by validation; the default is the src root.
fn base_root(cfg: &ConfigFile, selector: Option<&str>) -> PathBuf {
    match selector {
        Some("build") => cfg.paths.build.clone(),
        Some("public") => cfg.paths.public.clone(),
        _ => cfg.paths.src.clone(),
    }
}

/// A task's destination directory: `output` under the build root, or the
/// build root itself when `output` is empty.
fn output_dir(cfg: &ConfigFile, output: &str) -> PathBuf {
    if output.is_empty() {
        cfg.paths.build.clone()
    } else {
        cfg.paths.build.join(output)
    }
}

/// A pipeline's top-level steps run in series.
fn steps_node(
    cfg: &ConfigFile,
    steps: &[StepSpec],
    expanding: &mut Vec<String>,
) -> Result<PipelineNode> {
    let children = steps
        .iter()
        .map(|step| step_node(cfg, step, expanding))
        .collect::<Result<Vec<_>>>()?;
    Ok(PipelineNode::Series(children))
}

/// Expand one step into a node. A name resolves to a task leaf, or inlines
/// the referenced pipeline's node; `expanding` carries the reference chain
/// so assembly rejects pipeline cycles even on an unvalidated config.
fn step_node(cfg: &ConfigFile, step: &StepSpec, expanding: &mut Vec<String>) -> Result<PipelineNode> {
    match step {
        StepSpec::Name(name) => {
            if cfg.task.contains_key(name) {
                return Ok(PipelineNode::Task(name.clone()));
            }
            match cfg.pipeline.get(name) {
                Some(pipeline) => {
                    if expanding.iter().any(|seen| seen == name) {
                        return Err(EngineError::Cycle(name.clone()));
                    }
                    expanding.push(name.clone());
                    let node = steps_node(cfg, &pipeline.steps, expanding)?;
                    expanding.pop();
                    Ok(node)
                }
                None => Err(EngineError::UnknownTask(name.clone())),
            }
        }
        StepSpec::Series { series } => {
            let children = series
                .iter()
                .map(|inner| step_node(cfg, inner, expanding))
                .collect::<Result<Vec<_>>>()?;
            Ok(PipelineNode::Series(children))
        }
        StepSpec::Parallel { parallel } => {
            let children = parallel
                .iter()
                .map(|inner| step_node(cfg, inner, expanding))
                .collect::<Result<Vec<_>>>()?;
            Ok(PipelineNode::Parallel(children))
        }
    }
}

fn build_bindings(cfg: &ConfigFile) -> Result<Vec<WatchBinding>> {
    let mut bindings = Vec::new();

    // Per-task `watch` sugar: the task's name labels the binding.
    for (name, section) in cfg.task.iter() {
        if let Some(watch) = &section.watch {
            if watch.is_empty() {
                continue;
            }
            let base = base_root(cfg, section.base.as_deref());
            let pattern = Pattern::new(base, watch.iter().cloned());
            bindings.push(WatchBinding::node(
                name.clone(),
                pattern,
                PipelineNode::Task(name.clone()),
            ));
        }
    }

    for (label, section) in cfg.watch.iter() {
        let base = base_root(cfg, section.base.as_deref());
        let pattern = Pattern::new(base, section.patterns.iter().cloned());
        let mut expanding = Vec::new();
        let node = step_node(cfg, &section.run, &mut expanding)?;
        bindings.push(WatchBinding::node(label.clone(), pattern, node));
    }

    if !cfg.reload.patterns.is_empty() {
        let pattern = Pattern::new(cfg.paths.build.clone(), cfg.reload.patterns.iter().cloned());
        bindings.push(WatchBinding::reload("reload", pattern));
    }

    Ok(bindings)
}
