// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ActionKind, ConfigFile, StepSpec};
use crate::errors::{EngineError, Result};

/// Run semantic validation against a loaded configuration.
///
/// This checks:
/// - there is at least one task
/// - tasks and pipelines do not share a name
/// - per-task action requirements (`bundle` for `concat`, roots exist)
/// - all `depends_on` entries refer to existing tasks, acyclically
/// - all step names in pipelines and `[watch.*].run` refer to existing
///   tasks or pipelines, and pipeline references are acyclic
/// - glob pattern strings are non-empty
/// - watch binding labels are unique, including the per-task `watch` sugar
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_namespace(cfg)?;
    validate_tasks(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_dependency_dag(cfg)?;
    validate_steps(cfg)?;
    validate_pipeline_references(cfg)?;
    validate_watch_sections(cfg)?;
    validate_reload(cfg)?;
    Ok(())
}

fn config_err(msg: impl Into<String>) -> EngineError {
    EngineError::Config(msg.into())
}

fn ensure_has_tasks(cfg: &ConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(config_err(
            "config must contain at least one [task.<name>] section",
        ));
    }
    Ok(())
}

fn validate_namespace(cfg: &ConfigFile) -> Result<()> {
    for name in cfg.pipeline.keys() {
        if cfg.task.contains_key(name) {
            return Err(EngineError::DuplicateTask(name.clone()));
        }
    }
    Ok(())
}

const ROOT_SELECTORS: [&str; 3] = ["src", "build", "public"];

fn validate_root_selector(owner: &str, selector: &Option<String>) -> Result<()> {
    if let Some(base) = selector {
        if !ROOT_SELECTORS.contains(&base.as_str()) {
            return Err(config_err(format!(
                "{owner}: base must be one of \"src\", \"build\" or \"public\" (got \"{base}\")"
            )));
        }
    }
    Ok(())
}

fn validate_globs(owner: &str, globs: &[String]) -> Result<()> {
    for glob in globs {
        if glob.is_empty() {
            return Err(config_err(format!("{owner}: empty glob pattern")));
        }
    }
    Ok(())
}

fn validate_tasks(cfg: &ConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        let owner = format!("task '{name}'");
        validate_root_selector(&owner, &task.base)?;
        validate_globs(&owner, &task.input)?;
        if let Some(watch) = &task.watch {
            validate_globs(&owner, watch)?;
        }

        match task.action {
            ActionKind::Concat => {
                if task.bundle.is_none() {
                    return Err(config_err(format!(
                        "{owner}: concat requires a `bundle` file name"
                    )));
                }
            }
            ActionKind::Clean | ActionKind::Copy => {
                if task.bundle.is_some() {
                    return Err(config_err(format!(
                        "{owner}: `bundle` is only meaningful for concat"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &ConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.depends_on.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(config_err(format!(
                    "task '{name}' has unknown dependency '{dep}' in `depends_on`"
                )));
            }
            if dep == name {
                return Err(config_err(format!(
                    "task '{name}' cannot depend on itself in `depends_on`"
                )));
            }
        }
    }
    Ok(())
}

fn validate_dependency_dag(cfg: &ConfigFile) -> Result<()> {
    // Edge direction: dep -> task. A topological sort fails on a cycle.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }
    for (name, task) in cfg.task.iter() {
        for dep in task.depends_on.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(EngineError::Cycle(cycle.node_id().to_string())),
    }
}

fn validate_step(cfg: &ConfigFile, owner: &str, step: &StepSpec) -> Result<()> {
    match step {
        StepSpec::Name(name) => {
            if !cfg.task.contains_key(name) && !cfg.pipeline.contains_key(name) {
                return Err(config_err(format!(
                    "{owner} references unknown task or pipeline '{name}'"
                )));
            }
            Ok(())
        }
        StepSpec::Series { series: steps } | StepSpec::Parallel { parallel: steps } => {
            for inner in steps {
                validate_step(cfg, owner, inner)?;
            }
            Ok(())
        }
    }
}

fn validate_steps(cfg: &ConfigFile) -> Result<()> {
    for (name, pipeline) in cfg.pipeline.iter() {
        let owner = format!("pipeline '{name}'");
        for step in &pipeline.steps {
            validate_step(cfg, &owner, step)?;
        }
    }
    Ok(())
}

/// Collect the pipeline names a step refers to, for cycle checking.
fn pipeline_refs<'a>(cfg: &ConfigFile, step: &'a StepSpec, out: &mut Vec<&'a str>) {
    match step {
        StepSpec::Name(name) => {
            if cfg.pipeline.contains_key(name) {
                out.push(name);
            }
        }
        StepSpec::Series { series: steps } | StepSpec::Parallel { parallel: steps } => {
            for inner in steps {
                pipeline_refs(cfg, inner, out);
            }
        }
    }
}

fn validate_pipeline_references(cfg: &ConfigFile) -> Result<()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.pipeline.keys() {
        graph.add_node(name.as_str());
    }
    for (name, pipeline) in cfg.pipeline.iter() {
        let mut refs = Vec::new();
        for step in &pipeline.steps {
            pipeline_refs(cfg, step, &mut refs);
        }
        for referenced in refs {
            if referenced == name {
                return Err(EngineError::Cycle(name.clone()));
            }
            graph.add_edge(referenced, name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(EngineError::Cycle(cycle.node_id().to_string())),
    }
}

/// True if the config's `[reload]` section will produce a binding.
fn has_reload_binding(cfg: &ConfigFile) -> bool {
    !cfg.reload.patterns.is_empty()
}

fn validate_watch_sections(cfg: &ConfigFile) -> Result<()> {
    for (label, watch) in cfg.watch.iter() {
        let owner = format!("watch '{label}'");
        validate_root_selector(&owner, &watch.base)?;
        if watch.patterns.is_empty() {
            return Err(config_err(format!("{owner}: `patterns` must not be empty")));
        }
        validate_globs(&owner, &watch.patterns)?;
        validate_step(cfg, &owner, &watch.run)?;

        // The per-task `watch` sugar claims the task's name as a label, and
        // `[reload]` claims "reload".
        if let Some(task) = cfg.task.get(label) {
            if task.watch.as_ref().is_some_and(|w| !w.is_empty()) {
                return Err(config_err(format!(
                    "watch label '{label}' collides with the `watch` list of task '{label}'"
                )));
            }
        }
        if label == "reload" && has_reload_binding(cfg) {
            return Err(config_err(
                "watch label 'reload' collides with the [reload] section",
            ));
        }
    }
    Ok(())
}

fn validate_reload(cfg: &ConfigFile) -> Result<()> {
    validate_globs("[reload]", &cfg.reload.patterns)?;
    if has_reload_binding(cfg) {
        if let Some(task) = cfg.task.get("reload") {
            if task.watch.as_ref().is_some_and(|w| !w.is_empty()) {
                return Err(config_err(
                    "the `watch` list of task 'reload' collides with the [reload] section",
                ));
            }
        }
    }
    Ok(())
}
