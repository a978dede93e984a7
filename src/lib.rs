// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod orchestrator;
pub mod pattern;
pub mod pipeline;
pub mod registry;
pub mod reload;
pub mod transforms;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{build_engine, load_and_validate, ConfigFile, StepSpec};
use crate::fs::{FileSystem, RealFileSystem};
use crate::reload::{LogReloadSink, ReloadSink};
use crate::watch::{spawn_watcher, WatchOptions};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - engine assembly (registry + pipelines + bindings)
/// - the initial run of the requested target
/// - (optional) file watcher with the reload sink
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let cfg = cfg.anchored_at(&config_root_dir(&config_path));

    if args.list {
        for name in target_names(&cfg) {
            println!("{name}");
        }
        return Ok(());
    }

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let engine = build_engine(&cfg, fs)?;
    let orchestrator = Arc::new(engine.orchestrator);

    match orchestrator.run(&args.target).await {
        Ok(_) => {}
        Err(err) if args.watch => {
            // In watch mode a failed first build is not fatal; the next
            // file change gets another attempt.
            warn!(
                task = %err.task,
                cause = %err.source,
                "initial build failed; watching for changes"
            );
        }
        Err(err) => return Err(err.into()),
    }

    if !args.watch {
        return Ok(());
    }

    let sink: Arc<dyn ReloadSink> = Arc::new(LogReloadSink);
    let options = WatchOptions {
        settle: engine.debounce,
    };
    let handle = spawn_watcher(engine.bindings, orchestrator, sink, options)?;

    info!(
        bindings = handle.labels().len(),
        "watch mode active; Ctrl-C to stop"
    );
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    handle.shutdown();

    Ok(())
}

/// Figure out the directory the config's relative paths are anchored to.
///
/// - If the config path has a non-empty parent (e.g. "site/Buildpipe.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Buildpipe.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Runnable target names: every task plus every pipeline, sorted.
fn target_names(cfg: &ConfigFile) -> Vec<&str> {
    let mut names: Vec<&str> = cfg
        .task
        .keys()
        .chain(cfg.pipeline.keys())
        .map(String::as_str)
        .collect();
    names.sort_unstable();
    names
}

/// Simple dry-run output: print tasks, pipelines and watch bindings.
fn print_dry_run(cfg: &ConfigFile) {
    println!("buildpipe dry-run");
    println!("  paths.src = {}", cfg.paths.src.display());
    println!("  paths.build = {}", cfg.paths.build.display());
    println!("  paths.public = {}", cfg.paths.public.display());
    println!("  settings.debounce_ms = {}", cfg.settings.debounce_ms);
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        println!("      action: {:?}", task.action);
        if !task.input.is_empty() {
            println!("      input: {:?}", task.input);
        }
        if let Some(ref base) = task.base {
            println!("      base: {base}");
        }
        if !task.output.is_empty() {
            println!("      output: {}", task.output);
        }
        if let Some(ref bundle) = task.bundle {
            println!("      bundle: {bundle}");
        }
        if task.incremental {
            println!("      incremental: true");
        }
        if !task.depends_on.is_empty() {
            println!("      depends_on: {:?}", task.depends_on);
        }
        if let Some(ref watch) = task.watch {
            if !watch.is_empty() {
                println!("      watch: {:?}", watch);
            }
        }
    }

    if !cfg.pipeline.is_empty() {
        println!();
        println!("pipelines ({}):", cfg.pipeline.len());
        for (name, pipeline) in cfg.pipeline.iter() {
            println!("  - {name}: {}", render_steps(&pipeline.steps));
        }
    }

    if !cfg.watch.is_empty() {
        println!();
        println!("watch bindings ({}):", cfg.watch.len());
        for (label, watch) in cfg.watch.iter() {
            println!(
                "  - {label}: {:?} -> {}",
                watch.patterns,
                render_step(&watch.run)
            );
        }
    }

    if !cfg.reload.patterns.is_empty() {
        println!();
        println!("reload: {:?}", cfg.reload.patterns);
    }

    debug!("dry-run complete (no execution)");
}

fn render_steps(steps: &[StepSpec]) -> String {
    steps
        .iter()
        .map(render_step)
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_step(step: &StepSpec) -> String {
    match step {
        StepSpec::Name(name) => name.clone(),
        StepSpec::Series { series } => format!("series({})", render_steps(series)),
        StepSpec::Parallel { parallel } => format!("parallel({})", render_steps(parallel)),
    }
}
