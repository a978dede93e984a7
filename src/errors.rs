// src/errors.rs

//! Crate-wide error types.
//!
//! `EngineError` covers everything the engine itself can diagnose;
//! `BuildError` wraps an `EngineError` with the name of the task (or
//! requested target) the failure is attributed to, which is what the CLI
//! and the watcher report.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown task or pipeline '{0}'")]
    UnknownTask(String),

    #[error("task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("dependency cycle involving '{0}'")]
    Cycle(String),

    #[error("invalid glob pattern '{pattern}'")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("filesystem error at {path:?}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("task '{task}' transform failed")]
    Transform {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("file watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl EngineError {
    /// Helper for wrapping raw io errors with the path they occurred on.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Failure of a single build run, attributed to a leaf task.
///
/// For failures detected before any action runs (unknown name, cycle), the
/// `task` field names the offending reference instead.
#[derive(Error, Debug, Clone)]
#[error("task '{task}' failed")]
pub struct BuildError {
    pub task: String,
    #[source]
    pub source: Arc<EngineError>,
}

impl BuildError {
    pub fn new(task: impl Into<String>, source: EngineError) -> Self {
        Self {
            task: task.into(),
            source: Arc::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
