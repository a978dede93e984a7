// src/pipeline/mod.rs

//! Pipeline nodes and their execution.
//!
//! This module provides:
//! - the [`PipelineNode`] tree plus the [`series`], [`parallel`] and
//!   [`task`] combinators that build it
//! - the executor that runs a node tree, with per-run task deduplication

pub mod exec;
pub mod node;

pub use exec::{RunState, TaskReport};
pub use node::{parallel, series, task, PipelineNode};
