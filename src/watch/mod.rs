// src/watch/mod.rs

//! File watching and change-triggered re-runs.
//!
//! This module is responsible for:
//! - binding glob patterns to targets ([`WatchBinding`])
//! - wiring up a cross-platform filesystem watcher (`notify`)
//! - coalescing change bursts so an in-flight run schedules at most one
//!   follow-up ([`TriggerCell`])
//!
//! It does not know how tasks execute; bound nodes are handed back to the
//! orchestrator, and reload bindings go to the [`crate::reload::ReloadSink`].

pub mod binding;
pub mod debounce;
pub mod watcher;

pub use binding::{BindTarget, WatchBinding};
pub use debounce::TriggerCell;
pub use watcher::{spawn_watcher, WatchOptions, WatcherHandle};
