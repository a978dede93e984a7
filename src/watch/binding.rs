// src/watch/binding.rs

use crate::pattern::Pattern;
use crate::pipeline::PipelineNode;

/// What a binding does when its pattern matches a change.
#[derive(Debug, Clone)]
pub enum BindTarget {
    /// Re-run this node in full. No partial re-run of sub-nodes.
    Node(PipelineNode),
    /// Poke the reload sink instead of running anything.
    Reload,
}

/// One watched pattern tied to one target.
///
/// Bindings are independent of each other; any number may coexist, and one
/// changed path can fire several of them.
#[derive(Debug, Clone)]
pub struct WatchBinding {
    label: String,
    pattern: Pattern,
    target: BindTarget,
}

impl WatchBinding {
    pub fn new(label: impl Into<String>, pattern: Pattern, target: BindTarget) -> Self {
        Self {
            label: label.into(),
            pattern,
            target,
        }
    }

    /// Binding that re-runs `node` on changes.
    pub fn node(label: impl Into<String>, pattern: Pattern, node: PipelineNode) -> Self {
        Self::new(label, pattern, BindTarget::Node(node))
    }

    /// Binding that notifies the reload sink on changes.
    pub fn reload(label: impl Into<String>, pattern: Pattern) -> Self {
        Self::new(label, pattern, BindTarget::Reload)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn target(&self) -> &BindTarget {
        &self.target
    }
}
