// src/pipeline/node.rs

use crate::registry::TaskName;

/// A composable execution tree.
///
/// Leaves reference tasks by name; the names are resolved against the
/// registry when a run is linked, so a node can be built before every task
/// it mentions is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineNode {
    /// Run the named task (after its `depends_on` predecessors).
    Task(TaskName),
    /// Run children strictly in sequence; first failure aborts the rest.
    Series(Vec<PipelineNode>),
    /// Run children concurrently; running siblings finish even if one fails.
    Parallel(Vec<PipelineNode>),
}

impl PipelineNode {
    /// Leaf task names in definition order, duplicates included.
    pub fn task_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            PipelineNode::Task(name) => out.push(name),
            PipelineNode::Series(children) | PipelineNode::Parallel(children) => {
                for child in children {
                    child.collect_names(out);
                }
            }
        }
    }

    /// Short human-readable form, used in logs and dry-run output.
    pub fn render(&self) -> String {
        match self {
            PipelineNode::Task(name) => name.clone(),
            PipelineNode::Series(children) => {
                let inner: Vec<String> = children.iter().map(PipelineNode::render).collect();
                format!("series({})", inner.join(", "))
            }
            PipelineNode::Parallel(children) => {
                let inner: Vec<String> = children.iter().map(PipelineNode::render).collect();
                format!("parallel({})", inner.join(", "))
            }
        }
    }
}

/// Leaf node referencing a registered task.
pub fn task(name: impl Into<TaskName>) -> PipelineNode {
    PipelineNode::Task(name.into())
}

/// Sequential group. An empty group completes successfully without running
/// anything.
pub fn series<I>(nodes: I) -> PipelineNode
where
    I: IntoIterator<Item = PipelineNode>,
{
    PipelineNode::Series(nodes.into_iter().collect())
}

/// Concurrent group. An empty group completes successfully without running
/// anything.
pub fn parallel<I>(nodes: I) -> PipelineNode
where
    I: IntoIterator<Item = PipelineNode>,
{
    PipelineNode::Parallel(nodes.into_iter().collect())
}
