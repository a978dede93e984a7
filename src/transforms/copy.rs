// src/transforms/copy.rs

use anyhow::{Context, Result};
use tracing::debug;

use crate::registry::{ActionContext, ActionOutput, BoxFuture, TaskAction};

/// Copies each resolved input into the destination, preserving its path
/// relative to the pattern base.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyAction;

impl TaskAction for CopyAction {
    fn run(&self, ctx: ActionContext) -> BoxFuture<Result<ActionOutput>> {
        Box::pin(async move {
            let mut written = Vec::with_capacity(ctx.files.len());
            for file in &ctx.files {
                let dest = ctx.dest_for(file);
                ctx.fs
                    .copy(file, &dest)
                    .with_context(|| format!("copying {:?} to {:?}", file, dest))?;
                debug!(from = ?file, to = ?dest, "copied");
                written.push(dest);
            }
            Ok(ActionOutput { written })
        })
    }
}
