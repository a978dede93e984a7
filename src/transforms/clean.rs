// src/transforms/clean.rs

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::registry::{ActionContext, ActionOutput, BoxFuture, TaskAction};

/// Removes the destination directory tree. An absent directory is success,
/// so a fresh checkout cleans without complaint.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanAction;

impl TaskAction for CleanAction {
    fn run(&self, ctx: ActionContext) -> BoxFuture<Result<ActionOutput>> {
        Box::pin(async move {
            if ctx.dest.as_os_str().is_empty() {
                bail!("clean needs an output directory");
            }
            if !ctx.fs.exists(&ctx.dest) {
                debug!(dir = ?ctx.dest, "nothing to clean");
                return Ok(ActionOutput::default());
            }
            ctx.fs
                .remove_dir_all(&ctx.dest)
                .with_context(|| format!("removing {:?}", ctx.dest))?;
            debug!(dir = ?ctx.dest, "removed output directory");
            Ok(ActionOutput::default())
        })
    }
}
