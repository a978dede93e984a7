// src/transforms/concat.rs

use anyhow::{Context, Result};
use tracing::debug;

use crate::registry::{ActionContext, ActionOutput, BoxFuture, TaskAction};

/// Joins the resolved inputs, in resolution order, into one bundle file
/// under the destination, with a newline between inputs. With no inputs the
/// bundle is left untouched.
#[derive(Debug, Clone)]
pub struct ConcatAction {
    bundle: String,
}

impl ConcatAction {
    /// `bundle` is the output file name, relative to the destination.
    pub fn new(bundle: impl Into<String>) -> Self {
        Self {
            bundle: bundle.into(),
        }
    }
}

impl TaskAction for ConcatAction {
    fn run(&self, ctx: ActionContext) -> BoxFuture<Result<ActionOutput>> {
        let bundle = self.bundle.clone();
        Box::pin(async move {
            if ctx.files.is_empty() {
                debug!(bundle = %bundle, "no inputs; bundle left as-is");
                return Ok(ActionOutput::default());
            }

            let mut joined = Vec::new();
            for (i, file) in ctx.files.iter().enumerate() {
                let data = ctx
                    .fs
                    .read(file)
                    .with_context(|| format!("reading {:?}", file))?;
                if i > 0 {
                    joined.push(b'\n');
                }
                joined.extend_from_slice(&data);
            }

            let dest = ctx.dest.join(&bundle);
            ctx.fs
                .write(&dest, &joined)
                .with_context(|| format!("writing {:?}", dest))?;
            debug!(inputs = ctx.files.len(), to = ?dest, "concatenated bundle");
            Ok(ActionOutput::written([dest]))
        })
    }
}
