// src/reload.rs

//! Dev-server reload notifications.
//!
//! A reload binding does not re-run anything; when files matching it
//! change, the watcher pokes the [`ReloadSink`]. No content crosses the
//! boundary, only the trigger.

use std::fmt::Debug;

use tokio::sync::mpsc;
use tracing::{info, warn};

/// Receiver of reload triggers. `label` names the binding that fired.
pub trait ReloadSink: Send + Sync + Debug {
    fn notify(&self, label: &str);
}

/// Logs each trigger. The default when no dev server is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReloadSink;

impl ReloadSink for LogReloadSink {
    fn notify(&self, label: &str) {
        info!(binding = %label, "reload triggered");
    }
}

/// Forwards each trigger into a channel, for a dev server (or a test) on
/// the receiving end.
#[derive(Debug, Clone)]
pub struct ChannelReloadSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelReloadSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReloadSink for ChannelReloadSink {
    fn notify(&self, label: &str) {
        if self.tx.send(label.to_string()).is_err() {
            warn!("reload receiver dropped; trigger discarded");
        }
    }
}
