use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::accounting::notifier::NotificationEvent;

/// Receives the notifications the engine emits. Sinks are display layers, they never feed back
/// into accounting.
pub trait NotificationSink {
    fn notify(&mut self, event: &NotificationEvent) -> Result<()>;
}

/// Writes every notification to the log.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&mut self, event: &NotificationEvent) -> Result<()> {
        info!(
            kind = ?event.kind,
            elapsed = event.seconds_elapsed,
            remaining = event.remaining_seconds,
            "{}",
            event.message()
        );
        Ok(())
    }
}

/// Fans notifications out to the control connections that asked to watch.
pub struct BroadcastSink {
    sender: broadcast::Sender<NotificationEvent>,
}

impl BroadcastSink {
    pub fn new(sender: broadcast::Sender<NotificationEvent>) -> Self {
        Self { sender }
    }
}

impl NotificationSink for BroadcastSink {
    fn notify(&mut self, event: &NotificationEvent) -> Result<()> {
        if self.sender.send(event.clone()).is_err() {
            debug!("Nobody is watching notifications");
        }
        Ok(())
    }
}
