//! Abortable delayed deliveries of feed events

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::FeedEvent;

/// Spawns sleep-then-send tasks and keeps their handles so they can be
/// aborted when the owning controller goes away.
///
/// The tasks never touch controller state; they only deliver a `FeedEvent`
/// back to whoever drains the channel.
pub struct Timers {
    tx: mpsc::UnboundedSender<FeedEvent>,
    pending: Vec<JoinHandle<()>>,
}

impl Timers {
    pub fn new(tx: mpsc::UnboundedSender<FeedEvent>) -> Self {
        Self {
            tx,
            pending: Vec::new(),
        }
    }

    /// Deliver `event` after `delay`. Must be called from within a tokio runtime.
    pub fn schedule(&mut self, delay: Duration, event: FeedEvent) {
        self.pending.retain(|handle| !handle.is_finished());

        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(event).is_err() {
                tracing::debug!("Feed event receiver closed -- event dropped");
            }
        });
        self.pending.push(handle);
    }

    /// Number of deliveries that have not fired yet.
    pub fn pending(&self) -> usize {
        self.pending.iter().filter(|h| !h.is_finished()).count()
    }

    /// Abort every delivery that has not fired yet.
    pub fn cancel_all(&mut self) {
        for handle in self.pending.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
