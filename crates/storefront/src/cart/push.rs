//! Ordered background pushes of the cart to the server.
//!
//! Every local mutation bumps the cart revision and schedules the full line
//! set. A single worker task drains the schedule:
//!
//! - pushes run one at a time, in revision order
//! - a revision at or below the last pushed one is skipped
//! - schedules that arrive while a push is in flight collapse to the latest
//!
//! The server therefore converges on the newest local cart even when requests
//! would otherwise race. A failed push is logged and not retried; the next
//! mutation carries the full cart again.

use std::sync::Arc;

use shopkeep_core::CartLine;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::ShopApi;

#[derive(Debug, Clone)]
struct PushRequest {
    revision: u64,
    lines: Vec<CartLine>,
}

/// Handle to the cart push worker.
///
/// Dropping the handle lets the worker finish the latest scheduled push and
/// then exit.
pub struct CartPusher {
    requests: watch::Sender<Option<PushRequest>>,
    settled: watch::Receiver<u64>,
    scheduled: u64,
}

impl CartPusher {
    /// Spawn the worker on the current Tokio runtime.
    pub fn spawn(api: Arc<dyn ShopApi>) -> Self {
        let (requests, pending) = watch::channel(None);
        let (settled_tx, settled) = watch::channel(0);
        tokio::spawn(run_worker(api, pending, settled_tx));

        Self {
            requests,
            settled,
            scheduled: 0,
        }
    }

    /// Schedule `lines` as the server cart for `revision`.
    ///
    /// Ignored when `revision` is not newer than the last scheduled one.
    pub fn schedule(&mut self, revision: u64, lines: Vec<CartLine>) {
        if revision <= self.scheduled {
            debug!(revision, scheduled = self.scheduled, "Ignoring stale cart push");
            return;
        }
        self.scheduled = revision;
        self.requests.send_replace(Some(PushRequest { revision, lines }));
    }

    /// Newest revision handed to the worker.
    #[must_use]
    pub const fn scheduled(&self) -> u64 {
        self.scheduled
    }

    /// Newest revision the worker has finished with, successfully or not.
    #[must_use]
    pub fn settled(&self) -> u64 {
        *self.settled.borrow()
    }

    /// Wait until everything scheduled so far has been attempted.
    pub async fn flush(&mut self) {
        let target = self.scheduled;
        if self.settled.wait_for(|settled| *settled >= target).await.is_err() {
            warn!(revision = target, "Cart push worker stopped before flushing");
        }
    }
}

async fn run_worker(
    api: Arc<dyn ShopApi>,
    mut pending: watch::Receiver<Option<PushRequest>>,
    settled: watch::Sender<u64>,
) {
    let mut last_pushed = 0;

    // `changed` still reports a final unseen value after the handle drops.
    while pending.changed().await.is_ok() {
        let Some(request) = pending.borrow_and_update().clone() else {
            continue;
        };
        if request.revision <= last_pushed {
            continue;
        }

        match api.replace_cart(&request.lines).await {
            Ok(()) => debug!(revision = request.revision, lines = request.lines.len(), "Cart pushed"),
            Err(e) => warn!(revision = request.revision, error = %e, "Cart push failed"),
        }

        last_pushed = request.revision;
        settled.send_replace(last_pushed);
    }

    debug!(last_pushed, "Cart push worker stopped");
}
