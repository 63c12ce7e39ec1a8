//! Long-polling update source.
//!
//! Repeatedly calls `getUpdates`, converts each update into an
//! `InboundEvent` and forwards it to the dispatcher's channel.

use std::time::Duration;

use reviewbot_types::event::InboundEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::TelegramTransport;
use super::types::Update;

const DEFAULT_BACKOFF: Duration = Duration::from_secs(3);

/// Long-polls the Bot API until cancelled.
pub struct UpdatePoller {
    transport: TelegramTransport,
    timeout_secs: u64,
    backoff: Duration,
    offset: i64,
}

impl UpdatePoller {
    pub fn new(transport: TelegramTransport, timeout_secs: u64) -> Self {
        Self {
            transport,
            timeout_secs,
            backoff: DEFAULT_BACKOFF,
            offset: 0,
        }
    }

    /// Override the pause after a failed `getUpdates`.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Poll and forward until `cancel` fires or the receiver is dropped.
    pub async fn run(mut self, tx: mpsc::Sender<InboundEvent>, cancel: CancellationToken) {
        info!(timeout_secs = self.timeout_secs, "update poller started");

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.transport.get_updates(self.offset, self.timeout_secs) => result,
            };

            let updates = match result {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, "getUpdates failed, backing off");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.backoff) => continue,
                    }
                }
            };

            self.offset = next_offset(self.offset, &updates);
            if !updates.is_empty() {
                debug!(count = updates.len(), offset = self.offset, "received updates");
            }

            for update in updates {
                if tx.send(InboundEvent::from(update)).await.is_err() {
                    info!("dispatcher channel closed, stopping update poller");
                    return;
                }
            }
        }

        info!("update poller stopped");
    }
}

/// The offset that acknowledges every update in `updates`.
fn next_offset(current: i64, updates: &[Update]) -> i64 {
    updates
        .iter()
        .map(|u| u.update_id + 1)
        .fold(current, i64::max)
}
