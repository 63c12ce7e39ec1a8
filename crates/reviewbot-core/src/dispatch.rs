//! Dispatch entry point: routes inbound events to session actors.
//!
//! Dispatch never blocks on a session. Identity is validated, the user's actor
//! is resolved (and created if needed), and the event is placed on its inbox
//! without waiting.

use reviewbot_types::error::{DispatchError, InboxError};
use reviewbot_types::event::{InboundEvent, SessionEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::repository::{ReviewStore, SessionStore};
use crate::session::{Rejected, SessionRegistry};
use crate::transport::Transport;

/// What happened to an accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Queued on the user's session inbox.
    Enqueued,
    /// Dropped because the session inbox was full (or its actor went away).
    Dropped,
}

/// Routes events to per-user sessions.
pub struct Dispatcher<T, S, R> {
    registry: SessionRegistry<T, S, R>,
}

impl<T, S, R> Clone for Dispatcher<T, S, R> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<T, S, R> Dispatcher<T, S, R>
where
    T: Transport + 'static,
    S: SessionStore + 'static,
    R: ReviewStore + 'static,
{
    pub fn new(registry: SessionRegistry<T, S, R>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SessionRegistry<T, S, R> {
        &self.registry
    }

    /// Route one event to its sender's session.
    ///
    /// Events without a sender or chat are rejected and no session is
    /// created. Returns once the event is queued or dropped; handling happens
    /// on the session's own task.
    pub async fn dispatch(&self, event: InboundEvent) -> Result<DispatchOutcome, DispatchError> {
        let event = match SessionEvent::try_from(event) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "rejecting inbound event");
                return Err(e);
            }
        };

        let user_id = event.sender.user_id;
        let chat_id = event.chat_id;

        let handle = self.registry.resolve(user_id, chat_id).await;
        let rejected = match handle.enqueue(event) {
            Ok(()) => return Ok(DispatchOutcome::Enqueued),
            Err(Rejected {
                reason: InboxError::Full(_),
                ..
            }) => return Ok(DispatchOutcome::Dropped),
            Err(rejected) => rejected,
        };

        // The actor was evicted between resolve and enqueue. Try a fresh one
        // once.
        debug!(%user_id, "session closed during dispatch, resolving again");
        let handle = self.registry.resolve(user_id, chat_id).await;
        match handle.enqueue(rejected.event) {
            Ok(()) => Ok(DispatchOutcome::Enqueued),
            Err(rejected) => {
                warn!(%user_id, reason = %rejected.reason, "dropping event");
                Ok(DispatchOutcome::Dropped)
            }
        }
    }

    /// Dispatch events from `rx` until it closes or `cancel` fires.
    pub async fn run(&self, mut rx: mpsc::Receiver<InboundEvent>, cancel: CancellationToken) {
        info!("dispatcher started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = rx.recv() => match event {
                    // rejections are already logged
                    Some(event) => { let _ = self.dispatch(event).await; }
                    None => break,
                }
            }
        }
        info!("dispatcher stopped");
    }
}
