//! Per-user session actor.
//!
//! Each live user gets a dedicated actor task that:
//! - Serializes all handling for that user via a bounded inbox (FIFO)
//! - Owns the user's `SessionData` and is its only writer
//! - Persists every state change before replying
//!
//! The actor is built un-started. Its loop is spawned by the first call to
//! [`SessionHandle::start`]; later calls are no-ops.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use reviewbot_types::error::{InboxError, RepositoryError, SessionError};
use reviewbot_types::event::{Command, Contact, MediaRef, Payload, SessionEvent, Sender};
use reviewbot_types::reply::{OutboundMessage, Reply, ReplyMarkup};
use reviewbot_types::review::ReviewContent;
use reviewbot_types::session::{ChatId, SessionData, SessionState, UserId};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::repository::{ReviewStore, SessionStore};
use crate::transport::Transport;

use super::SessionDeps;
use super::greeting::greeting;

type ActorLoop = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

// ============================================================================
// Handle
// ============================================================================

/// An event that could not be placed in a session inbox.
///
/// Carries the event back so the caller may retry against a fresh session.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct Rejected {
    pub reason: InboxError,
    pub event: SessionEvent,
}

/// Cheap, cloneable handle to one session actor.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    user_id: UserId,
    inbox: mpsc::Sender<SessionEvent>,
    cancel: CancellationToken,
    /// One-shot start guard.
    started: AtomicBool,
    /// The actor loop, until it is spawned.
    pending: Mutex<Option<ActorLoop>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionHandle {
    /// The user this session belongs to.
    pub fn user_id(&self) -> UserId {
        self.inner.user_id
    }

    /// Push an event onto the inbox without waiting.
    ///
    /// A full inbox drops the event (drop-newest) and logs a warning; the
    /// producer is never blocked by a slow session.
    pub fn enqueue(&self, event: SessionEvent) -> Result<(), Rejected> {
        let user_id = self.inner.user_id;
        self.inner.inbox.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(event) => {
                warn!(%user_id, "session inbox full, dropping event");
                Rejected {
                    reason: InboxError::Full(user_id),
                    event,
                }
            }
            mpsc::error::TrySendError::Closed(event) => Rejected {
                reason: InboxError::Closed(user_id),
                event,
            },
        })
    }

    /// Spawn the actor loop. Only the first call has any effect.
    ///
    /// Returns `true` if this call started the loop. Must be called from
    /// within a tokio runtime.
    pub fn start(&self) -> bool {
        if self
            .inner
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match pending {
            Some(actor_loop) => {
                let task = tokio::spawn(actor_loop);
                *self.inner.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
                true
            }
            None => false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::Acquire)
    }

    /// Ask the actor to stop at its next suspension point.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Take the actor's task handle (for awaiting shutdown).
    pub fn take_task(&self) -> Option<JoinHandle<()>> {
        self.inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Whether two handles refer to the same actor.
    pub fn ptr_eq(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("user_id", &self.inner.user_id)
            .field("started", &self.is_started())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

// ============================================================================
// Actor
// ============================================================================

/// One user's conversation state machine.
pub struct SessionActor<T, S, R> {
    data: SessionData,
    chat_id: ChatId,
    deps: SessionDeps<T, S, R>,
    inbox: mpsc::Receiver<SessionEvent>,
    cancel: CancellationToken,
    /// No stored row exists yet; the loop writes one before the first event.
    unsaved: bool,
}

impl<T, S, R> SessionActor<T, S, R>
where
    T: Transport + 'static,
    S: SessionStore + 'static,
    R: ReviewStore + 'static,
{
    /// Create an actor that consumes `inbox`.
    pub fn new(
        data: SessionData,
        chat_id: ChatId,
        deps: SessionDeps<T, S, R>,
        inbox: mpsc::Receiver<SessionEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            data,
            chat_id,
            deps,
            inbox,
            cancel,
            unsaved: false,
        }
    }

    /// Build an un-started actor with a bounded inbox and return its handle.
    pub fn build(
        data: SessionData,
        chat_id: ChatId,
        deps: SessionDeps<T, S, R>,
        inbox_capacity: usize,
        cancel: CancellationToken,
    ) -> SessionHandle {
        Self::build_inner(data, chat_id, deps, inbox_capacity, cancel, false)
    }

    /// Like [`build`](Self::build), for a user the store has no row for.
    ///
    /// The actor writes the initial row itself once started, before it
    /// handles its first event.
    pub fn build_unsaved(
        data: SessionData,
        chat_id: ChatId,
        deps: SessionDeps<T, S, R>,
        inbox_capacity: usize,
        cancel: CancellationToken,
    ) -> SessionHandle {
        Self::build_inner(data, chat_id, deps, inbox_capacity, cancel, true)
    }

    fn build_inner(
        data: SessionData,
        chat_id: ChatId,
        deps: SessionDeps<T, S, R>,
        inbox_capacity: usize,
        cancel: CancellationToken,
        unsaved: bool,
    ) -> SessionHandle {
        let (tx, rx) = mpsc::channel(inbox_capacity.max(1));
        let user_id = data.user_id;
        let mut actor = Self::new(data, chat_id, deps, rx, cancel.clone());
        actor.unsaved = unsaved;

        SessionHandle {
            inner: Arc::new(HandleInner {
                user_id,
                inbox: tx,
                cancel,
                started: AtomicBool::new(false),
                pending: Mutex::new(Some(Box::pin(actor.run()))),
                task: Mutex::new(None),
            }),
        }
    }

    /// The actor's current in-memory session.
    pub fn data(&self) -> &SessionData {
        &self.data
    }

    /// Inbox loop. Exits on cancellation or when every sender is gone; an
    /// event already dequeued is always handled to completion first.
    pub async fn run(mut self) {
        let user_id = self.data.user_id;
        info!(%user_id, "session started");

        if self.unsaved {
            self.create_row().await;
        }

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!(%user_id, "session cancelled");
                    break;
                }

                event = self.inbox.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        debug!(%user_id, "session inbox closed");
                        break;
                    }
                }
            }
        }

        info!(%user_id, "session stopped");
    }

    async fn create_row(&mut self) {
        match self.deps.sessions.save(&self.data).await {
            Ok(()) => self.unsaved = false,
            Err(e) => warn!(user_id = %self.data.user_id, error = %e, "failed to create session row"),
        }
    }

    /// Handle one event. Failures become a single retry-later reply.
    pub async fn handle_event(&mut self, event: SessionEvent) {
        debug!(
            user_id = %self.data.user_id,
            sender = %event.sender.first_name,
            state = %self.data.state,
            "handling event"
        );

        if let Err(e) = self.route(event).await {
            error!(user_id = %self.data.user_id, error = %e, "failed to handle message");
            self.reply(Reply::RetryLater).await;
        }
    }

    async fn route(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        let SessionEvent {
            sender, payload, ..
        } = event;

        match payload {
            Payload::Text { text } => match Command::parse(&text) {
                Some(command) => self.handle_command(command).await,
                None => self.handle_content(text, None).await,
            },
            Payload::Contact(contact) => self.handle_contact(&sender, contact).await,
            Payload::Media(media) => {
                let refs = media.media_refs();
                let caption = media.caption_text().to_string();
                self.handle_content(caption, Some(refs)).await
            }
            Payload::Unsupported => self.handle_content(String::new(), None).await,
        }
    }

    async fn handle_command(&mut self, command: Command) -> Result<(), SessionError> {
        match command {
            Command::Start => {
                self.send_greeting().await;
            }
            Command::Comment => {
                self.update(|data| data.state = SessionState::Comment).await?;
                self.reply(Reply::StartComment).await;
            }
            Command::Finish => {
                self.update(|data| data.state = SessionState::Init).await?;
                self.reply(Reply::FinishComment).await;
            }
            Command::Unknown(text) => {
                debug!(user_id = %self.data.user_id, command = %text, "unknown command");
                self.reply(Reply::UnknownCommand).await;
            }
        }
        Ok(())
    }

    async fn handle_contact(&mut self, sender: &Sender, contact: Contact) -> Result<(), SessionError> {
        if contact.user_id != Some(sender.user_id) {
            warn!(user_id = %self.data.user_id, "contact shared for another user");
            self.reply(Reply::UseOwnContact).await;
            return Ok(());
        }

        let phone_number = contact.phone_number;
        self.update(|data| data.phone_number = phone_number).await?;
        self.send(
            OutboundMessage::new(self.chat_id, Reply::PhoneBound)
                .with_markup(ReplyMarkup::RemoveKeyboard),
        )
        .await;
        Ok(())
    }

    /// Free-form content: collected while commenting, otherwise answered
    /// with the greeting.
    async fn handle_content(
        &mut self,
        text: String,
        media: Option<Vec<MediaRef>>,
    ) -> Result<(), SessionError> {
        if self.data.state != SessionState::Comment {
            self.send_greeting().await;
            return Ok(());
        }

        let refs = media.unwrap_or_default();
        if text.is_empty() && refs.is_empty() {
            self.reply(Reply::SendValidComment).await;
            return Ok(());
        }

        let mut media_urls = Vec::with_capacity(refs.len());
        for media_ref in &refs {
            let url = self
                .deps
                .transport
                .resolve_media_url(&media_ref.file_id)
                .await?;
            debug!(user_id = %self.data.user_id, kind = ?media_ref.kind, "media url resolved");
            media_urls.push(url);
        }

        let content = ReviewContent::new(text, media_urls);
        self.deps.reviews.store(self.data.user_id, &content).await?;
        debug!(
            user_id = %self.data.user_id,
            media = content.media_urls.len(),
            "review content stored"
        );

        self.reply(Reply::ResumeComment).await;
        Ok(())
    }

    /// Apply a change and persist it. The in-memory copy is restored if the
    /// save fails, so it never runs ahead of the store.
    async fn update(&mut self, change: impl FnOnce(&mut SessionData)) -> Result<(), RepositoryError> {
        let previous = self.data.clone();
        change(&mut self.data);
        if let Err(e) = self.deps.sessions.save(&self.data).await {
            self.data = previous;
            return Err(e);
        }
        Ok(())
    }

    async fn send_greeting(&self) {
        self.send(greeting(&self.data, self.chat_id)).await;
    }

    async fn reply(&self, reply: Reply) {
        self.send(OutboundMessage::new(self.chat_id, reply)).await;
    }

    /// Single delivery attempt; failures are logged, not retried.
    async fn send(&self, message: OutboundMessage) {
        if let Err(e) = self.deps.transport.send(&message).await {
            error!(
                user_id = %self.data.user_id,
                chat_id = %message.chat_id,
                error = %e,
                "failed to send reply"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
