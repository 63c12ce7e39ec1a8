//! Recording collaborators for session tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Barrier;

use reviewbot_types::error::{RepositoryError, TransportError};
use reviewbot_types::event::{Payload, SessionEvent, Sender};
use reviewbot_types::reply::{Delivery, OutboundMessage};
use reviewbot_types::review::ReviewContent;
use reviewbot_types::session::{ChatId, SessionData, UserId};

use crate::repository::{ReviewStore, SessionStore};
use crate::transport::Transport;

use super::SessionDeps;

pub const TEST_CHAT_ID: ChatId = ChatId(8989);
pub const TEST_USER_ID: UserId = UserId(3678);
pub const TEST_PHONE_NUMBER: &str = "86478901";

pub type TestDeps = SessionDeps<RecordingTransport, MemorySessionStore, MemoryReviewStore>;

pub fn test_deps() -> TestDeps {
    SessionDeps::new(
        Arc::new(RecordingTransport::default()),
        Arc::new(MemorySessionStore::default()),
        Arc::new(MemoryReviewStore::default()),
    )
}

pub fn event_from(user_id: UserId, payload: Payload) -> SessionEvent {
    SessionEvent {
        sender: Sender {
            user_id,
            first_name: "Tester".to_string(),
        },
        chat_id: TEST_CHAT_ID,
        payload,
    }
}

pub fn text_event(text: &str) -> SessionEvent {
    event_from(TEST_USER_ID, Payload::text(text))
}

/// Poll `cond` until it holds, failing the test after about two seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutboundMessage>>,
    media_lookups: Mutex<Vec<String>>,
    pub fail_send: AtomicBool,
    pub fail_media: AtomicBool,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn media_lookups(&self) -> Vec<String> {
        self.media_lookups.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<Delivery, TransportError> {
        let count = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(*message);
            sent.len()
        };
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(TransportError::Request("connection reset".to_string()));
        }
        Ok(Delivery {
            message_id: count as i64,
        })
    }

    async fn resolve_media_url(&self, file_id: &str) -> Result<String, TransportError> {
        self.media_lookups.lock().unwrap().push(file_id.to_string());
        if self.fail_media.load(Ordering::SeqCst) {
            return Err(TransportError::Api {
                code: 400,
                description: "Bad Request: invalid file_id".to_string(),
            });
        }
        Ok(format!("https://files.test/{file_id}"))
    }
}

// ---------------------------------------------------------------------------
// Session store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemorySessionStore {
    rows: Mutex<HashMap<UserId, SessionData>>,
    saves: Mutex<Vec<SessionData>>,
    loads: AtomicUsize,
    pub fail_load: AtomicBool,
    pub fail_save: AtomicBool,
    /// Simulated latency for `load`, to widen creation races.
    pub load_delay: Option<Duration>,
    /// Simulated latency for `save`, to stall an actor.
    pub save_delay: Option<Duration>,
    /// Holds every `load` until this many are in flight.
    pub load_barrier: Option<Arc<Barrier>>,
}

impl MemorySessionStore {
    pub fn with_load_delay(delay: Duration) -> Self {
        Self {
            load_delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn with_load_barrier(loads: usize) -> Self {
        Self {
            load_barrier: Some(Arc::new(Barrier::new(loads))),
            ..Default::default()
        }
    }

    pub fn with_save_delay(delay: Duration) -> Self {
        Self {
            save_delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn insert(&self, data: SessionData) {
        self.rows.lock().unwrap().insert(data.user_id, data);
    }

    pub fn row(&self, user_id: UserId) -> Option<SessionData> {
        self.rows.lock().unwrap().get(&user_id).cloned()
    }

    pub fn saves(&self) -> Vec<SessionData> {
        self.saves.lock().unwrap().clone()
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl SessionStore for MemorySessionStore {
    async fn load(&self, user_id: UserId) -> Result<Option<SessionData>, RepositoryError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.load_barrier {
            barrier.wait().await;
        }
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection);
        }
        Ok(self.row(user_id))
    }

    async fn save(&self, data: &SessionData) -> Result<(), RepositoryError> {
        if let Some(delay) = self.save_delay {
            tokio::time::sleep(delay).await;
        }
        self.saves.lock().unwrap().push(data.clone());
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("save fail".to_string()));
        }
        self.insert(data.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Review store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryReviewStore {
    records: Mutex<Vec<(UserId, ReviewContent)>>,
    pub fail: AtomicBool,
}

impl MemoryReviewStore {
    pub fn records(&self) -> Vec<(UserId, ReviewContent)> {
        self.records.lock().unwrap().clone()
    }
}

impl ReviewStore for MemoryReviewStore {
    async fn store(&self, user_id: UserId, content: &ReviewContent) -> Result<(), RepositoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection);
        }
        self.records.lock().unwrap().push((user_id, content.clone()));
        Ok(())
    }
}
