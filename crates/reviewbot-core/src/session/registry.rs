//! Session registry: the process-wide map from user to live session actor.
//!
//! Lookups take a fast path under the lock. On a miss the stored session is
//! hydrated with the lock released, then inserted with a check-and-set so two
//! concurrent first events for the same user always end up on one actor.

use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use reviewbot_types::config::SessionSettings;
use reviewbot_types::session::{ChatId, SessionData, UserId};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::repository::{ReviewStore, SessionStore};
use crate::transport::Transport;

use super::SessionDeps;
use super::actor::{SessionActor, SessionHandle};

struct Entry {
    handle: SessionHandle,
    last_active: Instant,
}

struct RegistryInner<T, S, R> {
    deps: SessionDeps<T, S, R>,
    settings: SessionSettings,
    entries: Mutex<HashMap<UserId, Entry>>,
    /// Parent of every actor's cancellation token.
    shutdown: CancellationToken,
}

/// Owns every live session actor.
///
/// Cloning is cheap; clones share the same map.
pub struct SessionRegistry<T, S, R> {
    inner: Arc<RegistryInner<T, S, R>>,
}

impl<T, S, R> Clone for SessionRegistry<T, S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, S, R> SessionRegistry<T, S, R>
where
    T: Transport + 'static,
    S: SessionStore + 'static,
    R: ReviewStore + 'static,
{
    pub fn new(deps: SessionDeps<T, S, R>, settings: SessionSettings) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                deps,
                settings,
                entries: Mutex::new(HashMap::new()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Return the running actor for `user_id`, creating it if needed.
    ///
    /// `chat_id` is only used when a new actor is created; an existing actor
    /// keeps the chat it was created with. Every call refreshes the session's
    /// activity timestamp.
    pub async fn resolve(&self, user_id: UserId, chat_id: ChatId) -> SessionHandle {
        if let Some(handle) = self.touch(user_id) {
            handle.start();
            return handle;
        }

        // Slow path: no lock held while the store is consulted.
        let (data, stored) = self.hydrate(user_id).await;
        let deps = self.inner.deps.clone();
        let capacity = self.inner.settings.inbox_capacity();
        let cancel = self.inner.shutdown.child_token();
        let candidate = if stored {
            SessionActor::build(data, chat_id, deps, capacity, cancel)
        } else {
            SessionActor::build_unsaved(data, chat_id, deps, capacity, cancel)
        };

        let handle = {
            let mut entries = self.lock();
            let now = Instant::now();
            match entries.entry(user_id) {
                MapEntry::Occupied(mut occupied) if !occupied.get().handle.is_cancelled() => {
                    // Lost the creation race; the candidate was never started.
                    debug!(%user_id, "session created concurrently, discarding candidate");
                    let entry = occupied.get_mut();
                    entry.last_active = now;
                    entry.handle.clone()
                }
                MapEntry::Occupied(mut occupied) => {
                    occupied.insert(Entry {
                        handle: candidate.clone(),
                        last_active: now,
                    });
                    candidate
                }
                MapEntry::Vacant(vacant) => {
                    vacant.insert(Entry {
                        handle: candidate.clone(),
                        last_active: now,
                    });
                    candidate
                }
            }
        };

        if handle.start() {
            debug!(%user_id, chat_id = %chat_id, "session actor spawned");
        }
        handle
    }

    /// Fast path: refresh and return a live entry.
    fn touch(&self, user_id: UserId) -> Option<SessionHandle> {
        let mut entries = self.lock();
        let entry = entries.get_mut(&user_id)?;
        if entry.handle.is_cancelled() {
            return None;
        }
        entry.last_active = Instant::now();
        Some(entry.handle.clone())
    }

    /// Load the stored session, falling back to a fresh one.
    ///
    /// The flag is false only when the store has no row for the user; the
    /// actor that wins installation then writes it, so a caller that loses
    /// the creation race never touches the store. Load failures are logged
    /// and never block the user from being served.
    async fn hydrate(&self, user_id: UserId) -> (SessionData, bool) {
        match self.inner.deps.sessions.load(user_id).await {
            Ok(Some(data)) => (data, true),
            Ok(None) => (SessionData::initial(user_id), false),
            Err(e) => {
                warn!(%user_id, error = %e, "failed to load session, starting fresh");
                (SessionData::initial(user_id), true)
            }
        }
    }

    /// Evict every session idle for longer than `threshold` as of `now`.
    ///
    /// Entries are removed under the lock and their actors cancelled after it
    /// is released. Returns the evicted users.
    pub fn purge_inactive(&self, now: Instant, threshold: Duration) -> Vec<UserId> {
        let evicted: Vec<(UserId, SessionHandle)> = {
            let mut entries = self.lock();
            let stale: Vec<UserId> = entries
                .iter()
                .filter(|(_, entry)| now.saturating_duration_since(entry.last_active) > threshold)
                .map(|(user_id, _)| *user_id)
                .collect();
            stale
                .into_iter()
                .filter_map(|user_id| entries.remove(&user_id).map(|e| (user_id, e.handle)))
                .collect()
        };

        evicted
            .into_iter()
            .map(|(user_id, handle)| {
                handle.cancel();
                info!(%user_id, "session expired");
                user_id
            })
            .collect()
    }

    /// Periodically purge idle sessions until [`shutdown`](Self::shutdown).
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        let registry = self.clone();
        let period = self.inner.settings.purge_interval();
        let threshold = self.inner.settings.inactivity();
        let shutdown = self.inner.shutdown.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    tick = ticker.tick() => {
                        let evicted = registry.purge_inactive(tick, threshold);
                        if !evicted.is_empty() {
                            debug!(count = evicted.len(), "purged inactive sessions");
                        }
                    }
                }
            }
            debug!("session reaper stopped");
        })
    }

    /// Cancel every actor and wait for their loops to exit.
    ///
    /// An event an actor is already handling runs to completion; queued
    /// events are discarded.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let handles: Vec<SessionHandle> = self.lock().drain().map(|(_, e)| e.handle).collect();
        let count = handles.len();

        for handle in handles {
            handle.cancel();
            if let Some(task) = handle.take_task() {
                if let Err(e) = task.await {
                    warn!(user_id = %handle.user_id(), error = %e, "session task failed");
                }
            }
        }
        info!(sessions = count, "session registry shut down");
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.lock().contains_key(&user_id)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_support::*;
    use reviewbot_types::error::InboxError;
    use reviewbot_types::reply::Reply;
    use reviewbot_types::session::SessionState;
    use std::sync::atomic::Ordering;

    fn registry(deps: TestDeps) -> SessionRegistry<RecordingTransport, MemorySessionStore, MemoryReviewStore> {
        SessionRegistry::new(deps, SessionSettings::default())
    }

    #[tokio::test]
    async fn resolve_returns_same_actor_for_same_user() {
        let registry = registry(test_deps());

        let first = registry.resolve(TEST_USER_ID, TEST_CHAT_ID).await;
        let second = registry.resolve(TEST_USER_ID, TEST_CHAT_ID).await;

        assert!(first.ptr_eq(&second));
        assert!(first.is_started());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(TEST_USER_ID));

        let other = registry.resolve(UserId(1), ChatId(1)).await;
        assert!(!other.ptr_eq(&first));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_events_share_one_actor() {
        let deps = SessionDeps::new(
            Arc::new(RecordingTransport::default()),
            Arc::new(MemorySessionStore::with_load_delay(Duration::from_millis(20))),
            Arc::new(MemoryReviewStore::default()),
        );
        let registry = registry(deps.clone());

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.resolve(TEST_USER_ID, TEST_CHAT_ID).await })
            })
            .collect();

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }

        assert_eq!(registry.len(), 1);
        assert!(handles.iter().all(|h| h.ptr_eq(&handles[0])));
        assert!(deps.sessions.load_count() >= 1);

        // only the installed actor creates the row
        eventually(|| !deps.sessions.saves().is_empty()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(deps.sessions.saves(), vec![SessionData::initial(TEST_USER_ID)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn losing_resolver_never_overwrites_live_state() {
        let deps = SessionDeps::new(
            Arc::new(RecordingTransport::default()),
            Arc::new(MemorySessionStore::with_load_barrier(2)),
            Arc::new(MemoryReviewStore::default()),
        );
        let registry = registry(deps.clone());

        let racers: Vec<_> = (0..2)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.resolve(TEST_USER_ID, TEST_CHAT_ID).await })
            })
            .collect();
        let mut handles = Vec::new();
        for racer in racers {
            handles.push(racer.await.unwrap());
        }
        assert!(handles[0].ptr_eq(&handles[1]));
        assert_eq!(deps.sessions.load_count(), 2);

        handles[0].enqueue(text_event("/comment")).unwrap();
        eventually(|| deps.transport.sent().len() == 1).await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let states: Vec<SessionState> = deps.sessions.saves().into_iter().map(|d| d.state).collect();
        assert_eq!(states, vec![SessionState::Init, SessionState::Comment]);
        assert_eq!(deps.sessions.row(TEST_USER_ID).unwrap().state, SessionState::Comment);
    }

    #[tokio::test]
    async fn hydrates_stored_session() {
        let deps = test_deps();
        deps.sessions.insert(SessionData {
            user_id: TEST_USER_ID,
            state: SessionState::Comment,
            phone_number: TEST_PHONE_NUMBER.to_string(),
        });
        let registry = registry(deps.clone());

        let handle = registry.resolve(TEST_USER_ID, TEST_CHAT_ID).await;
        handle.enqueue(text_event("my review")).unwrap();

        eventually(|| deps.transport.sent().len() == 1).await;
        assert_eq!(deps.transport.sent()[0].reply, Reply::ResumeComment);
        assert_eq!(deps.reviews.records().len(), 1);
        // existing rows are not rewritten on hydration
        assert!(deps.sessions.saves().is_empty());
    }

    #[tokio::test]
    async fn missing_row_is_materialized() {
        let deps = test_deps();
        let registry = registry(deps.clone());

        registry.resolve(TEST_USER_ID, TEST_CHAT_ID).await;

        eventually(|| !deps.sessions.saves().is_empty()).await;
        assert_eq!(deps.sessions.saves(), vec![SessionData::initial(TEST_USER_ID)]);
        assert_eq!(
            deps.sessions.row(TEST_USER_ID),
            Some(SessionData::initial(TEST_USER_ID))
        );
    }

    #[tokio::test]
    async fn load_failure_falls_back_to_fresh_session() {
        let deps = test_deps();
        deps.sessions.fail_load.store(true, Ordering::SeqCst);
        let registry = registry(deps.clone());

        let handle = registry.resolve(TEST_USER_ID, TEST_CHAT_ID).await;
        handle.enqueue(text_event("hello")).unwrap();

        // fresh session is idle, so free text gets the greeting
        eventually(|| deps.transport.sent().len() == 1).await;
        assert_eq!(
            deps.transport.sent()[0].reply,
            Reply::Help { request_phone: true }
        );
        assert!(deps.sessions.saves().is_empty());
    }

    #[tokio::test]
    async fn purge_evicts_only_idle_sessions() {
        let registry = registry(test_deps());
        let stale = registry.resolve(UserId(1), ChatId(1)).await;
        let fresh = registry.resolve(UserId(2), ChatId(2)).await;

        // make user 2 the most recently active by a clear margin
        let later = Instant::now() + Duration::from_secs(200);
        {
            let mut entries = registry.lock();
            entries.get_mut(&UserId(2)).unwrap().last_active = later;
        }

        let evicted = registry.purge_inactive(later, Duration::from_secs(300));
        assert!(evicted.is_empty());

        let evicted = registry.purge_inactive(later + Duration::from_secs(100), Duration::from_secs(250));
        assert_eq!(evicted, vec![UserId(1)]);
        assert!(stale.is_cancelled());
        assert!(!fresh.is_cancelled());
        assert!(!registry.contains(UserId(1)));
        assert!(registry.contains(UserId(2)));
    }

    #[tokio::test]
    async fn purge_at_exact_threshold_keeps_session() {
        let registry = registry(test_deps());
        registry.resolve(TEST_USER_ID, TEST_CHAT_ID).await;
        let last_active = registry.lock()[&TEST_USER_ID].last_active;

        let threshold = Duration::from_secs(300);
        assert!(registry.purge_inactive(last_active + threshold, threshold).is_empty());
        assert_eq!(
            registry.purge_inactive(last_active + threshold + Duration::from_millis(1), threshold),
            vec![TEST_USER_ID]
        );
    }

    #[tokio::test]
    async fn resolve_after_purge_creates_new_actor() {
        let deps = test_deps();
        let registry = registry(deps.clone());
        let first = registry.resolve(TEST_USER_ID, TEST_CHAT_ID).await;
        first.enqueue(text_event("/comment")).unwrap();
        eventually(|| deps.transport.sent().len() == 1).await;

        let far_future = Instant::now() + Duration::from_secs(301);
        assert_eq!(
            registry.purge_inactive(far_future, Duration::from_secs(300)),
            vec![TEST_USER_ID]
        );
        first.take_task().unwrap().await.unwrap();

        let second = registry.resolve(TEST_USER_ID, TEST_CHAT_ID).await;
        assert!(!second.ptr_eq(&first));
        assert!(second.is_started());

        // the evicted actor no longer accepts events
        let rejected = first.enqueue(text_event("late")).unwrap_err();
        assert_eq!(rejected.reason, InboxError::Closed(TEST_USER_ID));

        // state survives through the store
        second.enqueue(text_event("after restart")).unwrap();
        eventually(|| deps.reviews.records().len() == 1).await;
        assert_eq!(deps.reviews.records()[0].1.text, "after restart");
    }

    #[tokio::test(start_paused = true)]
    async fn reaper_evicts_after_inactivity() {
        let settings = SessionSettings {
            inbox_capacity: 10,
            inactivity_secs: 30,
            purge_interval_secs: 5,
        };
        let registry = SessionRegistry::new(test_deps(), settings);
        let handle = registry.resolve(TEST_USER_ID, TEST_CHAT_ID).await;
        let reaper = registry.spawn_reaper();

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(registry.contains(TEST_USER_ID));

        // activity resets the clock
        registry.resolve(TEST_USER_ID, TEST_CHAT_ID).await;
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert!(registry.contains(TEST_USER_ID));

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(!registry.contains(TEST_USER_ID));
        assert!(handle.is_cancelled());

        registry.shutdown().await;
        reaper.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_stops_every_actor() {
        let deps = test_deps();
        let registry = registry(deps.clone());
        let handles = vec![
            registry.resolve(UserId(1), ChatId(1)).await,
            registry.resolve(UserId(2), ChatId(2)).await,
            registry.resolve(UserId(3), ChatId(3)).await,
        ];

        registry.shutdown().await;

        assert!(registry.is_empty());
        assert!(registry.is_shutdown());
        for handle in &handles {
            assert!(handle.is_cancelled());
            assert!(handle.enqueue(text_event("after shutdown")).is_err());
        }
    }
}
