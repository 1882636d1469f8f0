//! Session registry and polling task lifecycle.
//!
//! Each session carries two locks, always taken in this order:
//! 1. the task slot, held for the whole of a start / stop / restart so that
//!    lifecycle transitions of one session never interleave;
//! 2. the field lock, held only for short reads and writes.
//!
//! Polling tasks take only the field lock, so a lifecycle transition may
//! await the exit of the old task while holding the slot.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{ChatId, InputError, UserSession};
use crate::ports::BotServices;
use crate::scheduler::PollingTask;

/// Session lifecycle errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No active session")]
    NoActiveSession,

    #[error("Session already exists, to run new session - stop the previous one")]
    AlreadyActive,

    #[error(transparent)]
    Input(#[from] InputError),
}

/// Polling task of one session generation.
struct TaskSlot {
    generation: u64,
    /// Single-use stop signal; sending consumes it.
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TaskSlot {
    /// Fires the stop signal without waiting for the task.
    fn signal(self, chat_id: ChatId) -> (u64, JoinHandle<()>) {
        if self.cancel.send(()).is_err() {
            warn!(
                chat_id,
                generation = self.generation,
                "Polling task exited before it was cancelled"
            );
        }
        (self.generation, self.handle)
    }

    /// Fires the stop signal and waits until the task has exited.
    async fn stop(self, chat_id: ChatId) {
        let (generation, handle) = self.signal(chat_id);
        join_task(chat_id, generation, handle).await;
    }
}

async fn join_task(chat_id: ChatId, generation: u64, handle: JoinHandle<()>) {
    match handle.await {
        Ok(()) => debug!(chat_id, generation, "Polling task stopped"),
        Err(e) if e.is_panic() => {
            error!(chat_id, generation, "Polling task panicked: {}", e);
        }
        Err(e) => warn!(chat_id, generation, "Polling task did not finish: {}", e),
    }
}

/// One chat's session: its fields plus the slot of its polling task.
pub struct SessionHandle {
    chat_id: ChatId,
    state: Mutex<UserSession>,
    task: Mutex<Option<TaskSlot>>,
    generations: AtomicU64,
    running: AtomicUsize,
}

impl SessionHandle {
    fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            state: Mutex::new(UserSession::new()),
            task: Mutex::new(None),
            generations: AtomicU64::new(0),
            running: AtomicUsize::new(0),
        }
    }

    /// Chat this session belongs to.
    #[must_use]
    pub const fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// Locks the session fields.
    ///
    /// Do not hold the guard across a registry lifecycle call.
    pub async fn lock(&self) -> MutexGuard<'_, UserSession> {
        self.state.lock().await
    }

    /// Returns a consistent copy of the session fields.
    pub async fn snapshot(&self) -> UserSession {
        self.state.lock().await.clone()
    }

    /// Number of polling tasks currently alive for this session.
    #[must_use]
    pub fn running_tasks(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Registers a live polling task; the count drops when the guard does.
    pub(crate) fn track_task(self: &Arc<Self>) -> TaskGuard {
        let live = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        TaskGuard {
            session: Arc::clone(self),
            live,
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("chat_id", &self.chat_id)
            .field("running", &self.running_tasks())
            .finish_non_exhaustive()
    }
}

/// Keeps a session's live task count up while a polling task runs.
#[derive(Debug)]
pub struct TaskGuard {
    session: Arc<SessionHandle>,
    live: usize,
}

impl TaskGuard {
    /// Live tasks for the session, this one included, at registration time.
    #[must_use]
    pub const fn live_at_start(&self) -> usize {
        self.live
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.session.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Concurrent map from chat id to session.
///
/// Unrelated chats never contend on a shared lock; the map itself is sharded
/// and every session synchronizes on its own locks.
pub struct SessionRegistry {
    sessions: DashMap<ChatId, Arc<SessionHandle>>,
    services: Arc<BotServices>,
}

impl SessionRegistry {
    /// Creates an empty registry whose tasks use the given collaborators.
    #[must_use]
    pub fn new(services: Arc<BotServices>) -> Self {
        Self {
            sessions: DashMap::new(),
            services,
        }
    }

    /// Collaborators shared with the polling tasks.
    #[must_use]
    pub const fn services(&self) -> &Arc<BotServices> {
        &self.services
    }

    /// Returns the session of `chat_id`, creating it with defaults if absent.
    #[must_use]
    pub fn get_or_create(&self, chat_id: ChatId) -> Arc<SessionHandle> {
        let entry = self.sessions.entry(chat_id).or_insert_with(|| {
            debug!(chat_id, "Creating session");
            Arc::new(SessionHandle::new(chat_id))
        });
        Arc::clone(entry.value())
    }

    /// Returns the session of `chat_id` if one was ever created.
    #[must_use]
    pub fn get(&self, chat_id: ChatId) -> Option<Arc<SessionHandle>> {
        self.sessions.get(&chat_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of known sessions, active or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no session was ever created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Live polling tasks of `chat_id` (0 for unknown chats).
    #[must_use]
    pub fn running_tasks(&self, chat_id: ChatId) -> usize {
        self.get(chat_id).map_or(0, |handle| handle.running_tasks())
    }

    /// Marks the session active and starts its polling task.
    ///
    /// Returns the notification interval in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyActive`] if a task is already running.
    pub async fn activate(&self, chat_id: ChatId) -> Result<u64, SessionError> {
        let handle = self.get_or_create(chat_id);
        let mut task = handle.task.lock().await;

        let interval_secs = {
            let mut state = handle.state.lock().await;
            if state.active {
                return Err(SessionError::AlreadyActive);
            }
            state.active = true;
            state.poll_interval_secs()
        };

        if let Some(stray) = task.take() {
            error!(
                chat_id,
                generation = stray.generation,
                "Inactive session still owned a polling task, stopping it"
            );
            stray.stop(chat_id).await;
        }

        *task = Some(self.spawn_task(&handle, interval_secs));
        info!(chat_id, interval_secs, "Session activated");

        Ok(interval_secs)
    }

    /// Stops the polling task and marks the session inactive.
    ///
    /// Returns only after the task has exited.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoActiveSession`] for absent or inactive sessions.
    pub async fn deactivate(&self, chat_id: ChatId) -> Result<(), SessionError> {
        let handle = self.get(chat_id).ok_or(SessionError::NoActiveSession)?;
        let mut task = handle.task.lock().await;

        let active = handle.state.lock().await.active;
        if !active {
            return Err(SessionError::NoActiveSession);
        }

        match task.take() {
            Some(slot) => slot.stop(chat_id).await,
            None => error!(chat_id, "Active session had no polling task"),
        }

        handle.state.lock().await.mark_inactive();
        info!(chat_id, "Session deactivated");

        Ok(())
    }

    /// Stores a new notification interval and restarts the polling task with it.
    ///
    /// The old task has exited before the new one is spawned.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoActiveSession`] for absent or inactive sessions
    /// and [`SessionError::Input`] for an out-of-range interval.
    pub async fn set_poll_interval(&self, chat_id: ChatId, secs: i64) -> Result<u64, SessionError> {
        let handle = self.get(chat_id).ok_or(SessionError::NoActiveSession)?;
        let mut task = handle.task.lock().await;

        let interval_secs = {
            let mut state = handle.state.lock().await;
            if !state.active {
                return Err(SessionError::NoActiveSession);
            }
            state.set_poll_interval_secs(secs)?
        };

        match task.take() {
            Some(old) => old.stop(chat_id).await,
            None => error!(chat_id, "Active session had no polling task to restart"),
        }

        *task = Some(self.spawn_task(&handle, interval_secs));
        info!(chat_id, interval_secs, "Polling task restarted with new interval");

        Ok(interval_secs)
    }

    /// Stops every polling task and waits for all of them to exit.
    pub async fn shutdown(&self) {
        let handles: Vec<Arc<SessionHandle>> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut stopping = Vec::new();
        for handle in &handles {
            let mut task = handle.task.lock().await;
            if let Some(slot) = task.take() {
                stopping.push((handle.chat_id, slot.signal(handle.chat_id)));
            }
            handle.state.lock().await.mark_inactive();
        }

        let count = stopping.len();
        for (chat_id, (generation, join)) in stopping {
            join_task(chat_id, generation, join).await;
        }

        info!("Stopped {} polling tasks", count);
    }

    /// Spawns a polling task with a freshly created stop signal.
    ///
    /// Signals are never reused: every generation gets its own channel.
    fn spawn_task(&self, handle: &Arc<SessionHandle>, interval_secs: u64) -> TaskSlot {
        let generation = handle.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let (cancel, cancelled) = oneshot::channel();

        let join = PollingTask::new(
            Arc::clone(handle),
            Arc::clone(&self.services),
            generation,
            Duration::from_secs(interval_secs),
        )
        .spawn(cancelled);

        TaskSlot {
            generation,
            cancel,
            handle: join,
        }
    }
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("services", &self.services)
            .finish()
    }
}
