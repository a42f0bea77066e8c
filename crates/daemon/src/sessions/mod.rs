// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live session management: the in-memory map, per-turn persistence, the
//! idle sweeper, and restore-on-startup.
//!
//! Locking discipline: the map lock is taken before any session lock and
//! released before the session lock is dropped into a closure; no lock is
//! ever held across disk I/O. "Persist after turn" is a snapshot posted
//! to a single persister task; serial queue processing is what keeps
//! per-session persistence ordered, not locks held across I/O.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use p42_core::{Clock, Metadata, ObjectType, Role, Session, SessionState};
use p42_storage::{SessionIndex, SessionIndexEntry, Store, StoreError};

struct SessionSlot {
    inner: Mutex<Session>,
}

enum PersistMsg {
    Snapshot(Session),
    /// Barrier: acked once everything enqueued before it has been written.
    Flush(oneshot::Sender<()>),
}

pub struct SessionManager<C: Clock> {
    sessions: RwLock<HashMap<String, Arc<SessionSlot>>>,
    store: Arc<Store>,
    index: Arc<SessionIndex>,
    clock: C,
    idle_timeout_ms: u64,
    persist_tx: mpsc::UnboundedSender<PersistMsg>,
}

impl<C: Clock> SessionManager<C> {
    /// Must be called from within a tokio runtime: the persister task is
    /// spawned here.
    pub fn new(store: Arc<Store>, index: Arc<SessionIndex>, clock: C, idle_timeout_ms: u64) -> Self {
        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        spawn_persister(Arc::clone(&store), Arc::clone(&index), clock.clone(), persist_rx);
        Self {
            sessions: RwLock::new(HashMap::new()),
            store,
            index,
            clock,
            idle_timeout_ms,
            persist_tx,
        }
    }

    /// Find or create a session. A requested id that is neither live nor
    /// in the index starts a fresh session under that id.
    pub fn get_or_create(&self, session_id: Option<&str>, agent: &str) -> (String, bool) {
        if let Some(id) = session_id {
            if self.sessions.read().contains_key(id) {
                return (id.to_string(), false);
            }
            if let Some(entry) = self.index.get(id) {
                if self.rehydrate(&entry) {
                    return (id.to_string(), false);
                }
            }
            self.insert_new(id, agent);
            return (id.to_string(), true);
        }

        let mut id = format!("cli-{}", self.clock.epoch_ms());
        // Two sessions opened in the same millisecond get distinct ids.
        while self.sessions.read().contains_key(&id) || self.index.get(&id).is_some() {
            id.push('x');
        }
        self.insert_new(&id, agent);
        (id, true)
    }

    fn insert_new(&self, id: &str, agent: &str) {
        let mut session = Session::new(id, agent, self.clock.now());
        session.idle_timeout_ms = self.idle_timeout_ms;
        self.sessions.write().insert(id.to_string(), Arc::new(SessionSlot { inner: Mutex::new(session) }));
        info!(session = id, agent, "session created");
    }

    /// Pull a persisted session back into the live map. Timestamps are
    /// kept, so the next sweep classifies it correctly.
    fn rehydrate(&self, entry: &SessionIndexEntry) -> bool {
        if entry.state.is_terminal() {
            return false;
        }
        match self.load_persisted(&entry.object_id) {
            Ok(session) => {
                self.sessions
                    .write()
                    .entry(session.id.clone())
                    .or_insert_with(|| Arc::new(SessionSlot { inner: Mutex::new(session) }));
                debug!(session = %entry.id, "session rehydrated");
                true
            }
            Err(e) => {
                warn!(session = %entry.id, error = %e, "failed to rehydrate session");
                false
            }
        }
    }

    fn load_persisted(&self, object_id: &str) -> Result<Session, StoreError> {
        let bytes = self.store.read_object(object_id)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Run `f` under the session lock, then enqueue the mutated session
    /// for persistence. Returns `None` for an unknown session.
    pub fn mutate<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let slot = self.sessions.read().get(id).cloned()?;
        let (result, snapshot) = {
            let mut session = slot.inner.lock();
            let result = f(&mut session);
            (result, session.clone())
        };
        self.enqueue_persist(snapshot);
        Some(result)
    }

    /// Append a message and enqueue a persist. Returns the updated
    /// snapshot.
    pub fn append_message(&self, id: &str, role: Role, content: &str) -> Option<Session> {
        let now = self.clock.now();
        let slot = self.sessions.read().get(id).cloned()?;
        let snapshot = {
            let mut session = slot.inner.lock();
            session.add_message(role, content, now);
            session.clone()
        };
        self.enqueue_persist(snapshot.clone());
        Some(snapshot)
    }

    /// A point-in-time copy: live map first, then the persisted store.
    pub fn snapshot(&self, id: &str) -> Option<Session> {
        if let Some(slot) = self.sessions.read().get(id).cloned() {
            return Some(slot.inner.lock().clone());
        }
        let entry = self.index.get(id)?;
        self.load_persisted(&entry.object_id).ok()
    }

    /// Explicit terminal transition. The session is persisted and leaves
    /// the live map. Ordering matters: the terminal snapshot goes through
    /// the same queue as the turn snapshots before it.
    pub fn complete(&self, id: &str) -> Option<Session> {
        let slot = self.sessions.read().get(id).cloned()?;
        let snapshot = {
            let mut session = slot.inner.lock();
            session.complete();
            session.clone()
        };
        self.sessions.write().remove(id);
        self.enqueue_persist(snapshot.clone());
        Some(snapshot)
    }

    /// One sweep cycle over every live session: at most one transition
    /// each, abandoned sessions leave the map after a final persist.
    pub fn sweep(&self) {
        let now = self.clock.now();
        let live: Vec<(String, Arc<SessionSlot>)> = self
            .sessions
            .read()
            .iter()
            .map(|(id, slot)| (id.clone(), Arc::clone(slot)))
            .collect();

        for (id, slot) in live {
            let transition = {
                let mut session = slot.inner.lock();
                session.sweep(now).map(|state| (state, session.clone()))
            };
            match transition {
                Some((SessionState::Abandoned, snapshot)) => {
                    info!(session = %id, "session abandoned");
                    self.sessions.write().remove(&id);
                    self.enqueue_persist(snapshot);
                }
                Some((state, snapshot)) => {
                    debug!(session = %id, state = %state, "session swept");
                    self.enqueue_persist(snapshot);
                }
                None => {}
            }
        }
    }

    /// Rehydrate recent non-terminal sessions from the index.
    pub fn restore(&self, window: chrono::Duration) {
        let cutoff = self.clock.now() - window;
        let mut restored = 0usize;
        for entry in self.index.all() {
            if entry.created_at < cutoff {
                continue;
            }
            if !matches!(entry.state, SessionState::Active | SessionState::Idle) {
                continue;
            }
            if self.rehydrate(&entry) {
                restored += 1;
            }
        }
        if restored > 0 {
            info!(restored, "sessions restored from index");
        }
    }

    /// Persist every live non-terminal session and wait for the queue to
    /// drain. Used at shutdown: the final snapshots are enqueued behind
    /// any still-pending turn snapshots, so the last write wins.
    pub async fn persist_all(&self) {
        let live: Vec<Arc<SessionSlot>> = self.sessions.read().values().cloned().collect();
        for slot in live {
            let snapshot = slot.inner.lock().clone();
            if snapshot.state.is_terminal() {
                continue;
            }
            self.enqueue_persist(snapshot);
        }
        self.flush().await;
    }

    /// Wait until every snapshot enqueued so far has been written.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.persist_tx.send(PersistMsg::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Summaries of every live session, for `/memory` merges and status.
    pub fn live_summaries(&self) -> Vec<SessionIndexEntry> {
        self.sessions
            .read()
            .values()
            .map(|slot| {
                let s = slot.inner.lock();
                SessionIndexEntry {
                    id: s.id.clone(),
                    object_id: String::new(),
                    agent: s.agent.clone(),
                    created_at: s.created_at,
                    last_activity: s.last_activity,
                    state: s.state,
                    message_count: s.message_count(),
                }
            })
            .collect()
    }

    /// Index summaries merged with live state (live wins per id).
    pub fn all_summaries(&self) -> Vec<SessionIndexEntry> {
        let mut by_id: HashMap<String, SessionIndexEntry> =
            self.index.all().into_iter().map(|e| (e.id.clone(), e)).collect();
        for live in self.live_summaries() {
            by_id.insert(live.id.clone(), live);
        }
        let mut all: Vec<_> = by_id.into_values().collect();
        all.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        all
    }

    pub fn live_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Serialize and store one session snapshot immediately, bypassing
    /// the queue. Used where the caller needs the paths to exist before
    /// replying (and by tests).
    pub fn persist(&self, snapshot: &Session) -> Result<String, StoreError> {
        persist_session(&self.store, &self.index, snapshot, self.clock.now())
    }

    /// Post a snapshot to the persister queue. Failures never fail the
    /// originating request.
    fn enqueue_persist(&self, snapshot: Session) {
        if self.persist_tx.send(PersistMsg::Snapshot(snapshot)).is_err() {
            warn!("persist queue closed; snapshot dropped");
        }
    }
}

/// The single persister task: serial processing is the ordering
/// guarantee for per-session persistence.
fn spawn_persister<C: Clock>(
    store: Arc<Store>,
    index: Arc<SessionIndex>,
    clock: C,
    mut rx: mpsc::UnboundedReceiver<PersistMsg>,
) {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match msg {
                PersistMsg::Snapshot(snapshot) => {
                    if let Err(e) = persist_session(&store, &index, &snapshot, clock.now()) {
                        warn!(session = %snapshot.id, error = %e, "background persist failed");
                    }
                }
                PersistMsg::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
    });
}

/// The three virtual paths a session is visible under: by id, by date,
/// by agent.
pub fn session_paths(session: &Session) -> Vec<String> {
    vec![
        format!("/memory/{}", session.id),
        format!("/by-date/{}/{}", session.created_at.format("%Y-%m-%d"), session.id),
        format!("/by-agent/{}/memory/{}", session.agent, session.id),
    ]
}

/// Serialize and store a session snapshot. Each turn produces a new
/// object id; the path set stays the same, so it is released from the
/// previous snapshot's record first.
fn persist_session(
    store: &Store,
    index: &SessionIndex,
    snapshot: &Session,
    now: DateTime<Utc>,
) -> Result<String, StoreError> {
    let bytes = serde_json::to_vec_pretty(snapshot)?;
    let paths = session_paths(snapshot);
    store.release_paths(&paths, now)?;

    let mut metadata = Metadata::new(ObjectType::Session);
    metadata.title = snapshot.id.clone();
    metadata.agent = Some(snapshot.agent.clone());
    metadata.session = Some(snapshot.id.clone());
    metadata.created = snapshot.created_at;
    metadata.description = format!("conversation with {}", snapshot.agent);
    for path in &paths {
        metadata.add_path(path.clone());
    }
    let object_id = store.store_with_metadata(&bytes, &mut metadata, now)?;

    index.upsert(SessionIndexEntry {
        id: snapshot.id.clone(),
        object_id: object_id.clone(),
        agent: snapshot.agent.clone(),
        created_at: snapshot.created_at,
        last_activity: snapshot.last_activity,
        state: snapshot.state,
        message_count: snapshot.message_count(),
    })?;
    Ok(object_id)
}

/// Run the sweeper until cancelled.
pub fn spawn_sweeper<C: Clock>(
    manager: Arc<SessionManager<C>>,
    interval: std::time::Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => manager.sweep(),
                _ = shutdown.cancelled() => break,
            }
        }
    })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
