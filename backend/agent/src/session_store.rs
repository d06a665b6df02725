//! In-memory session storage.
//!
//! Sessions live in an LRU-bounded cache keyed by conversation id. Whole
//! round-trips for one conversation run one at a time behind a per-id async
//! gate; gates are kept outside the cache so neither eviction nor a reset can
//! hand a second caller a fresh gate while the first still holds the old one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use hermes_core::{Session, Turn};
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

/// Default cap on distinct conversations held at once.
pub const DEFAULT_MAX_SESSIONS: u64 = 10_000;

type Gate = Arc<tokio::sync::Mutex<()>>;
type GateMap = Mutex<HashMap<String, Gate>>;

struct SessionEntry {
    state: Mutex<Session>,
}

impl SessionEntry {
    fn new(id: &str) -> Self {
        Self {
            state: Mutex::new(Session::new(id)),
        }
    }

    fn state(&self) -> MutexGuard<'_, Session> {
        // Critical sections never panic mid-update; poisoning is ignored.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn lock_gates(gates: &GateMap) -> MutexGuard<'_, HashMap<String, Gate>> {
    gates.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Exclusive use of one conversation, held for a whole exchange.
///
/// The permit pins the session entry it was granted for: writes made through
/// it land in that entry and never in one created by a concurrent reset.
pub struct SessionPermit {
    id: String,
    entry: Arc<SessionEntry>,
    gates: Arc<GateMap>,
    _guard: OwnedMutexGuard<()>,
}

impl SessionPermit {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Copy of the session state as seen by this permit.
    pub fn session(&self) -> Session {
        self.entry.state().clone()
    }
}

impl Drop for SessionPermit {
    fn drop(&mut self) {
        // The map and our guard hold one reference each; anything more is a waiter.
        let mut gates = lock_gates(&self.gates);
        if gates.get(&self.id).is_some_and(|g| Arc::strong_count(g) <= 2) {
            gates.remove(&self.id);
        }
    }
}

pub struct SessionStore {
    sessions: Cache<String, Arc<SessionEntry>>,
    gates: Arc<GateMap>,
}

impl SessionStore {
    pub fn new(max_sessions: u64) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(max_sessions)
                .eviction_policy(EvictionPolicy::lru())
                .build(),
            gates: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn entry(&self, id: &str) -> Arc<SessionEntry> {
        self.sessions.get_with_by_ref(id, || {
            debug!(session_id = %id, "Creating session");
            Arc::new(SessionEntry::new(id))
        })
    }

    /// Return the session for `id`, creating it on first use.
    ///
    /// Repeated calls return the same logical session until [`reset`](Self::reset).
    pub fn get_or_create(&self, id: &str) -> Session {
        self.entry(id).state().clone()
    }

    /// Current state without creating anything.
    pub fn snapshot(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).map(|entry| entry.state().clone())
    }

    pub fn append(&self, id: &str, turn: Turn) {
        self.entry(id).state().append(turn);
    }

    /// Keep only the most recent `max_turns` turns.
    pub fn trim(&self, id: &str, max_turns: usize) {
        self.entry(id).state().trim(max_turns);
    }

    /// Record one successful exchange: both turns, the thread id, the
    /// counter bump and the retention trim happen under one lock.
    /// Returns the new message count.
    ///
    /// Writes go to the entry pinned by `permit`. If that entry was evicted
    /// while the exchange ran it is put back, since no other writer can hold
    /// the conversation meanwhile.
    pub fn record_exchange(
        &self,
        permit: &SessionPermit,
        user: Turn,
        assistant: Turn,
        thread_id: Option<String>,
        retention: usize,
    ) -> u64 {
        let count = {
            let mut session = permit.entry.state();
            session.append(user);
            session.append(assistant);
            session.trim(retention);
            if thread_id.is_some() {
                session.thread_id = thread_id;
            }
            session.message_count += 1;
            session.message_count
        };

        let current = self
            .sessions
            .get(permit.id())
            .is_some_and(|entry| Arc::ptr_eq(&entry, &permit.entry));
        if !current {
            debug!(session_id = %permit.id(), "Restoring session evicted mid-exchange");
            self.sessions
                .insert(permit.id().to_string(), Arc::clone(&permit.entry));
        }
        count
    }

    /// Forget the session. Returns whether one existed.
    ///
    /// Callers that may race an exchange should hold the conversation's
    /// permit while resetting.
    pub fn reset(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Wait for exclusive use of the conversation `id`.
    pub async fn acquire(&self, id: &str) -> SessionPermit {
        let gate = {
            let mut gates = lock_gates(&self.gates);
            Arc::clone(gates.entry(id.to_string()).or_default())
        };
        let guard = gate.lock_owned().await;
        SessionPermit {
            id: id.to_string(),
            entry: self.entry(id),
            gates: Arc::clone(&self.gates),
            _guard: guard,
        }
    }

    /// Approximate number of live sessions.
    pub fn len(&self) -> u64 {
        self.sessions.run_pending_tasks();
        self.sessions.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}
