use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::settings::SettingKey;
use crate::socialdata::MonitorType;

/// What a chat's pending multi-step interaction is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// A monitor-type button press.
    AwaitingMonitorTypeSelection,
    /// The target handle for a new monitor of the recorded type.
    AwaitingHandleInput { monitor_type: MonitorType },
    /// A view/delete button press for the conflicting monitor.
    /// The handle is kept lower-cased for case-insensitive matching.
    AwaitingDuplicateResolution { handle: String },
    /// The handle whose monitor should be stopped.
    AwaitingStopHandleInput,
    /// The monitor id to show details for.
    AwaitingDetailsId,
    /// The new value for the recorded setting key.
    AwaitingSettingValue { key: SettingKey },
}

/// The ephemeral per-chat interaction record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub state: SessionState,
}

impl Session {
    pub fn new(state: SessionState) -> Self {
        Self { state }
    }
}

/// Process-local table of pending sessions, at most one per chat id.
///
/// `put` replaces whatever was pending: a new command always wins over an
/// unfinished conversation. `acquire` hands out a per-chat guard that every
/// engine entry point holds across its full transition, so two inputs for
/// the same chat can never interleave while one is suspended on an external
/// call; unrelated chats proceed concurrently.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<i64, Session>>,
    guards: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize transitions for one chat id. Guard entries live for the
    /// process lifetime; the operator set is small and static.
    pub async fn acquire(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let guard = {
            let mut guards = self.guards.lock().expect("session lock poisoned");
            guards
                .entry(chat_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        guard.lock_owned().await
    }

    pub fn put(&self, chat_id: i64, session: Session) {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        sessions.insert(chat_id, session);
    }

    /// Remove and return the pending session, if any. Taking up front means
    /// every outcome of the transition leaves the store clean unless the
    /// engine explicitly re-arms a follow-up state.
    pub fn take(&self, chat_id: i64) -> Option<Session> {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        sessions.remove(&chat_id)
    }

    pub fn clear(&self, chat_id: i64) {
        let mut sessions = self.sessions.lock().expect("session lock poisoned");
        sessions.remove(&chat_id);
    }

    pub fn get(&self, chat_id: i64) -> Option<Session> {
        let sessions = self.sessions.lock().expect("session lock poisoned");
        sessions.get(&chat_id).cloned()
    }
}
