/// In-memory session store - the single source of truth for session state
///
/// Sessions are ephemeral: they live for the duration of a send (plus a
/// retention window) and are swept by age. All mutation goes through
/// [`SessionStore::update`] / [`SessionStore::append_log`]; nothing else
/// hands out mutable access to a session record.
use crate::models::session::{LogEntry, LogStatus, Session, SessionStats, SessionUpdate};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn create(&self, session: Session) {
        let mut sessions = self.write();
        sessions.insert(session.id.clone(), session);
    }

    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.read().get(session_id).cloned()
    }

    /// Read-modify-write partial update; no-op for unknown ids
    pub fn update(&self, session_id: &str, update: SessionUpdate) -> bool {
        let mut sessions = self.write();
        let Some(session) = sessions.get_mut(session_id) else {
            return false;
        };
        if let Some(status) = update.status {
            session.status = status;
        }
        if let Some(stats) = update.stats {
            session.stats = stats;
        }
        if let Some(started_at) = update.started_at {
            session.started_at = Some(started_at);
        }
        if let Some(completed_at) = update.completed_at {
            session.completed_at = Some(completed_at);
        }
        true
    }

    /// Flips a non-terminal session to `completed`, stamping the
    /// completion time. Returns false for unknown sessions and for
    /// sessions already in a terminal state, so exactly one caller wins
    /// when concurrent job finishers race on the transition and a
    /// cancelled session can never become completed.
    pub fn try_complete(&self, session_id: &str, completed_at: chrono::DateTime<Utc>) -> bool {
        let mut sessions = self.write();
        let Some(session) = sessions.get_mut(session_id) else {
            return false;
        };
        if session.status.is_terminal() {
            return false;
        }
        session.status = crate::models::session::SessionStatus::Completed;
        session.completed_at = Some(completed_at);
        true
    }

    pub fn delete(&self, session_id: &str) -> bool {
        self.write().remove(session_id).is_some()
    }

    pub fn list_all(&self) -> Vec<Session> {
        self.read().values().cloned().collect()
    }

    /// Appends an attempt log entry and recomputes the aggregate stats
    /// from the full log: sent/failed are terminal entry counts, pending
    /// is the remainder. Stats are always derived, never independently
    /// mutated, so `total == sent + failed + pending` holds by
    /// construction.
    pub fn append_log(&self, session_id: &str, entry: LogEntry) {
        let mut sessions = self.write();
        let Some(session) = sessions.get_mut(session_id) else {
            return;
        };
        session.logs.push(entry);

        let sent = session
            .logs
            .iter()
            .filter(|log| log.status == LogStatus::Sent)
            .count();
        let failed = session
            .logs
            .iter()
            .filter(|log| log.status == LogStatus::Failed)
            .count();
        let total = session.recipients.len();
        session.stats = SessionStats {
            total,
            sent,
            failed,
            pending: total.saturating_sub(sent + failed),
        };
    }

    pub fn logs(&self, session_id: &str) -> Vec<LogEntry> {
        self.read()
            .get(session_id)
            .map(|session| session.logs.clone())
            .unwrap_or_default()
    }

    /// Deletes sessions created before the cutoff; returns how many were
    /// swept
    pub fn cleanup_older_than(&self, max_age_hours: i64) -> usize {
        let cutoff = Utc::now() - Duration::hours(max_age_hours);
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, session| session.created_at >= cutoff);
        let swept = before - sessions.len();
        if swept > 0 {
            tracing::info!(swept = swept, max_age_hours = max_age_hours, "Swept old sessions");
        }
        swept
    }

    /// Memory footprint counters: (sessions, total log entries)
    pub fn memory_stats(&self) -> (usize, usize) {
        let sessions = self.read();
        let total_logs = sessions.values().map(|session| session.logs.len()).sum();
        (sessions.len(), total_logs)
    }
}
