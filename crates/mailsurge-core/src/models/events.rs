/// Typed progress events streamed to session observers
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One progress event, addressed to a single session's observers
///
/// Wire shape: `{"type": "...", "sessionId": "...", "timestamp": "...",
/// "data": {...}}`; `data` is absent for payload-free events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl SessionEvent {
    /// Creates an event stamped now
    pub fn now(session_id: &str, kind: EventKind) -> Self {
        Self {
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventKind {
    #[serde(rename_all = "camelCase")]
    SessionCreated { total_recipients: usize },
    SessionStarted,
    SessionPaused,
    SessionResumed,
    SessionCancelled,
    #[serde(rename_all = "camelCase")]
    SessionCompleted {
        total_sent: usize,
        total_failed: usize,
        duration_seconds: u64,
    },
    EmailSending {
        recipient: String,
    },
    #[serde(rename_all = "camelCase")]
    EmailSent {
        recipient: String,
        message_id: String,
    },
    #[serde(rename_all = "camelCase")]
    EmailFailed {
        recipient: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
        error_message: String,
        retry_count: u32,
        will_retry: bool,
    },
    #[serde(rename_all = "camelCase")]
    EmailRetry {
        recipient: String,
        retry_count: u32,
        next_attempt_in_seconds: u64,
    },
    #[serde(rename_all = "camelCase")]
    StatsUpdated {
        total: usize,
        sent: usize,
        failed: usize,
        pending: usize,
        /// Emails per minute since the session started
        rate: u64,
        /// Estimated seconds remaining; 0 when the rate is 0
        eta: u64,
    },
}
