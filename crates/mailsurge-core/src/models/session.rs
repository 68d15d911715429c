/// Session domain models
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One addressee of a bulk-send session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipient {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Custom merge variables, substituted into the template at send time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<HashMap<String, String>>,
}

/// SMTP server credentials and connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// true: implicit TLS (SMTPS); false: STARTTLS upgrade
    pub secure: bool,
    pub auth: SmtpAuth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpAuth {
    pub user: String,
    /// Accepted on the way in, never echoed back out in snapshots
    #[serde(skip_serializing, default)]
    pub pass: String,
}

/// Email composition data, shared read-only across all jobs of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub from: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<TemplateAttachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateAttachment {
    pub filename: String,
    /// Raw bytes; carried as a base64 string on the wire
    #[serde(with = "base64_bytes")]
    pub content: Bytes,
    #[serde(rename = "contentType")]
    pub content_type: String,
}

/// Send-rate policy: per-job stagger delay plus a concurrency ceiling
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(rename = "delayMs")]
    pub delay_ms: u64,
    pub concurrency: usize,
}

/// Session lifecycle states
///
/// `idle` is pre-dispatch; `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Aggregate counters, always derived (log scan or queue counts)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStats {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub pending: usize,
}

/// One bulk-send campaign: recipients + template + pacing + accumulated state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub recipients: Vec<Recipient>,
    pub smtp: SmtpConfig,
    pub email: EmailTemplate,
    pub pacing: PacingConfig,
    pub status: SessionStatus,
    pub stats: SessionStats,
    pub logs: Vec<LogEntry>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "startedAt", skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "completedAt", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates a pre-dispatch session record
    pub fn new(
        recipients: Vec<Recipient>,
        smtp: SmtpConfig,
        email: EmailTemplate,
        pacing: PacingConfig,
    ) -> Self {
        let total = recipients.len();
        Self {
            id: Uuid::new_v4().to_string(),
            recipients,
            smtp,
            email,
            pacing,
            status: SessionStatus::Idle,
            stats: SessionStats {
                total,
                sent: 0,
                failed: 0,
                pending: total,
            },
            logs: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

/// Per-attempt outcome states recorded in the session log
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Queued,
    Sending,
    Sent,
    Failed,
    Retry,
}

/// One log line per send attempt; retries append new entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub recipient: String,
    pub status: LogStatus,
    #[serde(rename = "messageId", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "retryCount")]
    pub retry_count: u32,
}

impl LogEntry {
    /// Creates a log entry stamped now, without result details
    pub fn new(session_id: &str, recipient: &str, status: LogStatus, retry_count: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            recipient: recipient.to_string(),
            status,
            message_id: None,
            error_code: None,
            error_message: None,
            timestamp: Utc::now(),
            retry_count,
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_error(
        mut self,
        error_code: Option<String>,
        error_message: Option<String>,
    ) -> Self {
        self.error_code = error_code;
        self.error_message = error_message;
        self
    }
}

/// Partial session update applied through the store's read-modify-write
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub status: Option<SessionStatus>,
    pub stats: Option<SessionStats>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionUpdate {
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn stats(stats: SessionStats) -> Self {
        Self {
            stats: Some(stats),
            ..Default::default()
        }
    }

    pub fn with_started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }

    pub fn with_completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }
}

/// Serde adapter: `Bytes` <-> base64 string
mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
