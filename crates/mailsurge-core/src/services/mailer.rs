/// SMTP delivery behind the `Mailer` seam
///
/// `SmtpMailer` owns one pooled outbound connection per configuration;
/// `ScriptedMailer` is the in-tree test double used by the worker's
/// integration tests; `MailerRegistry` maps live sessions to their
/// transport.
use crate::constants::{SMTP_POOL_MAX_CONNECTIONS, SMTP_TIMEOUT_SECS};
use crate::email::composer;
use crate::error::SurgeError;
use crate::models::session::{EmailTemplate, Recipient, SmtpConfig};
use async_trait::async_trait;
use lettre::transport::smtp::PoolConfig;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

/// Outcome of one send attempt; never a raw error surface
#[derive(Debug, Clone)]
pub struct SendResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl SendResult {
    pub fn ok(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error_code: None,
            error_message: None,
        }
    }

    pub fn failure(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Lightweight handshake confirming credentials/reachability without
    /// sending mail
    async fn verify(&self) -> Result<(), SurgeError>;

    /// Personalizes and submits one message
    async fn send(&self, template: &EmailTemplate, recipient: &Recipient) -> SendResult;

    /// Releases the pooled connection; safe to call repeatedly
    async fn close(&self);
}

/// Best-effort failure taxonomy from transport error text
///
/// The mapping is a fixed table over provider response phrasing, checked
/// in order. Network-shape failures come first (the transport folds
/// socket errors into its message text), then the SMTP response
/// heuristics in the same precedence the taxonomy defines.
pub fn classify_error_text(text: &str) -> &'static str {
    let lowered = text.to_lowercase();

    if lowered.contains("connection reset") || lowered.contains("broken pipe") {
        "ECONNRESET"
    } else if lowered.contains("timed out") || lowered.contains("timeout") {
        "ETIMEDOUT"
    } else if lowered.contains("dns")
        || lowered.contains("failed to lookup")
        || lowered.contains("name or service not known")
    {
        "ENOTFOUND"
    } else if lowered.contains("authentication") || lowered.contains("credentials") {
        "AUTH_FAILED"
    } else if lowered.contains("quota") {
        "QUOTA_EXCEEDED"
    } else if lowered.contains("rate limit") || lowered.contains("too many") {
        "RATE_LIMITED"
    } else if lowered.contains("invalid") {
        "INVALID_RECIPIENT"
    } else if lowered.contains("blocked") || lowered.contains("blacklist") {
        "BLOCKED"
    } else {
        "UNKNOWN_ERROR"
    }
}

/// Pooled SMTP sender for one configuration
pub struct SmtpMailer {
    transport: tokio::sync::RwLock<Option<AsyncSmtpTransport<Tokio1Executor>>>,
}

impl SmtpMailer {
    /// Builds the pooled transport: implicit TLS when `secure`, STARTTLS
    /// otherwise, with credentials, port, timeout, and a bounded pool.
    /// Fails with a configuration error when required fields are absent.
    /// No network I/O happens here; see [`Mailer::verify`].
    pub fn connect(config: &SmtpConfig) -> Result<Self, SurgeError> {
        if config.host.trim().is_empty() {
            return Err(SurgeError::Config("SMTP host is required".to_string()));
        }
        if config.auth.user.trim().is_empty() || config.auth.pass.trim().is_empty() {
            return Err(SurgeError::Config(
                "SMTP username and password are required".to_string(),
            ));
        }

        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| SurgeError::Config(format!("Invalid SMTP host '{}': {}", config.host, e)))?;

        let transport = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)))
            .credentials(Credentials::new(
                config.auth.user.clone(),
                config.auth.pass.clone(),
            ))
            .pool_config(PoolConfig::new().max_size(SMTP_POOL_MAX_CONNECTIONS))
            .build();

        Ok(Self {
            transport: tokio::sync::RwLock::new(Some(transport)),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn verify(&self) -> Result<(), SurgeError> {
        let transport = self.transport.read().await.clone();
        let Some(transport) = transport else {
            return Err(SurgeError::Smtp("SMTP transport is closed".to_string()));
        };

        match transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(SurgeError::Smtp(
                "SMTP server rejected the connection test".to_string(),
            )),
            Err(e) => Err(SurgeError::Smtp(format!("SMTP connection failed: {}", e))),
        }
    }

    async fn send(&self, template: &EmailTemplate, recipient: &Recipient) -> SendResult {
        let transport = self.transport.read().await.clone();
        let Some(transport) = transport else {
            return SendResult::failure("NO_TRANSPORTER", "SMTP transport not configured");
        };

        let (message, message_id) = match composer::compose(template, recipient) {
            Ok(composed) => composed,
            Err(SurgeError::Validation(message)) => {
                return SendResult::failure("INVALID_RECIPIENT", message);
            }
            Err(e) => return SendResult::failure("UNKNOWN_ERROR", e.to_string()),
        };

        match transport.send(message).await {
            Ok(_) => SendResult::ok(message_id),
            Err(e) => {
                let text = e.to_string();
                SendResult::failure(classify_error_text(&text), text)
            }
        }
    }

    async fn close(&self) {
        let mut transport = self.transport.write().await;
        // Dropping the transport tears down the pool; repeat calls no-op
        transport.take();
    }
}

/// Scriptable mailer for tests: plays queued outcomes, then falls back
/// to the configured default
pub struct ScriptedMailer {
    outcomes: Mutex<VecDeque<SendResult>>,
    fallback_failure: Option<SendResult>,
    calls: AtomicUsize,
    deliveries: Mutex<Vec<String>>,
}

impl ScriptedMailer {
    pub fn always_succeed() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            fallback_failure: None,
            calls: AtomicUsize::new(0),
            deliveries: Mutex::new(Vec::new()),
        }
    }

    /// Fails `times` sends with `error_code`, then succeeds
    pub fn failing(error_code: &str, times: usize) -> Self {
        let outcomes = (0..times)
            .map(|i| {
                SendResult::failure(error_code, format!("scripted failure #{}", i + 1))
            })
            .collect();
        Self {
            outcomes: Mutex::new(outcomes),
            fallback_failure: None,
            calls: AtomicUsize::new(0),
            deliveries: Mutex::new(Vec::new()),
        }
    }

    pub fn always_fail(error_code: &str) -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            fallback_failure: Some(SendResult::failure(error_code, "scripted failure")),
            calls: AtomicUsize::new(0),
            deliveries: Mutex::new(Vec::new()),
        }
    }

    /// Total number of send attempts observed
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Recipient addresses of successful deliveries, in completion order
    pub fn deliveries(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Mailer for ScriptedMailer {
    async fn verify(&self) -> Result<(), SurgeError> {
        Ok(())
    }

    async fn send(&self, _template: &EmailTemplate, recipient: &Recipient) -> SendResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self
            .outcomes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        let result = match scripted {
            Some(result) => result,
            None => match &self.fallback_failure {
                Some(failure) => failure.clone(),
                None => SendResult::ok(format!("<scripted-{}@mailsurge>", call)),
            },
        };

        if result.success {
            self.deliveries
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(recipient.email.clone());
        }
        result
    }

    async fn close(&self) {}
}

/// Session id -> mailer map, so the scheduler reaches the right pooled
/// transport for each job
#[derive(Default)]
pub struct MailerRegistry {
    inner: RwLock<HashMap<String, Arc<dyn Mailer>>>,
}

impl MailerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session_id: &str, mailer: Arc<dyn Mailer>) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.insert(session_id.to_string(), mailer);
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<dyn Mailer>> {
        let inner = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.get(session_id).cloned()
    }

    pub fn remove(&self, session_id: &str) -> Option<Arc<dyn Mailer>> {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.remove(session_id)
    }
}
