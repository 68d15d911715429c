//! Common test utilities for scheduler integration tests
#![allow(dead_code)]

use chrono::Utc;
use mailsurge_core::models::events::SessionEvent;
use mailsurge_core::models::session::{
    EmailTemplate, PacingConfig, Recipient, Session, SessionStatus, SessionUpdate, SmtpAuth,
    SmtpConfig,
};
use mailsurge_core::{EventBroadcaster, JobQueue, Mailer, MailerRegistry, SessionStore};
use mailsurge_worker::{Scheduler, SchedulerConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn recipients(n: usize) -> Vec<Recipient> {
    (0..n)
        .map(|i| Recipient {
            email: format!("user{}@example.com", i),
            name: Some(format!("User {}", i)),
            variables: None,
        })
        .collect()
}

pub fn template() -> EmailTemplate {
    EmailTemplate {
        from: "sender@example.com".to_string(),
        subject: "Hello {{name}}".to_string(),
        html: None,
        text: Some("Hi {{name}}".to_string()),
        attachments: vec![],
    }
}

pub fn smtp_config() -> SmtpConfig {
    SmtpConfig {
        host: "smtp.example.com".to_string(),
        port: 587,
        secure: false,
        auth: SmtpAuth {
            user: "user".to_string(),
            pass: "pass".to_string(),
        },
    }
}

/// Millisecond-scale scheduling so scenarios finish quickly; the retry
/// base keeps even three backoff rounds well under a second
pub fn fast_config() -> SchedulerConfig {
    SchedulerConfig {
        global_concurrency: 3,
        tick_interval_ms: 10,
        error_backoff_ms: 50,
        retry_base_delay_ms: 10,
        cleanup_grace_secs: 60,
    }
}

pub struct Harness {
    pub queue: Arc<JobQueue>,
    pub store: Arc<SessionStore>,
    pub events: Arc<EventBroadcaster>,
    pub mailers: Arc<MailerRegistry>,
    pub scheduler: Arc<Scheduler>,
}

impl Harness {
    pub fn new(config: SchedulerConfig) -> Self {
        let queue = Arc::new(JobQueue::new(2));
        let store = Arc::new(SessionStore::new());
        let events = Arc::new(EventBroadcaster::new(1024));
        let mailers = Arc::new(MailerRegistry::new());
        let scheduler = Scheduler::new(
            Arc::clone(&queue),
            Arc::clone(&store),
            Arc::clone(&events),
            Arc::clone(&mailers),
            config,
        );
        Self {
            queue,
            store,
            events,
            mailers,
            scheduler,
        }
    }

    /// Creates a running session the way the control surface does:
    /// store record, registered mailer, enqueued jobs, status running
    pub fn start_session(
        &self,
        recipients: Vec<Recipient>,
        pacing: PacingConfig,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> String {
        let session = Session::new(recipients.clone(), smtp_config(), template(), pacing);
        let session_id = session.id.clone();
        self.store.create(session);

        if let Some(mailer) = mailer {
            self.mailers.register(&session_id, mailer);
        }
        self.queue
            .enqueue(&session_id, &recipients, Arc::new(template()), &pacing);
        self.store.update(
            &session_id,
            SessionUpdate::status(SessionStatus::Running).with_started_at(Utc::now()),
        );
        session_id
    }

    pub fn spawn(&self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(Arc::clone(&self.scheduler).run())
    }

    /// Emulates the control surface's pause command
    pub fn pause(&self, session_id: &str) {
        self.queue.pause(session_id);
        self.store
            .update(session_id, SessionUpdate::status(SessionStatus::Paused));
    }

    pub fn resume(&self, session_id: &str) {
        self.queue.resume(session_id);
        self.store
            .update(session_id, SessionUpdate::status(SessionStatus::Running));
    }

    /// Emulates the control surface's cancel command
    pub fn cancel(&self, session_id: &str) {
        self.queue.cancel(session_id);
        self.store.update(
            session_id,
            SessionUpdate::status(SessionStatus::Cancelled).with_completed_at(Utc::now()),
        );
    }

    pub fn status(&self, session_id: &str) -> SessionStatus {
        self.store
            .get(session_id)
            .map(|session| session.status)
            .expect("session exists")
    }

    /// Collects the session's events into a shared vec for later
    /// inspection; subscribe before spawning the scheduler
    pub fn collect_events(&self, session_id: &str) -> Arc<Mutex<Vec<SessionEvent>>> {
        let mut rx = self.events.subscribe(session_id);
        let collected: Arc<Mutex<Vec<SessionEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&collected);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => sink.lock().unwrap().push(event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        collected
    }
}

/// Polls until the condition holds or the timeout elapses; returns the
/// final evaluation
pub async fn wait_until<F: Fn() -> bool>(condition: F, timeout_ms: u64) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
