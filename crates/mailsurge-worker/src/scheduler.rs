/// The dispatch engine: a single long-lived loop that polls the job
/// queue, runs sends concurrently within the configured budget, applies
/// the retry policy, and drives session completion.
///
/// Pause/resume/cancel never reach the loop directly. The control
/// surface mutates queue/store state and the loop simply re-reads
/// eligibility on its next tick, so a paused session's jobs stop being
/// selected with no special case inside dispatch.
use chrono::{DateTime, Utc};
use mailsurge_core::constants::{
    DEFAULT_GLOBAL_CONCURRENCY, RETRY_BASE_DELAY_MS, SESSION_CLEANUP_GRACE_SECS,
    WORKER_ERROR_BACKOFF_MS, WORKER_TICK_INTERVAL_MS,
};
use mailsurge_core::models::events::EventKind;
use mailsurge_core::models::session::{LogEntry, LogStatus, SessionStats, SessionUpdate};
use mailsurge_core::services::queue::{EmailJob, backoff_delay_ms};
use mailsurge_core::utils::logging::redact_email;
use mailsurge_core::{
    EventBroadcaster, JobQueue, MailerRegistry, SendResult, SessionEvent, SessionStore,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Error codes worth another attempt; everything else is terminal
const RETRYABLE_ERROR_CODES: [&str; 5] = [
    "ECONNRESET",
    "ETIMEDOUT",
    "ENOTFOUND",
    "RATE_LIMITED",
    "QUOTA_EXCEEDED",
];

pub fn is_retryable_code(code: &str) -> bool {
    RETRYABLE_ERROR_CODES.contains(&code)
}

/// Scheduling policy knobs; defaults match the documented behavior
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Sends in flight across all sessions
    pub global_concurrency: usize,
    pub tick_interval_ms: u64,
    /// Extended sleep after a loop-level error
    pub error_backoff_ms: u64,
    /// Base for the per-job retry backoff (doubles per retry, capped)
    pub retry_base_delay_ms: u64,
    /// How long finished sessions keep their queue state for late
    /// observers
    pub cleanup_grace_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            global_concurrency: DEFAULT_GLOBAL_CONCURRENCY,
            tick_interval_ms: WORKER_TICK_INTERVAL_MS,
            error_backoff_ms: WORKER_ERROR_BACKOFF_MS,
            retry_base_delay_ms: RETRY_BASE_DELAY_MS,
            cleanup_grace_secs: SESSION_CLEANUP_GRACE_SECS,
        }
    }
}

pub struct Scheduler {
    queue: Arc<JobQueue>,
    store: Arc<SessionStore>,
    events: Arc<EventBroadcaster>,
    mailers: Arc<MailerRegistry>,
    config: SchedulerConfig,
    running: AtomicBool,
}

impl Scheduler {
    pub fn new(
        queue: Arc<JobQueue>,
        store: Arc<SessionStore>,
        events: Arc<EventBroadcaster>,
        mailers: Arc<MailerRegistry>,
        config: SchedulerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            store,
            events,
            mailers,
            config,
            running: AtomicBool::new(true),
        })
    }

    /// Signals the loop to exit after its current tick
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Runs until [`stop`](Self::stop). Individual job failures never
    /// escape; a panic inside a dispatch task is logged and answered
    /// with an extended backoff instead of killing the loop.
    pub async fn run(self: Arc<Self>) {
        info!(
            global_concurrency = self.config.global_concurrency,
            tick_interval_ms = self.config.tick_interval_ms,
            "Dispatch loop started"
        );

        while self.running.load(Ordering::SeqCst) {
            let jobs = self.queue.select_eligible(self.config.global_concurrency);

            if !jobs.is_empty() {
                let mut in_flight = JoinSet::new();
                for job in jobs {
                    let scheduler = Arc::clone(&self);
                    in_flight.spawn(async move { scheduler.process_job(job).await });
                }

                let mut loop_error = false;
                while let Some(joined) = in_flight.join_next().await {
                    if let Err(e) = joined {
                        error!(error = %e, "Dispatch task aborted");
                        loop_error = true;
                    }
                }
                if loop_error {
                    tokio::time::sleep(Duration::from_millis(self.config.error_backoff_ms)).await;
                    continue;
                }
            }

            tokio::time::sleep(Duration::from_millis(self.config.tick_interval_ms)).await;
        }

        info!("Dispatch loop stopped");
    }

    async fn process_job(&self, job: EmailJob) {
        let session_id = job.session_id.clone();
        let recipient = job.recipient.email.clone();

        self.queue.mark_processing(&job.id);
        self.store.append_log(
            &session_id,
            LogEntry::new(&session_id, &recipient, LogStatus::Sending, job.retry_count),
        );
        self.events.publish(
            &session_id,
            SessionEvent::now(
                &session_id,
                EventKind::EmailSending {
                    recipient: recipient.clone(),
                },
            ),
        );
        debug!(
            session_id = %session_id,
            recipient = %redact_email(&recipient),
            retry_count = job.retry_count,
            "Dispatching send"
        );

        // A missing mailer is a wiring defect, not a recipient problem;
        // it must not take the loop down with it
        let result = match self.mailers.get(&session_id) {
            Some(mailer) => mailer.send(&job.template, &job.recipient).await,
            None => SendResult::failure("PROCESSING_ERROR", "No mailer registered for session"),
        };

        if result.success {
            let message_id = result.message_id.unwrap_or_default();
            self.queue.mark_completed(&job.id);
            self.store.append_log(
                &session_id,
                LogEntry::new(&session_id, &recipient, LogStatus::Sent, job.retry_count)
                    .with_message_id(message_id.clone()),
            );
            self.events.publish(
                &session_id,
                SessionEvent::now(
                    &session_id,
                    EventKind::EmailSent {
                        recipient: recipient.clone(),
                        message_id,
                    },
                ),
            );
            info!(
                session_id = %session_id,
                recipient = %redact_email(&recipient),
                "Email sent"
            );
        } else {
            self.handle_failure(&job, result);
        }

        self.update_progress(&session_id);
    }

    fn handle_failure(&self, job: &EmailJob, result: SendResult) {
        let session_id = &job.session_id;
        let recipient = &job.recipient.email;
        let error_code = result.error_code;
        let error_message = result
            .error_message
            .unwrap_or_else(|| "send failed".to_string());

        let retryable = error_code
            .as_deref()
            .map(is_retryable_code)
            .unwrap_or(false);

        if retryable
            && job.retry_count < job.max_retries
            && self.queue.retry(&job.id, self.config.retry_base_delay_ms)
        {
            let next_retry_count = job.retry_count + 1;
            let delay_ms = backoff_delay_ms(self.config.retry_base_delay_ms, next_retry_count);
            self.store.append_log(
                session_id,
                LogEntry::new(session_id, recipient, LogStatus::Retry, job.retry_count)
                    .with_error(error_code.clone(), Some(error_message.clone())),
            );
            self.events.publish(
                session_id,
                SessionEvent::now(
                    session_id,
                    EventKind::EmailRetry {
                        recipient: recipient.clone(),
                        retry_count: next_retry_count,
                        next_attempt_in_seconds: delay_ms / 1000,
                    },
                ),
            );
            warn!(
                session_id = %session_id,
                recipient = %redact_email(recipient),
                error_code = error_code.as_deref().unwrap_or("-"),
                retry_count = next_retry_count,
                delay_ms = delay_ms,
                "Transient send failure, retry scheduled"
            );
        } else {
            self.queue.mark_failed(&job.id);
            self.store.append_log(
                session_id,
                LogEntry::new(session_id, recipient, LogStatus::Failed, job.retry_count)
                    .with_error(error_code.clone(), Some(error_message.clone())),
            );
            self.events.publish(
                session_id,
                SessionEvent::now(
                    session_id,
                    EventKind::EmailFailed {
                        recipient: recipient.clone(),
                        error_code: error_code.clone(),
                        error_message,
                        retry_count: job.retry_count,
                        will_retry: false,
                    },
                ),
            );
            warn!(
                session_id = %session_id,
                recipient = %redact_email(recipient),
                error_code = error_code.as_deref().unwrap_or("-"),
                "Send failed permanently"
            );
        }
    }

    /// Pushes queue-derived stats into the store, streams them to
    /// observers, and drives the completion transition once the
    /// session's jobs have all settled
    fn update_progress(&self, session_id: &str) {
        let Some(session) = self.store.get(session_id) else {
            return;
        };
        let queue_stats = self.queue.session_stats(session_id);

        let stats = SessionStats {
            total: session.recipients.len(),
            sent: queue_stats.completed,
            failed: queue_stats.failed,
            pending: queue_stats.pending + queue_stats.processing,
        };
        self.store.update(session_id, SessionUpdate::stats(stats));

        let rate = send_rate_per_minute(session.started_at, stats.sent, Utc::now());
        self.events.publish(
            session_id,
            SessionEvent::now(
                session_id,
                EventKind::StatsUpdated {
                    total: stats.total,
                    sent: stats.sent,
                    failed: stats.failed,
                    pending: stats.pending,
                    rate,
                    eta: eta_seconds(stats.pending, rate),
                },
            ),
        );

        if queue_stats.pending == 0 && queue_stats.processing == 0 {
            let completed_at = Utc::now();
            // try_complete loses on cancelled sessions and on the second
            // of two racing finishers
            if self.store.try_complete(session_id, completed_at) {
                let duration_seconds = session
                    .started_at
                    .map(|started_at| (completed_at - started_at).num_seconds().max(0) as u64)
                    .unwrap_or(0);
                self.events.publish(
                    session_id,
                    SessionEvent::now(
                        session_id,
                        EventKind::SessionCompleted {
                            total_sent: queue_stats.completed,
                            total_failed: queue_stats.failed,
                            duration_seconds,
                        },
                    ),
                );
                info!(
                    session_id = %session_id,
                    total_sent = queue_stats.completed,
                    total_failed = queue_stats.failed,
                    duration_seconds = duration_seconds,
                    "Session completed"
                );
                self.schedule_cleanup(session_id);
            }
        }
    }

    /// Keeps finished queue state around for the grace period so late
    /// observers can still fetch final stats, then drops it
    fn schedule_cleanup(&self, session_id: &str) {
        let queue = Arc::clone(&self.queue);
        let mailers = Arc::clone(&self.mailers);
        let events = Arc::clone(&self.events);
        let grace = Duration::from_secs(self.config.cleanup_grace_secs);
        let session_id = session_id.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            queue.cleanup(&session_id);
            if let Some(mailer) = mailers.remove(&session_id) {
                mailer.close().await;
            }
            events.remove(&session_id);
            debug!(session_id = %session_id, "Session queue state cleaned up");
        });
    }
}

/// Emails per minute since the session started, rounded
fn send_rate_per_minute(
    started_at: Option<DateTime<Utc>>,
    sent: usize,
    now: DateTime<Utc>,
) -> u64 {
    let Some(started_at) = started_at else {
        return 0;
    };
    let elapsed_ms = (now - started_at).num_milliseconds().max(0) as f64;
    if elapsed_ms <= 0.0 {
        return 0;
    }
    (sent as f64 / (elapsed_ms / 60_000.0)).round() as u64
}

/// Seconds until the session drains at the current rate; 0 when stalled
fn eta_seconds(pending: usize, rate: u64) -> u64 {
    if pending == 0 || rate == 0 {
        return 0;
    }
    ((pending as f64 / rate as f64) * 60.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_retryable_code_set() {
        assert!(is_retryable_code("ECONNRESET"));
        assert!(is_retryable_code("ETIMEDOUT"));
        assert!(is_retryable_code("ENOTFOUND"));
        assert!(is_retryable_code("RATE_LIMITED"));
        assert!(is_retryable_code("QUOTA_EXCEEDED"));

        assert!(!is_retryable_code("AUTH_FAILED"));
        assert!(!is_retryable_code("INVALID_RECIPIENT"));
        assert!(!is_retryable_code("BLOCKED"));
        assert!(!is_retryable_code("PROCESSING_ERROR"));
        assert!(!is_retryable_code("UNKNOWN_ERROR"));
    }

    #[test]
    fn test_send_rate_per_minute() {
        let now = Utc::now();
        let started = now - ChronoDuration::minutes(2);
        assert_eq!(send_rate_per_minute(Some(started), 10, now), 5);
        assert_eq!(send_rate_per_minute(None, 10, now), 0);
        // Sub-millisecond elapsed time cannot produce a rate
        assert_eq!(send_rate_per_minute(Some(now), 10, now), 0);
    }

    #[test]
    fn test_eta_seconds() {
        assert_eq!(eta_seconds(10, 5), 120);
        assert_eq!(eta_seconds(0, 5), 0);
        assert_eq!(eta_seconds(10, 0), 0);
        assert_eq!(eta_seconds(1, 60), 1);
    }
}
