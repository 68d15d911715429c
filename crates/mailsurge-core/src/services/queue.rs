/// In-memory job queue with pacing-aware, fairness-capped selection
///
/// Holds one job per recipient per session across all active sessions.
/// Lifecycle is tracked in id sets rather than on the jobs themselves:
/// a job absent from every set is *pending*; membership in `processing`,
/// `completed`, or `failed` is exclusive by construction of the
/// transition methods.
use crate::constants::{MAX_JOB_RETRIES, RETRY_MAX_DELAY_MS};
use crate::models::session::{EmailTemplate, PacingConfig, Recipient};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// One scheduled send attempt unit
#[derive(Debug, Clone)]
pub struct EmailJob {
    pub id: String,
    pub session_id: String,
    pub recipient: Recipient,
    pub template: Arc<EmailTemplate>,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Earliest time this job may be selected
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Per-session (or overall) lifecycle counts derived from the tracking sets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Default)]
struct QueueState {
    jobs: Vec<EmailJob>,
    processing: HashSet<String>,
    completed: HashSet<String>,
    failed: HashSet<String>,
    /// Session ids excluded from selection until resumed
    paused: HashSet<String>,
    /// Session ids excluded from selection permanently
    cancelled: HashSet<String>,
}

pub struct JobQueue {
    state: Mutex<QueueState>,
    /// Ceiling on concurrently processing jobs within one session
    session_cap: usize,
}

/// Exponential backoff for job retries: `base * 2^retry_count`, capped
pub fn backoff_delay_ms(base_delay_ms: u64, retry_count: u32) -> u64 {
    base_delay_ms
        .saturating_mul(2u64.saturating_pow(retry_count))
        .min(RETRY_MAX_DELAY_MS)
}

impl JobQueue {
    pub fn new(session_cap: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            session_cap,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // A panic while holding the lock leaves consistent-enough state;
        // keep serving rather than propagating the poison.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Creates one job per recipient, staggering eligibility by the
    /// pacing delay: job `i` becomes eligible at `now + i * delay_ms`.
    pub fn enqueue(
        &self,
        session_id: &str,
        recipients: &[Recipient],
        template: Arc<EmailTemplate>,
        pacing: &PacingConfig,
    ) -> Vec<EmailJob> {
        let now = Utc::now();
        let jobs: Vec<EmailJob> = recipients
            .iter()
            .enumerate()
            .map(|(index, recipient)| EmailJob {
                id: Uuid::new_v4().to_string(),
                session_id: session_id.to_string(),
                recipient: recipient.clone(),
                template: Arc::clone(&template),
                retry_count: 0,
                max_retries: MAX_JOB_RETRIES,
                scheduled_at: now + Duration::milliseconds((index as u64 * pacing.delay_ms) as i64),
                created_at: now,
            })
            .collect();

        let mut state = self.lock();
        state.jobs.extend(jobs.iter().cloned());
        tracing::debug!(
            session_id = %session_id,
            jobs = jobs.len(),
            delay_ms = pacing.delay_ms,
            "Enqueued session jobs"
        );
        jobs
    }

    /// Returns the jobs eligible to run right now, capped at
    /// `global_concurrency` in total and at the per-session ceiling per
    /// session so one large session cannot starve the others.
    ///
    /// Selection does not change job state; callers mark the jobs they
    /// actually dispatch via [`mark_processing`](Self::mark_processing).
    pub fn select_eligible(&self, global_concurrency: usize) -> Vec<EmailJob> {
        let state = self.lock();
        let now = Utc::now();

        let mut by_session: BTreeMap<&str, Vec<&EmailJob>> = BTreeMap::new();
        for job in state.jobs.iter() {
            if state.processing.contains(&job.id)
                || state.completed.contains(&job.id)
                || state.failed.contains(&job.id)
            {
                continue;
            }
            if state.paused.contains(&job.session_id) || state.cancelled.contains(&job.session_id) {
                continue;
            }
            if job.scheduled_at > now {
                continue;
            }
            by_session.entry(job.session_id.as_str()).or_default().push(job);
        }

        let mut selected: Vec<EmailJob> = Vec::new();
        for (session_id, mut jobs) in by_session {
            if selected.len() >= global_concurrency {
                break;
            }
            jobs.sort_by_key(|job| job.scheduled_at);

            let in_flight = state
                .jobs
                .iter()
                .filter(|job| job.session_id == session_id && state.processing.contains(&job.id))
                .count();
            let budget = (global_concurrency - selected.len())
                .min(self.session_cap.saturating_sub(in_flight));

            selected.extend(jobs.into_iter().take(budget).cloned());
        }
        selected
    }

    /// Idempotent transition into the processing set
    pub fn mark_processing(&self, job_id: &str) {
        let mut state = self.lock();
        state.processing.insert(job_id.to_string());
    }

    /// Idempotent transition processing -> completed
    pub fn mark_completed(&self, job_id: &str) {
        let mut state = self.lock();
        state.processing.remove(job_id);
        state.completed.insert(job_id.to_string());
    }

    /// Idempotent transition processing -> failed
    pub fn mark_failed(&self, job_id: &str) {
        let mut state = self.lock();
        state.processing.remove(job_id);
        state.failed.insert(job_id.to_string());
    }

    /// Returns the job back to *pending* with an exponential-backoff
    /// eligibility time, or `false` when the job is unknown or its
    /// retry budget is exhausted.
    pub fn retry(&self, job_id: &str, base_delay_ms: u64) -> bool {
        let mut state = self.lock();
        let Some(job) = state.jobs.iter_mut().find(|job| job.id == job_id) else {
            return false;
        };
        if job.retry_count >= job.max_retries {
            return false;
        }

        job.retry_count += 1;
        let delay_ms = backoff_delay_ms(base_delay_ms, job.retry_count);
        job.scheduled_at = Utc::now() + Duration::milliseconds(delay_ms as i64);
        let job_id = job.id.clone();

        // Clear tracking membership so the job is selectable again
        state.processing.remove(&job_id);
        state.failed.remove(&job_id);
        true
    }

    /// Excludes the session from selection until resumed; job state is
    /// retained
    pub fn pause(&self, session_id: &str) {
        let mut state = self.lock();
        state.paused.insert(session_id.to_string());
    }

    pub fn resume(&self, session_id: &str) {
        let mut state = self.lock();
        state.paused.remove(session_id);
    }

    /// Permanently excludes the session from selection and releases its
    /// processing slots. Cancelled jobs are never retried or resumed;
    /// sends already in flight settle on their own and are ignored for
    /// future scheduling.
    pub fn cancel(&self, session_id: &str) {
        let mut state = self.lock();
        state.cancelled.insert(session_id.to_string());

        let ids: Vec<String> = state
            .jobs
            .iter()
            .filter(|job| job.session_id == session_id)
            .map(|job| job.id.clone())
            .collect();
        for id in &ids {
            state.processing.remove(id);
        }
    }

    /// Lifecycle counts for one session, derived by scanning its jobs
    /// against the tracking sets
    pub fn session_stats(&self, session_id: &str) -> QueueStats {
        let state = self.lock();
        let mut stats = QueueStats::default();
        for job in state.jobs.iter().filter(|job| job.session_id == session_id) {
            if state.processing.contains(&job.id) {
                stats.processing += 1;
            } else if state.completed.contains(&job.id) {
                stats.completed += 1;
            } else if state.failed.contains(&job.id) {
                stats.failed += 1;
            } else {
                stats.pending += 1;
            }
        }
        stats
    }

    /// Queue-wide counts plus the number of distinct sessions with jobs
    pub fn overall_stats(&self) -> (QueueStats, usize) {
        let state = self.lock();
        let stats = QueueStats {
            pending: state.jobs.len()
                - state.processing.len()
                - state.completed.len()
                - state.failed.len(),
            processing: state.processing.len(),
            completed: state.completed.len(),
            failed: state.failed.len(),
        };
        let sessions = state
            .jobs
            .iter()
            .map(|job| job.session_id.as_str())
            .collect::<HashSet<_>>()
            .len();
        (stats, sessions)
    }

    pub fn get_job(&self, job_id: &str) -> Option<EmailJob> {
        let state = self.lock();
        state.jobs.iter().find(|job| job.id == job_id).cloned()
    }

    /// Drops the session's jobs and every trace of them from the
    /// tracking sets. Called after the post-completion grace period.
    pub fn cleanup(&self, session_id: &str) {
        let mut state = self.lock();
        let ids: Vec<String> = state
            .jobs
            .iter()
            .filter(|job| job.session_id == session_id)
            .map(|job| job.id.clone())
            .collect();

        state.jobs.retain(|job| job.session_id != session_id);
        for id in &ids {
            state.processing.remove(id);
            state.completed.remove(id);
            state.failed.remove(id);
        }
        state.paused.remove(session_id);
        state.cancelled.remove(session_id);
    }
}
