/// Application constants
///
/// This module contains all hardcoded values used throughout the application.
/// Constants are organized by category for easy maintenance.
// ============================================================================
// Session Limits
// ============================================================================
/// Maximum recipients accepted per session
pub const MAX_RECIPIENTS_PER_SESSION: usize = 2000;

/// Maximum number of attachments per session
pub const MAX_ATTACHMENTS_PER_SESSION: usize = 5;

/// Maximum size per attachment (10 MB)
pub const MAX_ATTACHMENT_SIZE_BYTES: usize = 10 * 1024 * 1024;

// ============================================================================
// Retry Configuration
// ============================================================================

/// Maximum number of retries per job for transient send failures
pub const MAX_JOB_RETRIES: u32 = 3;

/// Base delay for job retry exponential backoff in milliseconds
pub const RETRY_BASE_DELAY_MS: u64 = 5000;

/// Maximum delay for job retry exponential backoff in milliseconds
pub const RETRY_MAX_DELAY_MS: u64 = 30000;

// ============================================================================
// Scheduling
// ============================================================================

/// Default number of sends in flight across all sessions
pub const DEFAULT_GLOBAL_CONCURRENCY: usize = 3;

/// Default ceiling on concurrently processing jobs within one session
pub const DEFAULT_SESSION_CONCURRENCY_CAP: usize = 2;

/// Worker loop tick interval in milliseconds
pub const WORKER_TICK_INTERVAL_MS: u64 = 1000;

/// Worker loop backoff after a loop-level error, in milliseconds
pub const WORKER_ERROR_BACKOFF_MS: u64 = 5000;

/// Grace period before queue state for a finished session is dropped
pub const SESSION_CLEANUP_GRACE_SECS: u64 = 60;

// ============================================================================
// Pacing Recommendations
// ============================================================================

/// Recommended minimum per-job stagger delay in milliseconds
pub const PACING_MIN_DELAY_MS: u64 = 500;

/// Recommended maximum per-job stagger delay in milliseconds
pub const PACING_MAX_DELAY_MS: u64 = 10000;

/// Recommended maximum per-session send concurrency
pub const PACING_MAX_CONCURRENCY: usize = 5;

// ============================================================================
// SMTP Transport
// ============================================================================

/// Maximum pooled connections per SMTP configuration
pub const SMTP_POOL_MAX_CONNECTIONS: u32 = 5;

/// Messages sent over one pooled connection before it is recycled
pub const SMTP_MAX_MESSAGES_PER_CONNECTION: u32 = 100;

/// Provider-safe send ceiling (emails per second)
/// Note: pacing keeps actual throughput well below this; the figure
/// matches common provider limits (e.g. Gmail)
pub const SMTP_SEND_RATE_PER_SECOND: u32 = 14;

/// Connection/greeting/socket timeout for SMTP operations in seconds
pub const SMTP_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Session Retention
// ============================================================================

/// Sessions older than this are swept from the store
pub const SESSION_MAX_AGE_HOURS: i64 = 24;

/// Interval between store sweeps in seconds
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 3600;

// ============================================================================
// Events
// ============================================================================

/// Per-session broadcast channel capacity; laggards drop oldest events
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// Testing Constants
// ============================================================================

#[cfg(test)]
pub mod test_constants {
    /// Test recipient address
    pub const TEST_EMAIL: &str = "test@example.com";

    /// Test sender address
    pub const TEST_FROM: &str = "sender@example.com";
}
