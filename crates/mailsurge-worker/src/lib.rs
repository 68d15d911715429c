/// Mailsurge Worker - the send-session dispatch loop
///
/// This crate contains the scheduler that drains the job queue,
/// executes sends concurrently, applies the retry policy, and keeps
/// session state and observers up to date.
pub mod scheduler;

// Re-export commonly used items
pub use scheduler::{Scheduler, SchedulerConfig, is_retryable_code};
