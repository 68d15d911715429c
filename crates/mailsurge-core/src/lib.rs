/// Mailsurge Core - Shared library for the Mailsurge bulk-email dispatch engine
///
/// This crate contains the data model, job queue, session store, SMTP
/// sender, and event broadcaster shared by the Mailsurge worker and API.
pub mod constants;
pub mod email;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use error::SurgeError;
pub use models::events::{EventKind, SessionEvent};
pub use models::session::{
    EmailTemplate, LogEntry, LogStatus, PacingConfig, Recipient, Session, SessionStats,
    SessionStatus, SessionUpdate, SmtpConfig, TemplateAttachment,
};
pub use services::broadcast::EventBroadcaster;
pub use services::mailer::{Mailer, MailerRegistry, ScriptedMailer, SendResult, SmtpMailer};
pub use services::queue::{EmailJob, JobQueue, QueueStats};
pub use services::store::SessionStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
