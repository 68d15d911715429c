/// Domain models for sessions, jobs, and progress events
pub mod events;
pub mod session;

pub use events::{EventKind, SessionEvent};
pub use session::{
    EmailTemplate, LogEntry, LogStatus, PacingConfig, Recipient, Session, SessionStats,
    SessionStatus, SessionUpdate, SmtpAuth, SmtpConfig, TemplateAttachment,
};
