/// Error types for the Mailsurge system
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurgeError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl SurgeError {
    /// Determines if an error is retriable
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Smtp(_) => true, // Some SMTP errors are retriable
            Self::Queue(_) => true,
            Self::Validation(_) => false,
            Self::Config(_) => false,
            Self::Session(_) => false,
            Self::Unknown(_) => false,
        }
    }
}

// Implement conversions for common error types
impl From<serde_json::Error> for SurgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::env::VarError> for SurgeError {
    fn from(err: std::env::VarError) -> Self {
        Self::Config(err.to_string())
    }
}
