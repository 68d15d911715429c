/// Boundary validation for session creation
use crate::constants::{
    MAX_ATTACHMENT_SIZE_BYTES, MAX_ATTACHMENTS_PER_SESSION, MAX_RECIPIENTS_PER_SESSION,
    PACING_MAX_CONCURRENCY, PACING_MAX_DELAY_MS, PACING_MIN_DELAY_MS,
};
use crate::error::SurgeError;
use crate::models::session::{EmailTemplate, PacingConfig, Recipient};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub fn is_valid_email(address: &str) -> bool {
    EMAIL_REGEX.is_match(address)
}

/// Rejects empty/oversized recipient lists and malformed addresses,
/// naming the offending addresses
pub fn validate_recipients(recipients: &[Recipient]) -> Result<(), SurgeError> {
    if recipients.is_empty() {
        return Err(SurgeError::Validation("No recipients provided".to_string()));
    }
    if recipients.len() > MAX_RECIPIENTS_PER_SESSION {
        return Err(SurgeError::Validation(format!(
            "Maximum {} recipients allowed",
            MAX_RECIPIENTS_PER_SESSION
        )));
    }

    let invalid: Vec<&str> = recipients
        .iter()
        .filter(|recipient| !is_valid_email(&recipient.email))
        .map(|recipient| recipient.email.as_str())
        .collect();
    if !invalid.is_empty() {
        return Err(SurgeError::Validation(format!(
            "Invalid email addresses: {}",
            invalid.join(", ")
        )));
    }
    Ok(())
}

/// A template needs a sender, at least one body, and well-formed
/// attachments within the size limits
pub fn validate_template(template: &EmailTemplate) -> Result<(), SurgeError> {
    if !is_valid_email(&template.from) {
        return Err(SurgeError::Validation(format!(
            "Invalid sender address: {}",
            template.from
        )));
    }
    if template.html.is_none() && template.text.is_none() {
        return Err(SurgeError::Validation(
            "Template must provide an HTML or text body".to_string(),
        ));
    }

    if template.attachments.len() > MAX_ATTACHMENTS_PER_SESSION {
        return Err(SurgeError::Validation(format!(
            "Maximum {} attachments allowed",
            MAX_ATTACHMENTS_PER_SESSION
        )));
    }
    for attachment in &template.attachments {
        if attachment.content.len() > MAX_ATTACHMENT_SIZE_BYTES {
            return Err(SurgeError::Validation(format!(
                "Attachment '{}' exceeds {} bytes",
                attachment.filename, MAX_ATTACHMENT_SIZE_BYTES
            )));
        }
        if attachment.content_type.parse::<mime::Mime>().is_err() {
            return Err(SurgeError::Validation(format!(
                "Attachment '{}' has an invalid content type: {}",
                attachment.filename, attachment.content_type
            )));
        }
    }
    Ok(())
}

/// Pacing is sanity-checked, not enforced: out-of-range values are
/// allowed but logged, since they usually mean a misconfigured client
pub fn check_pacing(pacing: &PacingConfig) {
    if pacing.delay_ms < PACING_MIN_DELAY_MS || pacing.delay_ms > PACING_MAX_DELAY_MS {
        tracing::warn!(
            delay_ms = pacing.delay_ms,
            "Pacing delay outside the recommended {}..={} ms range",
            PACING_MIN_DELAY_MS,
            PACING_MAX_DELAY_MS
        );
    }
    if pacing.concurrency == 0 || pacing.concurrency > PACING_MAX_CONCURRENCY {
        tracing::warn!(
            concurrency = pacing.concurrency,
            "Pacing concurrency outside the recommended 1..={} range",
            PACING_MAX_CONCURRENCY
        );
    }
}
