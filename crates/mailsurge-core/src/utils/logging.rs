/// Logging utilities for PII redaction
///
/// Recipient addresses are personal data; log lines keep the domain for
/// debugging and mask the local part.
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_PATTERN: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b").unwrap();
}

/// Redacts email addresses from text, preserving the domain
///
/// # Examples
/// ```
/// use mailsurge_core::utils::logging::redact_email;
///
/// assert_eq!(redact_email("user@example.com"), "***@example.com");
/// ```
pub fn redact_email(text: &str) -> String {
    EMAIL_PATTERN
        .replace_all(text, |caps: &regex::Captures| {
            let email = &caps[0];
            match email.find('@') {
                Some(at_pos) => format!("***{}", &email[at_pos..]),
                None => "***@***".to_string(),
            }
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_email() {
        assert_eq!(redact_email("user@example.com"), "***@example.com");
        assert_eq!(
            redact_email("Sending to alice@foo.com and bob@bar.com"),
            "Sending to ***@foo.com and ***@bar.com"
        );
        assert_eq!(redact_email("no addresses here"), "no addresses here");
    }
}
