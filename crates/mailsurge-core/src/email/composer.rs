/// Personalized message assembly using the lettre crate
use crate::email::merge;
use crate::error::SurgeError;
use crate::models::session::{EmailTemplate, Recipient};
use lettre::Message;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use std::str::FromStr;
use uuid::Uuid;

fn to_mailbox(address: &str, name: Option<&str>) -> Result<Mailbox, SurgeError> {
    if let Some(name) = name {
        Ok(Mailbox::new(
            Some(name.to_string()),
            address
                .parse()
                .map_err(|e| SurgeError::Validation(format!("Invalid email address: {}", e)))?,
        ))
    } else {
        Mailbox::from_str(address)
            .map_err(|e| SurgeError::Validation(format!("Invalid email address: {}", e)))
    }
}

/// Builds the personalized message for one recipient
///
/// Merge tags are substituted into subject, HTML, and text before
/// assembly. Returns the message and its Message-ID (generated here so
/// the caller can report it without re-parsing headers).
pub fn compose(
    template: &EmailTemplate,
    recipient: &Recipient,
) -> Result<(Message, String), SurgeError> {
    let message_id = format!("<{}@mailsurge>", Uuid::new_v4());

    let builder = Message::builder()
        .from(to_mailbox(&template.from, None)?)
        .to(to_mailbox(&recipient.email, recipient.name.as_deref())?)
        .subject(merge::render(&template.subject, recipient))
        .message_id(Some(message_id.clone()));

    let text = template
        .text
        .as_ref()
        .map(|text| merge::render(text, recipient));
    let html = template
        .html
        .as_ref()
        .map(|html| merge::render(html, recipient));

    // Body structure mirrors what providers expect: alternative parts
    // for text+HTML, mixed when attachments are present
    let body_part = match (text, html) {
        (Some(text), Some(html)) => MultiPart::alternative()
            .singlepart(SinglePart::plain(text))
            .singlepart(SinglePart::html(html)),
        (Some(text), None) => MultiPart::alternative().singlepart(SinglePart::plain(text)),
        (None, Some(html)) => MultiPart::alternative().singlepart(SinglePart::html(html)),
        (None, None) => {
            return Err(SurgeError::Validation(
                "Template must provide an HTML or text body".to_string(),
            ));
        }
    };

    let message = if template.attachments.is_empty() {
        builder
            .multipart(body_part)
            .map_err(|e| SurgeError::Smtp(format!("Failed to build message: {}", e)))?
    } else {
        let mut mixed = MultiPart::mixed().multipart(body_part);
        for attachment in &template.attachments {
            let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                SurgeError::Validation(format!(
                    "Invalid attachment content type '{}': {}",
                    attachment.content_type, e
                ))
            })?;
            mixed = mixed.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.content.to_vec(), content_type),
            );
        }
        builder
            .multipart(mixed)
            .map_err(|e| SurgeError::Smtp(format!("Failed to build message: {}", e)))?
    };

    Ok((message, message_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use crate::models::session::TemplateAttachment;

    fn template() -> EmailTemplate {
        EmailTemplate {
            from: crate::constants::test_constants::TEST_FROM.to_string(),
            subject: "Hello {{name}}".to_string(),
            html: Some("<p>Hi {{name}}</p>".to_string()),
            text: Some("Hi {{name}}".to_string()),
            attachments: vec![],
        }
    }

    fn recipient() -> Recipient {
        Recipient {
            email: "jane@example.com".to_string(),
            name: Some("Jane".to_string()),
            variables: None,
        }
    }

    #[test]
    fn test_compose_substitutes_merge_tags() {
        let (message, _) = compose(&template(), &recipient()).unwrap();
        let formatted = String::from_utf8_lossy(&message.formatted()).to_string();

        assert!(formatted.contains("Subject: Hello Jane"));
        assert!(formatted.contains("Hi Jane"));
        assert!(!formatted.contains("{{name}}"));
    }

    #[test]
    fn test_compose_returns_message_id_present_in_headers() {
        let (message, message_id) = compose(&template(), &recipient()).unwrap();
        let formatted = String::from_utf8_lossy(&message.formatted()).to_string();

        assert!(message_id.starts_with('<'));
        assert!(formatted.contains(message_id.trim_start_matches('<').trim_end_matches('>')));
    }

    #[test]
    fn test_compose_rejects_invalid_recipient_address() {
        let bad = Recipient {
            email: "not-an-address".to_string(),
            name: None,
            variables: None,
        };
        let err = compose(&template(), &bad).unwrap_err();
        assert!(matches!(err, SurgeError::Validation(_)));
    }

    #[test]
    fn test_compose_requires_some_body() {
        let mut empty = template();
        empty.html = None;
        empty.text = None;
        assert!(compose(&empty, &recipient()).is_err());
    }

    #[test]
    fn test_compose_with_attachment() {
        let mut with_attachment = template();
        with_attachment.attachments.push(TemplateAttachment {
            filename: "notes.txt".to_string(),
            content: Bytes::from_static(b"attached text"),
            content_type: "text/plain".to_string(),
        });

        let (message, _) = compose(&with_attachment, &recipient()).unwrap();
        let formatted = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(formatted.contains("notes.txt"));
    }

    #[test]
    fn test_compose_rejects_bad_attachment_content_type() {
        let mut bad = template();
        bad.attachments.push(TemplateAttachment {
            filename: "x".to_string(),
            content: Bytes::from_static(b"x"),
            content_type: "not a mime type".to_string(),
        });
        assert!(compose(&bad, &recipient()).is_err());
    }
}
