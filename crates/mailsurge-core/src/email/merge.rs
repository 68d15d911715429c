/// Merge-tag substitution
///
/// Tags are literal `{{key}}` placeholders replaced with per-recipient
/// data. This is plain string replacement, not template evaluation:
/// a tag whose key the recipient does not carry passes through
/// verbatim. Known limitation, kept for predictability.
use crate::models::session::Recipient;

/// Replaces `{{email}}`, `{{name}}` (when the recipient has one), and
/// every custom variable key in `content`
pub fn render(content: &str, recipient: &Recipient) -> String {
    let mut output = content.replace("{{email}}", &recipient.email);

    if let Some(name) = &recipient.name {
        output = output.replace("{{name}}", name);
    }

    if let Some(variables) = &recipient.variables {
        for (key, value) in variables {
            output = output.replace(&format!("{{{{{}}}}}", key), value);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn recipient_with_vars(vars: &[(&str, &str)]) -> Recipient {
        Recipient {
            email: "jane@example.com".to_string(),
            name: Some("Jane".to_string()),
            variables: Some(
                vars.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<HashMap<_, _>>(),
            ),
        }
    }

    #[test]
    fn test_replaces_builtin_tags() {
        let recipient = recipient_with_vars(&[]);
        let out = render("Hello {{name}} <{{email}}>", &recipient);
        assert_eq!(out, "Hello Jane <jane@example.com>");
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let recipient = recipient_with_vars(&[]);
        let out = render("{{name}} {{name}} {{name}}", &recipient);
        assert_eq!(out, "Jane Jane Jane");
    }

    #[test]
    fn test_replaces_custom_variables() {
        let recipient = recipient_with_vars(&[("company", "Acme"), ("plan", "Pro")]);
        let out = render("{{company}} ({{plan}})", &recipient);
        assert_eq!(out, "Acme (Pro)");
    }

    #[test]
    fn test_unresolved_tags_pass_through() {
        let recipient = Recipient {
            email: "jane@example.com".to_string(),
            name: None,
            variables: None,
        };
        let out = render("Hi {{name}}, your code is {{code}}", &recipient);
        assert_eq!(out, "Hi {{name}}, your code is {{code}}");
    }

    #[test]
    fn test_idempotent_on_content_without_tags() {
        let recipient = recipient_with_vars(&[("a", "b")]);
        let content = "No tags here at all.";
        assert_eq!(render(content, &recipient), content);
        assert_eq!(render(&render(content, &recipient), &recipient), content);
    }
}
