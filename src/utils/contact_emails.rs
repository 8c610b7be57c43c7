use crate::api::mailer::OutgoingEmail;
use crate::models::contact_models::ContactSubmission;

const TEAM_SIGNATURE: &str = "Convis AI Team";

/// Minimal escaping for values interpolated into HTML mail bodies.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Notification sent to the internal inbox for every accepted submission.
pub fn business_notification(submission: &ContactSubmission, inbox: &str) -> OutgoingEmail {
    let company = submission.company.as_deref().unwrap_or("(none)");
    let html = format!(
        "<p>You have a new contact form submission:</p>\
         <ul>\
         <li><strong>Name:</strong> {}</li>\
         <li><strong>Email:</strong> {}</li>\
         <li><strong>Company:</strong> {}</li>\
         </ul>\
         <p><strong>Message:</strong></p>\
         <p>{}</p>",
        escape_html(&submission.name),
        escape_html(&submission.email),
        escape_html(company),
        escape_html(&submission.message).replace('\n', "<br>"),
    );
    let text = format!(
        "You have a new contact form submission:\n\n\
         Name:    {}\n\
         Email:   {}\n\
         Company: {}\n\n\
         Message:\n{}",
        submission.name, submission.email, company, submission.message,
    );
    OutgoingEmail {
        to: inbox.to_string(),
        subject: format!("New Contact from {}", submission.name),
        html,
        text,
    }
}

/// Thank-you note sent back to the submitter.
pub fn confirmation(submission: &ContactSubmission) -> OutgoingEmail {
    let html = format!(
        "<p>Hi {},</p>\
         <p>Thanks for your message. We\u{2019}ll get back to you shortly.</p>\
         <p>Best regards,<br>{}</p>",
        escape_html(&submission.name),
        TEAM_SIGNATURE,
    );
    let text = format!(
        "Hi {},\n\nThanks for your message. We\u{2019}ll get back to you shortly.\n\nBest regards,\n{}",
        submission.name, TEAM_SIGNATURE,
    );
    OutgoingEmail {
        to: submission.email.clone(),
        subject: "Thank you for contacting us".to_string(),
        html,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ContactSubmission {
        ContactSubmission {
            name: "Ann <script>".to_string(),
            email: "ann@x.com".to_string(),
            company: None,
            message: "line one\nline two".to_string(),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn business_notification_goes_to_inbox() {
        let mail = business_notification(&submission(), "inbox@convis.ai");
        assert_eq!(mail.to, "inbox@convis.ai");
        assert_eq!(mail.subject, "New Contact from Ann <script>");
        assert!(mail.html.contains("Ann &lt;script&gt;"));
        assert!(mail.html.contains("line one<br>line two"));
        assert!(mail.html.contains("(none)"));
        assert!(mail.text.contains("Company: (none)"));
        assert!(mail.text.contains("Email:   ann@x.com"));
    }

    #[test]
    fn confirmation_goes_to_submitter() {
        let mail = confirmation(&submission());
        assert_eq!(mail.to, "ann@x.com");
        assert_eq!(mail.subject, "Thank you for contacting us");
        assert!(mail.text.starts_with("Hi Ann <script>,"));
        assert!(!mail.html.contains("<script>"));
    }
}
