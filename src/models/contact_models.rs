use serde::{Deserialize, Serialize};

/// Raw contact form body. Every field is optional on the wire so missing
/// fields get the same answer as empty ones. Fields that are present must
/// be strings; `"company": 5` fails to deserialize and is answered as
/// invalid JSON.
#[derive(Debug, Default, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A contact request that passed field validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub message: String,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ContactRequest {
    /// Returns `None` if name, email or message is missing or blank.
    pub fn validate(self) -> Option<ContactSubmission> {
        Some(ContactSubmission {
            name: present(self.name)?,
            email: present(self.email)?,
            company: present(self.company),
            message: present(self.message)?,
        })
    }
}

impl ContactSubmission {
    /// Key used by the per-email throttles.
    pub fn email_key(&self) -> String {
        self.email.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: Option<&str>, email: Option<&str>, message: Option<&str>) -> ContactRequest {
        ContactRequest {
            name: name.map(String::from),
            email: email.map(String::from),
            company: None,
            message: message.map(String::from),
        }
    }

    #[test]
    fn complete_request_validates() {
        let sub = request(Some(" Ann "), Some("Ann@X.com"), Some("hi"))
            .validate()
            .unwrap();
        assert_eq!(sub.name, "Ann");
        assert_eq!(sub.email, "Ann@X.com");
        assert_eq!(sub.email_key(), "ann@x.com");
        assert_eq!(sub.company, None);
    }

    #[test]
    fn missing_or_blank_required_fields_fail() {
        assert!(request(None, Some("a@x.com"), Some("hi")).validate().is_none());
        assert!(request(Some("A"), None, Some("hi")).validate().is_none());
        assert!(request(Some("A"), Some("a@x.com"), Some("   ")).validate().is_none());
    }

    #[test]
    fn blank_company_is_dropped() {
        let mut req = request(Some("A"), Some("a@x.com"), Some("hi"));
        req.company = Some("  ".to_string());
        assert_eq!(req.validate().unwrap().company, None);
    }

    #[test]
    fn deserializes_partial_body() {
        let req: ContactRequest = serde_json::from_str(r#"{"name":"A"}"#).unwrap();
        assert_eq!(req.name.as_deref(), Some("A"));
        assert!(req.email.is_none());
    }

    #[test]
    fn non_string_field_fails_to_deserialize() {
        let parsed = serde_json::from_str::<ContactRequest>(
            r#"{"name":"A","email":"a@x.com","company":5,"message":"hi"}"#,
        );
        assert!(parsed.is_err());
    }
}
