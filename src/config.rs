use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// How much upstream detail the public endpoints may reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseVerbosity {
    /// Raw upstream ids and error bodies are returned to the caller.
    Detailed,
    /// Callers only see generic flags and messages.
    Minimal,
}

impl ResponseVerbosity {
    pub fn is_detailed(self) -> bool {
        self == ResponseVerbosity::Detailed
    }
}

#[derive(Clone)]
pub struct VapiConfig {
    pub api_key: String,
    pub agent_id: String,
    pub phone_number_id: String,
    pub base_url: String,
}

impl fmt::Debug for VapiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapiConfig")
            .field("api_key", &"[redacted]")
            .field("agent_id", &self.agent_id)
            .field("phone_number_id", &self.phone_number_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    /// Implicit TLS when set, STARTTLS otherwise.
    pub secure: bool,
    /// Sender address. Falls back to `user`, which not every relay accepts
    /// as an address (SendGrid logs in as `apikey`).
    pub from: String,
    pub from_name: String,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"[redacted]")
            .field("secure", &self.secure)
            .field("from", &self.from)
            .field("from_name", &self.from_name)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub verbosity: ResponseVerbosity,
    /// `None` when any telephony credential is missing.
    pub vapi: Option<VapiConfig>,
    /// `None` when any SMTP credential is missing.
    pub smtp: Option<SmtpConfig>,
    /// Internal address that receives contact notifications.
    pub contact_inbox: Option<String>,
    pub sentry_dsn: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| vars.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // blank values count as unset
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("PORT") {
            Some(p) => p.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => 3000,
        };

        let is_development = var("ENVIRONMENT").as_deref() == Some("development");
        let verbosity = match var("RESPONSE_VERBOSITY").as_deref() {
            Some("detailed") => ResponseVerbosity::Detailed,
            Some("minimal") => ResponseVerbosity::Minimal,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "RESPONSE_VERBOSITY",
                    reason: format!("expected detailed or minimal, got {}", other),
                })
            }
            None if is_development => ResponseVerbosity::Detailed,
            None => ResponseVerbosity::Minimal,
        };

        let vapi = match (var("VAPI_API_KEY"), var("VAPI_AGENT_ID"), var("VAPI_PHONE_NUMBER_ID")) {
            (Some(api_key), Some(agent_id), Some(phone_number_id)) => Some(VapiConfig {
                api_key,
                agent_id,
                phone_number_id,
                base_url: var("VAPI_BASE_URL").unwrap_or_else(|| "https://api.vapi.ai".to_string()),
            }),
            _ => None,
        };

        let smtp = match (var("SMTP_HOST"), var("SMTP_USER"), var("SMTP_PASS")) {
            (Some(host), Some(user), Some(pass)) => {
                let port = match var("SMTP_PORT") {
                    Some(p) => p.parse::<u16>().map_err(|e| ConfigError::Invalid {
                        name: "SMTP_PORT",
                        reason: e.to_string(),
                    })?,
                    None => 587,
                };
                Some(SmtpConfig {
                    host,
                    port,
                    from: var("SMTP_FROM").unwrap_or_else(|| user.clone()),
                    user,
                    pass,
                    secure: var("SMTP_SECURE").as_deref() == Some("true"),
                    from_name: var("SMTP_FROM_NAME").unwrap_or_else(|| "CONVIS LABS".to_string()),
                })
            }
            _ => None,
        };

        let contact_inbox = var("CONTACT_INBOX").or_else(|| smtp.as_ref().map(|s| s.from.clone()));

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            frontend_url: var("FRONTEND_URL").unwrap_or_else(|| "http://localhost:8080".to_string()),
            verbosity,
            vapi,
            smtp,
            contact_inbox,
            sentry_dsn: var("SENTRY_DSN"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_with_empty_environment() {
        let config = Config::from_map(&HashMap::new()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.verbosity, ResponseVerbosity::Minimal);
        assert!(config.vapi.is_none());
        assert!(config.smtp.is_none());
        assert!(config.contact_inbox.is_none());
    }

    #[test]
    fn development_defaults_to_detailed_responses() {
        let config = Config::from_map(&vars(&[("ENVIRONMENT", "development")])).unwrap();
        assert_eq!(config.verbosity, ResponseVerbosity::Detailed);
    }

    #[test]
    fn explicit_verbosity_wins_over_environment() {
        let config = Config::from_map(&vars(&[
            ("ENVIRONMENT", "development"),
            ("RESPONSE_VERBOSITY", "minimal"),
        ]))
        .unwrap();
        assert_eq!(config.verbosity, ResponseVerbosity::Minimal);
    }

    #[test]
    fn unknown_verbosity_is_rejected() {
        let err = Config::from_map(&vars(&[("RESPONSE_VERBOSITY", "loud")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "RESPONSE_VERBOSITY", .. }));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = Config::from_map(&vars(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn vapi_needs_all_three_credentials() {
        let partial = Config::from_map(&vars(&[
            ("VAPI_API_KEY", "key"),
            ("VAPI_AGENT_ID", "agent"),
            ("VAPI_PHONE_NUMBER_ID", "  "),
        ]))
        .unwrap();
        assert!(partial.vapi.is_none());

        let full = Config::from_map(&vars(&[
            ("VAPI_API_KEY", "sk-live-123"),
            ("VAPI_AGENT_ID", "agent"),
            ("VAPI_PHONE_NUMBER_ID", "pn"),
        ]))
        .unwrap();
        let vapi = full.vapi.unwrap();
        assert_eq!(vapi.base_url, "https://api.vapi.ai");
        assert!(!format!("{:?}", vapi).contains("sk-live-123"));
    }

    #[test]
    fn smtp_inbox_defaults_to_smtp_user() {
        let config = Config::from_map(&vars(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USER", "hello@convis.ai"),
            ("SMTP_PASS", "secret"),
            ("SMTP_SECURE", "true"),
        ]))
        .unwrap();
        let smtp = config.smtp.as_ref().unwrap();
        assert_eq!(smtp.port, 587);
        assert!(smtp.secure);
        assert_eq!(smtp.from_name, "CONVIS LABS");
        assert_eq!(smtp.from, "hello@convis.ai");
        assert_eq!(config.contact_inbox.as_deref(), Some("hello@convis.ai"));
        assert!(!format!("{:?}", smtp).contains("secret"));
    }

    #[test]
    fn smtp_from_overrides_a_login_that_is_not_an_address() {
        let config = Config::from_map(&vars(&[
            ("SMTP_HOST", "smtp.sendgrid.net"),
            ("SMTP_USER", "apikey"),
            ("SMTP_PASS", "SG.secret"),
            ("SMTP_FROM", "hello@convis.ai"),
        ]))
        .unwrap();
        let smtp = config.smtp.as_ref().unwrap();
        assert_eq!(smtp.user, "apikey");
        assert_eq!(smtp.from, "hello@convis.ai");
        assert_eq!(config.contact_inbox.as_deref(), Some("hello@convis.ai"));
    }
}
