use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::address::AddressError;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid email address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("Failed to build email message: {0}")]
    Build(String),
    #[error("Failed to create SMTP relay: {0}")]
    Relay(String),
    #[error("SMTP send failed: {0}")]
    Send(String),
    #[error("SMTP server rejected the connection check")]
    Unreachable,
}

/// Outbound mail collaborator used by the contact endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Checks that the relay accepts a connection with our credentials.
    async fn verify(&self) -> Result<(), MailError>;

    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let relay = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| MailError::Relay(e.to_string()))?;

        let creds = Credentials::new(config.user.clone(), config.pass.clone());
        let transport = relay.port(config.port).credentials(creds).build();

        let from_address = config.from.parse::<Address>().map_err(|e: AddressError| {
            MailError::InvalidAddress {
                address: config.from.clone(),
                reason: e.to_string(),
            }
        })?;
        let from = Mailbox::new(Some(config.from_name.clone()), from_address);

        tracing::info!(
            "SMTP mailer ready - Server: {}, Port: {}, Implicit TLS: {}",
            config.host,
            config.port,
            config.secure
        );
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn verify(&self) -> Result<(), MailError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailError::Unreachable),
            Err(e) => Err(MailError::Send(e.to_string())),
        }
    }

    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let to = email.to.parse::<Mailbox>().map_err(|e: AddressError| {
            MailError::InvalidAddress {
                address: email.to.clone(),
                reason: e.to_string(),
            }
        })?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(email.text, email.html))
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Send(e.to_string()))?;
        Ok(())
    }
}
