use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::api::mailer::{MailError, Mailer};
use crate::config::ResponseVerbosity;
use crate::models::contact_models::{ContactRequest, ContactResponse, ContactSubmission};
use crate::utils::client_ip::client_ip;
use crate::utils::contact_emails;
use crate::utils::contact_limiter::Throttle;
use crate::AppState;

#[derive(Error, Debug)]
pub enum ContactError {
    #[error("Invalid JSON")]
    InvalidJson,
    #[error("Missing required fields (name, email, message).")]
    MissingFields,
    #[error("Server misconfiguration")]
    Misconfigured,
    #[error("{}", throttle_message(.0))]
    RateLimited(Throttle),
    #[error("Internal Server Error")]
    Mail(#[from] MailError),
}

fn throttle_message(throttle: &Throttle) -> &'static str {
    match throttle {
        Throttle::Ip => "Too many requests from this IP.",
        Throttle::Email => "Too many requests for this email.",
        Throttle::Cooldown => "Please wait before sending another message.",
    }
}

impl ContactError {
    pub fn status(&self) -> StatusCode {
        match self {
            ContactError::InvalidJson | ContactError::MissingFields => StatusCode::BAD_REQUEST,
            ContactError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ContactError::Misconfigured | ContactError::Mail(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn reply(&self, verbosity: ResponseVerbosity) -> (StatusCode, Json<Value>) {
        let body = match self {
            ContactError::Mail(e) if verbosity.is_detailed() => {
                json!({ "message": self.to_string(), "error": e.to_string() })
            }
            _ => json!({ "message": self.to_string() }),
        };
        (self.status(), Json(body))
    }
}

/// Shows the first character and the domain only.
pub fn redact_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, domain)
        }
        None => "[redacted]".to_string(),
    }
}

pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Json<ContactResponse>, (StatusCode, Json<Value>)> {
    let verbosity = state.config.verbosity;
    let ip = client_ip(&headers);
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!("Rejected contact body: {}", rejection);
            return Err(ContactError::InvalidJson.reply(verbosity));
        }
    };

    process_contact(&state, &ip, request)
        .await
        .map(|()| {
            Json(ContactResponse {
                message: "Your message has been sent!".to_string(),
            })
        })
        .map_err(|e| e.reply(verbosity))
}

/// Validates, throttles and mails one submission.
///
/// The business notification is awaited and its failure is returned. The
/// confirmation to the submitter is spawned and only logged if it fails.
pub async fn process_contact(
    state: &Arc<AppState>,
    ip: &str,
    request: ContactRequest,
) -> Result<(), ContactError> {
    let submission = request.validate().ok_or(ContactError::MissingFields)?;

    let (mailer, inbox) = match (&state.mailer, &state.config.contact_inbox) {
        (Some(mailer), Some(inbox)) => (mailer.clone(), inbox.clone()),
        _ => {
            tracing::error!("Contact submission received but SMTP is not configured");
            return Err(ContactError::Misconfigured);
        }
    };

    if let Err(throttle) = state.contact_limiter.admit(ip, &submission.email_key()) {
        tracing::warn!(
            "Contact submission throttled by {} check (ip: {}, email: {})",
            throttle,
            ip,
            redact_email(&submission.email)
        );
        return Err(ContactError::RateLimited(throttle));
    }

    mailer.verify().await.map_err(|e| {
        tracing::error!("SMTP connection check failed: {}", e);
        e
    })?;

    mailer
        .send(contact_emails::business_notification(&submission, &inbox))
        .await
        .map_err(|e| {
            tracing::error!("Failed to send contact notification: {}", e);
            e
        })?;
    tracing::info!("Contact notification sent for {}", redact_email(&submission.email));

    send_confirmation(mailer, submission);
    Ok(())
}

fn send_confirmation(mailer: Arc<dyn Mailer>, submission: ContactSubmission) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(contact_emails::confirmation(&submission)).await {
            tracing::error!(
                "Confirmation email to {} failed: {}",
                redact_email(&submission.email),
                e
            );
        }
    });
}
