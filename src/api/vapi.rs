use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::VapiConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    /// Country code and subscriber number, already concatenated.
    pub number: String,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStarted {
    pub execution_id: Option<String>,
}

#[derive(Error, Debug)]
pub enum TelephonyError {
    #[error("Telephony API returned {status}: {body}")]
    Upstream { status: u16, body: Value },
    #[error("Failed to reach telephony API: {0}")]
    Transport(String),
}

/// Places outbound calls through the voice-agent provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelephonyClient: Send + Sync {
    async fn start_call(&self, call: OutboundCall) -> Result<CallStarted, TelephonyError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VapiCallPayload<'a> {
    phone_number_id: &'a str,
    assistant_id: &'a str,
    customer: VapiCustomer<'a>,
}

#[derive(Serialize)]
struct VapiCustomer<'a> {
    number: &'a str,
    extension: &'a str,
}

#[derive(Deserialize, Default)]
struct VapiCallResponse {
    execution_id: Option<Value>,
    id: Option<Value>,
}

/// Ids may come back as strings or numbers; `null` counts as absent.
fn id_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

pub struct VapiClient {
    http: Client,
    config: VapiConfig,
}

impl VapiClient {
    pub fn new(config: VapiConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl TelephonyClient for VapiClient {
    async fn start_call(&self, call: OutboundCall) -> Result<CallStarted, TelephonyError> {
        let payload = VapiCallPayload {
            phone_number_id: &self.config.phone_number_id,
            assistant_id: &self.config.agent_id,
            customer: VapiCustomer {
                number: &call.number,
                extension: &call.extension,
            },
        };
        let url = format!("{}/call", self.config.base_url.trim_end_matches('/'));

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TelephonyError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TelephonyError::Transport(e.to_string()))?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if !status.is_success() {
            tracing::error!("Telephony API returned error {}: {}", status, body);
            return Err(TelephonyError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: VapiCallResponse = serde_json::from_value(body).unwrap_or_default();
        let execution_id = parsed
            .execution_id
            .and_then(id_text)
            .or_else(|| parsed.id.and_then(id_text));
        tracing::debug!("Outbound call accepted, execution id: {:?}", execution_id);
        Ok(CallStarted { execution_id })
    }
}
