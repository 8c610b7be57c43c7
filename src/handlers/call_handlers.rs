use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde_json::{json, Value};
use thiserror::Error;

use crate::api::vapi::{OutboundCall, TelephonyError};
use crate::config::ResponseVerbosity;
use crate::models::call_models::CallRequest;
use crate::utils::client_ip::client_ip;
use crate::AppState;

pub type CallLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Outbound calls cost money and the route is public: 3 per minute per IP.
pub fn call_limiter() -> CallLimiter {
    RateLimiter::keyed(Quota::per_minute(nonzero!(3u32)))
}

#[derive(Error, Debug)]
pub enum CallTriggerError {
    #[error("Invalid JSON")]
    InvalidJson,
    #[error("countryCode and phoneNumber are required.")]
    MissingNumber,
    #[error("Server misconfiguration")]
    Misconfigured,
    #[error("Too many call requests, try again later")]
    RateLimited,
    #[error(transparent)]
    Telephony(#[from] TelephonyError),
}

impl CallTriggerError {
    pub fn status(&self) -> StatusCode {
        match self {
            CallTriggerError::InvalidJson | CallTriggerError::MissingNumber => StatusCode::BAD_REQUEST,
            CallTriggerError::Misconfigured => StatusCode::INTERNAL_SERVER_ERROR,
            CallTriggerError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            CallTriggerError::Telephony(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Upstream bodies and transport reasons only leave the service with
    /// detailed verbosity.
    pub fn reply(&self, verbosity: ResponseVerbosity) -> (StatusCode, Json<Value>) {
        let message = match (self, verbosity) {
            (CallTriggerError::Telephony(TelephonyError::Upstream { body, .. }), ResponseVerbosity::Detailed) => {
                body.to_string()
            }
            (CallTriggerError::Telephony(TelephonyError::Upstream { .. }), ResponseVerbosity::Minimal) => {
                "Failed to initiate call".to_string()
            }
            (CallTriggerError::Telephony(TelephonyError::Transport(reason)), ResponseVerbosity::Detailed) => {
                format!("Failed to contact telephony service: {}", reason)
            }
            (CallTriggerError::Telephony(TelephonyError::Transport(_)), ResponseVerbosity::Minimal) => {
                "Failed to contact telephony service".to_string()
            }
            _ => self.to_string(),
        };
        (self.status(), Json(json!({ "error": message })))
    }
}

pub async fn trigger_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CallRequest>, JsonRejection>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let verbosity = state.config.verbosity;
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!("Rejected call body: {}", rejection);
            return Err(CallTriggerError::InvalidJson.reply(verbosity));
        }
    };

    let execution_id = place_call(&state, &client_ip(&headers), request)
        .await
        .map_err(|e| e.reply(verbosity))?;

    if verbosity.is_detailed() {
        Ok(Json(json!({ "executionId": execution_id })))
    } else {
        Ok(Json(json!({ "success": true })))
    }
}

/// Returns the provider's execution id (which may be absent) on success.
pub async fn place_call(
    state: &Arc<AppState>,
    ip: &str,
    request: CallRequest,
) -> Result<Option<String>, CallTriggerError> {
    let number = request.destination().ok_or(CallTriggerError::MissingNumber)?;

    let telephony = state.telephony.clone().ok_or_else(|| {
        tracing::error!("Call requested but telephony credentials are not configured");
        CallTriggerError::Misconfigured
    })?;

    if state.call_limiter.check_key(&ip.to_string()).is_err() {
        tracing::warn!("Call trigger rate limit exceeded for ip {}", ip);
        return Err(CallTriggerError::RateLimited);
    }

    let call = OutboundCall {
        number,
        extension: request.extension(),
    };
    match telephony.start_call(call).await {
        Ok(started) => {
            tracing::info!("Outbound demo call started, execution id: {:?}", started.execution_id);
            Ok(started.execution_id)
        }
        Err(e) => {
            tracing::error!("Failed to start outbound call: {}", e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::vapi::{CallStarted, MockTelephonyClient};
    use crate::config::Config;
    use crate::simulation::call_panel::ScriptedOutcome;
    use crate::utils::clock::ManualClock;
    use std::collections::HashMap;

    fn state_with(telephony: Option<MockTelephonyClient>) -> Arc<AppState> {
        Arc::new(AppState::new(
            Config::from_map(&HashMap::new()).unwrap(),
            Arc::new(ManualClock::default()),
            None,
            telephony.map(|t| Arc::new(t) as Arc<dyn crate::api::vapi::TelephonyClient>),
            Box::new(ScriptedOutcome::default()),
        ))
    }

    fn request(country_code: Option<&str>, phone_number: Option<&str>) -> CallRequest {
        CallRequest {
            country_code: country_code.map(String::from),
            phone_number: phone_number.map(String::from),
            extension: None,
        }
    }

    #[tokio::test]
    async fn forwards_joined_number_and_returns_execution_id() {
        let mut telephony = MockTelephonyClient::new();
        telephony
            .expect_start_call()
            .withf(|call| call.number == "+15551234567" && call.extension.is_empty())
            .times(1)
            .returning(|_| {
                Ok(CallStarted {
                    execution_id: Some("exec-1".to_string()),
                })
            });
        let state = state_with(Some(telephony));

        let id = place_call(&state, "1.2.3.4", request(Some("+1"), Some("5551234567")))
            .await
            .unwrap();
        assert_eq!(id.as_deref(), Some("exec-1"));
    }

    #[tokio::test]
    async fn missing_number_is_checked_before_configuration() {
        let state = state_with(None);
        let err = place_call(&state, "1.2.3.4", request(Some("+1"), None)).await.unwrap_err();
        assert!(matches!(err, CallTriggerError::MissingNumber));
        let (status, Json(body)) = err.reply(ResponseVerbosity::Minimal);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "countryCode and phoneNumber are required." }));
    }

    #[tokio::test]
    async fn missing_credentials_are_a_server_error() {
        let state = state_with(None);
        let err = place_call(&state, "1.2.3.4", request(Some("+1"), Some("555"))).await.unwrap_err();
        let (status, Json(body)) = err.reply(ResponseVerbosity::Detailed);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Server misconfiguration" }));
    }

    #[tokio::test]
    async fn fourth_call_in_a_minute_is_throttled() {
        let mut telephony = MockTelephonyClient::new();
        telephony
            .expect_start_call()
            .times(4)
            .returning(|_| Ok(CallStarted { execution_id: None }));
        let state = state_with(Some(telephony));

        for _ in 0..3 {
            place_call(&state, "1.2.3.4", request(Some("+1"), Some("555"))).await.unwrap();
        }
        let err = place_call(&state, "1.2.3.4", request(Some("+1"), Some("555"))).await.unwrap_err();
        assert!(matches!(err, CallTriggerError::RateLimited));
        place_call(&state, "5.6.7.8", request(Some("+1"), Some("555"))).await.unwrap();
    }

    #[test]
    fn upstream_errors_respect_verbosity() {
        let err = CallTriggerError::Telephony(TelephonyError::Upstream {
            status: 400,
            body: json!({ "message": "assistantId invalid" }),
        });
        let (status, Json(minimal)) = err.reply(ResponseVerbosity::Minimal);
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(minimal, json!({ "error": "Failed to initiate call" }));
        let (_, Json(detailed)) = err.reply(ResponseVerbosity::Detailed);
        assert_eq!(detailed, json!({ "error": r#"{"message":"assistantId invalid"}"# }));
    }

    #[test]
    fn transport_errors_respect_verbosity() {
        let err = CallTriggerError::Telephony(TelephonyError::Transport("dns failure".to_string()));
        let (status, Json(minimal)) = err.reply(ResponseVerbosity::Minimal);
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(minimal, json!({ "error": "Failed to contact telephony service" }));
        let (_, Json(detailed)) = err.reply(ResponseVerbosity::Detailed);
        assert_eq!(
            detailed,
            json!({ "error": "Failed to contact telephony service: dns failure" })
        );
    }
}
