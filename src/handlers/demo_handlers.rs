use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::simulation::agents::Agent;
use crate::simulation::call_panel::{CallSimError, CallSnapshot};
use crate::AppState;

impl CallSimError {
    fn reply(&self) -> (StatusCode, Json<Value>) {
        let status = match self {
            CallSimError::UnknownAgent(_) => StatusCode::NOT_FOUND,
            CallSimError::NotRetryable(_) => StatusCode::CONFLICT,
        };
        (status, Json(json!({ "error": self.to_string() })))
    }
}

pub async fn list_agents(State(state): State<Arc<AppState>>) -> Json<Vec<Agent>> {
    let panel = state.call_panel.lock().await;
    Json(panel.agents().to_vec())
}

pub async fn get_call(State(state): State<Arc<AppState>>) -> Json<CallSnapshot> {
    let mut panel = state.call_panel.lock().await;
    Json(panel.snapshot())
}

pub async fn start_call(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Result<Json<CallSnapshot>, (StatusCode, Json<Value>)> {
    let mut panel = state.call_panel.lock().await;
    panel.start_call(&agent_id).map(Json).map_err(|e| {
        tracing::debug!("Demo call rejected: {}", e);
        e.reply()
    })
}

pub async fn hang_up(State(state): State<Arc<AppState>>) -> Json<CallSnapshot> {
    let mut panel = state.call_panel.lock().await;
    Json(panel.hang_up())
}

pub async fn retry_call(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CallSnapshot>, (StatusCode, Json<Value>)> {
    let mut panel = state.call_panel.lock().await;
    panel.retry().map(Json).map_err(|e| e.reply())
}
