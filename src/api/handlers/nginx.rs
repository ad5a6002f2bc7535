//! Process control: status, start, stop, restart.

use axum::extract::State;
use axum::Json;
use serde_json::Value;

use super::control_response;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::process::ProcessStatus;

pub async fn status(State(state): State<AppState>) -> Json<ProcessStatus> {
    Json(state.controller.status().await)
}

pub async fn start(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    control_response("started", state.controller.start().await)
}

pub async fn stop(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    control_response("stopped", state.controller.stop().await)
}

pub async fn restart(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    control_response("restarted", state.controller.restart().await)
}
