//! Primary config file: read, transactional save, test, reload.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{control_response, read_error, transaction_error};
use crate::http::response::{self, ApiError};
use crate::http::server::AppState;
use crate::process::Reloader;

#[derive(Debug, Deserialize)]
pub struct ContentBody {
    pub content: String,
}

pub async fn get_config(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let content = state.config_file.read().await.map_err(read_error)?;
    Ok(Json(json!({
        "content": content,
        "path": state.config_file.path().display().to_string(),
    })))
}

pub async fn put_config(
    State(state): State<AppState>,
    body: Result<Json<ContentBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let outcome = state.config_file.save(&body.content).await;
    if let Some(err) = transaction_error(&outcome) {
        return Err(err);
    }
    Ok(Json(json!({
        "message": "saved, tested and reloaded",
        "backup": outcome.backup,
        "output": outcome.validation_output(),
        "reload": outcome.reload_output(),
    })))
}

/// `200 {success:true}` when the live config passes, `400 {success:false}` when not.
pub async fn test_config(State(state): State<AppState>) -> Response {
    let result = state.config_file.test().await;
    let status = if result.success {
        StatusCode::OK
    } else if result.timed_out {
        StatusCode::GATEWAY_TIMEOUT
    } else {
        StatusCode::BAD_REQUEST
    };
    response::with_status(
        status,
        json!({ "success": result.success, "output": result.output }),
    )
}

pub async fn reload_config(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    control_response("reloaded", state.controller.reload().await)
}
