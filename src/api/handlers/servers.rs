//! Per-server files: list, read, transactional save, create, rename, delete.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::config::ContentBody;
use super::{read_error, transaction_error};
use crate::http::response::ApiError;
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateServerBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameServerBody {
    #[serde(rename = "newName", default)]
    pub new_name: String,
}

pub async fn list_servers(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let servers = state.servers.list().await?;
    Ok(Json(json!({ "servers": servers })))
}

pub async fn get_server(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let file = state.servers.read(&name).await.map_err(read_error)?;
    Ok(Json(json!(file)))
}

pub async fn put_server(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<ContentBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let outcome = state.servers.save(&name, &body.content).await?;
    if let Some(err) = transaction_error(&outcome) {
        return Err(err);
    }
    Ok(Json(json!({
        "message": "saved, tested and reloaded",
        "backup": outcome.backup,
        "output": outcome.reload_output(),
    })))
}

pub async fn create_server(
    State(state): State<AppState>,
    body: Result<Json<CreateServerBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let created = state
        .servers
        .create(&body.name, body.content.as_deref())
        .await?;
    Ok(Json(json!({
        "message": "file created",
        "name": created.name,
        "path": created.path,
    })))
}

pub async fn rename_server(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<RenameServerBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let (old_name, new_name) = state.servers.rename(&name, &body.new_name).await?;
    Ok(Json(json!({
        "message": "file renamed",
        "oldName": old_name,
        "newName": new_name,
    })))
}

pub async fn delete_server(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let backup = state.servers.delete(&name).await?;
    Ok(Json(json!({ "message": "file deleted", "backup": backup })))
}
