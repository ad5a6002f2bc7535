//! Backup listing, snapshot, restore and deletion.
//!
//! A missing backup on restore or delete is reported as `500` with
//! `"backup not found"`, which is what existing clients key on.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ConfError;
use crate::http::response::ApiError;
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BackupFilter {
    pub artifact: Option<String>,
}

fn backup_error(err: ConfError) -> ApiError {
    match err {
        ConfError::NotFound(_) => ApiError::internal("backup not found"),
        ConfError::InvalidName(_) => ApiError::from(err),
        other => {
            tracing::error!(error = %other, "Backup operation failed");
            ApiError::internal(other.to_string())
        }
    }
}

pub async fn list_backups(
    State(state): State<AppState>,
    Query(filter): Query<BackupFilter>,
) -> Result<Json<Value>, ApiError> {
    let backups = state.backups.list(filter.artifact.as_deref()).await?;
    Ok(Json(json!({ "backups": backups })))
}

/// Snapshot the primary config.
pub async fn create_backup(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let backup = state
        .config_file
        .create_backup()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(json!({ "message": "backup created", "name": backup.name })))
}

pub async fn restore_backup(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let restored = state.backups.restore(&name).await.map_err(backup_error)?;
    Ok(Json(json!({
        "message": "restored",
        "output": restored.output,
        "artifact": restored.artifact,
        "valid": restored.valid,
    })))
}

pub async fn delete_backup(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.backups.delete(&name).await.map_err(backup_error)?;
    Ok(Json(json!({ "message": "backup deleted", "name": name })))
}
