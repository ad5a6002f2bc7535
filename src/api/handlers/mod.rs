//! Request handlers, one module per resource.

pub mod backups;
pub mod config;
pub mod nginx;
pub mod servers;

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::error::{ConfError, ErrorKind};
use crate::http::response::ApiError;
use crate::process::ProcessResult;
use crate::transaction::{TransactionOutcome, TransactionState};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// The error response for a transaction that did not commit, or `None`.
pub(crate) fn transaction_error(outcome: &TransactionOutcome) -> Option<ApiError> {
    let kind = outcome.error?;
    let err = match (outcome.state, kind) {
        (TransactionState::RolledBack, ErrorKind::Timeout) => {
            ApiError::new(StatusCode::GATEWAY_TIMEOUT, "config test timed out")
                .with("output", outcome.validation_output())
        }
        (TransactionState::RolledBack, _) => ApiError::bad_request("config test failed")
            .with("output", outcome.validation_output()),
        // Validation failed and the rollback write failed too.
        (TransactionState::Applied, _) => {
            ApiError::internal("config test failed and rollback failed, restore from backup")
                .with("output", outcome.validation_output())
                .with("detail", &outcome.detail)
        }
        (TransactionState::Validated, ErrorKind::Timeout) => {
            ApiError::new(StatusCode::GATEWAY_TIMEOUT, "config saved but reload timed out")
                .with("output", outcome.reload_output())
        }
        (TransactionState::Validated, _) => ApiError::internal("config saved but reload failed")
            .with("output", outcome.reload_output()),
        (_, ErrorKind::BackupFailed) => ApiError::internal("backup failed, config not changed")
            .with("detail", &outcome.detail),
        _ => ApiError::internal(
            outcome
                .detail
                .clone()
                .unwrap_or_else(|| "write failed".to_string()),
        ),
    };
    Some(err.with("backup", &outcome.backup))
}

/// Reads answer 500 for any failure, a missing file included; only a bad
/// name stays a 400.
pub(crate) fn read_error(err: ConfError) -> ApiError {
    match err {
        ConfError::InvalidName(_) => ApiError::from(err),
        other => {
            tracing::error!(error = %other, "Read failed");
            ApiError::internal(other.to_string())
        }
    }
}

/// `200 {message, output}` or `500 {error, output}` (`504` on timeout).
pub(crate) fn control_response(done: &str, result: ProcessResult) -> Result<Json<Value>, ApiError> {
    if result.success {
        return Ok(Json(json!({ "message": done, "output": result.output })));
    }
    let status = if result.timed_out {
        StatusCode::GATEWAY_TIMEOUT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let message = match result.exit_code {
        Some(code) => format!("exit status {code}"),
        None if result.timed_out => "command timed out".to_string(),
        None => "command failed".to_string(),
    };
    Err(ApiError::new(status, message).with("output", result.output))
}
