//! Backup, apply, validate, reload; roll back when validation fails.
//!
//! # State Transitions
//! ```text
//! Idle → BackedUp → Applied → Validated → Reloaded → Committed
//!                      │
//!                      └─(validation fails)→ RolledBack
//! ```
//!
//! - The backup is written before the live file is touched. If it cannot be
//!   written the transaction stops in `Idle`.
//! - Rollback writes back the bytes read at the start, not the backup file.
//! - A failed reload leaves the validated content in place.

use std::io;
use std::path::Path;

use serde::Serialize;
use tokio::fs;

use crate::backup::BackupStore;
use crate::error::ErrorKind;
use crate::observability::metrics;
use crate::process::{ProcessResult, Reloader, ValidationResult, Validator};
use crate::transaction::fsio;
use crate::transaction::lock::PathLocks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Idle,
    BackedUp,
    Applied,
    Validated,
    Reloaded,
    Committed,
    RolledBack,
}

/// Everything a caller needs to know about one `apply`.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionOutcome {
    /// Last state reached.
    pub state: TransactionState,
    /// Name of the backup taken in `BackedUp`.
    pub backup: Option<String>,
    /// The new content is on disk when the transaction ends.
    pub applied: bool,
    pub validation: Option<ValidationResult>,
    pub rolled_back: bool,
    pub reload: Option<ProcessResult>,
    pub error: Option<ErrorKind>,
    /// Detail for local failures (backup, write or rollback I/O).
    pub detail: Option<String>,
}

impl TransactionOutcome {
    fn new() -> Self {
        Self {
            state: TransactionState::Idle,
            backup: None,
            applied: false,
            validation: None,
            rolled_back: false,
            reload: None,
            error: None,
            detail: None,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.state == TransactionState::Committed
    }

    pub fn validation_output(&self) -> &str {
        self.validation.as_ref().map_or("", |v| v.output.as_str())
    }

    pub fn reload_output(&self) -> &str {
        self.reload.as_ref().map_or("", |r| r.output.as_str())
    }

    fn fail(mut self, kind: ErrorKind, detail: Option<String>) -> Self {
        self.error = Some(kind);
        self.detail = detail;
        self
    }
}

/// Orchestrates one safe update of a single artifact.
pub struct ConfigTransaction<'a> {
    backups: &'a BackupStore,
    locks: &'a PathLocks,
    backup_prefix: Option<&'a str>,
}

impl<'a> ConfigTransaction<'a> {
    pub fn new(backups: &'a BackupStore, locks: &'a PathLocks) -> Self {
        Self {
            backups,
            locks,
            backup_prefix: None,
        }
    }

    /// Name backups `<prefix>.<stamp>.backup` instead of after the file name.
    pub fn backup_prefix(mut self, prefix: &'a str) -> Self {
        self.backup_prefix = Some(prefix);
        self
    }

    /// Replace the content of `artifact` with `content`.
    ///
    /// The artifact path is locked for the whole sequence.
    pub async fn apply(
        &self,
        artifact: &Path,
        content: &[u8],
        validator: &dyn Validator,
        reloader: &dyn Reloader,
    ) -> TransactionOutcome {
        let _guard = self.locks.lock(artifact).await;
        let outcome = self.run(artifact, content, validator, reloader).await;
        metrics::record_transaction(outcome_label(&outcome));
        outcome
    }

    async fn run(
        &self,
        artifact: &Path,
        content: &[u8],
        validator: &dyn Validator,
        reloader: &dyn Reloader,
    ) -> TransactionOutcome {
        let mut outcome = TransactionOutcome::new();
        let name = self
            .backup_prefix
            .map_or_else(|| fsio::artifact_name(artifact), str::to_string);
        let path = artifact.display();

        // A missing file is a first write, not an error.
        let (original, existed) = match fs::read(artifact).await {
            Ok(bytes) => (bytes, true),
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(artifact = %path, error = %e, "Could not read current content, backing up empty");
                }
                (Vec::new(), e.kind() != io::ErrorKind::NotFound)
            }
        };

        match self.backups.create(&name, &original).await {
            Ok(backup) => {
                outcome.backup = Some(backup.name);
                outcome.state = TransactionState::BackedUp;
            }
            Err(e) => {
                tracing::error!(artifact = %path, error = %e, "Backup failed, live file untouched");
                return outcome.fail(ErrorKind::BackupFailed, Some(e.to_string()));
            }
        }

        if let Err(e) = fsio::write_atomic(artifact, content).await {
            tracing::error!(artifact = %path, error = %e, "Write failed");
            return outcome.fail(ErrorKind::WriteFailed, Some(e.to_string()));
        }
        outcome.state = TransactionState::Applied;
        outcome.applied = true;
        tracing::debug!(artifact = %path, backup = ?outcome.backup, "Applied new content");

        let validation = validator.validate(artifact).await;
        let passed = validation.success;
        let timed_out = validation.timed_out;
        outcome.validation = Some(validation);

        if !passed {
            let restored = if existed {
                fsio::write_atomic(artifact, &original).await
            } else {
                remove_created(artifact).await
            };
            let kind = if timed_out {
                ErrorKind::Timeout
            } else {
                ErrorKind::ValidationFailed
            };
            return match restored {
                Ok(()) => {
                    tracing::warn!(artifact = %path, backup = ?outcome.backup, "Validation failed, rolled back");
                    outcome.state = TransactionState::RolledBack;
                    outcome.applied = false;
                    outcome.rolled_back = true;
                    outcome.fail(kind, None)
                }
                Err(e) => {
                    tracing::error!(
                        artifact = %path,
                        backup = ?outcome.backup,
                        error = %e,
                        "Validation failed and rollback failed; restore from backup"
                    );
                    outcome.fail(kind, Some(format!("rollback failed: {e}")))
                }
            };
        }
        outcome.state = TransactionState::Validated;

        let reload = reloader.reload().await;
        let reloaded = reload.success;
        let timed_out = reload.timed_out;
        outcome.reload = Some(reload);
        if !reloaded {
            tracing::warn!(artifact = %path, "Saved but reload failed");
            let kind = if timed_out {
                ErrorKind::Timeout
            } else {
                ErrorKind::ReloadFailed
            };
            return outcome.fail(kind, None);
        }
        outcome.state = TransactionState::Reloaded;

        outcome.state = TransactionState::Committed;
        tracing::info!(artifact = %path, backup = ?outcome.backup, "Configuration committed");
        outcome
    }
}

/// Undo a first write. A dangling symlink keeps pointing where it did; only
/// the file created behind it goes.
async fn remove_created(artifact: &Path) -> io::Result<()> {
    let target = fsio::resolve(artifact).await?;
    fs::remove_file(target).await
}

fn outcome_label(outcome: &TransactionOutcome) -> &'static str {
    match (outcome.state, outcome.error) {
        (TransactionState::Committed, _) => "committed",
        (TransactionState::RolledBack, _) => "rolled_back",
        (_, Some(ErrorKind::BackupFailed)) => "backup_failed",
        (_, Some(ErrorKind::WriteFailed)) => "write_failed",
        (TransactionState::Validated, _) => "reload_failed",
        _ => "failed",
    }
}
