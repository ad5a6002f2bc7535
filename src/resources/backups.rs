//! Operator-facing backup actions: list, snapshot, restore, delete.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::backup::naming::{self, PRIMARY_ARTIFACT, SERVER_SUFFIX};
use crate::backup::{BackupInfo, BackupStore};
use crate::error::{ConfError, ConfResult};
use crate::process::Validator;
use crate::transaction::{fsio, PathLocks};

#[derive(Debug, Clone, Serialize)]
pub struct RestoreOutcome {
    /// Path of the artifact that was overwritten.
    pub artifact: String,
    /// Output of the post-restore config test.
    pub output: String,
    pub valid: bool,
}

#[derive(Clone)]
pub struct BackupResource {
    store: Arc<BackupStore>,
    primary: PathBuf,
    servers_dir: PathBuf,
    locks: PathLocks,
    validator: Arc<dyn Validator>,
}

impl BackupResource {
    pub fn new(
        store: Arc<BackupStore>,
        primary: impl Into<PathBuf>,
        servers_dir: impl Into<PathBuf>,
        locks: PathLocks,
        validator: Arc<dyn Validator>,
    ) -> Self {
        Self {
            store,
            primary: primary.into(),
            servers_dir: servers_dir.into(),
            locks,
            validator,
        }
    }

    pub async fn list(&self, artifact: Option<&str>) -> ConfResult<Vec<BackupInfo>> {
        self.store.list(artifact).await
    }

    pub async fn delete(&self, name: &str) -> ConfResult<()> {
        self.store.delete(name).await
    }

    /// Live path a backup restores onto.
    ///
    /// `nginx.conf` and the primary file's own name map to the primary path;
    /// any other `*.conf` artifact maps into the servers directory. Names that
    /// do not carry an artifact prefix restore onto the primary file.
    pub fn target_of(&self, backup: &str) -> ConfResult<PathBuf> {
        let Some(artifact) = naming::artifact_of(backup) else {
            return Ok(self.primary.clone());
        };
        if artifact == PRIMARY_ARTIFACT || artifact == fsio::artifact_name(&self.primary) {
            return Ok(self.primary.clone());
        }
        if naming::is_safe_name(artifact) && artifact.ends_with(SERVER_SUFFIX) {
            return Ok(self.servers_dir.join(artifact));
        }
        Err(ConfError::InvalidName(backup.to_string()))
    }

    /// Write the backup content back byte for byte, then test the result.
    ///
    /// The test is reported, not acted on: a failing test does not undo the
    /// restore.
    pub async fn restore(&self, name: &str) -> ConfResult<RestoreOutcome> {
        let content = self.store.get(name).await?;
        let target = self.target_of(name)?;

        {
            let _guard = self.locks.lock(&target).await;
            fsio::write_atomic(&target, &content)
                .await
                .map_err(|e| ConfError::io("restore", &target, e))?;
        }
        tracing::info!(backup = %name, artifact = %target.display(), "Backup restored");

        let check = self.validator.validate(&self.primary).await;
        if !check.success {
            tracing::warn!(backup = %name, "Restored configuration does not pass the config test");
        }
        Ok(RestoreOutcome {
            artifact: target.display().to_string(),
            output: check.output,
            valid: check.success,
        })
    }
}
