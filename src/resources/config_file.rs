//! The primary configuration file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;

use crate::backup::naming::PRIMARY_ARTIFACT;
use crate::backup::{Backup, BackupStore};
use crate::error::{ConfError, ConfResult};
use crate::process::{Reloader, ValidationResult, Validator};
use crate::transaction::{ConfigTransaction, PathLocks, TransactionOutcome};

#[derive(Clone)]
pub struct ConfigResource {
    path: PathBuf,
    backups: Arc<BackupStore>,
    locks: PathLocks,
    validator: Arc<dyn Validator>,
    reloader: Arc<dyn Reloader>,
}

impl ConfigResource {
    pub fn new(
        path: impl Into<PathBuf>,
        backups: Arc<BackupStore>,
        locks: PathLocks,
        validator: Arc<dyn Validator>,
        reloader: Arc<dyn Reloader>,
    ) -> Self {
        Self {
            path: path.into(),
            backups,
            locks,
            validator,
            reloader,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> ConfResult<String> {
        read_artifact(&self.path).await
    }

    /// Save through the full backup, validate, reload sequence.
    pub async fn save(&self, content: &str) -> TransactionOutcome {
        ConfigTransaction::new(&self.backups, &self.locks)
            .backup_prefix(PRIMARY_ARTIFACT)
            .apply(
                &self.path,
                content.as_bytes(),
                self.validator.as_ref(),
                self.reloader.as_ref(),
            )
            .await
    }

    /// Test the live file without changing anything.
    pub async fn test(&self) -> ValidationResult {
        self.validator.validate(&self.path).await
    }

    /// Snapshot the live file on demand. Unlike the apply path, an unreadable
    /// file is an error here: there is nothing to snapshot.
    pub async fn create_backup(&self) -> ConfResult<Backup> {
        let _guard = self.locks.lock(&self.path).await;
        let content = fs::read(&self.path)
            .await
            .map_err(|e| ConfError::io("read", &self.path, e))?;
        self.backups
            .create(PRIMARY_ARTIFACT, &content)
            .await
    }
}

/// Read an artifact as text, mapping a missing file to `NotFound`.
pub(crate) async fn read_artifact(path: &Path) -> ConfResult<String> {
    match fs::read(path).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(ConfError::NotFound(path.display().to_string()))
        }
        Err(e) => Err(ConfError::io("read", path, e)),
    }
}
