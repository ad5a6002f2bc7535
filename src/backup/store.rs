//! Timestamped snapshots of configuration artifacts on disk.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::backup::clock::Clock;
use crate::backup::naming::{self, MAX_SEQUENCE};
use crate::error::{ConfError, ConfResult};
use crate::observability::metrics;

/// A snapshot that was just written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backup {
    pub name: String,
    pub artifact: String,
    pub created: NaiveDateTime,
    pub size: u64,
}

/// Listing entry for an existing snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub name: String,
    pub size: u64,
    /// File modification time, RFC 3339.
    pub created: String,
}

/// Directory of `*.backup` files.
pub struct BackupStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    /// Latest stamp issued; later stamps never go below it.
    last_issued: Mutex<Option<NaiveDateTime>>,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
            last_issued: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_stamp(&self) -> NaiveDateTime {
        let now = self.clock.now();
        let mut last = self
            .last_issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let stamp = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }

    /// Write `content` as a new snapshot of `artifact`.
    ///
    /// Existing snapshots are never overwritten: a name taken within the same
    /// second moves on to the next counter.
    pub async fn create(&self, artifact: &str, content: &[u8]) -> ConfResult<Backup> {
        naming::ensure_safe_name(artifact)?;
        let created = self.next_stamp();
        let stamp = naming::format_stamp(created);

        for sequence in 0..=MAX_SEQUENCE {
            let name = naming::backup_name(artifact, &stamp, sequence);
            let path = self.dir.join(&name);
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(ConfError::io("create backup", path, e)),
            };

            if let Err(e) = write_all_synced(&mut file, content).await {
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(ConfError::io("write backup", path, e));
            }

            metrics::record_backup(artifact);
            tracing::info!(backup = %name, artifact, size = content.len(), "Backup created");
            return Ok(Backup {
                name,
                artifact: artifact.to_string(),
                created,
                size: content.len() as u64,
            });
        }

        Err(ConfError::AlreadyExists(naming::backup_name(
            artifact,
            &stamp,
            MAX_SEQUENCE,
        )))
    }

    /// Snapshots, newest first, optionally only those of one artifact.
    pub async fn list(&self, artifact: Option<&str>) -> ConfResult<Vec<BackupInfo>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| ConfError::io("read dir", &self.dir, e))?;

        let mut backups = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ConfError::io("read dir", &self.dir, e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.ends_with(naming::BACKUP_SUFFIX) {
                continue;
            }
            if let Some(filter) = artifact {
                if naming::artifact_of(&name) != Some(filter) {
                    continue;
                }
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let created = meta
                .modified()
                .map(|t| DateTime::<Local>::from(t).to_rfc3339())
                .unwrap_or_default();
            backups.push(BackupInfo {
                name,
                size: meta.len(),
                created,
            });
        }

        backups.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(backups)
    }

    pub async fn get(&self, name: &str) -> ConfResult<Vec<u8>> {
        naming::ensure_backup_name(name)?;
        let path = self.dir.join(name);
        fs::read(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfError::NotFound(name.to_string()),
            _ => ConfError::io("read backup", path, e),
        })
    }

    pub async fn delete(&self, name: &str) -> ConfResult<()> {
        naming::ensure_backup_name(name)?;
        let path = self.dir.join(name);
        fs::remove_file(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfError::NotFound(name.to_string()),
            _ => ConfError::io("delete backup", path, e),
        })?;
        tracing::info!(backup = %name, "Backup deleted");
        Ok(())
    }
}

async fn write_all_synced(file: &mut fs::File, content: &[u8]) -> io::Result<()> {
    file.write_all(content).await?;
    file.sync_all().await
}
