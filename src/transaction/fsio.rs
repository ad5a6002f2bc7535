//! Filesystem helpers for live artifacts.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// File name used as the backup prefix for an artifact.
pub fn artifact_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string())
}

fn staging_path(path: &Path) -> PathBuf {
    // Leading dot and no `.conf` suffix, so `include *.conf` never sees it.
    let name = format!(".{}.{}.tmp", artifact_name(path), Uuid::new_v4().simple());
    path.with_file_name(name)
}

/// The file `path` ultimately refers to.
///
/// Symlinks (such as `sites-enabled` entries) resolve to their target, even
/// when the target does not exist yet. Anything else is returned unchanged.
pub async fn resolve(path: &Path) -> io::Result<PathBuf> {
    let is_link = match fs::symlink_metadata(path).await {
        Ok(meta) => meta.file_type().is_symlink(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => return Err(e),
    };
    if !is_link {
        return Ok(path.to_path_buf());
    }
    match fs::canonicalize(path).await {
        Ok(target) => Ok(target),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let link = fs::read_link(path).await?;
            Ok(match path.parent() {
                Some(dir) => dir.join(link),
                None => link,
            })
        }
        Err(e) => Err(e),
    }
}

/// Replace the file behind `path` with `content` via a staged file and a
/// rename, keeping the permissions of the file being replaced. A symlink is
/// written through, never replaced.
pub async fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let target = resolve(path).await?;
    let staged = staging_path(&target);
    let result = async {
        let mut file = fs::File::create(&staged).await?;
        file.write_all(content).await?;
        file.sync_all().await?;
        drop(file);
        if let Ok(meta) = fs::metadata(&target).await {
            fs::set_permissions(&staged, meta.permissions()).await?;
        }
        fs::rename(&staged, &target).await
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&staged).await;
    }
    result
}
