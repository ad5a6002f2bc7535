//! Per-server `*.conf` files.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::backup::naming::{self, SERVER_SUFFIX};
use crate::backup::BackupStore;
use crate::error::{ConfError, ConfResult};
use crate::process::{Reloader, Validator};
use crate::resources::config_file::read_artifact;
use crate::transaction::{ConfigTransaction, PathLocks, TransactionOutcome};

/// Written when a server file is created without content.
pub const DEFAULT_SERVER_TEMPLATE: &str = r#"server {
    listen 80;
    server_name localhost;

    location / {
        root /usr/share/nginx/html;
        index index.html index.htm;
    }
}"#;

#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub path: String,
    pub size: u64,
    /// Modification time, seconds since the epoch.
    pub updated: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerFile {
    pub name: String,
    pub content: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedServer {
    pub name: String,
    pub path: String,
}

#[derive(Clone)]
pub struct ServerResource {
    dir: PathBuf,
    backups: Arc<BackupStore>,
    locks: PathLocks,
    validator: Arc<dyn Validator>,
    reloader: Arc<dyn Reloader>,
}

impl ServerResource {
    pub fn new(
        dir: impl Into<PathBuf>,
        backups: Arc<BackupStore>,
        locks: PathLocks,
        validator: Arc<dyn Validator>,
        reloader: Arc<dyn Reloader>,
    ) -> Self {
        Self {
            dir: dir.into(),
            backups,
            locks,
            validator,
            reloader,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a user-supplied name to a path inside the servers directory.
    pub fn resolve(&self, name: &str) -> ConfResult<(String, PathBuf)> {
        let file_name = naming::normalize_server_name(name)?;
        let path = self.dir.join(&file_name);
        Ok((file_name, path))
    }

    pub async fn list(&self) -> ConfResult<Vec<ServerInfo>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| ConfError::io("read dir", &self.dir, e))?;

        let mut servers = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ConfError::io("read dir", &self.dir, e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.ends_with(SERVER_SUFFIX) {
                continue;
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let updated = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |d| d.as_secs());
            servers.push(ServerInfo {
                path: entry.path().display().to_string(),
                name,
                size: meta.len(),
                updated,
            });
        }
        servers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(servers)
    }

    pub async fn read(&self, name: &str) -> ConfResult<ServerFile> {
        let (name, path) = self.resolve(name)?;
        let content = read_artifact(&path).await?;
        Ok(ServerFile {
            name,
            content,
            path: path.display().to_string(),
        })
    }

    /// Save through the backup, validate, reload sequence.
    pub async fn save(&self, name: &str, content: &str) -> ConfResult<TransactionOutcome> {
        let (_, path) = self.resolve(name)?;
        Ok(ConfigTransaction::new(&self.backups, &self.locks)
            .apply(
                &path,
                content.as_bytes(),
                self.validator.as_ref(),
                self.reloader.as_ref(),
            )
            .await)
    }

    /// Create a new server file; empty content gets the default server block.
    pub async fn create(&self, name: &str, content: Option<&str>) -> ConfResult<CreatedServer> {
        let (name, path) = self.resolve(name)?;
        let content = match content {
            Some(c) if !c.is_empty() => c,
            _ => DEFAULT_SERVER_TEMPLATE,
        };

        let _guard = self.locks.lock(&path).await;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => ConfError::AlreadyExists(name.clone()),
                _ => ConfError::io("create", &path, e),
            })?;
        fill_new(file, &path, content.as_bytes())
            .await
            .map_err(|e| ConfError::io("write", &path, e))?;

        tracing::info!(server = %name, "Server file created");
        Ok(CreatedServer {
            name,
            path: path.display().to_string(),
        })
    }

    /// Rename `old` to `new`, refusing to replace an existing file.
    pub async fn rename(&self, old: &str, new: &str) -> ConfResult<(String, String)> {
        let (old_name, old_path) = self.resolve(old)?;
        if new.trim().is_empty() {
            return Err(ConfError::InvalidName("newName is required".to_string()));
        }
        let (new_name, new_path) = self.resolve(new)?;

        let _guards = self.locks.lock_pair(&old_path, &new_path).await;
        if !exists(&old_path).await? {
            return Err(ConfError::NotFound(old_name));
        }
        if exists(&new_path).await? {
            return Err(ConfError::AlreadyExists(new_name));
        }
        fs::rename(&old_path, &new_path)
            .await
            .map_err(|e| ConfError::io("rename", &old_path, e))?;

        tracing::info!(from = %old_name, to = %new_name, "Server file renamed");
        Ok((old_name, new_name))
    }

    /// Delete a server file after a best-effort backup.
    ///
    /// A failed backup is logged and the delete still goes ahead; the returned
    /// backup name is `None` in that case.
    pub async fn delete(&self, name: &str) -> ConfResult<Option<String>> {
        let (name, path) = self.resolve(name)?;
        let _guard = self.locks.lock(&path).await;

        let backup = match fs::read(&path).await {
            Ok(content) => match self.backups.create(&name, &content).await {
                Ok(backup) => Some(backup.name),
                Err(e) => {
                    tracing::warn!(server = %name, error = %e, "Backup before delete failed, deleting anyway");
                    None
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfError::NotFound(name));
            }
            Err(e) => {
                tracing::warn!(server = %name, error = %e, "Could not read file for backup, deleting anyway");
                None
            }
        };

        fs::remove_file(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfError::NotFound(name.clone()),
            _ => ConfError::io("delete", &path, e),
        })?;

        tracing::info!(server = %name, backup = ?backup, "Server file deleted");
        Ok(backup)
    }
}

/// Write a freshly created file; on failure remove it so the name stays free.
async fn fill_new<W>(mut file: W, path: &Path, content: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        file.write_all(content).await?;
        file.flush().await
    }
    .await;
    if written.is_err() {
        drop(file);
        let _ = fs::remove_file(path).await;
    }
    written
}

async fn exists(path: &Path) -> ConfResult<bool> {
    fs::try_exists(path)
        .await
        .map_err(|e| ConfError::io("stat", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::SystemClock;
    use crate::process::{ProcessResult, ValidationResult};
    use async_trait::async_trait;

    struct Pass;

    #[async_trait]
    impl Validator for Pass {
        async fn validate(&self, _candidate: &Path) -> ValidationResult {
            ProcessResult::ok("")
        }
    }

    #[async_trait]
    impl Reloader for Pass {
        async fn reload(&self) -> ProcessResult {
            ProcessResult::ok("")
        }
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        servers: ServerResource,
        store: Arc<BackupStore>,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let servers_dir = tmp.path().join("servers");
        let backups_dir = tmp.path().join("backups");
        std::fs::create_dir_all(&servers_dir).unwrap();
        std::fs::create_dir_all(&backups_dir).unwrap();
        let store = Arc::new(BackupStore::new(backups_dir, Arc::new(SystemClock)));
        let servers = ServerResource::new(
            servers_dir,
            store.clone(),
            PathLocks::new(),
            Arc::new(Pass),
            Arc::new(Pass),
        );
        Fixture {
            _tmp: tmp,
            servers,
            store,
        }
    }

    #[tokio::test]
    async fn test_create_appends_suffix_and_uses_template() {
        let f = fixture();
        let created = f.servers.create("example", None).await.unwrap();
        assert_eq!(created.name, "example.conf");

        let file = f.servers.read("example.conf").await.unwrap();
        assert_eq!(file.content, DEFAULT_SERVER_TEMPLATE);
    }

    /// Accepts nothing, like a full disk.
    struct FullDisk;

    impl AsyncWrite for FullDisk {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<io::Result<usize>> {
            std::task::Poll::Ready(Err(io::Error::other("no space left on device")))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_failed_fill_frees_the_name() {
        let f = fixture();
        let (_, path) = f.servers.resolve("partial").unwrap();
        std::fs::write(&path, "half a server {").unwrap();

        assert!(fill_new(FullDisk, &path, b"server {}").await.is_err());
        assert!(!path.exists());

        let created = f.servers.create("partial", Some("server {}")).await.unwrap();
        assert_eq!(created.name, "partial.conf");
    }

    #[tokio::test]
    async fn test_create_existing_is_untouched() {
        let f = fixture();
        f.servers.create("a", Some("server { listen 81; }")).await.unwrap();

        let err = f.servers.create("a.conf", Some("other")).await.unwrap_err();
        assert!(matches!(err, ConfError::AlreadyExists(_)));
        assert_eq!(f.servers.read("a").await.unwrap().content, "server { listen 81; }");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_names() {
        let f = fixture();
        for name in ["", "..", "../escape", "a b", "x/y"] {
            let err = f.servers.create(name, None).await.unwrap_err();
            assert!(matches!(err, ConfError::InvalidName(_)), "{name}");
        }
    }

    #[tokio::test]
    async fn test_rename() {
        let f = fixture();
        f.servers.create("a", Some("A")).await.unwrap();
        f.servers.create("b", Some("B")).await.unwrap();

        let err = f.servers.rename("a.conf", "b").await.unwrap_err();
        assert!(matches!(err, ConfError::AlreadyExists(_)));
        assert_eq!(f.servers.read("a").await.unwrap().content, "A");
        assert_eq!(f.servers.read("b").await.unwrap().content, "B");

        let err = f.servers.rename("missing.conf", "c").await.unwrap_err();
        assert!(matches!(err, ConfError::NotFound(_)));

        let err = f.servers.rename("a.conf", "../c").await.unwrap_err();
        assert!(matches!(err, ConfError::InvalidName(_)));

        let (old, new) = f.servers.rename("a.conf", "c").await.unwrap();
        assert_eq!((old.as_str(), new.as_str()), ("a.conf", "c.conf"));
        assert_eq!(f.servers.read("c").await.unwrap().content, "A");
        assert!(matches!(f.servers.read("a").await, Err(ConfError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_takes_backup() {
        let f = fixture();
        f.servers.create("gone", Some("server { listen 8080; }")).await.unwrap();

        let backup = f.servers.delete("gone.conf").await.unwrap().unwrap();
        assert!(backup.starts_with("gone.conf."));
        assert_eq!(f.store.get(&backup).await.unwrap(), b"server { listen 8080; }");
        assert!(f.servers.list().await.unwrap().is_empty());

        let err = f.servers.delete("gone.conf").await.unwrap_err();
        assert!(matches!(err, ConfError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_proceeds_when_backup_fails() {
        let f = fixture();
        f.servers.create("gone", None).await.unwrap();
        std::fs::remove_dir_all(f.store.dir()).unwrap();

        let backup = f.servers.delete("gone").await.unwrap();
        assert!(backup.is_none());
        assert!(matches!(f.servers.read("gone").await, Err(ConfError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_only_conf_files() {
        let f = fixture();
        f.servers.create("b", Some("bb")).await.unwrap();
        f.servers.create("a", Some("a")).await.unwrap();
        std::fs::write(f.servers.dir().join("readme.txt"), "x").unwrap();

        let list = f.servers.list().await.unwrap();
        let names: Vec<_> = list.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a.conf", "b.conf"]);
        assert_eq!(list[1].size, 2);
        assert!(list[0].updated > 0);
    }

    #[tokio::test]
    async fn test_save_creates_backup_and_writes() {
        let f = fixture();
        f.servers.create("site", Some("v1")).await.unwrap();

        let outcome = f.servers.save("site", "v2").await.unwrap();
        assert!(outcome.is_committed());
        assert_eq!(f.servers.read("site").await.unwrap().content, "v2");
        assert_eq!(f.store.get(&outcome.backup.unwrap()).await.unwrap(), b"v1");
    }
}
