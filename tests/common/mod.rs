//! Shared fixtures for integration tests.
//!
//! `FakeNginx` stands in for the nginx binary: `-t -c <file>` fails when the
//! file, or any `*.conf` under the include dir, contains `invalid`; reload
//! and the lifecycle commands succeed unless told otherwise.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::net::TcpListener;

use nginx_admin::config::AdminConfig;
use nginx_admin::http::{AppState, HttpServer};
use nginx_admin::lifecycle::Shutdown;
use nginx_admin::process::{ExternalCommand, ProcessResult};

pub const VALID_CONFIG: &str = "events {}\nhttp {\n    include servers/*.conf;\n}\n";
pub const INVALID_CONFIG: &str = "events {}\nhttp {\n    invalid_directive on;\n}\n";

#[derive(Default)]
pub struct FakeNginx {
    include_dir: Option<PathBuf>,
    fail_reload: AtomicBool,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeNginx {
    pub fn new(include_dir: Option<PathBuf>) -> Self {
        Self {
            include_dir,
            ..Default::default()
        }
    }

    pub fn fail_reload(&self, fail: bool) {
        self.fail_reload.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, args: &[&str]) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.iter().map(String::as_str).eq(args.iter().copied()))
            .count()
    }

    fn test(&self, target: &Path) -> ProcessResult {
        let mut texts = vec![std::fs::read_to_string(target).unwrap_or_default()];
        if let Some(dir) = &self.include_dir {
            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    if entry.path().extension().is_some_and(|e| e == "conf") {
                        texts.push(std::fs::read_to_string(entry.path()).unwrap_or_default());
                    }
                }
            }
        }
        if texts.iter().any(|t| t.contains("invalid")) {
            ProcessResult::failed(
                1,
                format!(
                    "nginx: [emerg] unknown directive in {}\nnginx: configuration file {} test failed\n",
                    target.display(),
                    target.display()
                ),
            )
        } else {
            ProcessResult::ok(format!(
                "nginx: configuration file {} test is successful\n",
                target.display()
            ))
        }
    }
}

#[async_trait]
impl ExternalCommand for FakeNginx {
    async fn run(&self, args: &[String]) -> ProcessResult {
        self.calls.lock().unwrap().push(args.to_vec());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match args.as_slice() {
            ["-t", "-c", target] => self.test(Path::new(target)),
            ["-s", "reload"] if self.fail_reload.load(Ordering::SeqCst) => {
                ProcessResult::failed(1, "nginx: [error] invalid PID number \"\"\n")
            }
            _ => ProcessResult::ok(""),
        }
    }
}

/// `pgrep` that always reports two workers.
pub struct FakePgrep;

#[async_trait]
impl ExternalCommand for FakePgrep {
    async fn run(&self, _args: &[String]) -> ProcessResult {
        ProcessResult::ok("101\n102\n")
    }
}

/// Temporary nginx layout: `nginx.conf`, `servers/`, `backups/`.
pub struct Fixture {
    pub dir: TempDir,
    pub config: AdminConfig,
    pub nginx: Arc<FakeNginx>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let servers = dir.path().join("servers");
        let backups = dir.path().join("backups");
        std::fs::create_dir_all(&servers).unwrap();
        std::fs::create_dir_all(&backups).unwrap();
        let primary = dir.path().join("nginx.conf");
        std::fs::write(&primary, VALID_CONFIG).unwrap();

        let mut config = AdminConfig::default();
        config.listener.bind_address = "127.0.0.1:0".to_string();
        config.nginx.config_path = primary;
        config.nginx.servers_dir = servers.clone();
        config.nginx.backups_dir = backups;

        Self {
            dir,
            config,
            nginx: Arc::new(FakeNginx::new(Some(servers))),
        }
    }

    pub fn primary(&self) -> PathBuf {
        self.config.nginx.config_path.clone()
    }

    pub fn servers_dir(&self) -> PathBuf {
        self.config.nginx.servers_dir.clone()
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.config.nginx.backups_dir.clone()
    }

    pub fn backup_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.backups_dir())
            .unwrap()
            .flatten()
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    pub fn state(&self) -> AppState {
        AppState::with_commands(&self.config, self.nginx.clone(), Arc::new(FakePgrep))
    }
}

/// A running server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

impl TestServer {
    pub async fn start(fixture: &Fixture) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = HttpServer::with_state(fixture.config.clone(), fixture.state());
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, rx).await;
        });

        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        Self {
            addr,
            client,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
