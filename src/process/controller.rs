//! Lifecycle control of the managed server process.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;

use crate::observability::metrics;
use crate::process::command::{ExternalCommand, ProcessResult};

/// Asks the running server to re-read its configuration.
#[async_trait]
pub trait Reloader: Send + Sync {
    async fn reload(&self) -> ProcessResult;
}

/// Whether the server is running and under which pids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessStatus {
    pub running: bool,
    pub pids: Vec<String>,
}

/// Drives the nginx binary and the process search command.
#[derive(Clone)]
pub struct ProcessController {
    nginx: Arc<dyn ExternalCommand>,
    pgrep: Arc<dyn ExternalCommand>,
    config_path: PathBuf,
    process_name: String,
}

impl ProcessController {
    pub fn new(
        nginx: Arc<dyn ExternalCommand>,
        pgrep: Arc<dyn ExternalCommand>,
        config_path: impl Into<PathBuf>,
        process_name: impl Into<String>,
    ) -> Self {
        Self {
            nginx,
            pgrep,
            config_path: config_path.into(),
            process_name: process_name.into(),
        }
    }

    async fn nginx(&self, action: &'static str, args: &[&str]) -> ProcessResult {
        let started = Instant::now();
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let result = self.nginx.run(&args).await;
        metrics::record_command(action, result.success, started);
        tracing::info!(action, success = result.success, timed_out = result.timed_out, "nginx control");
        result
    }

    pub async fn start(&self) -> ProcessResult {
        let config = self.config_path.display().to_string();
        self.nginx("start", &["-c", &config]).await
    }

    pub async fn stop(&self) -> ProcessResult {
        self.nginx("stop", &["-s", "stop"]).await
    }

    /// Stop then start. Start is attempted even when stop fails, since a
    /// stopped or crashed server still needs starting.
    pub async fn restart(&self) -> ProcessResult {
        let stopped = self.stop().await;
        if !stopped.success {
            tracing::warn!(output = %stopped.output, "Stop failed during restart, starting anyway");
        }
        let mut started = self.start().await;
        started.output = format!("{}{}", stopped.output, started.output);
        started
    }

    pub async fn status(&self) -> ProcessStatus {
        let args = vec!["-x".to_string(), self.process_name.clone()];
        let result = self.pgrep.run(&args).await;
        let pids: Vec<String> = if result.success {
            result.output.split_whitespace().map(str::to_string).collect()
        } else {
            Vec::new()
        };
        ProcessStatus {
            running: !pids.is_empty(),
            pids,
        }
    }
}

#[async_trait]
impl Reloader for ProcessController {
    async fn reload(&self) -> ProcessResult {
        self.nginx("reload", &["-s", "reload"]).await
    }
}
