//! Configuration validation through the server's own `-t` check.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::observability::metrics;
use crate::process::command::{ExternalCommand, ValidationResult};

/// Checks a candidate configuration without activating it.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, candidate: &Path) -> ValidationResult;
}

/// Runs `<nginx> -t -c <candidate>`.
#[derive(Clone)]
pub struct ProcessValidator {
    nginx: Arc<dyn ExternalCommand>,
}

impl ProcessValidator {
    pub fn new(nginx: Arc<dyn ExternalCommand>) -> Self {
        Self { nginx }
    }
}

#[async_trait]
impl Validator for ProcessValidator {
    async fn validate(&self, candidate: &Path) -> ValidationResult {
        let started = Instant::now();
        let args = vec![
            "-t".to_string(),
            "-c".to_string(),
            candidate.display().to_string(),
        ];
        let result = self.nginx.run(&args).await;
        metrics::record_command("test", result.success, started);
        if !result.success {
            tracing::info!(candidate = %candidate.display(), timed_out = result.timed_out, "Config test failed");
        }
        result
    }
}

/// Validates a fixed target regardless of the candidate passed in.
///
/// Server files are fragments included by the primary configuration, so they
/// are checked by testing the primary file.
#[derive(Clone)]
pub struct FixedTargetValidator<V> {
    inner: V,
    target: PathBuf,
}

impl<V: Validator> FixedTargetValidator<V> {
    pub fn new(inner: V, target: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            target: target.into(),
        }
    }
}

#[async_trait]
impl<V: Validator> Validator for FixedTargetValidator<V> {
    async fn validate(&self, _candidate: &Path) -> ValidationResult {
        self.inner.validate(&self.target).await
    }
}
