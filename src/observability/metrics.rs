//! Metrics collection and exposition.
//!
//! # Metrics
//! - `nginx_admin_transactions_total` (counter): apply outcomes by `outcome`
//! - `nginx_admin_commands_total` (counter): external commands by `action`, `success`
//! - `nginx_admin_command_duration_seconds` (histogram): command latency by `action`
//! - `nginx_admin_backups_created_total` (counter): snapshots by `artifact`
//!
//! Recording is a no-op until a recorder is installed, so tests need no setup.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_transaction(outcome: &'static str) {
    metrics::counter!("nginx_admin_transactions_total", "outcome" => outcome).increment(1);
}

pub fn record_command(action: &'static str, success: bool, started: Instant) {
    let success = if success { "true" } else { "false" };
    metrics::counter!("nginx_admin_commands_total", "action" => action, "success" => success)
        .increment(1);
    metrics::histogram!("nginx_admin_command_duration_seconds", "action" => action)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_backup(artifact: &str) {
    metrics::counter!("nginx_admin_backups_created_total", "artifact" => artifact.to_string())
        .increment(1);
}
