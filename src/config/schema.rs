//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the admin
//! service. All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the nginx admin service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Locations of the managed nginx installation.
    pub nginx: NginxConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// API authentication.
    pub auth: AuthConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:49856").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:49856".to_string(),
        }
    }
}

/// Paths and binaries of the managed server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NginxConfig {
    /// nginx executable used for `-t`, `-s reload`, start and stop.
    pub binary: PathBuf,

    /// Primary configuration file.
    pub config_path: PathBuf,

    /// Directory holding the per-server `*.conf` files.
    pub servers_dir: PathBuf,

    /// Directory receiving `*.backup` snapshots.
    pub backups_dir: PathBuf,

    /// Process name matched by the status check.
    pub process_name: String,

    /// Process search executable used by the status check.
    pub pgrep_binary: PathBuf,
}

impl Default for NginxConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("/usr/sbin/nginx"),
            config_path: PathBuf::from("/etc/nginx/nginx.conf"),
            servers_dir: PathBuf::from("/etc/nginx/servers"),
            backups_dir: PathBuf::from("./backups"),
            process_name: "nginx".to_string(),
            pgrep_binary: PathBuf::from("pgrep"),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for each external command (test, reload, start, stop, status).
    pub command_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            command_secs: 30,
            request_secs: 120,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// API authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer token required on `/api/*` when set.
    pub api_key: Option<String>,
}

/// Request hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Allow any origin (the bundled web UI is served from another port).
    pub cors_permissive: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            cors_permissive: true,
        }
    }
}
