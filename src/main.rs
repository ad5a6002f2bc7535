//! Nginx configuration management service.
//!
//! ```text
//!     Operator / UI                ┌──────────────────────────────────────────┐
//!     ─────────────────────────────┼─▶ http server ──▶ api handlers           │
//!                                  │                      │                   │
//!                                  │                      ▼                   │
//!                                  │               resources (config,         │
//!                                  │               servers, backups)          │
//!                                  │                      │                   │
//!                                  │                      ▼                   │
//!                                  │   transaction: backup → apply →          │
//!                                  │   validate → rollback | reload           │
//!                                  │         │                    │           │
//!                                  │         ▼                    ▼           │
//!                                  │   backup store        process (nginx -t, │
//!                                  │                       -s reload, pgrep)  │
//!                                  └──────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use nginx_admin::config::{load_config, AdminConfig};
use nginx_admin::lifecycle::{shutdown_on_signal, Shutdown};
use nginx_admin::observability::{logging, metrics};
use nginx_admin::HttpServer;

#[derive(Parser)]
#[command(name = "nginx-admin")]
#[command(about = "HTTP API for safe nginx configuration changes", long_about = None)]
struct Args {
    /// TOML config file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => AdminConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "nginx-admin starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        config_path = %config.nginx.config_path.display(),
        servers_dir = %config.nginx.servers_dir.display(),
        backups_dir = %config.nginx.backups_dir.display(),
        command_timeout_secs = config.timeouts.command_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    tokio::fs::create_dir_all(&config.nginx.backups_dir).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
