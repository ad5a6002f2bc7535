//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wire the resources and process controller into shared state
//! - Create the Axum Router with the API routes
//! - Wire up middleware (tracing, timeouts, request ID, CORS)
//! - Cap request bodies at `security.max_body_size` (413 when exceeded)
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api::setup_api_router;
use crate::backup::{BackupStore, SystemClock};
use crate::config::AdminConfig;
use crate::http::request::{request_id, MakeRequestUuidV4};
use crate::process::{
    ExternalCommand, FixedTargetValidator, ProcessController, ProcessValidator, Reloader,
    SystemCommand,
};
use crate::resources::{BackupResource, ConfigResource, ServerResource};
use crate::transaction::PathLocks;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config_file: ConfigResource,
    pub servers: ServerResource,
    pub backups: BackupResource,
    pub controller: Arc<ProcessController>,
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    /// State backed by the real nginx and pgrep binaries.
    pub fn new(config: &AdminConfig) -> Self {
        let deadline = Duration::from_secs(config.timeouts.command_secs);
        let nginx: Arc<dyn ExternalCommand> =
            Arc::new(SystemCommand::new(&config.nginx.binary, deadline));
        let pgrep: Arc<dyn ExternalCommand> =
            Arc::new(SystemCommand::new(&config.nginx.pgrep_binary, deadline));
        Self::with_commands(config, nginx, pgrep)
    }

    /// State backed by the given command runners.
    pub fn with_commands(
        config: &AdminConfig,
        nginx: Arc<dyn ExternalCommand>,
        pgrep: Arc<dyn ExternalCommand>,
    ) -> Self {
        let paths = &config.nginx;
        let store = Arc::new(BackupStore::new(&paths.backups_dir, Arc::new(SystemClock)));
        let locks = PathLocks::new();

        let validator = ProcessValidator::new(nginx.clone());
        let controller = Arc::new(ProcessController::new(
            nginx,
            pgrep,
            &paths.config_path,
            paths.process_name.clone(),
        ));
        let reloader: Arc<dyn Reloader> = controller.clone();

        let config_file = ConfigResource::new(
            &paths.config_path,
            store.clone(),
            locks.clone(),
            Arc::new(validator.clone()),
            reloader.clone(),
        );
        let servers = ServerResource::new(
            &paths.servers_dir,
            store.clone(),
            locks.clone(),
            Arc::new(FixedTargetValidator::new(validator.clone(), &paths.config_path)),
            reloader,
        );
        let backups = BackupResource::new(
            store,
            &paths.config_path,
            &paths.servers_dir,
            locks,
            Arc::new(validator),
        );

        Self {
            config_file,
            servers,
            backups,
            controller,
            api_key: config.auth.api_key.as_deref().map(Arc::from),
        }
    }
}

/// HTTP server for the admin API.
pub struct HttpServer {
    router: Router,
    config: AdminConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AdminConfig) -> Self {
        let state = AppState::new(&config);
        Self::with_state(config, state)
    }

    pub fn with_state(config: AdminConfig, state: AppState) -> Self {
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AdminConfig, state: AppState) -> Router {
        let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id(request),
            )
        });

        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
            .layer(trace)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        let router = setup_api_router(state)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(middleware);

        if config.security.cors_permissive {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            config_path = %self.config.nginx.config_path.display(),
            servers_dir = %self.config.nginx.servers_dir.display(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AdminConfig {
        &self.config
    }
}
